use snag::{Quality, QualityHints};

pub fn cmd_classify(
    height: Option<u32>,
    bandwidth: Option<u64>,
    label: Option<&str>,
    url: Option<&str>,
) {
    let mut hints = QualityHints::new();
    if let Some(h) = height {
        hints = hints.height(h);
    }
    if let Some(bw) = bandwidth {
        hints = hints.bandwidth(bw);
    }
    if let Some(l) = label {
        hints = hints.label(l);
    }
    if let Some(u) = url {
        hints = hints.url(u);
    }

    println!("{}", Quality::classify(&hints));
}

pub fn cmd_classify_texts(texts: &[String]) {
    for text in texts {
        let quality = Quality::classify(&QualityHints::new().label(text));
        println!("{:>8}  {text}", quality.label());
    }
}
