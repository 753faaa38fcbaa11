use anyhow::Result;

use snag::{HttpClient, PlaylistAnalyzer, ResolverConfig};

use super::parse_headers;

#[allow(clippy::cast_precision_loss)]
pub async fn cmd_manifest(config: &ResolverConfig, url: &str, raw_headers: &[String]) -> Result<()> {
    let headers = parse_headers(raw_headers)?;
    let client = HttpClient::from_config(config)?;
    let analyzer = PlaylistAnalyzer::new(client, config.manifest_timeout());

    println!("📺 Manifest: {url}\n");
    let variants = analyzer.analyze(url, &headers).await;

    for variant in &variants {
        let bandwidth = variant
            .bandwidth
            .map(|bw| format!("{:.1} Mbps", bw as f64 / 1_000_000.0))
            .unwrap_or_default();
        let resolution = variant
            .resolution
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        println!(
            "{:>8} {:>10} {:>10}  {}",
            variant.quality.label(), resolution, bandwidth, variant.url
        );
    }

    println!("\n({} variants)", variants.len());
    Ok(())
}
