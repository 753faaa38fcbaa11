use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use snag::stream::providers::DirectProvider;
use snag::stream::{MediaQuery, MediaType, TitleInfo};
use snag::{Resolver, ResolverConfig};

use super::parse_headers;

/// What the links are supposed to be.
pub struct Target {
    pub title: String,
    pub year: Option<i32>,
    pub id: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl Target {
    fn query(&self) -> MediaQuery {
        let id = self.id.clone().unwrap_or_else(|| self.title.clone());
        match (self.season, self.episode) {
            (Some(s), Some(e)) => MediaQuery::episode(id, s, e),
            _ => MediaQuery::movie(id),
        }
    }

    fn title_info(&self, media_type: MediaType) -> TitleInfo {
        TitleInfo {
            title: self.title.clone(),
            year: self.year,
            media_type,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub async fn cmd_resolve(
    config: ResolverConfig,
    links: Vec<String>,
    target: Target,
    raw_headers: &[String],
    json: bool,
) -> Result<()> {
    let query = target.query();
    let title = target.title_info(query.media_type);

    let mut provider = DirectProvider::new(links);
    for (name, value) in parse_headers(raw_headers)? {
        provider = provider.with_header(name, value);
    }

    let resolver = Resolver::new(Arc::new(title), config)?.with_provider(Arc::new(provider));

    let start = Instant::now();
    let streams = resolver.resolve(&query).await?;
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&streams)?);
        return Ok(());
    }

    println!("🎬 {query}\n");
    if streams.is_empty() {
        println!("❌ No playable streams");
        return Ok(());
    }

    for (i, stream) in streams.iter().enumerate() {
        let size = stream
            .size_bytes
            .map(|n| format!(" ({:.1} MB)", n as f64 / 1_048_576.0))
            .unwrap_or_default();
        println!(
            "{:>3}. {:>8}  [{}] {}{size}",
            i + 1,
            stream.quality.label(),
            stream.source_label,
            stream.url
        );
    }

    println!(
        "\n✅ {} streams in {:.0}ms",
        streams.len(),
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}
