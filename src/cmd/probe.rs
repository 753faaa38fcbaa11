use anyhow::Result;

use snag::{HttpClient, LinkValidator, ResolverConfig};

use super::parse_headers;

pub async fn cmd_probe(config: &ResolverConfig, urls: &[String], raw_headers: &[String]) -> Result<()> {
    let headers = parse_headers(raw_headers)?;
    let client = HttpClient::from_config(config)?;
    let validator = LinkValidator::new(client, config.validate_timeout());

    let probes = futures::future::join_all(urls.iter().map(|url| validator.probe(url, &headers))).await;

    let mut reachable = 0;
    for (url, probe) in urls.iter().zip(&probes) {
        let status = probe
            .status
            .map_or_else(|| "---".to_string(), |s| s.to_string());
        let size = probe
            .content_length
            .map(|n| format!(" {n} bytes"))
            .unwrap_or_default();
        let mark = if probe.valid { "✅" } else { "❌" };
        println!("{mark} {status} {url}{size}");
        if probe.valid {
            reachable += 1;
        }
    }

    println!("\n{reachable}/{} reachable", urls.len());
    Ok(())
}
