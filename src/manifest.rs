//! HLS master playlist analysis
//!
//! Expands an adaptive-streaming manifest into its concrete quality
//! variants. Supports:
//! - Master playlists (`#EXT-X-STREAM-INF` + URI line per variant)
//! - Media playlists (no variants; the manifest itself is the stream)
//! - Relative, root-relative and absolute variant URIs
//!
//! Analysis never fails the caller: an unreachable or unrecognisable
//! manifest degrades to a single `Unknown` variant pointing at itself.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::ResolveError;
use crate::http_client::HttpClient;
use crate::quality::{Quality, QualityHints};
use crate::stream::Resolution;

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";
const SEGMENT_MARKERS: [&str; 3] = ["#EXTINF:", "#EXT-X-TARGETDURATION", "#EXT-X-MEDIA-SEQUENCE"];

/// One playable quality variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub url: String,
    pub quality: Quality,
    pub bandwidth: Option<u64>,
    pub resolution: Option<Resolution>,
}

impl Variant {
    /// The manifest itself, quality unknown.
    fn whole(url: &str) -> Self {
        Self {
            url: url.to_string(),
            quality: Quality::Unknown,
            bandwidth: None,
            resolution: None,
        }
    }
}

/// `true` if a resolved link should be expanded as a manifest.
///
/// Deliberately lenient: `.m3u8` anywhere in the URL (proxied manifests
/// carry it in the query string), or an `mpegurl` content type from the probe.
pub fn looks_like_manifest(url: &str, content_type: Option<&str>) -> bool {
    let url_hit = url.to_ascii_lowercase().contains(".m3u8");
    let type_hit = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("mpegurl"));
    url_hit || type_hit
}

/// Parse manifest text fetched from `manifest_url`.
///
/// Returns the variants sorted best first (quality, then bandwidth). A
/// media playlist yields the manifest URL itself as one `Unknown` variant.
///
/// # Errors
///
/// `ResolveError::ManifestParse` when the text has neither variant nor
/// segment markers, or declares variants without any URI.
pub fn parse_manifest(text: &str, manifest_url: &str) -> Result<Vec<Variant>, ResolveError> {
    let base = Url::parse(manifest_url).ok();
    let mut variants = Vec::new();
    let mut pending: Option<HashMap<String, String>> = None;
    let mut declared = 0usize;

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix(STREAM_INF) {
            declared += 1;
            pending = Some(parse_attributes(rest));
        } else if line.is_empty() || line.starts_with('#') {
            continue;
        } else if let Some(attrs) = pending.take() {
            let url = resolve_uri(base.as_ref(), line);
            variants.push(build_variant(url, &attrs));
        }
    }

    if declared == 0 {
        if SEGMENT_MARKERS.iter().any(|m| text.contains(m)) {
            debug!("Media playlist, using manifest URL as the single stream");
            return Ok(vec![Variant::whole(manifest_url)]);
        }
        return Err(ResolveError::ManifestParse {
            url: manifest_url.to_string(),
            reason: "no variant or segment markers".to_string(),
        });
    }

    if variants.is_empty() {
        return Err(ResolveError::ManifestParse {
            url: manifest_url.to_string(),
            reason: format!("{declared} variant declarations without URIs"),
        });
    }

    sort_variants(&mut variants);
    Ok(variants)
}

fn build_variant(url: String, attrs: &HashMap<String, String>) -> Variant {
    let bandwidth = attrs
        .get("BANDWIDTH")
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|b| *b > 0);
    let resolution = attrs.get("RESOLUTION").and_then(|r| Resolution::parse(r));

    let mut hints = QualityHints::new().url(&url);
    if let Some(r) = resolution {
        hints = hints.height(r.height);
    }
    if let Some(b) = bandwidth {
        hints = hints.bandwidth(b);
    }
    let quality = Quality::classify(&hints);

    Variant {
        url,
        quality,
        bandwidth,
        resolution,
    }
}

/// Best first: quality descending, then bandwidth descending. Stable.
fn sort_variants(variants: &mut [Variant]) {
    variants.sort_by(|a, b| {
        Quality::cmp_desc(&a.quality, &b.quality)
            .then_with(|| b.bandwidth.unwrap_or(0).cmp(&a.bandwidth.unwrap_or(0)))
    });
}

/// Split an attribute list, honouring quoted values that contain commas.
fn parse_attributes(attr_str: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut current = String::new();
    let mut in_quotes = false;

    let mut flush = |item: &mut String| {
        if let Some((k, v)) = item.split_once('=') {
            attrs.insert(
                k.trim().to_ascii_uppercase(),
                v.trim().trim_matches('"').to_string(),
            );
        }
        item.clear();
    };

    for c in attr_str.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => flush(&mut current),
            _ => current.push(c),
        }
    }
    flush(&mut current);

    attrs
}

fn resolve_uri(base: Option<&Url>, uri: &str) -> String {
    match base {
        Some(base) => base.join(uri).map_or_else(|_| uri.to_string(), String::from),
        None => uri.to_string(),
    }
}

/// Fetches manifests and expands them into variants.
#[derive(Clone)]
pub struct PlaylistAnalyzer {
    client: HttpClient,
    timeout: Duration,
}

impl PlaylistAnalyzer {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch and expand a manifest. Never fails; see module docs.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn analyze(&self, url: &str, headers: &HashMap<String, String>) -> Vec<Variant> {
        let text = match self.client.fetch_text(url, headers, self.timeout).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Manifest fetch failed, keeping URL as-is: {e}");
                return vec![Variant::whole(url)];
            }
        };

        match parse_manifest(&text, url) {
            Ok(variants) => {
                debug!("Found {} variants", variants.len());
                variants
            }
            Err(e) => {
                warn!("{e}; keeping URL as-is");
                vec![Variant::whole(url)]
            }
        }
    }
}
