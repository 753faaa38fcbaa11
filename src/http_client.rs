//! Shared HTTP client
//!
//! One pooled `reqwest` client per [`Resolver`](crate::resolve::Resolver),
//! shared by the link validator, the playlist analyzer and every provider.
//! Features:
//! - HTTP/2 negotiated via ALPN, HTTP/1.1 fallback
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - DNS caching + Happy Eyeballs (IPv4/IPv6 racing)
//! - Connection pooling with keep-alive
//! - Cookie store, so hosts can set session cookies mid-chain

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};

use crate::config::ResolverConfig;

/// Pooled HTTP client
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self> {
        Self::from_config(&ResolverConfig::default())
    }

    /// Create a client from resolver configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            // Don't assume HTTP/2 - let server negotiate
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            // Per-request timeouts are set by each caller; this is the ceiling
            .timeout(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// Build a GET request carrying the given pass-through headers
    pub fn get(&self, url: &str, headers: &HashMap<String, String>) -> RequestBuilder {
        with_headers(self.client.get(url), headers)
    }

    /// Build a HEAD request carrying the given pass-through headers
    pub fn head(&self, url: &str, headers: &HashMap<String, String>) -> RequestBuilder {
        with_headers(self.client.head(url), headers)
    }

    /// GET a URL and return the body, failing on non-2xx status
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn fetch_text(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<String> {
        let response: Response = self.get(url, headers).timeout(timeout).send().await?;
        let status = response.status();
        debug!(status = %status, "Response received");

        if !status.is_success() {
            return Err(anyhow!("GET {url} returned {status}"));
        }

        Ok(response.text().await?)
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn with_headers(mut req: RequestBuilder, headers: &HashMap<String, String>) -> RequestBuilder {
    for (k, v) in headers {
        req = req.header(k.as_str(), v.as_str());
    }
    req
}
