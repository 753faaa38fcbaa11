//! Link validation
//!
//! A lightweight reachability probe: `HEAD` first, and a two-byte ranged
//! `GET` when the server refuses `HEAD`. 2xx (including 206) is valid;
//! everything else, timeouts and transport errors included, is not.
//! Probing never fails, it only answers.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::{Response, StatusCode};
use tracing::{debug, instrument};

use crate::http_client::HttpClient;

/// Outcome of probing one URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Probe {
    pub valid: bool,
    /// Final HTTP status, `None` on transport error or timeout.
    pub status: Option<u16>,
    /// Full resource size when the server reports it.
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

impl Probe {
    fn unreachable() -> Self {
        Self::default()
    }

    fn from_response(response: &Response) -> Self {
        let status = response.status();
        let headers = response.headers();

        // A ranged reply carries the full size in Content-Range: bytes 0-1/12345
        let content_length = if status == StatusCode::PARTIAL_CONTENT {
            headers
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit_once('/'))
                .and_then(|(_, total)| total.trim().parse().ok())
        } else {
            headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        };

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            valid: status.is_success(),
            status: Some(status.as_u16()),
            content_length,
            content_type,
        }
    }
}

/// Bounded-timeout URL prober.
#[derive(Clone)]
pub struct LinkValidator {
    client: HttpClient,
    timeout: Duration,
}

impl LinkValidator {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe a URL and report status, size and content type.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn probe(&self, url: &str, headers: &HashMap<String, String>) -> Probe {
        if !is_http_url(url) {
            debug!("Not an HTTP(S) URL, skipping probe");
            return Probe::unreachable();
        }

        let head = self
            .client
            .head(url, headers)
            .timeout(self.timeout)
            .send()
            .await;

        match head {
            Ok(resp) if head_unsupported(resp.status()) => {
                debug!(status = %resp.status(), "HEAD refused, retrying with ranged GET");
                self.ranged_get(url, headers).await
            }
            Ok(resp) => {
                let probe = Probe::from_response(&resp);
                debug!(status = ?probe.status, valid = probe.valid, "HEAD probe");
                probe
            }
            Err(e) => {
                debug!("HEAD probe failed: {e}");
                Probe::unreachable()
            }
        }
    }

    /// `true` if the URL currently serves content.
    pub async fn is_valid(&self, url: &str, headers: &HashMap<String, String>) -> bool {
        self.probe(url, headers).await.valid
    }

    /// Validate independent URLs fully in parallel.
    ///
    /// Output order matches input order; one failure never affects another.
    pub async fn validate_all(
        &self,
        urls: &[String],
        headers: &HashMap<String, String>,
    ) -> Vec<(String, bool)> {
        let probes = urls.iter().map(|url| async move {
            let valid = self.is_valid(url, headers).await;
            (url.clone(), valid)
        });
        join_all(probes).await
    }

    async fn ranged_get(&self, url: &str, headers: &HashMap<String, String>) -> Probe {
        let result = self
            .client
            .get(url, headers)
            .header(RANGE, "bytes=0-1")
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(resp) => {
                let probe = Probe::from_response(&resp);
                debug!(status = ?probe.status, valid = probe.valid, "Ranged GET probe");
                probe
            }
            Err(e) => {
                debug!("Ranged GET probe failed: {e}");
                Probe::unreachable()
            }
        }
    }
}

/// Statuses that mean "try GET instead". Many CDNs answer 403 to HEAD only.
fn head_unsupported(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED | StatusCode::FORBIDDEN
    )
}

fn is_http_url(url: &str) -> bool {
    url::Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}
