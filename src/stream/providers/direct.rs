//! Direct-link provider
//!
//! Wraps links the caller already has (a CDN URL, an HLS master playlist)
//! so they go through the same validation, manifest expansion and ranking
//! as links scraped from a host. Each link becomes one candidate with a
//! single `direct` strategy.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::warn;

use crate::stream::provider::{
    Candidate, HostProvider, MediaQuery, ProviderContext, SearchHit, Strategy, TitleInfo,
};

pub struct DirectProvider {
    links: Vec<String>,
    headers: HashMap<String, String>,
}

impl DirectProvider {
    #[must_use]
    pub fn new(links: Vec<String>) -> Self {
        Self {
            links,
            headers: HashMap::new(),
        }
    }

    /// Attach a pass-through header (e.g. `Referer`) to every candidate.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns `true` if the link can be used as-is.
    pub fn matches(&self, url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    fn label_for(url: &str) -> String {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "direct".to_string())
    }
}

#[async_trait]
impl HostProvider for DirectProvider {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn search(
        &self,
        title: &TitleInfo,
        _query: &MediaQuery,
        _ctx: &ProviderContext,
    ) -> Result<Vec<SearchHit>> {
        if self.links.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![SearchHit {
            id: "direct".to_string(),
            title: title.title.clone(),
            year: title.year,
            media_type: Some(title.media_type),
            url: None,
        }])
    }

    async fn candidates(
        &self,
        _hit: &SearchHit,
        _query: &MediaQuery,
        _ctx: &ProviderContext,
    ) -> Result<Vec<Candidate>> {
        let candidates = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, link)| {
                let ok = self.matches(link);
                if !ok {
                    warn!("Skipping non-HTTP link: {link}");
                }
                ok
            })
            .map(|(i, link)| Candidate {
                id: format!("direct-{}", i + 1),
                source_label: Self::label_for(link),
                raw_locator: link.clone(),
                headers: self.headers.clone(),
                strategies: vec![Strategy::new("direct", 1, link.clone())],
            })
            .collect();

        Ok(candidates)
    }

    async fn resolve_strategy(
        &self,
        candidate: &Candidate,
        strategy: &Strategy,
        _ctx: &ProviderContext,
    ) -> Result<Option<String>> {
        if strategy.name != "direct" {
            return Err(anyhow!(
                "Direct provider has no strategy '{}' for {}",
                strategy.name,
                candidate.id
            ));
        }
        Ok(Some(strategy.reference.clone()).filter(|r| !r.is_empty()))
    }
}
