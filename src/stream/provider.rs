//! Host provider traits and the pipeline's data model.
//!
//! A [`HostProvider`] knows how to walk one third-party host: search its
//! catalog, resolve a detail/episode page into server [`Candidate`]s, and
//! run a single [`Strategy`] against a candidate to obtain a final URL.
//! Everything host-specific (markup parsing, token decryption, redirect
//! chains) lives behind this trait; the resolver only sees the structured
//! types defined here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::domain_cache::DomainCache;
use crate::error::ResolveError;
use crate::http_client::HttpClient;
use crate::quality::Quality;

/// Kind of media being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movie => f.write_str("movie"),
            MediaType::Series => f.write_str("series"),
        }
    }
}

/// One caller request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    /// Canonical media identifier (e.g. an IMDb or TMDB id).
    pub media_id: String,
    pub media_type: MediaType,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl MediaQuery {
    pub fn movie(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            media_type: MediaType::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn episode(media_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            media_id: media_id.into(),
            media_type: MediaType::Series,
            season: Some(season),
            episode: Some(episode),
        }
    }

    /// Reject queries no provider could answer meaningfully.
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.media_id.trim().is_empty() {
            return Err(ResolveError::InvalidQuery("empty media id".to_string()));
        }

        match self.media_type {
            MediaType::Movie => {
                if self.season.is_some() || self.episode.is_some() {
                    return Err(ResolveError::InvalidQuery(format!(
                        "movie query {} carries season/episode",
                        self.media_id
                    )));
                }
            }
            MediaType::Series => match (self.season, self.episode) {
                (Some(s), Some(e)) if s > 0 && e > 0 => {}
                (Some(_), Some(_)) => {
                    return Err(ResolveError::InvalidQuery(format!(
                        "series query {} has a zero season/episode",
                        self.media_id
                    )));
                }
                _ => {
                    return Err(ResolveError::InvalidQuery(format!(
                        "series query {} needs both season and episode",
                        self.media_id
                    )));
                }
            },
        }

        Ok(())
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => write!(f, "{} S{s:02}E{e:02}", self.media_id),
            _ => write!(f, "{} ({})", self.media_id, self.media_type),
        }
    }
}

/// Canonical title and year for a media id, as returned by metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleInfo {
    pub title: String,
    pub year: Option<i32>,
    pub media_type: MediaType,
}

/// One entry from a host's search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Host-specific identifier or slug.
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub media_type: Option<MediaType>,
    /// Detail page URL, if the host exposes one.
    pub url: Option<String>,
}

/// One alternative method of turning a [`Candidate`] into a final URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub name: String,
    /// 1 = most preferred.
    pub priority: u32,
    /// Opaque reference the owning provider interprets (endpoint, token, ...).
    pub reference: String,
}

impl Strategy {
    pub fn new(name: impl Into<String>, priority: u32, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority,
            reference: reference.into(),
        }
    }
}

/// A logical server/source entry point, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    /// Human-readable server name, also used as a quality hint.
    pub source_label: String,
    pub raw_locator: String,
    /// Pass-through headers for probes, manifest fetches and playback.
    pub headers: HashMap<String, String>,
    pub strategies: Vec<Strategy>,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        source_label: impl Into<String>,
        raw_locator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_label: source_label.into(),
            raw_locator: raw_locator.into(),
            headers: HashMap::new(),
            strategies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Pixel dimensions of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Parse an HLS `RESOLUTION` attribute such as `1920x1080`.
    pub fn parse(value: &str) -> Option<Self> {
        let (w, h) = value.trim().split_once(['x', 'X'])?;
        Some(Self {
            width: w.trim().parse().ok()?,
            height: h.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A final, playable video reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stream {
    pub url: String,
    pub quality: Quality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    pub source_label: String,
}

/// Shared state handed to every provider call.
#[derive(Clone)]
pub struct ProviderContext {
    pub client: HttpClient,
    pub domains: Arc<DomainCache>,
    pub config: Arc<ResolverConfig>,
}

impl ProviderContext {
    pub fn new(client: HttpClient, domains: Arc<DomainCache>, config: Arc<ResolverConfig>) -> Self {
        Self {
            client,
            domains,
            config,
        }
    }
}

/// Canonical title/year lookup for a media id.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn title_info(&self, query: &MediaQuery) -> Result<TitleInfo>;
}

/// A fixed title acts as its own lookup.
#[async_trait]
impl MetadataLookup for TitleInfo {
    async fn title_info(&self, _query: &MediaQuery) -> Result<TitleInfo> {
        Ok(self.clone())
    }
}

/// Trait for third-party hosts.
///
/// The resolver drives the methods in order: [`search`](Self::search),
/// best-match selection (done by the resolver), [`candidates`](Self::candidates),
/// then [`resolve_strategy`](Self::resolve_strategy) once per strategy,
/// concurrently.
#[async_trait]
pub trait HostProvider: Send + Sync {
    /// Short lowercase provider name (e.g., `"direct"`).
    fn name(&self) -> &'static str;

    /// Search the host's catalog for the given title.
    async fn search(
        &self,
        title: &TitleInfo,
        query: &MediaQuery,
        ctx: &ProviderContext,
    ) -> Result<Vec<SearchHit>>;

    /// Resolve the detail (and episode) page of the selected hit into
    /// server candidates, each with its alternative strategies.
    async fn candidates(
        &self,
        hit: &SearchHit,
        query: &MediaQuery,
        ctx: &ProviderContext,
    ) -> Result<Vec<Candidate>>;

    /// Run one strategy. `Ok(None)` means the strategy found nothing.
    async fn resolve_strategy(
        &self,
        candidate: &Candidate,
        strategy: &Strategy,
        ctx: &ProviderContext,
    ) -> Result<Option<String>>;
}
