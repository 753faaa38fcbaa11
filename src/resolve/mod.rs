//! Resolution orchestrator
//!
//! Drives the whole pipeline for one [`MediaQuery`]:
//!
//! ```text
//! metadata lookup ─► per provider (concurrently):
//!                      search ─► best match ─► candidates      (sequential)
//!                      └─► race every candidate                (concurrent, settle-all)
//!                          └─► expand manifests / classify
//!                  ─► merge ─► dedup & rank
//! ```
//!
//! "Not found" at any stage yields an empty list, never an error; only a
//! malformed query is rejected.

pub mod racer;
pub mod rank;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use futures::FutureExt;
use tracing::{info, instrument, warn};

use crate::config::ResolverConfig;
use crate::domain_cache::DomainCache;
use crate::error::{DiscoveryError, ResolveError};
use crate::http_client::HttpClient;
use crate::manifest::{looks_like_manifest, PlaylistAnalyzer};
use crate::matching::select_best_match;
use crate::quality::{Quality, QualityHints};
use crate::stream::{
    Candidate, HostProvider, MediaQuery, MetadataLookup, ProviderContext, Stream, TitleInfo,
};
use crate::validator::LinkValidator;

pub use racer::{
    AttemptOutcome, CandidateState, RaceReport, ResolutionAttempt, ResolvedLink, StrategyRacer,
};
pub use rank::dedup_and_rank;

/// Resolves media queries into ranked streams across registered providers.
pub struct Resolver {
    metadata: Arc<dyn MetadataLookup>,
    providers: Vec<Arc<dyn HostProvider>>,
    ctx: ProviderContext,
    racer: StrategyRacer,
    analyzer: PlaylistAnalyzer,
}

impl Resolver {
    /// Create a resolver with no providers yet.
    pub fn new(metadata: Arc<dyn MetadataLookup>, config: ResolverConfig) -> Result<Self> {
        let client = HttpClient::from_config(&config)?;
        let domains = Arc::new(DomainCache::new(config.domain_cache_ttl()));
        let validator = LinkValidator::new(client.clone(), config.validate_timeout());
        let racer = StrategyRacer::new(validator, config.strategy_timeout());
        let analyzer = PlaylistAnalyzer::new(client.clone(), config.manifest_timeout());

        Ok(Self {
            metadata,
            providers: Vec::new(),
            ctx: ProviderContext::new(client, domains, Arc::new(config)),
            racer,
            analyzer,
        })
    }

    /// Register a host provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn HostProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Context handed to providers (client, domain cache, config).
    pub fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    /// Resolve a query into unique streams, best quality first.
    ///
    /// # Errors
    ///
    /// Only `ResolveError::InvalidQuery`; every other failure is logged and
    /// contributes nothing to the result.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn resolve(&self, query: &MediaQuery) -> Result<Vec<Stream>, ResolveError> {
        query.validate()?;

        let title = match self.lookup_title(query).await {
            Ok(title) => title,
            Err(e) => {
                warn!("{e}");
                return Ok(Vec::new());
            }
        };
        info!(
            "Resolving '{}' ({:?}) across {} providers",
            title.title,
            title.year,
            self.providers.len()
        );

        let per_provider = self.providers.iter().map(|provider| {
            AssertUnwindSafe(self.resolve_with(provider.as_ref(), &title, query))
                .catch_unwind()
                .map(move |outcome| {
                    outcome.unwrap_or_else(|payload| {
                        warn!(
                            provider = provider.name(),
                            "Provider panicked, dropping it: {}",
                            panic_message(payload.as_ref())
                        );
                        Vec::new()
                    })
                })
        });
        let merged: Vec<Stream> = join_all(per_provider).await.into_iter().flatten().collect();

        let ranked = dedup_and_rank(merged);
        info!("Resolved {} streams", ranked.len());
        Ok(ranked)
    }

    /// Run the sequential discovery chain of one provider.
    pub async fn discover(
        &self,
        provider: &dyn HostProvider,
        title: &TitleInfo,
        query: &MediaQuery,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        let limit = self.ctx.config.discovery_timeout();

        let hits = bounded("search", limit, provider.search(title, query, &self.ctx))
            .await?
            .map_err(|e| DiscoveryError::Search(format!("{e:#}")))?;

        let hit = select_best_match(title, &hits, self.ctx.config.match_threshold).ok_or_else(
            || DiscoveryError::NoMatch {
                title: title.title.clone(),
            },
        )?;

        let candidates = bounded("detail", limit, provider.candidates(hit, query, &self.ctx))
            .await?
            .map_err(|e| DiscoveryError::Detail(format!("{e:#}")))?;

        if candidates.is_empty() {
            return Err(DiscoveryError::NoCandidates {
                title: hit.title.clone(),
            });
        }
        Ok(candidates)
    }

    async fn lookup_title(&self, query: &MediaQuery) -> Result<TitleInfo, DiscoveryError> {
        let limit = self.ctx.config.discovery_timeout();
        bounded("metadata", limit, self.metadata.title_info(query))
            .await?
            .map_err(|e| DiscoveryError::Metadata(format!("{e:#}")))
    }

    async fn resolve_with(
        &self,
        provider: &dyn HostProvider,
        title: &TitleInfo,
        query: &MediaQuery,
    ) -> Vec<Stream> {
        let candidates = match self.discover(provider, title, query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(provider = provider.name(), "{e}");
                return Vec::new();
            }
        };
        info!(provider = provider.name(), "{} candidates", candidates.len());

        let races = candidates.iter().map(|candidate| {
            let branch = async move {
                let report = self.racer.race(provider, candidate, &self.ctx).await;
                match report.winner {
                    Some(link) => self.expand(candidate, &link).await,
                    None => Vec::new(),
                }
            };
            AssertUnwindSafe(branch).catch_unwind().map(move |outcome| {
                outcome.unwrap_or_else(|payload| {
                    warn!(
                        provider = provider.name(),
                        candidate = %candidate.id,
                        "Candidate panicked, dropping it: {}",
                        panic_message(payload.as_ref())
                    );
                    Vec::new()
                })
            })
        });

        join_all(races).await.into_iter().flatten().collect()
    }

    /// Turn a validated link into streams, expanding manifests.
    async fn expand(&self, candidate: &Candidate, link: &ResolvedLink) -> Vec<Stream> {
        if looks_like_manifest(&link.url, link.probe.content_type.as_deref()) {
            return self
                .analyzer
                .analyze(&link.url, &candidate.headers)
                .await
                .into_iter()
                .map(|v| Stream {
                    url: v.url,
                    quality: v.quality,
                    bandwidth: v.bandwidth,
                    resolution: v.resolution,
                    size_bytes: None,
                    headers: candidate.headers.clone(),
                    source_label: candidate.source_label.clone(),
                })
                .collect();
        }

        let quality = Quality::classify(
            &QualityHints::new()
                .label(&candidate.source_label)
                .url(&link.url),
        );
        vec![Stream {
            url: link.url.clone(),
            quality,
            bandwidth: None,
            resolution: None,
            size_bytes: link.probe.content_length,
            headers: candidate.headers.clone(),
            source_label: candidate.source_label.clone(),
        }]
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Bound one discovery step, turning an elapsed timer into a discovery error.
async fn bounded<T, F>(stage: &'static str, limit: Duration, fut: F) -> Result<T, DiscoveryError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DiscoveryError::Timeout {
            stage,
            secs: limit.as_secs(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MediaType, SearchHit, Strategy};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn matrix() -> TitleInfo {
        TitleInfo {
            title: "The Matrix".to_string(),
            year: Some(1999),
            media_type: MediaType::Movie,
        }
    }

    /// Host whose candidates are fixed; strategy references are final URLs.
    struct FixedHost {
        name: &'static str,
        hits: Vec<SearchHit>,
        candidates: Vec<Candidate>,
    }

    #[async_trait]
    impl HostProvider for FixedHost {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(
            &self,
            _title: &TitleInfo,
            _query: &MediaQuery,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Vec<SearchHit>> {
            Ok(self.hits.clone())
        }

        async fn candidates(
            &self,
            hit: &SearchHit,
            _query: &MediaQuery,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Vec<Candidate>> {
            if hit.id != "matrix-1999" {
                return Err(anyhow!("wrong detail page {}", hit.id));
            }
            Ok(self.candidates.clone())
        }

        async fn resolve_strategy(
            &self,
            _candidate: &Candidate,
            strategy: &Strategy,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Option<String>> {
            if strategy.reference == "explode" {
                return Err(anyhow!("decrypt failed"));
            }
            if strategy.reference == "overrun" {
                let servers: Vec<String> = Vec::new();
                return Ok(Some(servers[0].clone()));
            }
            Ok(Some(strategy.reference.clone()))
        }
    }

    /// Host whose search always fails.
    struct BrokenHost;

    #[async_trait]
    impl HostProvider for BrokenHost {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn search(
            &self,
            _title: &TitleInfo,
            _query: &MediaQuery,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Vec<SearchHit>> {
            Err(anyhow!("cloudflare challenge"))
        }

        async fn candidates(
            &self,
            _hit: &SearchHit,
            _query: &MediaQuery,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Vec<Candidate>> {
            unreachable!("search never succeeds")
        }

        async fn resolve_strategy(
            &self,
            _candidate: &Candidate,
            _strategy: &Strategy,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Option<String>> {
            unreachable!("search never succeeds")
        }
    }

    /// Host whose search panics.
    struct PanickingHost;

    #[async_trait]
    impl HostProvider for PanickingHost {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn search(
            &self,
            _title: &TitleInfo,
            _query: &MediaQuery,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Vec<SearchHit>> {
            let rows: Vec<SearchHit> = Vec::new();
            Ok(vec![rows[3].clone()])
        }

        async fn candidates(
            &self,
            _hit: &SearchHit,
            _query: &MediaQuery,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Vec<Candidate>> {
            unreachable!("search never returns")
        }

        async fn resolve_strategy(
            &self,
            _candidate: &Candidate,
            _strategy: &Strategy,
            _ctx: &ProviderContext,
        ) -> anyhow::Result<Option<String>> {
            unreachable!("search never returns")
        }
    }

    struct FailingMetadata;

    #[async_trait]
    impl MetadataLookup for FailingMetadata {
        async fn title_info(&self, _query: &MediaQuery) -> anyhow::Result<TitleInfo> {
            Err(anyhow!("unknown id"))
        }
    }

    fn hits() -> Vec<SearchHit> {
        vec![
            SearchHit {
                id: "reloaded-2003".to_string(),
                title: "The Matrix Reloaded".to_string(),
                year: Some(2003),
                media_type: Some(MediaType::Movie),
                url: None,
            },
            SearchHit {
                id: "matrix-1999".to_string(),
                title: "The Matrix".to_string(),
                year: Some(1999),
                media_type: Some(MediaType::Movie),
                url: None,
            },
        ]
    }

    async fn cdn() -> MockServer {
        let server = MockServer::start().await;
        for ok in ["/a/1080p.mp4", "/b/720p.mp4", "/hls/master.m3u8"] {
            Mock::given(method("HEAD"))
                .and(path(ok))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/hls/master.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
720/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=16000000,RESOLUTION=3840x2160
2160/index.m3u8
",
            ))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        server
    }

    fn resolver(metadata: Arc<dyn MetadataLookup>) -> Resolver {
        let config = ResolverConfig {
            validate_timeout_secs: 2,
            ..ResolverConfig::default()
        };
        Resolver::new(metadata, config).unwrap()
    }

    #[tokio::test]
    async fn two_candidates_resolve_to_two_ranked_streams() {
        let server = cdn().await;
        let base = server.uri();

        let candidates = vec![
            Candidate::new("A", "Server A", format!("{base}/embed/a"))
                .with_strategy(Strategy::new("api", 1, format!("{base}/b/720p.mp4")))
                .with_strategy(Strategy::new("embed", 2, format!("{base}/b/dead.mp4"))),
            Candidate::new("B", "Server B", format!("{base}/embed/b"))
                .with_strategy(Strategy::new("api", 1, format!("{base}/a/dead.mp4")))
                .with_strategy(Strategy::new("embed", 2, format!("{base}/a/1080p.mp4"))),
        ];
        let host = FixedHost {
            name: "fixed",
            hits: hits(),
            candidates,
        };

        let streams = resolver(Arc::new(matrix()))
            .with_provider(Arc::new(host))
            .resolve(&MediaQuery::movie("tt0133093"))
            .await
            .unwrap();

        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].url, format!("{base}/a/1080p.mp4"));
        assert_eq!(streams[0].quality, Quality::P1080);
        assert_eq!(streams[0].source_label, "Server B");
        assert_eq!(streams[1].url, format!("{base}/b/720p.mp4"));
        assert_eq!(streams[1].quality, Quality::P720);
    }

    #[tokio::test]
    async fn manifests_are_expanded_and_headers_attached() {
        let server = cdn().await;
        let base = server.uri();

        let candidates = vec![Candidate::new("H", "HLS", format!("{base}/embed/h"))
            .with_header("Referer", "https://host.example/")
            .with_strategy(Strategy::new("hls", 1, format!("{base}/hls/master.m3u8")))];
        let host = FixedHost {
            name: "fixed",
            hits: hits(),
            candidates,
        };

        let streams = resolver(Arc::new(matrix()))
            .with_provider(Arc::new(host))
            .resolve(&MediaQuery::movie("tt0133093"))
            .await
            .unwrap();

        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].quality, Quality::Uhd4k);
        assert_eq!(streams[0].url, format!("{base}/hls/2160/index.m3u8"));
        assert_eq!(streams[0].bandwidth, Some(16_000_000));
        assert_eq!(streams[1].quality, Quality::P720);
        assert!(streams
            .iter()
            .all(|s| s.headers.get("Referer").map(String::as_str) == Some("https://host.example/")));
    }

    #[tokio::test]
    async fn failing_provider_does_not_affect_others() {
        let server = cdn().await;
        let base = server.uri();

        let candidates = vec![
            Candidate::new("A", "Server A", "")
                .with_strategy(Strategy::new("api", 1, "explode")),
            Candidate::new("B", "Server B", "")
                .with_strategy(Strategy::new("api", 1, format!("{base}/a/1080p.mp4"))),
        ];
        let host = FixedHost {
            name: "fixed",
            hits: hits(),
            candidates,
        };

        let resolver = resolver(Arc::new(matrix()))
            .with_provider(Arc::new(BrokenHost))
            .with_provider(Arc::new(host));
        assert_eq!(resolver.provider_names(), ["broken", "fixed"]);

        let streams = resolver.resolve(&MediaQuery::movie("tt0133093")).await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].source_label, "Server B");
    }

    #[tokio::test]
    async fn panicking_strategy_does_not_affect_siblings() {
        let server = cdn().await;
        let base = server.uri();

        let candidates = vec![
            Candidate::new("A", "Server A", "")
                .with_strategy(Strategy::new("api", 1, "overrun")),
            Candidate::new("B", "Server B", "")
                .with_strategy(Strategy::new("api", 1, format!("{base}/a/1080p.mp4"))),
        ];
        let host = FixedHost {
            name: "fixed",
            hits: hits(),
            candidates,
        };

        let streams = resolver(Arc::new(matrix()))
            .with_provider(Arc::new(host))
            .resolve(&MediaQuery::movie("tt0133093"))
            .await
            .unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].source_label, "Server B");
    }

    #[tokio::test]
    async fn panicking_provider_does_not_affect_others() {
        let server = cdn().await;
        let base = server.uri();

        let host = FixedHost {
            name: "fixed",
            hits: hits(),
            candidates: vec![Candidate::new("B", "Server B", "")
                .with_strategy(Strategy::new("api", 1, format!("{base}/b/720p.mp4")))],
        };

        let streams = resolver(Arc::new(matrix()))
            .with_provider(Arc::new(PanickingHost))
            .with_provider(Arc::new(host))
            .resolve(&MediaQuery::movie("tt0133093"))
            .await
            .unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].url, format!("{base}/b/720p.mp4"));
    }

    #[test]
    fn panic_payloads_become_text() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 7");
        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");
    }

    #[tokio::test]
    async fn duplicate_links_across_providers_are_merged() {
        let server = cdn().await;
        let base = server.uri();
        let make = |name: &'static str| FixedHost {
            name,
            hits: hits(),
            candidates: vec![Candidate::new("A", name, "")
                .with_strategy(Strategy::new("api", 1, format!("{base}/a/1080p.mp4")))],
        };

        let streams = resolver(Arc::new(matrix()))
            .with_provider(Arc::new(make("one")))
            .with_provider(Arc::new(make("two")))
            .resolve(&MediaQuery::movie("tt0133093"))
            .await
            .unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].source_label, "one");
    }

    #[tokio::test]
    async fn no_search_match_is_empty_not_error() {
        let host = FixedHost {
            name: "fixed",
            hits: vec![SearchHit {
                id: "x".to_string(),
                title: "Something Else Entirely".to_string(),
                year: Some(1970),
                media_type: None,
                url: None,
            }],
            candidates: vec![],
        };
        let resolver = resolver(Arc::new(matrix()));
        let err = resolver
            .discover(&host, &matrix(), &MediaQuery::movie("tt0133093"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NoMatch { .. }));

        let streams = resolver
            .with_provider(Arc::new(host))
            .resolve(&MediaQuery::movie("tt0133093"))
            .await
            .unwrap();
        assert!(streams.is_empty());
    }

    #[tokio::test]
    async fn empty_candidate_list_is_a_discovery_failure() {
        let host = FixedHost {
            name: "fixed",
            hits: hits(),
            candidates: vec![],
        };
        let err = resolver(Arc::new(matrix()))
            .discover(&host, &matrix(), &MediaQuery::movie("tt0133093"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NoCandidates { .. }));
    }

    #[tokio::test]
    async fn metadata_failure_is_empty_not_error() {
        let streams = resolver(Arc::new(FailingMetadata))
            .with_provider(Arc::new(BrokenHost))
            .resolve(&MediaQuery::movie("tt0133093"))
            .await
            .unwrap();
        assert!(streams.is_empty());
    }

    #[tokio::test]
    async fn malformed_query_is_rejected() {
        let result = resolver(Arc::new(matrix()))
            .resolve(&MediaQuery::movie(""))
            .await;
        assert!(matches!(result, Err(ResolveError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn discovery_steps_are_time_bounded() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            1
        };
        let err = bounded("search", Duration::from_millis(50), slow).await.unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::Timeout {
                stage: "search",
                secs: 0
            }
        );
    }

    #[tokio::test]
    async fn context_carries_config() {
        let resolver = resolver(Arc::new(matrix()));
        assert_eq!(resolver.context().config.validate_timeout_secs, 2);
        assert!(resolver.provider_names().is_empty());
    }
}
