//! `snag` - Multi-host video stream resolver
//!
//! # Pipeline
//!
//! - **Discovery**: title metadata lookup, host search, best-match scoring, candidate listing
//! - **Racing**: every resolution strategy of a candidate runs concurrently, lowest validated priority wins
//! - **Validation**: HEAD probe with ranged-GET fallback
//! - **Manifests**: HLS master playlists expand into one stream per variant
//! - **Ranking**: URL dedup, then a stable best-quality-first sort
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use snag::stream::providers::DirectProvider;
//! use snag::stream::{MediaQuery, MediaType, TitleInfo};
//! use snag::{Resolver, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let title = TitleInfo {
//!         title: "Big Buck Bunny".to_string(),
//!         year: Some(2008),
//!         media_type: MediaType::Movie,
//!     };
//!     let provider = DirectProvider::new(vec!["https://cdn.example.com/master.m3u8".into()]);
//!     let resolver = Resolver::new(Arc::new(title), ResolverConfig::default())?
//!         .with_provider(Arc::new(provider));
//!
//!     for stream in resolver.resolve(&MediaQuery::movie("bbb")).await? {
//!         println!("{} {}", stream.quality, stream.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain_cache;
pub mod error;
pub mod http_client;
pub mod manifest;
pub mod matching;
pub mod quality;
pub mod resolve;
pub mod stream;
pub mod validator;

pub use config::ResolverConfig;
pub use domain_cache::DomainCache;
pub use error::{DiscoveryError, ResolveError};
pub use http_client::HttpClient;
pub use manifest::{looks_like_manifest, parse_manifest, PlaylistAnalyzer, Variant};
pub use matching::select_best_match;
pub use quality::{Quality, QualityHints};
pub use resolve::{dedup_and_rank, Resolver, StrategyRacer};
pub use stream::{Candidate, HostProvider, MediaQuery, MetadataLookup, Stream, Strategy};
pub use validator::{LinkValidator, Probe};

/// Version of snag
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
