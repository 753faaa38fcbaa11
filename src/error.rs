//! Error taxonomy for the resolution pipeline.
//!
//! Only [`ResolveError::InvalidQuery`] ever escapes [`Resolver::resolve`];
//! every other variant is recorded and swallowed at the smallest scope that
//! produced it (one provider, one candidate, one strategy).
//!
//! [`Resolver::resolve`]: crate::resolve::Resolver::resolve

use thiserror::Error;

/// Why a provider's discovery chain produced no candidates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("metadata lookup failed: {0}")]
    Metadata(String),

    #[error("search failed: {0}")]
    Search(String),

    #[error("no search result matched '{title}'")]
    NoMatch { title: String },

    #[error("detail lookup failed: {0}")]
    Detail(String),

    #[error("no candidates for '{title}'")]
    NoCandidates { title: String },

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("strategy '{strategy}' failed: {reason}")]
    Strategy { strategy: String, reason: String },

    #[error("validation failed for {url} (status {status:?})")]
    Validation { url: String, status: Option<u16> },

    #[error("manifest parse error for {url}: {reason}")]
    ManifestParse { url: String, reason: String },

    #[error("invalid media query: {0}")]
    InvalidQuery(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
