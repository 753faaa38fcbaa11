//! Resolver configuration loaded from `~/.config/snag/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ResolveError, Result};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Timeouts and tuning knobs for one [`Resolver`](crate::resolve::Resolver).
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Link validator probe timeout.
    pub validate_timeout_secs: u64,
    /// Upper bound for a single `resolve_strategy` call.
    pub strategy_timeout_secs: u64,
    /// Manifest fetch timeout.
    pub manifest_timeout_secs: u64,
    /// Upper bound for each discovery step (metadata, search, candidates).
    pub discovery_timeout_secs: u64,
    /// How long a provider's cached domain stays fresh.
    pub domain_cache_ttl_secs: u64,
    /// Minimum best-match score for a search hit to be accepted.
    pub match_threshold: f64,
    /// User-Agent sent with probes and manifest fetches.
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            validate_timeout_secs: 10,
            strategy_timeout_secs: 30,
            manifest_timeout_secs: 15,
            discovery_timeout_secs: 20,
            domain_cache_ttl_secs: 3600,
            match_threshold: 0.3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_secs)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_secs(self.manifest_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn domain_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.domain_cache_ttl_secs)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ResolveError::Config(e.to_string()))
    }

    /// Load from the default location.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load from an explicit path, falling back to defaults when it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Config(format!("failed to read {}: {e}", path.display())))?;

        Self::from_toml(&content).map_err(|e| match e {
            ResolveError::Config(msg) => {
                ResolveError::Config(format!("invalid TOML in {}: {msg}", path.display()))
            }
            other => other,
        })
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snag")
        .join("config.toml")
}
