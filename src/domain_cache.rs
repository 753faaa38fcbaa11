//! Provider domain cache
//!
//! Hosts rotate mirror domains often, so providers resolve their current
//! base domain once and keep it for a bounded TTL. The cache is an explicit
//! object owned by the [`Resolver`](crate::resolve::Resolver) and handed to
//! providers through [`ProviderContext`](crate::stream::ProviderContext);
//! concurrent readers never block each other.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedDomain {
    domain: String,
    stored_at: Instant,
}

/// TTL-bounded map from provider key to its current domain.
#[derive(Debug)]
pub struct DomainCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedDomain>>,
}

impl DomainCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh domain for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.domain.clone())
    }

    pub async fn insert(&self, key: impl Into<String>, domain: impl Into<String>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CachedDomain {
                domain: domain.into(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop an entry, e.g. after the cached domain stopped answering.
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Return the cached domain or compute, store and return a new one.
    ///
    /// A failed `lookup` leaves the cache untouched.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: &str, lookup: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(domain) = self.get(key).await {
            debug!("Domain cache hit: {key} -> {domain}");
            return Ok(domain);
        }

        let domain = lookup().await?;
        debug!("Domain cache fill: {key} -> {domain}");
        self.insert(key, domain.clone()).await;
        Ok(domain)
    }

    /// Remove expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for DomainCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn insert_then_get() {
        let cache = DomainCache::default();
        cache.insert("vidhost", "vidhost.to").await;
        assert_eq!(cache.get("vidhost").await.as_deref(), Some("vidhost.to"));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test]
    async fn zero_ttl_entries_are_never_fresh() {
        let cache = DomainCache::new(Duration::ZERO);
        cache.insert("vidhost", "vidhost.to").await;
        assert_eq!(cache.get("vidhost").await, None);
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn get_or_try_insert_with_calls_lookup_once() {
        let cache = DomainCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let domain = cache
                .get_or_try_insert_with("vidhost", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("vidhost.cc".to_string())
                })
                .await
                .unwrap();
            assert_eq!(domain, "vidhost.cc");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_lookup_is_not_cached() {
        let cache = DomainCache::default();
        let result = cache
            .get_or_try_insert_with("vidhost", || async { Err(anyhow!("all mirrors down")) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = DomainCache::default();
        cache.insert("vidhost", "vidhost.to").await;
        cache.invalidate("vidhost").await;
        assert_eq!(cache.get("vidhost").await, None);
    }
}
