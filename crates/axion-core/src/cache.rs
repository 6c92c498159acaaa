//! Time-boxed memoization of remote lookups
//!
//! The cache has two independent slot classes sharing one TTL:
//! - a single directory slot holding a whole [`Registry`] snapshot
//!   (devices, maintainers and support groups are stored and expire together)
//! - keyed build slots holding one lookup result per (codename, variant)
//!
//! An entry is valid while `now - stored_at < ttl`. Expired entries are
//! reported as absent and are only replaced by the next store, never extended.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::builds::{BuildKey, BuildRecord};
use crate::registry::Registry;

/// Default freshness window for both slot classes (1 minute)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default upper bound on distinct build keys held at once
pub const DEFAULT_MAX_BUILD_ENTRIES: usize = 512;

/// A cached value with the instant it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Wrap a value, stamping it with the current instant
    pub fn new(value: T) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    /// Whether this entry is still inside the freshness window
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Process-wide cache for the device directory and build lookups
///
/// Constructed once and shared (behind an `Arc`) by the registry loader
/// and the build lookup service.
pub struct FreshnessCache {
    ttl: Duration,
    /// Maximum number of build keys; 0 disables build caching entirely
    max_build_entries: usize,
    directory: RwLock<Option<CacheEntry<Arc<Registry>>>>,
    builds: RwLock<HashMap<BuildKey, CacheEntry<Option<BuildRecord>>>>,
}

impl FreshnessCache {
    /// Create an empty cache
    pub fn new(ttl: Duration, max_build_entries: usize) -> Self {
        Self {
            ttl,
            max_build_entries,
            directory: RwLock::new(None),
            builds: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached directory snapshot if it is still fresh
    pub async fn directory(&self) -> Option<Arc<Registry>> {
        let slot = self.directory.read().await;
        slot.as_ref()
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Replace the directory snapshot
    pub async fn store_directory(&self, registry: Arc<Registry>) {
        let mut slot = self.directory.write().await;
        debug!(devices = registry.len(), "Cached device directory");
        *slot = Some(CacheEntry::new(registry));
    }

    /// Get a cached build lookup result if it is still fresh
    ///
    /// The outer `Option` is the cache hit; the inner one is the lookup
    /// result itself, which is `None` for a cached "no build" answer.
    pub async fn build(&self, key: &BuildKey) -> Option<Option<BuildRecord>> {
        let builds = self.builds.read().await;
        builds
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Store a build lookup result, evicting to stay within capacity
    pub async fn store_build(&self, key: BuildKey, record: Option<BuildRecord>) {
        if self.max_build_entries == 0 {
            return;
        }

        let mut builds = self.builds.write().await;

        if !builds.contains_key(&key) && builds.len() >= self.max_build_entries {
            let ttl = self.ttl;
            builds.retain(|_, entry| entry.is_fresh(ttl));

            if builds.len() >= self.max_build_entries {
                let oldest = builds
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    debug!(key = %oldest, "Evicting oldest build entry");
                    builds.remove(&oldest);
                }
            }
        }

        debug!(key = %key, found = record.is_some(), "Cached build lookup");
        builds.insert(key, CacheEntry::new(record));
    }

    /// Number of build keys currently held (fresh or not)
    pub async fn build_entries(&self) -> usize {
        self.builds.read().await.len()
    }
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_BUILD_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builds::Variant;
    use crate::registry::parse_flat_text;

    fn record(version: &str) -> BuildRecord {
        BuildRecord {
            filename: format!("axion-{}.zip", version),
            version: version.to_string(),
            size: "1.00 GB".to_string(),
            date: "2025-03-01 12:00:00".to_string(),
            url: "https://example.com/axion.zip".to_string(),
            checksum: None,
        }
    }

    #[tokio::test]
    async fn test_directory_roundtrip_within_ttl() {
        let cache = FreshnessCache::default();
        assert!(cache.directory().await.is_none());

        let registry = Arc::new(parse_flat_text(
            "pipa=Xiaomi Pad 6=rmp=https://t.me/pipa\n",
        ));
        cache.store_directory(registry.clone()).await;

        let cached = cache.directory().await.unwrap();
        assert!(Arc::ptr_eq(&cached, &registry));
        // All three maps come from the same snapshot
        assert_eq!(cached.device_name("pipa"), Some("Xiaomi Pad 6"));
        assert_eq!(cached.find_maintainer("pipa"), Some("rmp"));
        assert_eq!(cached.support_group("pipa"), Some("https://t.me/pipa"));
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = FreshnessCache::new(Duration::from_millis(20), 8);
        let key = BuildKey::new("pipa", Variant::Gms);

        cache.store_directory(Arc::new(Registry::default())).await;
        cache.store_build(key.clone(), Some(record("1.0"))).await;
        assert!(cache.directory().await.is_some());
        assert!(cache.build(&key).await.is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cache.directory().await.is_none());
        assert!(cache.build(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_negative_result_is_distinct_from_miss() {
        let cache = FreshnessCache::default();
        let key = BuildKey::new("pipa", Variant::Vanilla);

        assert_eq!(cache.build(&key).await, None);
        cache.store_build(key.clone(), None).await;
        assert_eq!(cache.build(&key).await, Some(None));
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = FreshnessCache::new(DEFAULT_TTL, 2);
        let first = BuildKey::new("a", Variant::Vanilla);
        let second = BuildKey::new("b", Variant::Vanilla);
        let third = BuildKey::new("c", Variant::Vanilla);

        cache.store_build(first.clone(), Some(record("1"))).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.store_build(second.clone(), Some(record("2"))).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.store_build(third.clone(), Some(record("3"))).await;

        assert_eq!(cache.build_entries().await, 2);
        assert!(cache.build(&first).await.is_none());
        assert!(cache.build(&third).await.is_some());

        // Overwriting an existing key never evicts
        cache.store_build(third.clone(), Some(record("4"))).await;
        assert_eq!(cache.build_entries().await, 2);
        assert!(cache.build(&second).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_disables_build_cache() {
        let cache = FreshnessCache::new(DEFAULT_TTL, 0);
        let key = BuildKey::new("pipa", Variant::Gms);
        cache.store_build(key.clone(), Some(record("1"))).await;
        assert!(cache.build(&key).await.is_none());
    }
}
