//! Per-user read cache using moka
//!
//! Sits in front of the list endpoints. Entries are keyed by
//! `(UserId, ResourceTag)` and remember which user stored them, so a lookup
//! made under another session never sees them.
//!
//! - Default TTL is five minutes
//! - Every successful mutation invalidates the affected tag, then re-fetches
//! - A session change drops the previous user's entries

#![warn(missing_docs)]
#![warn(unreachable_pub)]

use leadflow_model::UserId;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of entries
pub const DEFAULT_CAPACITY: u64 = 1_000;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resource class a cached list belongs to, e.g. `prospects:mine`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTag(String);

impl ResourceTag {
    /// Arbitrary tag
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Prospect list under a scope label
    #[must_use]
    pub fn prospects(scope: &str) -> Self {
        Self(format!("prospects:{scope}"))
    }

    /// Event list
    #[must_use]
    pub fn events() -> Self {
        Self("events".to_string())
    }

    /// Tag text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this tag is a prospect list of any scope
    #[must_use]
    pub fn is_prospects(&self) -> bool {
        self.0.starts_with("prospects:")
    }
}

impl fmt::Display for ResourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    /// Lookups answered from cache
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    owner: UserId,
    value: V,
}

type Key = (UserId, ResourceTag);

/// Per-user, TTL-bounded cache of list results
#[derive(Clone)]
pub struct ScopedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<Key, Arc<Entry<V>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<V> fmt::Debug for ScopedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCache")
            .field("entry_count", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl<V> ScopedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create cache with max capacity and the default TTL
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self::with_ttl(max_capacity, DEFAULT_TTL)
    }

    /// Create cache with time-based expiration
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached value for `user`, if fresh
    ///
    /// An entry stored by anyone other than `user` is treated as absent.
    pub async fn get(&self, user: &UserId, tag: &ResourceTag) -> Option<V> {
        let key = (user.clone(), tag.clone());
        let found = self
            .inner
            .get(&key)
            .await
            .filter(|entry| &entry.owner == user)
            .map(|entry| entry.value.clone());
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(user_id = %user, tag = %tag, "cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(user_id = %user, tag = %tag, "cache miss");
        }
        found
    }

    /// Store `value` for `user`
    pub async fn insert(&self, user: &UserId, tag: ResourceTag, value: V) {
        let entry = Entry {
            owner: user.clone(),
            value,
        };
        self.inner.insert((user.clone(), tag), Arc::new(entry)).await;
    }

    /// Try to get or compute a value; errors are not cached
    ///
    /// # Errors
    /// Whatever `f` returns
    pub async fn try_get_or_insert_with<E, F, Fut>(
        &self,
        user: &UserId,
        tag: ResourceTag,
        f: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(cached) = self.get(user, &tag).await {
            return Ok(cached);
        }
        let value = f().await?;
        self.insert(user, tag, value.clone()).await;
        Ok(value)
    }

    /// Drop one entry
    pub async fn invalidate(&self, user: &UserId, tag: &ResourceTag) {
        self.inner.invalidate(&(user.clone(), tag.clone())).await;
    }

    /// Drop every entry of `user` whose tag matches `pred`
    pub async fn invalidate_where<P>(&self, user: &UserId, pred: P)
    where
        P: Fn(&ResourceTag) -> bool,
    {
        let stale: Vec<Key> = self
            .inner
            .iter()
            .filter(|(key, _)| &key.0 == user && pred(&key.1))
            .map(|(key, _)| (*key).clone())
            .collect();
        for key in &stale {
            self.inner.invalidate(key).await;
        }
        if !stale.is_empty() {
            tracing::debug!(user_id = %user, dropped = stale.len(), "cache entries invalidated");
        }
    }

    /// Drop every entry of `user`
    pub async fn invalidate_user(&self, user: &UserId) {
        self.invalidate_where(user, |_| true).await;
    }

    /// Invalidate all entries
    #[inline]
    pub fn clear_all(&self) {
        self.inner.invalidate_all();
    }

    /// Apply pending evictions so counts are exact
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<V> Default for ScopedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Default capacity and five minute TTL
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    fn alice() -> UserId {
        UserId::from("alice")
    }

    fn bob() -> UserId {
        UserId::from("bob")
    }

    #[tokio::test]
    async fn insert_and_get() {
        let cache: ScopedCache<Vec<u32>> = ScopedCache::default();
        cache
            .insert(&alice(), ResourceTag::prospects("mine"), vec![1, 2])
            .await;
        assert_eq!(
            cache.get(&alice(), &ResourceTag::prospects("mine")).await,
            Some(vec![1, 2])
        );
    }

    #[tokio::test]
    async fn other_user_sees_nothing() {
        let cache: ScopedCache<u32> = ScopedCache::default();
        cache.insert(&alice(), ResourceTag::events(), 7).await;
        assert_eq!(cache.get(&bob(), &ResourceTag::events()).await, None);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache: ScopedCache<u32> = ScopedCache::with_ttl(10, Duration::from_millis(50));
        cache.insert(&alice(), ResourceTag::events(), 1).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&alice(), &ResourceTag::events()).await, None);
    }

    #[tokio::test]
    async fn try_get_or_insert_with_caches_only_success() {
        let cache: ScopedCache<u32> = ScopedCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let failed: Result<u32, &str> = cache
            .try_get_or_insert_with(&alice(), ResourceTag::events(), || async { Err("down") })
            .await;
        assert!(failed.is_err());

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let value: Result<u32, &str> = cache
                .try_get_or_insert_with(&alice(), ResourceTag::events(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                })
                .await;
            assert_eq!(value, Ok(5));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_user_leaves_others() {
        let cache: ScopedCache<u32> = ScopedCache::default();
        cache.insert(&alice(), ResourceTag::prospects("mine"), 1).await;
        cache.insert(&alice(), ResourceTag::events(), 2).await;
        cache.insert(&bob(), ResourceTag::events(), 3).await;

        cache.invalidate_user(&alice()).await;
        assert_eq!(cache.get(&alice(), &ResourceTag::events()).await, None);
        assert_eq!(cache.get(&bob(), &ResourceTag::events()).await, Some(3));
    }

    #[tokio::test]
    async fn invalidate_where_targets_prospect_tags() {
        let cache: ScopedCache<u32> = ScopedCache::default();
        cache.insert(&alice(), ResourceTag::prospects("mine"), 1).await;
        cache.insert(&alice(), ResourceTag::prospects("group:g1"), 2).await;
        cache.insert(&alice(), ResourceTag::events(), 3).await;

        cache.invalidate_where(&alice(), ResourceTag::is_prospects).await;
        assert_eq!(cache.get(&alice(), &ResourceTag::prospects("mine")).await, None);
        assert_eq!(cache.get(&alice(), &ResourceTag::events()).await, Some(3));
    }

    #[tokio::test]
    async fn clear_all_and_stats() {
        let cache: ScopedCache<u32> = ScopedCache::new(100);
        for i in 0..5 {
            cache
                .insert(&alice(), ResourceTag::new(format!("t{i}")), i)
                .await;
        }
        cache.sync().await;
        assert_eq!(cache.stats().entry_count, 5);

        cache.clear_all();
        cache.sync().await;
        assert_eq!(cache.stats().entry_count, 0);
    }
}
