//! Changeset metadata cache
//!
//! Bounded cache over changeset author metadata (user id, display name,
//! privacy flag). Misses are filled synchronously through a pluggable
//! loader which runs on its own database session, separate from any
//! selection engine's session; the engine keeps a result stream open while
//! emitting, and the driver does not support interleaving further queries
//! on a session that is mid-stream.
//!
//! One cache instance is shared by every selection engine the factory hands
//! out. Concurrent misses on the same id coalesce into a single loader
//! call.

mod error;

pub use error::CacheError;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;

use crate::data::types::{CachedChangeset, ChangesetId};

/// Source of changeset author metadata.
///
/// Implementations must never report a missing row as an error; the
/// contract is to return [`CachedChangeset::private`] instead so emission
/// degrades to author-less.
#[async_trait]
pub trait ChangesetLoader: Send + Sync {
    async fn load(&self, id: ChangesetId) -> Result<CachedChangeset, CacheError>;
}

/// Capacity-bounded changeset metadata cache, shared across engines
#[derive(Clone)]
pub struct ChangesetCache {
    entries: Cache<ChangesetId, Arc<CachedChangeset>>,
    loader: Arc<dyn ChangesetLoader>,
}

impl fmt::Debug for ChangesetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangesetCache")
            .field("capacity", &self.entries.policy().max_capacity())
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl ChangesetCache {
    pub fn new(capacity: u64, loader: Arc<dyn ChangesetLoader>) -> Self {
        tracing::debug!(capacity, "initializing changeset metadata cache");
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
            loader,
        }
    }

    /// Author metadata for `id`.
    ///
    /// On a miss the loader runs before this returns and the result is
    /// installed, evicting older entries once the cache is full. Loader
    /// failures are not cached; the next lookup retries.
    pub async fn get(&self, id: ChangesetId) -> Result<Arc<CachedChangeset>, CacheError> {
        let loader = Arc::clone(&self.loader);
        self.entries
            .try_get_with(id, async move { loader.load(id).await.map(Arc::new) })
            .await
            .map_err(|e| (*e).clone())
    }

    #[cfg(test)]
    async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }

    #[cfg(test)]
    fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingLoader {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingLoader {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn slow() -> Self {
            Self {
                delay: Duration::from_millis(50),
                ..Self::new()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChangesetLoader for CountingLoader {
        async fn load(&self, id: ChangesetId) -> Result<CachedChangeset, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(CacheError::Loader("boom".to_string()));
            }
            Ok(CachedChangeset {
                user_id: Some(id as i64),
                display_name: Some(format!("user {id}")),
                data_public: true,
            })
        }
    }

    #[tokio::test]
    async fn test_miss_invokes_loader_once() {
        let loader = Arc::new(CountingLoader::new());
        let cache = ChangesetCache::new(16, loader.clone());

        let first = cache.get(1).await.unwrap();
        assert_eq!(first.user_id, Some(1));
        assert_eq!(loader.calls(), 1);

        let second = cache.get(1).await.unwrap();
        assert_eq!(second.display_name.as_deref(), Some("user 1"));
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_distinct_ids_load_separately() {
        let loader = Arc::new(CountingLoader::new());
        let cache = ChangesetCache::new(16, loader.clone());

        cache.get(1).await.unwrap();
        cache.get(2).await.unwrap();
        assert_eq!(loader.calls(), 2);
    }

    #[tokio::test]
    async fn test_miss_storm_coalesces_to_one_load() {
        let loader = Arc::new(CountingLoader::slow());
        let cache = ChangesetCache::new(16, loader.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get(42).await }));
        }
        for handle in handles {
            let entry = handle.await.unwrap().unwrap();
            assert_eq!(entry.user_id, Some(42));
        }
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let loader = Arc::new(CountingLoader::new());
        let cache = ChangesetCache::new(4, loader.clone());

        for id in 0..64 {
            cache.get(id).await.unwrap();
        }
        cache.run_pending_tasks().await;
        assert!(cache.entry_count() <= 4);
    }

    #[tokio::test]
    async fn test_loader_failure_is_not_cached() {
        let loader = Arc::new(CountingLoader::failing());
        let cache = ChangesetCache::new(16, loader.clone());

        assert!(cache.get(1).await.is_err());
        assert!(cache.get(1).await.is_err());
        assert_eq!(loader.calls(), 2);
    }
}
