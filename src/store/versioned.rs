use crate::clock::Clock;
use crate::model::Transaction;
use crate::store::TtlCache;
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// The whole transaction list cached under the store's version marker. A new marker misses, so a
/// write anywhere (even by another process) shows up on the next read. Each dataset is shared as
/// one `Arc` for as long as its marker is current.
#[derive(Debug)]
pub struct VersionedCache {
    entries: Mutex<TtlCache<String, Arc<Vec<Transaction>>>>,
}

impl VersionedCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(TtlCache::new(ttl, clock)),
        }
    }

    /// Returns the dataset cached for `version`, or calls `fetch` and caches its result. Errors
    /// from `fetch` are returned and not cached.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        version: &str,
        fetch: F,
    ) -> Result<Arc<Vec<Transaction>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Transaction>>>,
    {
        let key = version.to_string();
        if let Some(hit) = self.entries.lock().await.get(&key) {
            debug!("Version cache hit for {version}");
            return Ok(hit);
        }
        debug!("Version cache miss for {version}, fetching");
        let data = Arc::new(fetch().await?);
        let mut entries = self.entries.lock().await;
        // Only the newest marker is kept.
        entries.clear();
        entries.set(key, data.clone());
        Ok(data)
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (VersionedCache, ManualClock, Arc<AtomicUsize>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
        let cache = VersionedCache::new(Duration::from_secs(3600), Arc::new(clock.clone()));
        (cache, clock, Arc::new(AtomicUsize::new(0)))
    }

    async fn counted(calls: &AtomicUsize) -> Result<Vec<Transaction>> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    #[tokio::test]
    async fn test_same_version_same_instance() {
        let (cache, _, calls) = setup();
        let a = cache.get_or_fetch("v1", || counted(&calls)).await.unwrap();
        let b = cache.get_or_fetch("v1", || counted(&calls)).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let c = cache.get_or_fetch("v2", || counted(&calls)).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_superseded_version_is_dropped() {
        let (cache, _, calls) = setup();
        cache.get_or_fetch("v1", || counted(&calls)).await.unwrap();
        cache.get_or_fetch("v2", || counted(&calls)).await.unwrap();
        assert_eq!(cache.entries.lock().await.len(), 1);
        cache.get_or_fetch("v1", || counted(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_expires_after_an_hour() {
        let (cache, clock, calls) = setup();
        cache.get_or_fetch("v1", || counted(&calls)).await.unwrap();
        clock.advance(Duration::from_secs(3599));
        cache.get_or_fetch("v1", || counted(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        clock.advance(Duration::from_secs(1));
        cache.get_or_fetch("v1", || counted(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (cache, _, calls) = setup();
        let failed = cache
            .get_or_fetch("v1", || async {
                Err::<Vec<Transaction>, _>(anyhow::anyhow!("network down"))
            })
            .await;
        assert!(failed.is_err());
        cache.get_or_fetch("v1", || counted(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
