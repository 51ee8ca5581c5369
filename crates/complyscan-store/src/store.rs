//! Result store abstraction and the in-memory backend

use async_trait::async_trait;
use complyscan_core::{Result, StoredResult};
use parking_lot::Mutex;

use crate::cache::LruCache;

/// Default number of entries kept by [`MemoryStore`]
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Persistence keyed by normalized input text
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stored result for `key`, if any
    async fn lookup(&self, key: &str) -> Result<Option<StoredResult>>;

    /// Record a result for `key`
    ///
    /// Recording an already-present key must not create a second entry.
    async fn record(&self, key: &str, result: &StoredResult) -> Result<()>;

    /// Short backend name for logs and diagnostics
    fn backend(&self) -> &'static str;
}

/// Bounded in-process store backed by an LRU cache
pub struct MemoryStore {
    cache: Mutex<LruCache<String, StoredResult>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn lookup(&self, key: &str) -> Result<Option<StoredResult>> {
        Ok(self.cache.lock().get(key).cloned())
    }

    async fn record(&self, key: &str, result: &StoredResult) -> Result<()> {
        let mut cache = self.cache.lock();
        if cache.contains_key(key) {
            return Ok(());
        }
        if let Some((evicted, _)) = cache.put(key.to_string(), result.clone()) {
            tracing::debug!(
                "Evicted cache entry {}",
                complyscan_core::fingerprint(&evicted)
            );
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(issue: &str) -> StoredResult {
        StoredResult::new(vec![issue.to_string()], vec![format!("{}法规", issue)])
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        let store = MemoryStore::default();
        assert!(store.lookup("测试").await.unwrap().is_none());

        store.record("测试", &result("财务合规")).await.unwrap();
        let hit = store.lookup("测试").await.unwrap().unwrap();
        assert_eq!(hit.issues, vec!["财务合规"]);
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_memory_first_record_wins() {
        let store = MemoryStore::new(4);
        store.record("键", &result("财务合规")).await.unwrap();
        store.record("键", &result("税务合规")).await.unwrap();

        assert_eq!(store.len(), 1);
        let hit = store.lookup("键").await.unwrap().unwrap();
        assert_eq!(hit.issues, vec!["财务合规"]);
    }

    #[tokio::test]
    async fn test_memory_bounded() {
        let store = MemoryStore::new(2);
        store.record("一", &result("甲")).await.unwrap();
        store.record("二", &result("乙")).await.unwrap();

        // Refresh "一" so "二" is evicted next
        assert!(store.lookup("一").await.unwrap().is_some());
        store.record("三", &result("丙")).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.lookup("一").await.unwrap().is_some());
        assert!(store.lookup("二").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let store = std::sync::Arc::new(MemoryStore::new(64));
        let mut handles = Vec::new();

        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("键{}", i % 4);
                store.record(&key, &result("甲")).await.unwrap();
                store.lookup(&key).await.unwrap()
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(store.len(), 4);
    }
}
