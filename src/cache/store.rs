//! Cache Store Module
//!
//! The entry store contract and its in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache::CacheEntry;
use crate::clock::{Clock, SystemClock};
use crate::error::Result;

// == Entry Store ==
/// Key to (value, expiry) mapping behind the cache gate.
///
/// Every operation is individually atomic. Errors are reserved for backing
/// stores that can fail (a networked store, for example); callers degrade
/// rather than fail on them.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Returns the value if present and unexpired; evicts an expired entry.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores a value, replacing any existing entry.
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()>;

    /// Removes an entry. Returns whether one was present; absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Keys starting with `prefix`, in no particular order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Removes every expired entry, returning how many were dropped.
    async fn purge_expired(&self) -> Result<usize>;

    /// Removes every entry.
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries, expired ones included until purged.
    async fn len(&self) -> Result<usize>;
}

// == Memory Store ==
/// In-process entry store.
///
/// Reads share a read lock; an expired hit upgrades to the write lock and
/// re-checks before evicting, since another writer may have refreshed it.
/// `keys_with_prefix` skips expired entries.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Time source for expiry
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store on the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    // == Get ==
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    // == Set ==
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()> {
        let entry = CacheEntry::new(value, ttl_seconds, self.clock.now());
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    // == Delete ==
    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    // == Prefix Scan ==
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    // == Purge Expired ==
    async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn manual_store() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (MemoryStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_store_new() {
        let store = MemoryStore::new();
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_set_and_get() {
        let store = MemoryStore::new();

        store.set("edu:course:1", json!({"title": "Intro"}), 60).await.unwrap();
        let value = store.get("edu:course:1").await.unwrap();

        assert_eq!(value, Some(json!({"title": "Intro"})));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_get_nonexistent() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_delete_is_idempotent() {
        let store = MemoryStore::new();

        store.set("k", json!(1), 60).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_overwrite() {
        let store = MemoryStore::new();

        store.set("k", json!("v1"), 60).await.unwrap();
        store.set("k", json!("v2"), 60).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(json!("v2")));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_lazy_expiry_evicts() {
        let (store, clock) = manual_store();

        store.set("k", json!("v"), 10).await.unwrap();
        clock.advance_secs(9);
        assert!(store.get("k").await.unwrap().is_some());

        clock.advance_secs(1);
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.len().await.unwrap(), 0, "expired entry should be evicted on read");
    }

    #[tokio::test]
    async fn test_overwrite_resets_expiry() {
        let (store, clock) = manual_store();

        store.set("k", json!("old"), 10).await.unwrap();
        clock.advance_secs(8);
        store.set("k", json!("new"), 10).await.unwrap();
        clock.advance_secs(8);

        assert_eq!(store.get("k").await.unwrap(), Some(json!("new")));
    }

    #[tokio::test]
    async fn test_keys_with_prefix_skips_expired() {
        let (store, clock) = manual_store();

        store.set("edu:courses:{\"page\":1}", json!([]), 5).await.unwrap();
        store.set("edu:courses:{\"page\":2}", json!([]), 60).await.unwrap();
        store.set("edu:user:1", json!({}), 60).await.unwrap();
        clock.advance_secs(10);

        let keys = store.keys_with_prefix("edu:courses").await.unwrap();
        assert_eq!(keys, vec!["edu:courses:{\"page\":2}".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (store, clock) = manual_store();

        store.set("short", json!(1), 1).await.unwrap();
        store.set("long", json!(2), 100).await.unwrap();
        clock.advance_secs(2);

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new();
        store.set("a", json!(1), 60).await.unwrap();
        store.set("b", json!(2), 60).await.unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
