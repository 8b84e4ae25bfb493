//! Shared doubles for cache unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{EntryStore, PageRevalidator};
use crate::error::{CacheError, Result};

/// Store whose every operation fails.
pub(crate) struct BrokenStore;

fn refused<T>() -> Result<T> {
    Err(CacheError::Store("connection refused".to_string()))
}

#[async_trait]
impl EntryStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        refused()
    }
    async fn set(&self, _key: &str, _value: Value, _ttl: u64) -> Result<()> {
        refused()
    }
    async fn delete(&self, _key: &str) -> Result<bool> {
        refused()
    }
    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        refused()
    }
    async fn purge_expired(&self) -> Result<usize> {
        refused()
    }
    async fn clear(&self) -> Result<()> {
        refused()
    }
    async fn len(&self) -> Result<usize> {
        refused()
    }
}

/// Remembers every path it is asked to revalidate.
#[derive(Default)]
pub(crate) struct RecordingRevalidator {
    pub(crate) paths: Mutex<Vec<String>>,
}

impl PageRevalidator for RecordingRevalidator {
    fn revalidate(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}
