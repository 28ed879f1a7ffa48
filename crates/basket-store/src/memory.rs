//! In-process blob store.
//!
//! Used by tests and by `backend = "memory"` in the hub config. Saves can be
//! made to fail on demand to exercise error propagation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::trace;

use crate::backend::BlobStore;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, Value>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a blob without counting it as a save.
    pub async fn insert(&self, key: impl Into<String>, data: Value) {
        self.blobs.write().await.insert(key.into(), data);
    }

    /// Raw view of a blob.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.blobs.read().await.get(key).cloned()
    }

    /// Makes every following `save` fail until switched back.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, data: Value) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("save of '{key}' rejected")));
        }

        self.blobs.write().await.insert(key.to_string(), data);
        self.saves.fetch_add(1, Ordering::SeqCst);
        trace!(key = %key, "Blob saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryStore::new();
        assert_eq!(store.load("a").await.unwrap(), None);

        store.save("a", json!({"x": 1})).await.unwrap();
        assert_eq!(store.load("a").await.unwrap(), Some(json!({"x": 1})));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_saves() {
        let store = MemoryStore::new();
        store.set_fail_saves(true);

        assert!(matches!(
            store.save("a", json!({})).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.get("a").await, None);

        store.set_fail_saves(false);
        assert!(store.save("a", json!({})).await.is_ok());
    }
}
