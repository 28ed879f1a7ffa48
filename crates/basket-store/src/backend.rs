//! # Blob Store Seam
//!
//! The only thing the list manager knows about persistence:
//!
//! ```text
//! load(key) -> Option<json>      absent key = None
//! save(key, json)                full replace, no partial writes
//! ```
//!
//! Backends are picked at startup and shared as `Arc<dyn BlobStore>`.
//! [`Store`] binds one key to a backend so callers hold a per-blob handle.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreResult;

/// Version stamped into every saved blob.
pub const STORAGE_VERSION: u32 = 2;

/// Async key/value blob persistence.
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Returns the stored document, or `None` if the key was never saved.
    async fn load(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Replaces the stored document.
    async fn save(&self, key: &str, data: Value) -> StoreResult<()>;
}

/// A handle on one storage key.
#[derive(Clone)]
pub struct Store {
    key: String,
    backend: Arc<dyn BlobStore>,
}

impl Store {
    pub fn new(backend: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            backend,
        }
    }

    /// The storage key this handle reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the raw JSON document.
    pub async fn load(&self) -> StoreResult<Option<Value>> {
        self.backend.load(&self.key).await
    }

    /// Encodes and saves the document.
    pub async fn save<T: Serialize + ?Sized>(&self, data: &T) -> StoreResult<()> {
        let value = serde_json::to_value(data)?;
        self.backend.save(&self.key, value).await
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("key", &self.key).finish()
    }
}
