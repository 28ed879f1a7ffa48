//! # JSON File Blob Store
//!
//! One file per key inside a directory, wrapped in a versioned envelope:
//!
//! ```text
//! <dir>/shopping_list_manager.products
//! {
//!   "version": 2,
//!   "minor_version": 1,
//!   "key": "shopping_list_manager.products",
//!   "data": { ...blob... }
//! }
//! ```
//!
//! This is the layout of a Home Assistant `.storage` directory, so a
//! directory written by the existing integration can be served directly.
//!
//! Writes go to `<key>.tmp` first and are renamed into place; a crash
//! mid-write leaves the previous file intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{BlobStore, STORAGE_VERSION};
use crate::error::{StoreError, StoreResult};

const MINOR_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    #[serde(default = "default_minor_version")]
    minor_version: u32,
    key: String,
    data: Value,
}

fn default_minor_version() -> u32 {
    MINOR_VERSION
}

/// Blob store over a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Uses `dir`, creating it on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "key is empty"));
        }
        if key.contains('/') || key.contains('\\') {
            return Err(StoreError::invalid_key(key, "key contains a path separator"));
        }
        if key.contains("..") {
            return Err(StoreError::invalid_key(key, "key contains '..'"));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl BlobStore for JsonFileStore {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let path = self.path_for(key)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(key, e))?;

        if envelope.key != key {
            warn!(
                key = %key,
                stored_key = %envelope.key,
                "Storage file key does not match its file name"
            );
        }

        Ok(Some(envelope.data))
    }

    async fn save(&self, key: &str, data: Value) -> StoreResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let envelope = Envelope {
            version: STORAGE_VERSION,
            minor_version: MINOR_VERSION,
            key: key.to_string(),
            data,
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let tmp = self.dir.join(format!("{key}.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(key = %key, bytes = bytes.len(), "Blob written");
        Ok(())
    }
}
