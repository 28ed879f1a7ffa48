//! # basket-store: Persistence Adapter for Basket
//!
//! Every piece of list state is a JSON document stored under a string key.
//! This crate provides the [`BlobStore`] trait and three backends.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Basket Data Flow                                 │
//! │                                                                         │
//! │  ListManager (basket-lists)                                            │
//! │       │  Store::load / Store::save                                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  basket-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌──────────────┐         │   │
//! │  │   │ SqliteStore  │  │JsonFileStore │  │ MemoryStore  │         │   │
//! │  │   │ blobs table  │  │ one file/key │  │ tests        │         │   │
//! │  │   └──────────────┘  └──────────────┘  └──────────────┘         │   │
//! │  │            all implement  BlobStore { load, save }             │   │
//! │  │                                                                 │   │
//! │  │   StorageLayout: <domain>.<list_id>.products / .active_list    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use basket_store::{BlobStore, SqliteConfig, SqliteStore, Store};
//!
//! let backend: Arc<dyn BlobStore> = Arc::new(SqliteStore::new(SqliteConfig::new("basket.db")).await?);
//! let lists = Store::new(backend, "shopping_list_manager.lists");
//! let registry: Option<serde_json::Value> = lists.load().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod error;
pub mod file;
pub mod layout;
pub mod memory;
pub mod migrations;
pub mod sqlite;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{BlobStore, Store, STORAGE_VERSION};
pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use layout::{StorageLayout, DEFAULT_DOMAIN};
pub use memory::MemoryStore;
pub use sqlite::{SqliteConfig, SqliteStore};
