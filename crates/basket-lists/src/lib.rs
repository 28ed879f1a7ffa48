//! # basket-lists: Multi-List Shopping Manager
//!
//! Each list has a product **catalog** (what can be bought) and an
//! **active set** (how many of each are needed right now). The one rule
//! that must always hold:
//!
//! ```text
//! ∀ list, ∀ key ∈ active[list] : key ∈ products[list]
//! ```
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  basket-hub handlers                                                   │
//! │       │  add_or_update_product / set_quantity / delete_product / ...   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  basket-lists (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ListManager ──► Registry (catalogues, lists)                  │   │
//! │  │       │                                                         │   │
//! │  │       ├──► per-catalogue Mutex<CatalogueSlot>                   │   │
//! │  │       └──► ChangeNotifier (broadcast, no payload)               │   │
//! │  │                                                                 │   │
//! │  │   seed: country catalog + category files                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  basket-store (BlobStore: load / save)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use basket_core::NewProduct;
//! use basket_lists::ListManager;
//! use basket_store::MemoryStore;
//!
//! let manager = ListManager::new(Arc::new(MemoryStore::new()));
//! manager.add_or_update_product("groceries", NewProduct::new("milk", "Milk")).await?;
//! manager.set_quantity("groceries", "milk", 2).await?;
//! ```

pub mod error;
pub mod events;
pub mod manager;
mod registry;
pub mod seed;

pub use error::{ListError, ListResult};
pub use events::{ChangeNotifier, ListChanged, UPDATED_EVENT};
pub use manager::{ListManager, NewList};
