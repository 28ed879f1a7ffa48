//! # basket-core: Pure Domain Model for Basket
//!
//! This crate holds the types and rules shared by every other Basket crate.
//! It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Basket Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 WebSocket clients (panel UI)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON commands                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    basket-hub (apps/)                           │   │
//! │  │    add_product, set_qty, get_products, get_lists, ...           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        basket-lists: ListManager (catalogue locks, invariant)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ basket-core (THIS CRATE) ★                      │   │
//! │  │   types • validation • invariant • errors                      │   │
//! │  │   NO I/O • NO STORAGE • NO NETWORK                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  basket-store: blob load/save (SQLite, JSON files, memory)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, ActiveItem, Catalogue, ListMeta, User, Category
//! - [`validation`] - Input checks run before any lock is taken
//! - [`invariant`] - The active ⊆ products rule
//! - [`error`] - Domain error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invariant;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;
pub use validation::ValidationResult;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// The list every install starts with. Its storage uses the flat legacy keys.
pub const DEFAULT_LIST_ID: &str = "groceries";

/// Owner stamped on lists created by bootstrap or migration.
pub const SYSTEM_OWNER: &str = "system";

/// Category given to products added without one.
pub const DEFAULT_CATEGORY: &str = "other";

/// Unit given to products added without one.
pub const DEFAULT_UNIT: &str = "pcs";

/// Icon given to lists created without one.
pub const DEFAULT_LIST_ICON: &str = "mdi:cart";

/// Maximum length of product keys and list ids.
pub const MAX_KEY_LENGTH: usize = 100;

/// Maximum length of product and list names.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum quantity of a single item on a list.
///
/// Guards against typos such as 10000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 9999;
