//! # List Manager Errors
//!
//! ```text
//! ValidationError ─┐
//! CoreError ───────┼──► ListError ──► ApiError (hub)
//! StoreError ──────┘
//! ```

use basket_core::{CoreError, ValidationError};
use basket_store::StoreError;
use thiserror::Error;

/// Errors returned by [`crate::ListManager`] operations.
#[derive(Debug, Error)]
pub enum ListError {
    /// Malformed input. Raised before the list lock is taken; no state
    /// was touched.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// `set_qty` named a product the list's catalog doesn't have.
    ///
    /// ## When This Occurs
    /// - Client set a quantity before calling `add_product`
    /// - Another client deleted the product in between
    #[error(
        "Cannot set quantity for unknown product '{key}' in list '{list_id}'. \
         Product must be created first with add_product."
    )]
    InvariantViolation { list_id: String, key: String },

    /// A referenced registry entry doesn't exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Persistence failed. In-memory state may be ahead of storage.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Domain rule failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ListError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ListError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Result type for list manager operations.
pub type ListResult<T> = Result<T, ListError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_violation_message() {
        let err = ListError::InvariantViolation {
            list_id: "groceries".to_string(),
            key: "ghost".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot set quantity for unknown product 'ghost' in list 'groceries'. \
             Product must be created first with add_product."
        );
    }

    #[test]
    fn test_validation_passes_message_through() {
        let err: ListError = ValidationError::Negative {
            field: "qty".to_string(),
            value: -1,
        }
        .into();
        assert_eq!(err.to_string(), "qty cannot be negative: -1");
    }
}
