//! # Validation Module
//!
//! Input validation for list commands.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Hub protocol (serde)                                         │
//! │  ├── Shape checks (missing fields, wrong JSON types)                   │
//! │  └── invalid_format response                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Non-empty keys and names, length limits                           │
//! │  └── Quantity sign and range                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: ListManager (under the list lock)                            │
//! │  └── Product existence for set_qty (InvariantViolation)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here runs before a list lock is acquired, so a rejected
//! request never touches list state.

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_KEY_LENGTH, MAX_NAME_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product key.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most 100 characters
///
/// ## Example
/// ```rust
/// use basket_core::validation::validate_product_key;
///
/// assert!(validate_product_key("milk").is_ok());
/// assert!(validate_product_key("").is_err());
/// ```
pub fn validate_product_key(key: &str) -> ValidationResult<()> {
    require_text("key", key, MAX_KEY_LENGTH)
}

/// Validates a product display name.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    require_text("name", name, MAX_NAME_LENGTH)
}

/// Validates a list display name (used by `create_list`).
pub fn validate_list_name(name: &str) -> ValidationResult<()> {
    require_text("name", name, MAX_NAME_LENGTH)
}

/// Validates a list id.
///
/// Registries written by earlier versions hold ids with spaces and dots,
/// so only what would break a storage key is rejected: path separators,
/// `..`, and control characters.
///
/// ## Example
/// ```rust
/// use basket_core::validation::validate_list_id;
///
/// assert!(validate_list_id("groceries").is_ok());
/// assert!(validate_list_id("Weekend Trip").is_ok());
/// assert!(validate_list_id("../etc").is_err());
/// ```
pub fn validate_list_id(list_id: &str) -> ValidationResult<()> {
    require_text("list_id", list_id, MAX_KEY_LENGTH)?;

    let reason = if list_id.contains('/') || list_id.contains('\\') {
        "must not contain path separators"
    } else if list_id.contains("..") {
        "must not contain '..'"
    } else if list_id.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };

    Err(ValidationError::InvalidFormat {
        field: "list_id".to_string(),
        reason: reason.to_string(),
    })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested quantity and narrows it to `u32`.
///
/// ## Rules
/// - Must not be negative (0 is allowed and means "remove")
/// - Must not exceed MAX_ITEM_QUANTITY (9999)
///
/// ```text
/// set_qty(list, key, qty)
///      │
///      ▼
/// validate_quantity(qty) ← THIS FUNCTION (no lock held)
///      │
///      ├── qty < 0     → ValidationError::Negative
///      ├── qty > 9999  → ValidationError::OutOfRange
///      └── OK(u32)     → acquire list lock, check product exists
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<u32> {
    if qty < 0 {
        return Err(ValidationError::Negative {
            field: "qty".to_string(),
            value: qty,
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "qty".to_string(),
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }

    // Bounded by MAX_ITEM_QUANTITY above.
    Ok(qty as u32)
}

// =============================================================================
// Unit Tests
// =============================================================================
