//! # API Error Type
//!
//! What a client sees when a command fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  {"id": 7, "type": "set_qty", "key": "ghost", "qty": 3}                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ListManager::set_quantity ── ListError::InvariantViolation ──┐         │
//! │                                                               │         │
//! │                         ApiError::for_command(SetQty, err) ◄──┘         │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │  {"id": 7, "type": "result", "success": false,                         │
//! │   "error": {"code": "invariant_violation", "message": "..."}}          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each command has its own `<command>_failed` code. `set_qty` additionally
//! reports `invariant_violation` when the product isn't in the catalog.

use basket_lists::ListError;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error payload of a failed command.
///
/// ```json
/// { "code": "add_product_failed", "message": "name is required" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AddProductFailed,
    SetQtyFailed,
    /// Quantity set for a product the list's catalog doesn't have
    InvariantViolation,
    GetProductsFailed,
    GetActiveFailed,
    DeleteProductFailed,
    GetCataloguesFailed,
    GetListsFailed,
    CreateListFailed,
    GetCategoriesFailed,
    /// Frame was not a JSON object with a `type`
    InvalidFormat,
    /// `type` names no known command
    UnknownCommand,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AddProductFailed => "add_product_failed",
            ErrorCode::SetQtyFailed => "set_qty_failed",
            ErrorCode::InvariantViolation => "invariant_violation",
            ErrorCode::GetProductsFailed => "get_products_failed",
            ErrorCode::GetActiveFailed => "get_active_failed",
            ErrorCode::DeleteProductFailed => "delete_product_failed",
            ErrorCode::GetCataloguesFailed => "get_catalogues_failed",
            ErrorCode::GetListsFailed => "get_lists_failed",
            ErrorCode::CreateListFailed => "create_list_failed",
            ErrorCode::GetCategoriesFailed => "get_categories_failed",
            ErrorCode::InvalidFormat => "invalid_format",
            ErrorCode::UnknownCommand => "unknown_command",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidFormat, message)
    }

    pub fn unknown_command(command: &str) -> Self {
        ApiError::new(ErrorCode::UnknownCommand, format!("Unknown command: {}", command))
    }

    /// Translates a manager error raised while running a command whose
    /// generic failure code is `failed`.
    ///
    /// Storage errors are logged in full and reported generically.
    pub fn from_list_error(failed: ErrorCode, err: ListError) -> Self {
        match err {
            ListError::InvariantViolation { .. } => ApiError::new(ErrorCode::InvariantViolation, err.to_string()),
            ListError::Store(e) => {
                tracing::error!(code = %failed, error = %e, "Storage operation failed");
                ApiError::new(failed, "Storage operation failed")
            }
            other => ApiError::new(failed, other.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
