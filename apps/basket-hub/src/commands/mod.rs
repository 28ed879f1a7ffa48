//! # Command Handlers
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (context + dispatch)
//! ├── product.rs   ◄─── add_product, get_products, delete_product
//! ├── quantity.rs  ◄─── set_qty, get_active
//! └── lists.rs     ◄─── get_catalogues, get_lists, create_list, get_categories
//! ```
//!
//! Handlers return the `result` payload as JSON or an [`ApiError`]; the
//! server wraps either in the result envelope. Change events come from the
//! manager itself, not from here.

pub mod lists;
pub mod product;
pub mod quantity;

use std::path::PathBuf;
use std::sync::Arc;

use basket_core::User;
use basket_lists::ListManager;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ErrorCode};
use crate::protocol::Command;

/// Everything a handler may touch.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub manager: Arc<ListManager>,
    /// Where category seed files live.
    pub data_dir: PathBuf,
    pub country: Option<String>,
}

impl CommandContext {
    pub fn new(manager: Arc<ListManager>, data_dir: impl Into<PathBuf>, country: Option<String>) -> Self {
        CommandContext {
            manager,
            data_dir: data_dir.into(),
            country,
        }
    }
}

/// Runs one command on behalf of `user`.
pub async fn dispatch(ctx: &CommandContext, user: &User, command: Command) -> Result<Value, ApiError> {
    let name = command.name();
    debug!(command = name, user_id = %user.id, "Dispatching command");

    match command {
        Command::AddProduct(args) => product::add_product(ctx, args).await,
        Command::GetProducts(args) => product::get_products(ctx, args).await,
        Command::DeleteProduct(args) => product::delete_product(ctx, args).await,
        Command::SetQty(args) => quantity::set_qty(ctx, args).await,
        Command::GetActive(args) => quantity::get_active(ctx, args).await,
        Command::GetCatalogues => lists::get_catalogues(ctx).await,
        Command::GetLists => lists::get_lists(ctx, user).await,
        Command::CreateList(args) => lists::create_list(ctx, user, args).await,
        Command::GetCategories => lists::get_categories(ctx).await,
    }
}

/// Serializes a handler result, reporting failure under `code`.
pub(crate) fn to_result<T: Serialize>(code: ErrorCode, value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::new(code, format!("Failed to encode result: {}", e)))
}

/// The `{"success": true}` payload of commands with nothing to return.
pub(crate) fn acknowledged() -> Value {
    serde_json::json!({ "success": true })
}
