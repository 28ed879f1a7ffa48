//! # Wire Protocol
//!
//! Home Assistant style command messages.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HANDSHAKE                                                             │
//! │  ─────────                                                             │
//! │  client ───► {"type": "hello", "user_id": "alice"}                     │
//! │  hub    ◄─── {"type": "welcome", "user_id", "is_admin", "server_time"} │
//! │                                                                         │
//! │  COMMANDS                                                              │
//! │  ────────                                                              │
//! │  client ───► {"id": 3, "type": "shopping_list_manager/set_qty",       │
//! │               "list_id": "groceries", "key": "milk", "qty": 2}         │
//! │  hub    ◄─── {"id": 3, "type": "result", "success": true,              │
//! │               "result": {"success": true}}                              │
//! │                                                                         │
//! │  EVENTS (every connection, after every successful mutation)            │
//! │  ──────                                                                │
//! │  hub    ───► {"type": "event",                                         │
//! │               "event_type": "shopping_list_manager_updated"}           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `type` may be bare (`set_qty`) or carry the domain prefix.

use basket_core::{NewProduct, Visibility, DEFAULT_LIST_ID};
use basket_lists::{NewList, UPDATED_EVENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::ApiError;

/// Prefix Home Assistant puts in front of every command type.
pub const COMMAND_PREFIX: &str = "shopping_list_manager/";

// =============================================================================
// Handshake
// =============================================================================

/// First frame a client must send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Handshake {
    Hello { user_id: String },
}

/// Reply to a valid hello.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Welcome {
    pub user_id: String,
    pub is_admin: bool,
    /// RFC 3339
    pub server_time: String,
}

// =============================================================================
// Commands
// =============================================================================

fn default_list_id() -> String {
    DEFAULT_LIST_ID.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddProductArgs {
    #[serde(default = "default_list_id")]
    pub list_id: String,
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl AddProductArgs {
    pub fn into_parts(self) -> (String, NewProduct) {
        let product = NewProduct {
            key: self.key,
            name: self.name,
            category: self.category,
            unit: self.unit,
            image: self.image,
        };
        (self.list_id, product)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetQtyArgs {
    #[serde(default = "default_list_id")]
    pub list_id: String,
    pub key: String,
    pub qty: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListArgs {
    #[serde(default = "default_list_id")]
    pub list_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteProductArgs {
    #[serde(default = "default_list_id")]
    pub list_id: String,
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateListArgs {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub catalogue: Option<String>,
}

impl From<CreateListArgs> for NewList {
    fn from(args: CreateListArgs) -> Self {
        NewList {
            name: args.name,
            icon: args.icon,
            visibility: args.visibility,
            catalogue: args.catalogue,
        }
    }
}

/// A decoded client command.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    AddProduct(AddProductArgs),
    SetQty(SetQtyArgs),
    GetProducts(ListArgs),
    GetActive(ListArgs),
    DeleteProduct(DeleteProductArgs),
    GetCatalogues,
    GetLists,
    CreateList(CreateListArgs),
    GetCategories,
}

/// Every command type the hub understands, without prefix.
pub const COMMAND_TYPES: [&str; 9] = [
    "add_product",
    "set_qty",
    "get_products",
    "get_active",
    "delete_product",
    "get_catalogues",
    "get_lists",
    "create_list",
    "get_categories",
];

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddProduct(_) => "add_product",
            Command::SetQty(_) => "set_qty",
            Command::GetProducts(_) => "get_products",
            Command::GetActive(_) => "get_active",
            Command::DeleteProduct(_) => "delete_product",
            Command::GetCatalogues => "get_catalogues",
            Command::GetLists => "get_lists",
            Command::CreateList(_) => "create_list",
            Command::GetCategories => "get_categories",
        }
    }
}

/// A command plus the id to echo back.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: Option<Value>,
    pub command: Command,
}

/// A frame that could not be turned into a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub id: Option<Value>,
    pub error: ApiError,
}

/// Decodes one text frame.
///
/// ## Errors
/// - `invalid_format`: not JSON, not an object, no string `type`, or
///   missing/mistyped fields for a known command
/// - `unknown_command`: `type` names nothing in [`COMMAND_TYPES`]
pub fn parse_request(text: &str) -> Result<Request, Rejected> {
    let mut value: Value = serde_json::from_str(text).map_err(|e| Rejected {
        id: None,
        error: ApiError::invalid_format(format!("Message is not valid JSON: {}", e)),
    })?;

    let Some(object) = value.as_object_mut() else {
        return Err(Rejected {
            id: None,
            error: ApiError::invalid_format("Message must be a JSON object"),
        });
    };

    let id = object.get("id").cloned();
    let reject = |error: ApiError| Rejected { id: id.clone(), error };

    let kind = match object.get("type").and_then(Value::as_str) {
        Some(kind) => kind.strip_prefix(COMMAND_PREFIX).unwrap_or(kind).to_string(),
        None => return Err(reject(ApiError::invalid_format("Message has no type"))),
    };

    if !COMMAND_TYPES.contains(&kind.as_str()) {
        return Err(reject(ApiError::unknown_command(&kind)));
    }

    object.insert("type".to_string(), Value::String(kind));

    let command = serde_json::from_value::<Command>(value)
        .map_err(|e| reject(ApiError::invalid_format(e.to_string())))?;

    Ok(Request { id, command })
}

// =============================================================================
// Server Messages
// =============================================================================

/// Payload of the change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChangeEvent {
    pub event_type: String,
}

impl Default for ChangeEvent {
    fn default() -> Self {
        ChangeEvent {
            event_type: UPDATED_EVENT.to_string(),
        }
    }
}

/// Everything the hub sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome(Welcome),
    Result {
        id: Option<Value>,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ApiError>,
    },
    Event(ChangeEvent),
}

impl ServerMessage {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        ServerMessage::Result {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: ApiError) -> Self {
        ServerMessage::Result {
            id,
            success: false,
            result: None,
            error: Some(error),
        }
    }

    pub fn changed() -> Self {
        ServerMessage::Event(ChangeEvent::default())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Rejected> for ServerMessage {
    fn from(rejected: Rejected) -> Self {
        ServerMessage::failure(rejected.id, rejected.error)
    }
}
