//! # basket-hub: WebSocket Command Server
//!
//! Exposes [`basket_lists::ListManager`] to panel clients.
//!
//! ## Module Organization
//! ```text
//! basket-hub/src/
//! ├── lib.rs        ◄─── You are here
//! ├── main.rs       ◄─── Binary: config → storage → manager → server
//! ├── config.rs     ◄─── HubConfig (TOML + BASKET_* env)
//! ├── protocol.rs   ◄─── Request parsing, result/event envelopes
//! ├── error.rs      ◄─── ApiError, ErrorCode
//! ├── commands/     ◄─── One handler per command
//! └── server.rs     ◄─── axum WebSocket server
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use commands::CommandContext;
pub use config::{HubConfig, StorageBackend};
pub use error::{ApiError, ErrorCode};
pub use server::{HubHandle, HubServer, ServerError};
