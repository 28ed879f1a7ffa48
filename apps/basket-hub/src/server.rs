//! # WebSocket Server
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Basket Hub Server                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      HubServer (Axum)                           │   │
//! │  │                                                                 │   │
//! │  │  /ws endpoint ──▶ WebSocket upgrade ──▶ hello / welcome        │   │
//! │  │  /health      ──▶ "OK"                                          │   │
//! │  │                        │                                        │   │
//! │  │                        ▼                                        │   │
//! │  │   ┌──────────────── per connection ─────────────────┐          │   │
//! │  │   │  receive loop ──► commands::dispatch (in order)  │          │   │
//! │  │   │  outgoing task ◄── results, events, pings        │          │   │
//! │  │   │  event task    ◄── ListManager::subscribe()      │          │   │
//! │  │   │  ping task     (every 30s)                       │          │   │
//! │  │   └──────────────────────────────────────────────────┘          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests on one connection run one after another, so a client that
//! sends `add_product` then `set_qty` without waiting gets them applied in
//! that order. Different connections run concurrently.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use basket_core::User;
use futures_util::{stream::SplitStream, SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::commands::{self, CommandContext};
use crate::config::AccessSettings;
use crate::protocol::{parse_request, Handshake, ServerMessage, Welcome};

// =============================================================================
// Constants
// =============================================================================

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long a new connection has to say hello.
const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum message size (1MB).
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Outgoing frames buffered per connection.
const OUTGOING_BUFFER: usize = 64;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server shutdown channel closed")]
    ShutdownClosed,
}

pub type ServerResult<T> = Result<T, ServerError>;

// =============================================================================
// Connected Client
// =============================================================================

/// A connection that completed the handshake.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub user: User,
    pub addr: SocketAddr,
    pub connected_at: std::time::Instant,
}

// =============================================================================
// Hub State
// =============================================================================

/// Shared state of a running hub.
#[derive(Debug)]
pub struct HubState {
    context: CommandContext,
    access: AccessSettings,
    clients: RwLock<HashMap<u64, ConnectedClient>>,
    next_connection: AtomicU64,
}

impl HubState {
    pub fn new(context: CommandContext, access: AccessSettings) -> Self {
        HubState {
            context,
            access,
            clients: RwLock::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn register(&self, user: User, addr: SocketAddr) -> u64 {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let client = ConnectedClient {
            user,
            addr,
            connected_at: std::time::Instant::now(),
        };
        self.clients.write().await.insert(id, client);
        id
    }

    async fn remove(&self, connection_id: u64) {
        if let Some(client) = self.clients.write().await.remove(&connection_id) {
            info!(
                user_id = %client.user.id,
                connected_secs = client.connected_at.elapsed().as_secs(),
                "Client removed"
            );
        }
    }
}

// =============================================================================
// Hub Server
// =============================================================================

/// The WebSocket server.
pub struct HubServer {
    bind_addr: String,
    state: Arc<HubState>,
}

/// Handle for controlling a started server.
#[derive(Clone)]
pub struct HubHandle {
    state: Arc<HubState>,
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
}

impl HubHandle {
    /// Address actually bound; differs from the configured one for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn client_count(&self) -> usize {
        self.state.client_count().await
    }

    /// Stops accepting connections and lets open ones drain.
    pub async fn shutdown(&self) -> ServerResult<()> {
        self.shutdown_tx.send(()).await.map_err(|_| ServerError::ShutdownClosed)
    }
}

impl HubServer {
    pub fn new(bind_addr: impl Into<String>, context: CommandContext, access: AccessSettings) -> Self {
        HubServer {
            bind_addr: bind_addr.into(),
            state: Arc::new(HubState::new(context, access)),
        }
    }

    /// Binds the listener, spawns the server and returns a handle.
    pub async fn start(self) -> ServerResult<HubHandle> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone());

        let listener = TcpListener::bind(&self.bind_addr).await.map_err(|source| ServerError::Bind {
            addr: self.bind_addr.clone(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: self.bind_addr.clone(),
            source,
        })?;

        info!(addr = %local_addr, "Hub server started");

        tokio::spawn(async move {
            let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await;
                    info!("Hub server shutting down");
                })
                .await;
            if let Err(e) = result {
                error!(error = %e, "Hub server stopped with error");
            }
        });

        Ok(HubHandle {
            state: self.state,
            local_addr,
            shutdown_tx,
        })
    }
}

// =============================================================================
// WebSocket Handler
// =============================================================================

async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<HubState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    debug!(addr = %addr, "New WebSocket connection");
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, addr))
}

async fn handle_socket(socket: WebSocket, state: Arc<HubState>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();

    let user_id = match receive_hello(&mut receiver).await {
        Some(user_id) => user_id,
        None => {
            warn!(addr = %addr, "No valid hello - closing connection");
            return;
        }
    };

    let is_admin = state.access.is_admin(&user_id);
    let user = User::new(user_id, is_admin);
    let connection_id = state.register(user.clone(), addr).await;

    info!(user_id = %user.id, is_admin = user.is_admin, addr = %addr, "Client connected");

    // Subscribed before the welcome so no change after it is missed.
    let mut changes = state.context.manager.subscribe();

    let welcome = ServerMessage::Welcome(Welcome {
        user_id: user.id.clone(),
        is_admin: user.is_admin,
        server_time: chrono::Utc::now().to_rfc3339(),
    });
    match welcome.to_json() {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                warn!(user_id = %user.id, "Failed to send welcome");
                state.remove(connection_id).await;
                return;
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to encode welcome");
            state.remove(connection_id).await;
            return;
        }
    }

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(OUTGOING_BUFFER);

    // Outgoing message task
    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Change event forwarding task
    let events_tx = outgoing_tx.clone();
    let events_user = user.id.clone();
    let events_handle = tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(user_id = %events_user, skipped, "Change events coalesced");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
            if !send_message(&events_tx, &ServerMessage::changed()).await {
                break;
            }
        }
    });

    // Ping task
    let ping_tx = outgoing_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_interval = interval(PING_INTERVAL);
        ping_interval.tick().await;
        loop {
            ping_interval.tick().await;
            if ping_tx.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                break;
            }
        }
    });

    // Main receive loop
    loop {
        match receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    handle_frame(&state, &user, text.as_str(), &outgoing_tx).await;
                }
                Message::Binary(data) => match std::str::from_utf8(&data) {
                    Ok(text) => handle_frame(&state, &user, text, &outgoing_tx).await,
                    Err(_) => debug!(user_id = %user.id, "Ignoring non-UTF-8 binary frame"),
                },
                Message::Pong(_) => {}
                Message::Ping(data) => {
                    let _ = outgoing_tx.send(Message::Pong(data)).await;
                }
                Message::Close(_) => {
                    info!(user_id = %user.id, "Client requested close");
                    break;
                }
            },
            Some(Err(e)) => {
                warn!(user_id = %user.id, error = %e, "WebSocket error");
                break;
            }
            None => {
                info!(user_id = %user.id, "Client disconnected");
                break;
            }
        }
    }

    // Cleanup
    ping_handle.abort();
    events_handle.abort();
    drop(outgoing_tx);
    let _ = outgoing_handle.await;
    state.remove(connection_id).await;
}

/// Waits for the hello frame. `None` on timeout, close, or anything else.
async fn receive_hello(receiver: &mut SplitStream<WebSocket>) -> Option<String> {
    let frame = timeout(HELLO_TIMEOUT, receiver.next()).await.ok()??.ok()?;

    let parsed = match frame {
        Message::Text(text) => serde_json::from_str::<Handshake>(text.as_str()),
        Message::Binary(data) => serde_json::from_slice::<Handshake>(&data),
        _ => return None,
    };

    match parsed {
        Ok(Handshake::Hello { user_id }) if !user_id.trim().is_empty() => Some(user_id.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Invalid hello");
            None
        }
    }
}

/// Decodes, runs and answers one request.
async fn handle_frame(state: &HubState, user: &User, text: &str, outgoing: &mpsc::Sender<Message>) {
    let reply = match parse_request(text) {
        Ok(request) => {
            let command = request.command.name();
            match commands::dispatch(&state.context, user, request.command).await {
                Ok(result) => ServerMessage::success(request.id, result),
                Err(err) => {
                    warn!(user_id = %user.id, command, code = %err.code, message = %err.message, "Command failed");
                    ServerMessage::failure(request.id, err)
                }
            }
        }
        Err(rejected) => {
            debug!(user_id = %user.id, code = %rejected.error.code, "Rejected frame");
            rejected.into()
        }
    };

    if !send_message(outgoing, &reply).await {
        debug!(user_id = %user.id, "Connection closed before reply was sent");
    }
}

/// Queues a message on the connection's outgoing channel. `false` once the
/// connection is gone.
async fn send_message(outgoing: &mpsc::Sender<Message>, msg: &ServerMessage) -> bool {
    match msg.to_json() {
        Ok(json) => outgoing.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            error!(error = %e, "Failed to encode message");
            true
        }
    }
}
