//! Change notifications.
//!
//! Every successful mutation fires one payload-free [`ListChanged`] after
//! the catalogue lock is released. Subscribers re-fetch what they display.

use tokio::sync::broadcast;
use tracing::trace;

/// Event name pushed to clients.
pub const UPDATED_EVENT: &str = "shopping_list_manager_updated";

/// Something on some list changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListChanged;

#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ListChanged>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListChanged> {
        self.tx.subscribe()
    }

    /// Fires the event. Having no subscribers is fine.
    pub fn notify(&self) {
        let receivers = self.tx.send(ListChanged).unwrap_or(0);
        trace!(receivers, "List change notified");
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}
