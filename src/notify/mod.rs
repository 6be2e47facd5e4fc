use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::storage::Storage;

/// Broadcasts notification events to in-process subscribers (SSE bridges,
/// tests). Delivery transport beyond the inbox table is external.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<String>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    pub fn broadcast(&self, event: &str, params: Value) {
        let payload = serde_json::json!({ "event": event, "params": params });
        // Ignore errors — no subscribers is fine
        let _ = self
            .tx
            .send(serde_json::to_string(&payload).unwrap_or_default());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// Notification sink: "notify user X with message M".
///
/// Writes the user's inbox row and broadcasts an event. Strictly
/// fire-and-forget — a failed write is logged and swallowed so it can never
/// fail (or roll back) the operation that triggered it.
#[derive(Clone)]
pub struct Notifier {
    storage: Arc<Storage>,
    broadcaster: Arc<EventBroadcaster>,
}

impl Notifier {
    pub fn new(storage: Arc<Storage>, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            storage,
            broadcaster,
        }
    }

    pub async fn send(&self, user_id: &str, message: &str) {
        match self.storage.create_notification(user_id, message).await {
            Ok(notification) => {
                self.broadcaster.broadcast(
                    "notification.created",
                    serde_json::json!({
                        "id": notification.id,
                        "userId": notification.user_id,
                        "message": notification.message,
                        "createdAt": notification.created_at,
                    }),
                );
            }
            Err(e) => warn!(user_id, err = %e, "failed to persist notification"),
        }
    }
}
