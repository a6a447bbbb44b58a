//! Change-notification hub for new message rows.
//!
//! Inserts are published once into a broadcast channel; each conversation
//! view pulls from its own [`Subscription`], which only yields events for the
//! conversation it was opened on. Dropping the subscription unsubscribes.

use std::sync::Arc;

use serde::Deserialize;
use sqlx::{postgres::PgListener, PgPool};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::models::messagemodel::{ConversationKey, ConversationKind};

/// Postgres NOTIFY channel written by the `messages_notify_insert` trigger.
pub const MESSAGE_INSERTED_CHANNEL: &str = "message_inserted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    MessageInserted {
        message_id: Uuid,
        conversation: ConversationKey,
    },
    /// The receiver fell behind and may have missed inserts; consumers
    /// should refetch.
    Resync { conversation: ConversationKey },
}

impl ChangeEvent {
    pub fn conversation(&self) -> ConversationKey {
        match self {
            ChangeEvent::MessageInserted { conversation, .. } => *conversation,
            ChangeEvent::Resync { conversation } => *conversation,
        }
    }
}

#[derive(Debug)]
pub struct RealtimeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        trace!(event = ?event, "publishing change event");
        // no subscribers is not an error
        let _ = self.sender.send(event);
    }

    /// Opens a channel scoped to inserts on `conversation`.
    pub fn subscribe(&self, channel: impl Into<String>, conversation: ConversationKey) -> Subscription {
        let channel = channel.into();
        debug!(channel = %channel, "realtime subscription opened");
        Subscription {
            channel,
            filter: conversation,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Subscription {
    channel: String,
    filter: ConversationKey,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn conversation(&self) -> ConversationKey {
        self.filter
    }

    /// Next event for this conversation. `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.conversation() == self.filter => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(channel = %self.channel, skipped, "subscription lagged");
                    return Some(ChangeEvent::Resync {
                        conversation: self.filter,
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(channel = %self.channel, "realtime subscription closed");
    }
}

#[derive(Debug, Deserialize)]
struct InsertNotification {
    message_id: Uuid,
    kind: ConversationKind,
    contract_id: Option<Uuid>,
    proposal_id: Option<Uuid>,
}

fn parse_notification(payload: &str) -> Result<ChangeEvent, String> {
    let notification: InsertNotification =
        serde_json::from_str(payload).map_err(|e| e.to_string())?;
    let conversation = ConversationKey::from_columns(
        notification.kind,
        notification.contract_id,
        notification.proposal_id,
    )?;

    Ok(ChangeEvent::MessageInserted {
        message_id: notification.message_id,
        conversation,
    })
}

/// Forwards `message_inserted` notifications from Postgres into the hub,
/// reconnecting after failures.
pub fn spawn_pg_bridge(pool: PgPool, hub: Arc<RealtimeHub>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match PgListener::connect_with(&pool).await {
                Ok(mut listener) => {
                    if let Err(e) = listener.listen(MESSAGE_INSERTED_CHANNEL).await {
                        warn!("LISTEN {} failed: {}", MESSAGE_INSERTED_CHANNEL, e);
                    } else {
                        tracing::info!("Listening for {} notifications", MESSAGE_INSERTED_CHANNEL);
                        loop {
                            match listener.recv().await {
                                Ok(notification) => match parse_notification(notification.payload()) {
                                    Ok(event) => hub.publish(event),
                                    Err(e) => warn!("Ignoring malformed notification: {}", e),
                                },
                                Err(e) => {
                                    warn!("Realtime listener error: {}", e);
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => warn!("Failed to open realtime listener: {}", e),
            }

            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    })
}
