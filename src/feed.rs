//! Live message list for one conversation.
//!
//! A [`ConversationFeed`] is bound to at most one [`ConversationKey`] at a
//! time. Every insert notification for that key triggers a full refetch, so
//! sender names and ordering always come from the store.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    db::{messagedb::MessageExt, Gateway},
    models::messagemodel::{ConversationKey, Message, NewMessage},
    realtime::{RealtimeHub, Subscription},
    service::error::ServiceError,
    utils::sanitize::sanitize_message,
};

pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// Length-checks the text as typed, then strips markup.
pub fn prepare_content(raw: &str) -> Result<String, ServiceError> {
    if raw.trim().chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Message must not be more than {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }

    let content = sanitize_message(raw);
    if content.is_empty() {
        return Err(ServiceError::Validation("Message cannot be empty".to_string()));
    }
    Ok(content)
}

fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

#[derive(Debug)]
pub struct ConversationFeed {
    db_client: Arc<dyn Gateway>,
    hub: Arc<RealtimeHub>,
    sender_id: Uuid,
    subscription: Option<Subscription>,
    messages: Vec<Message>,
    draft: String,
}

impl ConversationFeed {
    pub fn new(db_client: Arc<dyn Gateway>, hub: Arc<RealtimeHub>, sender_id: Uuid) -> Self {
        Self {
            db_client,
            hub,
            sender_id,
            subscription: None,
            messages: Vec::new(),
            draft: String::new(),
        }
    }

    pub fn conversation(&self) -> Option<ConversationKey> {
        self.subscription.as_ref().map(|s| s.conversation())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    async fn fetch(&self, key: ConversationKey) -> Result<Vec<Message>, ServiceError> {
        let mut messages = self.db_client.get_conversation_messages(key).await?;
        sort_messages(&mut messages);
        Ok(messages)
    }

    /// Switches the feed to `key`: drops the old subscription, starts
    /// listening for inserts on `key`, then loads the history. Inserts that
    /// land while the history loads still trigger an update.
    pub async fn bind(&mut self, key: ConversationKey) -> Result<&[Message], ServiceError> {
        self.unbind();

        let subscription = self.hub.subscribe(key.channel_name(), key);
        self.messages = self.fetch(key).await?;
        self.subscription = Some(subscription);
        debug!("Feed bound to {} with {} messages", key, self.messages.len());

        Ok(&self.messages)
    }

    /// Waits for the next insert on the bound conversation and reloads the
    /// list. `None` when unbound or the hub has shut down.
    pub async fn next_update(&mut self) -> Result<Option<&[Message]>, ServiceError> {
        let key = match self.subscription.as_mut() {
            Some(subscription) => match subscription.recv().await {
                Some(event) => event.conversation(),
                None => return Ok(None),
            },
            None => return Ok(None),
        };

        self.messages = self.fetch(key).await?;
        Ok(Some(&self.messages))
    }

    /// Sends the current draft. The draft is cleared up front and put back
    /// if the insert fails.
    pub async fn send(&mut self) -> Result<Message, ServiceError> {
        let key = self
            .conversation()
            .ok_or_else(|| ServiceError::Validation("No conversation selected".to_string()))?;
        let content = prepare_content(&self.draft)?;

        let draft = std::mem::take(&mut self.draft);
        let result = self
            .db_client
            .insert_message(NewMessage {
                sender_id: self.sender_id,
                content,
                conversation: key,
            })
            .await;

        match result {
            Ok(message) => Ok(message),
            Err(e) => {
                warn!("Failed to send message to {}: {}", key, e);
                self.draft = draft;
                Err(e.into())
            }
        }
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<Message, ServiceError> {
        self.set_draft(text);
        self.send().await
    }

    pub fn unbind(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!("Feed unbound from {}", subscription.conversation());
        }
        self.messages.clear();
    }
}
