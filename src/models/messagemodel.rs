// models/messagemodel.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "conversation_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Contract,
    Proposal,
}

impl ConversationKind {
    pub fn to_str(&self) -> &str {
        match self {
            ConversationKind::Contract => "contract",
            ConversationKind::Proposal => "proposal",
        }
    }
}

impl std::str::FromStr for ConversationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contract" | "contracts" => Ok(ConversationKind::Contract),
            "proposal" | "proposals" => Ok(ConversationKind::Proposal),
            other => Err(format!("Unknown conversation kind: {}", other)),
        }
    }
}

/// Anchor of a message thread. A message belongs to exactly one of these.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ConversationKey {
    Contract(Uuid),
    Proposal(Uuid),
}

impl ConversationKey {
    pub fn new(kind: ConversationKind, id: Uuid) -> Self {
        match kind {
            ConversationKind::Contract => ConversationKey::Contract(id),
            ConversationKind::Proposal => ConversationKey::Proposal(id),
        }
    }

    pub fn kind(&self) -> ConversationKind {
        match self {
            ConversationKey::Contract(_) => ConversationKind::Contract,
            ConversationKey::Proposal(_) => ConversationKind::Proposal,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ConversationKey::Contract(id) | ConversationKey::Proposal(id) => *id,
        }
    }

    pub fn contract_id(&self) -> Option<Uuid> {
        match self {
            ConversationKey::Contract(id) => Some(*id),
            ConversationKey::Proposal(_) => None,
        }
    }

    pub fn proposal_id(&self) -> Option<Uuid> {
        match self {
            ConversationKey::Proposal(id) => Some(*id),
            ConversationKey::Contract(_) => None,
        }
    }

    /// Rebuilds a key from stored columns. Fails unless exactly one anchor is set
    /// and it agrees with the discriminant.
    pub fn from_columns(
        kind: ConversationKind,
        contract_id: Option<Uuid>,
        proposal_id: Option<Uuid>,
    ) -> Result<Self, String> {
        match (kind, contract_id, proposal_id) {
            (ConversationKind::Contract, Some(id), None) => Ok(ConversationKey::Contract(id)),
            (ConversationKind::Proposal, None, Some(id)) => Ok(ConversationKey::Proposal(id)),
            (kind, contract_id, proposal_id) => Err(format!(
                "Inconsistent conversation anchor: kind={}, contract_id={:?}, proposal_id={:?}",
                kind.to_str(),
                contract_id,
                proposal_id
            )),
        }
    }

    /// Name of the realtime channel scoped to this conversation.
    pub fn channel_name(&self) -> String {
        format!("messages:{}:{}", self.kind().to_str(), self.id())
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().to_str(), self.id())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: Option<String>,
    pub content: String,
    pub conversation_kind: ConversationKind,
    pub contract_id: Option<Uuid>,
    pub proposal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: Option<String>,
    pub content: String,
    pub conversation: ConversationKey,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = String;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let conversation =
            ConversationKey::from_columns(row.conversation_kind, row.contract_id, row.proposal_id)?;

        Ok(Message {
            id: row.id,
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            content: row.content,
            conversation,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub content: String,
    pub conversation: ConversationKey,
}
