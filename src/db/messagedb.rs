// db/messagedb.rs
use async_trait::async_trait;
use sqlx::Error;

use super::db::DBClient;
use crate::models::messagemodel::*;

#[async_trait]
pub trait MessageExt {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, Error>;

    /// Full history of one conversation, oldest first.
    async fn get_conversation_messages(
        &self,
        conversation: ConversationKey,
    ) -> Result<Vec<Message>, Error>;
}

fn into_message(row: MessageRow) -> Result<Message, Error> {
    Message::try_from(row).map_err(|e| Error::Decode(e.into()))
}

#[async_trait]
impl MessageExt for DBClient {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, Error> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            WITH inserted AS (
                INSERT INTO messages (sender_id, content, conversation_kind, contract_id, proposal_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, sender_id, content, conversation_kind, contract_id, proposal_id, created_at
            )
            SELECT i.id, i.sender_id, u.full_name AS sender_name, i.content,
                   i.conversation_kind, i.contract_id, i.proposal_id, i.created_at
            FROM inserted i
            LEFT JOIN users u ON u.id = i.sender_id
            "#,
        )
        .bind(new_message.sender_id)
        .bind(new_message.content)
        .bind(new_message.conversation.kind())
        .bind(new_message.conversation.contract_id())
        .bind(new_message.conversation.proposal_id())
        .fetch_one(&self.pool)
        .await?;

        into_message(row)
    }

    async fn get_conversation_messages(
        &self,
        conversation: ConversationKey,
    ) -> Result<Vec<Message>, Error> {
        let column = match conversation {
            ConversationKey::Contract(_) => "contract_id",
            ConversationKey::Proposal(_) => "proposal_id",
        };

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT m.id, m.sender_id, u.full_name AS sender_name, m.content,
                   m.conversation_kind, m.contract_id, m.proposal_id, m.created_at
            FROM messages m
            LEFT JOIN users u ON u.id = m.sender_id
            WHERE m.{} = $1
            ORDER BY m.created_at ASC, m.id ASC
            "#,
            column
        ))
        .bind(conversation.id())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_message).collect()
    }
}
