use crate::domain::message::{ExpiryStamp, Message};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRecord {
    pub(crate) id: Uuid,
    pub(crate) conversation_id: Uuid,
    pub(crate) sender_id: Uuid,
    pub(crate) content: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) read_at: Option<OffsetDateTime>,
    pub(crate) expires_at: Option<OffsetDateTime>,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            conversation_id: record.conversation_id,
            sender_id: record.sender_id,
            content: record.content,
            created_at: record.created_at,
            read_at: record.read_at,
            expires_at: record.expires_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ExpiryStampRecord {
    pub(crate) id: Uuid,
    pub(crate) expires_at: OffsetDateTime,
}

impl From<ExpiryStampRecord> for ExpiryStamp {
    fn from(record: ExpiryStampRecord) -> Self {
        Self { message_id: record.id, expires_at: record.expires_at }
    }
}
