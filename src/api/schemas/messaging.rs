use crate::domain::message::{ConversationHistory, ExpiryStamp, Message};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Query string of `GET /messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesQuery {
    pub wallet_address: String,
    pub other_user_pseudonym: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_wallet: String,
    pub recipient_pseudonym: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_own: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl MessageResponse {
    #[must_use]
    pub fn from_message(message: Message, viewer_id: Uuid) -> Self {
        Self {
            is_own: message.is_from(viewer_id),
            id: message.id,
            conversation_id: message.conversation_id,
            content: message.content,
            created_at: message.created_at,
            expires_at: message.expires_at,
        }
    }

    #[must_use]
    pub fn list_from_history(history: ConversationHistory) -> Vec<Self> {
        let viewer_id = history.viewer_id;
        history.messages.into_iter().map(|m| Self::from_message(m, viewer_id)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMessagesRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMessagesResponse {
    pub deleted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampExpiryRequest {
    pub wallet_address: String,
    pub ids: Vec<Uuid>,
    pub ttl_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryStampResponse {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<ExpiryStamp> for ExpiryStampResponse {
    fn from(stamp: ExpiryStamp) -> Self {
        Self { id: stamp.message_id, expires_at: stamp.expires_at }
    }
}
