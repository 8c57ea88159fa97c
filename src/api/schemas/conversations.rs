use crate::domain::conversation::ConversationSummary;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Query string of `GET /conversations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationsQuery {
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationRequest {
    pub wallet_address: String,
    pub other_user_pseudonym: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationResponse {
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummaryResponse {
    pub conversation_id: Uuid,
    pub other_participant: String,
    pub last_message: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_message_time: Option<OffsetDateTime>,
    pub unread_count: i64,
}

impl From<ConversationSummary> for ConversationSummaryResponse {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            conversation_id: summary.conversation_id,
            other_participant: summary.other_participant,
            last_message: summary.last_message,
            last_message_time: summary.last_message_time,
            unread_count: summary.unread_count,
        }
    }
}
