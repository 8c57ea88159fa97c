use crate::domain::conversation::ConversationSummary;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct ConversationSummaryRecord {
    pub(crate) conversation_id: Uuid,
    pub(crate) other_participant: String,
    pub(crate) last_message: Option<String>,
    pub(crate) last_message_time: Option<OffsetDateTime>,
    pub(crate) unread_count: i64,
}

impl From<ConversationSummaryRecord> for ConversationSummary {
    fn from(record: ConversationSummaryRecord) -> Self {
        Self {
            conversation_id: record.conversation_id,
            other_participant: record.other_participant,
            last_message: record.last_message,
            last_message_time: record.last_message_time,
            unread_count: record.unread_count,
        }
    }
}
