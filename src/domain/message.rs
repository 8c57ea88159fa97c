use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub read_at: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
}

impl Message {
    #[must_use]
    pub fn is_from(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id
    }
}

/// The messages of one conversation as seen by one of its participants.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    pub conversation_id: Uuid,
    pub viewer_id: Uuid,
    pub messages: Vec<Message>,
}

/// A persisted ephemeral deadline for a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryStamp {
    pub message_id: Uuid,
    pub expires_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_from_matches_sender_only() {
        let sender_id = Uuid::new_v4();
        let msg = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id,
            content: "hi".into(),
            created_at: OffsetDateTime::now_utc(),
            read_at: None,
            expires_at: None,
        };
        assert!(msg.is_from(sender_id));
        assert!(!msg.is_from(Uuid::new_v4()));
    }
}
