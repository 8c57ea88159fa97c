use time::OffsetDateTime;
use uuid::Uuid;

/// The two participants of a conversation in canonical order.
///
/// Both `(a, b)` and `(b, a)` produce the same pair, so a pair can be used
/// directly as the store-level uniqueness key of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    low: Uuid,
    high: Uuid,
}

impl ParticipantPair {
    /// Builds the canonical pair for two distinct users.
    ///
    /// # Errors
    /// Returns an error if both ids are the same user.
    pub fn new(a: Uuid, b: Uuid) -> Result<Self, String> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Ok(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => Err("Cannot start a conversation with yourself".into()),
        }
    }

    #[must_use]
    pub const fn low(&self) -> Uuid {
        self.low
    }

    #[must_use]
    pub const fn high(&self) -> Uuid {
        self.high
    }
}

/// A row of a user's conversation list.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub other_participant: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<OffsetDateTime>,
    pub unread_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ParticipantPair::new(a, b).unwrap(), ParticipantPair::new(b, a).unwrap());
    }

    #[test]
    fn test_pair_low_is_smaller() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let pair = ParticipantPair::new(a, b).unwrap();
        assert!(pair.low() < pair.high());
    }

    #[test]
    fn test_pair_rejects_self_conversation() {
        let a = Uuid::new_v4();
        assert!(ParticipantPair::new(a, a).is_err());
    }
}
