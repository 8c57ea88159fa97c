use crate::api::schemas::conversations::ConversationSummaryResponse;
use crate::api::schemas::messaging::{ExpiryStampResponse, MessageResponse};
use crate::api::schemas::users::UserResponse;
use crate::client::{ClientError, MessagingApi};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use time::OffsetDateTime;
use uuid::Uuid;

/// In-memory stand-in for the messaging server.
#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    pub(crate) conversations: Mutex<Vec<ConversationSummaryResponse>>,
    pub(crate) messages: Mutex<Vec<MessageResponse>>,
    deleted: Mutex<Vec<Uuid>>,
    stamped: Mutex<Vec<(Uuid, u64)>>,
    pub(crate) delete_attempts: AtomicUsize,
    pub(crate) conversation_fetches: AtomicUsize,
    pub(crate) message_fetches: AtomicUsize,
    pub(crate) fail_deletes: AtomicBool,
    pub(crate) fail_fetches: AtomicBool,
    pub(crate) fail_stamps: AtomicBool,
}

impl FakeApi {
    pub(crate) fn deleted(&self) -> Vec<Uuid> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) fn stamped(&self) -> Vec<(Uuid, u64)> {
        self.stamped.lock().unwrap().clone()
    }

    fn unavailable() -> ClientError {
        ClientError::Api { status: 503, message: "unavailable".into() }
    }
}

pub(crate) fn incoming(content: &str) -> MessageResponse {
    message(content, false)
}

pub(crate) fn outgoing(content: &str) -> MessageResponse {
    message(content, true)
}

fn message(content: &str, is_own: bool) -> MessageResponse {
    MessageResponse {
        id: Uuid::new_v4(),
        conversation_id: Uuid::nil(),
        content: content.to_string(),
        created_at: OffsetDateTime::now_utc(),
        is_own,
        expires_at: None,
    }
}

pub(crate) fn summary(other: &str) -> ConversationSummaryResponse {
    ConversationSummaryResponse {
        conversation_id: Uuid::new_v4(),
        other_participant: other.to_string(),
        last_message: None,
        last_message_time: None,
        unread_count: 0,
    }
}

#[async_trait]
impl MessagingApi for FakeApi {
    async fn register(&self, wallet_address: &str, pseudonym: &str) -> Result<UserResponse, ClientError> {
        Ok(UserResponse {
            id: Uuid::new_v4(),
            wallet_address: wallet_address.to_string(),
            pseudonym: pseudonym.to_string(),
            created_at: OffsetDateTime::now_utc(),
        })
    }

    async fn open_conversation(&self, _wallet_address: &str, _other_pseudonym: &str) -> Result<Uuid, ClientError> {
        Ok(Uuid::nil())
    }

    async fn list_conversations(&self, _wallet_address: &str) -> Result<Vec<ConversationSummaryResponse>, ClientError> {
        self.conversation_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn list_messages(
        &self,
        _wallet_address: &str,
        _other_pseudonym: &str,
    ) -> Result<Vec<MessageResponse>, ClientError> {
        self.message_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn send_message(
        &self,
        _sender_wallet: &str,
        _recipient_pseudonym: &str,
        content: &str,
    ) -> Result<MessageResponse, ClientError> {
        let sent = outgoing(content);
        self.messages.lock().unwrap().push(sent.clone());
        Ok(sent)
    }

    async fn delete_messages(&self, ids: &[Uuid]) -> Result<u64, ClientError> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.messages.lock().unwrap().retain(|m| !ids.contains(&m.id));
        self.deleted.lock().unwrap().extend_from_slice(ids);
        Ok(ids.len() as u64)
    }

    async fn stamp_expiry(
        &self,
        _wallet_address: &str,
        ids: &[Uuid],
        ttl_ms: u64,
    ) -> Result<Vec<ExpiryStampResponse>, ClientError> {
        if self.fail_stamps.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let expires_at = OffsetDateTime::now_utc() + std::time::Duration::from_millis(ttl_ms);
        self.stamped.lock().unwrap().extend(ids.iter().map(|id| (*id, ttl_ms)));

        // First stamp wins, and only incoming messages are stamped.
        let mut messages = self.messages.lock().unwrap();
        Ok(messages
            .iter_mut()
            .filter(|m| !m.is_own && ids.contains(&m.id))
            .map(|m| {
                let stamped = *m.expires_at.get_or_insert(expires_at);
                ExpiryStampResponse { id: m.id, expires_at: stamped }
            })
            .collect())
    }
}
