use crate::adapters::database::DbPool;
use crate::adapters::database::conversation_repo::ConversationRepository;
use crate::adapters::database::message_repo::MessageRepository;
use crate::adapters::database::user_repo::UserRepository;
use crate::config::MessagingConfig;
use crate::domain::message::{ConversationHistory, ExpiryStamp, Message};
use crate::domain::ttl::validate_ttl_ms;
use crate::error::{AppError, Result};
use crate::services::conversation_service::lookup_or_create;
use crate::services::user_service::{require_by_pseudonym, require_by_wallet};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) sent_total: Counter<u64>,
    pub(crate) deleted_total: Counter<u64>,
    pub(crate) stamped_total: Counter<u64>,
    pub(crate) fetch_batch_size: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("circle-server");
        Self {
            sent_total: meter
                .u64_counter("circle_messages_sent_total")
                .with_description("Total messages successfully sent")
                .build(),
            deleted_total: meter
                .u64_counter("circle_messages_deleted_total")
                .with_description("Messages deleted on request")
                .build(),
            stamped_total: meter
                .u64_counter("circle_messages_expiry_stamped_total")
                .with_description("Messages that received an ephemeral deadline")
                .build(),
            fetch_batch_size: meter
                .u64_histogram("circle_message_fetch_batch_size")
                .with_description("Number of messages returned for a conversation fetch")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MessageService {
    pool: DbPool,
    repo: MessageRepository,
    user_repo: UserRepository,
    conversation_repo: ConversationRepository,
    config: MessagingConfig,
    metrics: Metrics,
}

impl MessageService {
    #[must_use]
    pub fn new(
        pool: DbPool,
        repo: MessageRepository,
        user_repo: UserRepository,
        conversation_repo: ConversationRepository,
        config: MessagingConfig,
    ) -> Self {
        Self { pool, repo, user_repo, conversation_repo, config, metrics: Metrics::new() }
    }

    /// Sends a message from a wallet to the user holding `recipient_pseudonym`.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the content is empty or too long, or the sender writes to themselves.
    /// Returns `AppError::NotFound` if the sender or recipient does not exist.
    /// Returns `AppError::Database` if the message cannot be stored.
    #[tracing::instrument(err(level = "warn"), skip(self, content), fields(content_len = content.len()))]
    pub async fn send(&self, sender_wallet: &str, recipient_pseudonym: &str, content: &str) -> Result<Message> {
        self.validate_content(content)?;

        let mut tx = self.pool.begin().await?;
        let sender = require_by_wallet(&self.user_repo, &mut tx, sender_wallet).await?;
        let recipient = require_by_pseudonym(&self.user_repo, &mut tx, recipient_pseudonym).await?;
        let conversation_id = lookup_or_create(&self.conversation_repo, &mut tx, sender.id, recipient.id).await?;

        match self.repo.create(&mut tx, conversation_id, sender.id, content).await {
            Ok(message) => {
                tx.commit().await?;
                tracing::debug!(message_id = %message.id, %conversation_id, "Message stored");
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "success")]);
                Ok(message)
            }
            Err(e) => {
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "failure")]);
                Err(e)
            }
        }
    }

    /// Returns the conversation between a wallet and a pseudonym, marking the
    /// viewer's incoming messages read.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if either user does not exist.
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn list(&self, viewer_wallet: &str, other_pseudonym: &str) -> Result<ConversationHistory> {
        let mut tx = self.pool.begin().await?;
        let viewer = require_by_wallet(&self.user_repo, &mut tx, viewer_wallet).await?;
        let other = require_by_pseudonym(&self.user_repo, &mut tx, other_pseudonym).await?;
        let conversation_id = lookup_or_create(&self.conversation_repo, &mut tx, viewer.id, other.id).await?;

        let marked = self.repo.mark_read(&mut tx, conversation_id, viewer.id).await?;
        let messages = self.repo.list_for_conversation(&mut tx, conversation_id, i64::from(self.config.fetch_limit)).await?;
        tx.commit().await?;

        if marked > 0 {
            tracing::debug!(marked, "Marked incoming messages read");
        }
        self.metrics.fetch_batch_size.record(messages.len() as u64, &[]);

        Ok(ConversationHistory { conversation_id, viewer_id: viewer.id, messages })
    }

    /// Deletes the given messages. Ids that no longer exist are ignored.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if too many ids are given.
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(err(level = "warn"), skip(self), fields(batch_count = message_ids.len()))]
    pub async fn delete_batch(&self, message_ids: &[Uuid]) -> Result<u64> {
        self.validate_batch(message_ids)?;
        let mut conn = self.pool.acquire().await?;
        let deleted = self.repo.delete_batch(&mut conn, message_ids).await?;
        self.metrics.deleted_total.add(deleted, &[]);
        Ok(deleted)
    }

    /// Persists an ephemeral deadline `ttl_ms` from now on messages the viewer received.
    /// Messages that already carry a deadline keep it.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the TTL is out of range or too many ids are given.
    /// Returns `AppError::NotFound` if the viewer does not exist.
    #[tracing::instrument(err(level = "warn"), skip(self), fields(batch_count = message_ids.len()))]
    pub async fn stamp_expiry(&self, viewer_wallet: &str, message_ids: &[Uuid], ttl_ms: u64) -> Result<Vec<ExpiryStamp>> {
        self.validate_batch(message_ids)?;
        let ttl = validate_ttl_ms(ttl_ms).map_err(AppError::BadRequest)?;

        let mut conn = self.pool.acquire().await?;
        let viewer = require_by_wallet(&self.user_repo, &mut conn, viewer_wallet).await?;
        let expires_at = OffsetDateTime::now_utc() + ttl;
        let stamps = self.repo.stamp_expiry(&mut conn, viewer.id, message_ids, expires_at).await?;

        self.metrics.stamped_total.add(stamps.len() as u64, &[]);
        Ok(stamps)
    }

    fn validate_content(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("Message content cannot be empty".into()));
        }
        if content.len() > self.config.max_content_len {
            return Err(AppError::BadRequest(format!(
                "Message content is too long (max {} bytes)",
                self.config.max_content_len
            )));
        }
        Ok(())
    }

    fn validate_batch(&self, message_ids: &[Uuid]) -> Result<()> {
        if message_ids.len() > self.config.max_batch_ids {
            return Err(AppError::BadRequest(format!("At most {} ids per request", self.config.max_batch_ids)));
        }
        Ok(())
    }
}
