use crate::adapters::database::records::{ExpiryStampRecord, MessageRecord};
use crate::domain::message::{ExpiryStamp, Message};
use crate::error::Result;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct MessageRepository {}

impl MessageRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Records a new message in a conversation.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, content))]
    pub(crate) async fn create(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r"
            INSERT INTO messages (conversation_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, conversation_id, sender_id, content, created_at, read_at, expires_at
            ",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(conn)
        .await?;

        Ok(record.into())
    }

    /// Fetches the `limit` most recent live messages of a conversation in chronological order.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_conversation(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r"
            SELECT id, conversation_id, sender_id, content, created_at, read_at, expires_at
            FROM (
                SELECT id, conversation_id, sender_id, content, created_at, read_at, expires_at
                FROM messages
                WHERE conversation_id = $1
                  AND (expires_at IS NULL OR expires_at > NOW())
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            ) recent
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Marks every unread message that `reader_id` received in the conversation as read.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn mark_read(&self, conn: &mut PgConnection, conversation_id: Uuid, reader_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE messages
            SET read_at = NOW()
            WHERE conversation_id = $1
              AND sender_id <> $2
              AND read_at IS NULL
            ",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Persists an ephemeral deadline on messages received by `recipient_id`.
    ///
    /// The first stamp wins: messages that already carry a deadline keep it, and
    /// their existing deadline is returned.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn), fields(batch_count = message_ids.len()))]
    pub(crate) async fn stamp_expiry(
        &self,
        conn: &mut PgConnection,
        recipient_id: Uuid,
        message_ids: &[Uuid],
        expires_at: OffsetDateTime,
    ) -> Result<Vec<ExpiryStamp>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<_, ExpiryStampRecord>(
            r"
            UPDATE messages m
            SET expires_at = COALESCE(m.expires_at, $3),
                read_at = COALESCE(m.read_at, NOW())
            FROM conversations c
            WHERE m.id = ANY($1)
              AND c.id = m.conversation_id
              AND (c.participant_low = $2 OR c.participant_high = $2)
              AND m.sender_id <> $2
            RETURNING m.id, m.expires_at
            ",
        )
        .bind(message_ids)
        .bind(recipient_id)
        .bind(expires_at)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Deletes a batch of messages. Unknown ids are ignored.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn), fields(batch_count = message_ids.len()))]
    pub(crate) async fn delete_batch(&self, conn: &mut PgConnection, message_ids: &[Uuid]) -> Result<u64> {
        if message_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM messages WHERE id = ANY($1)").bind(message_ids).execute(conn).await?;
        Ok(result.rows_affected())
    }

    /// Deletes every message whose ephemeral deadline has passed.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn delete_expired(&self, conn: &mut PgConnection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE expires_at < NOW()").execute(conn).await?;
        Ok(result.rows_affected())
    }
}
