use crate::adapters::database::records::ConversationSummaryRecord;
use crate::domain::conversation::{ConversationSummary, ParticipantPair};
use crate::error::Result;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct ConversationRepository {}

impl ConversationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Returns the id of the conversation for `pair`, creating it if needed.
    ///
    /// The no-op `DO UPDATE` makes the statement return the existing row on
    /// conflict, so concurrent callers for the same pair all get the same id.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the upsert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn lookup_or_create(&self, conn: &mut PgConnection, pair: ParticipantPair) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO conversations (participant_low, participant_high)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT conversations_participants_unique
            DO UPDATE SET participant_low = EXCLUDED.participant_low
            RETURNING id
            ",
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_pair(&self, conn: &mut PgConnection, pair: ParticipantPair) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            SELECT id FROM conversations
            WHERE participant_low = $1 AND participant_high = $2
            ",
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(conn)
        .await?;

        Ok(id)
    }

    /// Lists every conversation `user_id` takes part in, most recently active first.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_summaries(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>> {
        let records = sqlx::query_as::<_, ConversationSummaryRecord>(
            r"
            SELECT
                c.id AS conversation_id,
                u.pseudonym AS other_participant,
                lm.content AS last_message,
                lm.created_at AS last_message_time,
                unread.count AS unread_count
            FROM conversations c
            JOIN users u
              ON u.id = CASE WHEN c.participant_low = $1 THEN c.participant_high ELSE c.participant_low END
            LEFT JOIN LATERAL (
                SELECT m.content, m.created_at
                FROM messages m
                WHERE m.conversation_id = c.id
                  AND (m.expires_at IS NULL OR m.expires_at > NOW())
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT 1
            ) lm ON TRUE
            CROSS JOIN LATERAL (
                SELECT COUNT(*) AS count
                FROM messages m
                WHERE m.conversation_id = c.id
                  AND m.sender_id <> $1
                  AND m.read_at IS NULL
            ) unread
            WHERE c.participant_low = $1 OR c.participant_high = $1
            ORDER BY lm.created_at DESC NULLS LAST, c.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
