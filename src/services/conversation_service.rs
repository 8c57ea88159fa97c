use crate::adapters::database::DbPool;
use crate::adapters::database::conversation_repo::ConversationRepository;
use crate::adapters::database::user_repo::UserRepository;
use crate::domain::conversation::{ConversationSummary, ParticipantPair};
use crate::error::{AppError, Result};
use crate::services::user_service::{require_by_pseudonym, require_by_wallet};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ConversationService {
    pool: DbPool,
    repo: ConversationRepository,
    user_repo: UserRepository,
}

impl ConversationService {
    #[must_use]
    pub const fn new(pool: DbPool, repo: ConversationRepository, user_repo: UserRepository) -> Self {
        Self { pool, repo, user_repo }
    }

    /// Returns the conversation id shared by two users, creating the conversation on first contact.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if both ids are the same user.
    /// Returns `AppError::Database` if the store cannot be reached.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn lookup_or_create(&self, a: Uuid, b: Uuid) -> Result<Uuid> {
        let mut conn = self.pool.acquire().await?;
        lookup_or_create(&self.repo, &mut conn, a, b).await
    }

    /// Resolves a wallet and a pseudonym, then looks up or creates their conversation.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if either user is unknown.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn lookup_or_create_by_handles(&self, wallet_address: &str, other_pseudonym: &str) -> Result<Uuid> {
        let mut conn = self.pool.acquire().await?;
        let me = require_by_wallet(&self.user_repo, &mut conn, wallet_address).await?;
        let other = require_by_pseudonym(&self.user_repo, &mut conn, other_pseudonym).await?;
        lookup_or_create(&self.repo, &mut conn, me.id, other.id).await
    }

    /// Lists the conversations of the user owning `wallet_address`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the wallet is not registered.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn list_for_wallet(&self, wallet_address: &str) -> Result<Vec<ConversationSummary>> {
        let mut conn = self.pool.acquire().await?;
        let me = require_by_wallet(&self.user_repo, &mut conn, wallet_address).await?;
        self.repo.list_summaries(&mut conn, me.id).await
    }
}

pub(crate) async fn lookup_or_create(
    repo: &ConversationRepository,
    conn: &mut PgConnection,
    a: Uuid,
    b: Uuid,
) -> Result<Uuid> {
    let pair = ParticipantPair::new(a, b).map_err(AppError::BadRequest)?;
    if let Some(id) = repo.find_by_pair(conn, pair).await? {
        return Ok(id);
    }
    let id = repo.lookup_or_create(conn, pair).await?;
    tracing::debug!(conversation_id = %id, "Conversation resolved");
    Ok(id)
}
