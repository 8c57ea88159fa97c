use crate::adapters::database::DbPool;
use crate::adapters::database::user_repo::UserRepository;
use crate::domain::user::{User, WalletAddress, validate_pseudonym};
use crate::error::{AppError, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};
use sqlx::PgConnection;

#[derive(Clone, Debug)]
struct Metrics {
    registrations_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("circle-server");
        Self {
            registrations_total: meter
                .u64_counter("circle_user_registrations_total")
                .with_description("User registration attempts")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserService {
    pool: DbPool,
    repo: UserRepository,
    metrics: Metrics,
}

impl UserService {
    #[must_use]
    pub fn new(pool: DbPool, repo: UserRepository) -> Self {
        Self { pool, repo, metrics: Metrics::new() }
    }

    /// Registers a wallet under a pseudonym.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the wallet address or pseudonym is malformed.
    /// Returns `AppError::Conflict` if either is already registered.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn register(&self, wallet_address: &str, pseudonym: &str) -> Result<User> {
        let wallet = WalletAddress::parse(wallet_address).map_err(AppError::BadRequest)?;
        let pseudonym = pseudonym.trim();
        validate_pseudonym(pseudonym).map_err(AppError::BadRequest)?;

        let mut conn = self.pool.acquire().await?;
        match self.repo.create(&mut conn, &wallet, pseudonym).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User registered");
                self.metrics.registrations_total.add(1, &[KeyValue::new("status", "success")]);
                Ok(user)
            }
            Err(e) => {
                self.metrics.registrations_total.add(1, &[KeyValue::new("status", "failure")]);
                Err(e)
            }
        }
    }

    /// # Errors
    /// Returns `AppError::NotFound` if no user has this pseudonym.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub async fn find_by_pseudonym(&self, pseudonym: &str) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        require_by_pseudonym(&self.repo, &mut conn, pseudonym).await
    }

    /// # Errors
    /// Returns `AppError::BadRequest` if the wallet address is malformed.
    /// Returns `AppError::NotFound` if the wallet is not registered.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub async fn find_by_wallet(&self, wallet_address: &str) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        require_by_wallet(&self.repo, &mut conn, wallet_address).await
    }
}

/// Resolves a raw wallet address to a registered user.
pub(crate) async fn require_by_wallet(
    repo: &UserRepository,
    conn: &mut PgConnection,
    wallet_address: &str,
) -> Result<User> {
    let wallet = WalletAddress::parse(wallet_address).map_err(AppError::BadRequest)?;
    repo.find_by_wallet(conn, &wallet).await?.ok_or_else(AppError::user_not_found)
}

/// Resolves a pseudonym to a registered user.
pub(crate) async fn require_by_pseudonym(
    repo: &UserRepository,
    conn: &mut PgConnection,
    pseudonym: &str,
) -> Result<User> {
    repo.find_by_pseudonym(conn, pseudonym.trim()).await?.ok_or_else(AppError::user_not_found)
}
