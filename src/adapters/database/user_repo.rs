use crate::adapters::database::UNIQUE_VIOLATION;
use crate::adapters::database::records::UserRecord;
use crate::domain::user::{User, WalletAddress};
use crate::error::{AppError, Result};
use sqlx::PgConnection;

#[derive(Clone, Debug, Default)]
pub struct UserRepository {}

impl UserRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Inserts a new user.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the wallet address or pseudonym is already registered.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn create(
        &self,
        conn: &mut PgConnection,
        wallet_address: &WalletAddress,
        pseudonym: &str,
    ) -> Result<User> {
        let result = sqlx::query_as::<_, UserRecord>(
            r"
            INSERT INTO users (wallet_address, pseudonym)
            VALUES ($1, $2)
            RETURNING id, wallet_address, pseudonym, created_at
            ",
        )
        .bind(wallet_address.as_str())
        .bind(pseudonym)
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                if e.constraint() == Some("users_wallet_address_key") {
                    Err(AppError::Conflict("Wallet address already registered".into()))
                } else {
                    Err(AppError::Conflict("Pseudonym already taken".into()))
                }
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_wallet(
        &self,
        conn: &mut PgConnection,
        wallet_address: &WalletAddress,
    ) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, wallet_address, pseudonym, created_at
            FROM users
            WHERE wallet_address = $1
            ",
        )
        .bind(wallet_address.as_str())
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Looks up a user by pseudonym, ignoring case.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_pseudonym(&self, conn: &mut PgConnection, pseudonym: &str) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, wallet_address, pseudonym, created_at
            FROM users
            WHERE LOWER(pseudonym) = LOWER($1)
            ",
        )
        .bind(pseudonym)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }
}
