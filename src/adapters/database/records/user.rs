use crate::domain::user::User;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) wallet_address: String,
    pub(crate) pseudonym: String,
    pub(crate) created_at: OffsetDateTime,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            wallet_address: record.wallet_address,
            pseudonym: record.pseudonym,
            created_at: record.created_at,
        }
    }
}
