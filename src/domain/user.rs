use time::OffsetDateTime;
use uuid::Uuid;

pub const PSEUDONYM_MIN_LEN: usize = 3;
pub const PSEUDONYM_MAX_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub wallet_address: String,
    pub pseudonym: String,
    pub created_at: OffsetDateTime,
}

/// A wallet address in canonical form: `0x` followed by 40 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parses and lowercases a wallet address.
    ///
    /// # Errors
    /// Returns a description of the problem if the input is not a `0x`-prefixed 20-byte hex address.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) else {
            return Err("Wallet address must start with 0x".into());
        };
        if hex.len() != 40 {
            return Err("Wallet address must contain 40 hex digits".into());
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("Wallet address contains non-hex characters".into());
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates a user-chosen display handle.
///
/// # Errors
/// Returns a description of the problem if the pseudonym is too short, too long,
/// or contains characters outside `[A-Za-z0-9_]`.
pub fn validate_pseudonym(pseudonym: &str) -> Result<(), String> {
    let len = pseudonym.chars().count();
    if len < PSEUDONYM_MIN_LEN {
        return Err(format!("Pseudonym must be at least {PSEUDONYM_MIN_LEN} characters"));
    }
    if len > PSEUDONYM_MAX_LEN {
        return Err(format!("Pseudonym must be at most {PSEUDONYM_MAX_LEN} characters"));
    }
    if !pseudonym.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Pseudonym may only contain letters, digits and underscores".into());
    }
    Ok(())
}
