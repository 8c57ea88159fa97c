use clap::ValueEnum;
use std::time::Duration;

/// Longest ephemeral delay the server accepts for an expiry stamp.
pub const MAX_EPHEMERAL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How long an incoming message survives after it has been displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum EphemeralTtl {
    /// Deleted shortly after being read.
    #[value(name = "read")]
    AfterRead,
    #[value(name = "10s")]
    TenSeconds,
    #[default]
    #[value(name = "30s")]
    ThirtySeconds,
    #[value(name = "60s")]
    OneMinute,
    #[value(name = "300s")]
    FiveMinutes,
}

impl EphemeralTtl {
    #[must_use]
    pub const fn duration(self) -> Duration {
        match self {
            Self::AfterRead => Duration::from_millis(1500),
            Self::TenSeconds => Duration::from_secs(10),
            Self::ThirtySeconds => Duration::from_secs(30),
            Self::OneMinute => Duration::from_secs(60),
            Self::FiveMinutes => Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn as_millis(self) -> u64 {
        u64::try_from(self.duration().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Checks a client-provided expiry delay in milliseconds.
///
/// # Errors
/// Returns an error if the delay is zero or longer than [`MAX_EPHEMERAL_TTL`].
pub fn validate_ttl_ms(ttl_ms: u64) -> Result<Duration, String> {
    let ttl = Duration::from_millis(ttl_ms);
    if ttl.is_zero() {
        return Err("ttlMs must be positive".into());
    }
    if ttl > MAX_EPHEMERAL_TTL {
        return Err(format!("ttlMs must not exceed {}", MAX_EPHEMERAL_TTL.as_millis()));
    }
    Ok(ttl)
}
