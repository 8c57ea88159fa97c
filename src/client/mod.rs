//! Client side of ephemeral messaging: an HTTP client for the messaging API,
//! the per-conversation expiry scheduler and the polling refresh loop.

pub mod api;
pub mod ephemeral;
pub mod poller;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpMessagingClient, MessagingApi};
pub use ephemeral::{EphemeralSession, EphemeralState};
pub use poller::{ConversationPoller, ViewSnapshot};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("No conversation is open")]
    NoActiveConversation,
}

impl ClientError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
