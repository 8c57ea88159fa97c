use crate::api::schemas::conversations::ConversationSummaryResponse;
use crate::api::schemas::messaging::MessageResponse;
use crate::client::{ClientError, EphemeralSession, MessagingApi};
use crate::domain::ttl::EphemeralTtl;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What a messenger view renders after a refresh.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    pub conversations: Vec<ConversationSummaryResponse>,
    pub active: Option<String>,
    pub messages: Vec<MessageResponse>,
}

/// Fixed-interval refresh of the conversation list and the active conversation.
///
/// Each poll replaces view state wholesale and hands the active conversation's
/// messages to its [`EphemeralSession`], which schedules newly seen incoming
/// messages for deletion.
#[derive(Debug)]
pub struct ConversationPoller {
    api: Arc<dyn MessagingApi>,
    viewer_wallet: String,
    ttl: EphemeralTtl,
    poll_interval: Duration,
    conversations: Vec<ConversationSummaryResponse>,
    session: Option<EphemeralSession>,
}

impl ConversationPoller {
    #[must_use]
    pub fn new(
        api: Arc<dyn MessagingApi>,
        viewer_wallet: impl Into<String>,
        ttl: EphemeralTtl,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            viewer_wallet: viewer_wallet.into(),
            ttl,
            poll_interval,
            conversations: Vec::new(),
            session: None,
        }
    }

    /// Makes `other_pseudonym` the active conversation with a fresh session.
    /// The previous session, and its pending timers, are dropped.
    pub fn open_conversation(&mut self, other_pseudonym: impl Into<String>) {
        let other_pseudonym = other_pseudonym.into();
        tracing::debug!(other = %other_pseudonym, "Opening conversation");
        self.session =
            Some(EphemeralSession::new(Arc::clone(&self.api), self.viewer_wallet.clone(), other_pseudonym, self.ttl));
    }

    pub fn close_conversation(&mut self) {
        self.session = None;
    }

    #[must_use]
    pub fn active_conversation(&self) -> Option<&str> {
        self.session.as_ref().map(EphemeralSession::other_pseudonym)
    }

    #[must_use]
    pub const fn session(&self) -> Option<&EphemeralSession> {
        self.session.as_ref()
    }

    /// Sends a message to the active conversation and refreshes the view.
    ///
    /// # Errors
    /// Returns `ClientError::NoActiveConversation` if no conversation is open,
    /// or the underlying error if the send fails.
    pub async fn send(&mut self, content: &str) -> Result<MessageResponse, ClientError> {
        let Some(other) = self.active_conversation().map(ToString::to_string) else {
            return Err(ClientError::NoActiveConversation);
        };
        let sent = self.api.send_message(&self.viewer_wallet, &other, content).await?;
        self.refresh().await;
        Ok(sent)
    }

    /// Performs one poll. Fetch failures are logged and leave the previous state in place.
    #[tracing::instrument(skip(self), fields(active = self.active_conversation().unwrap_or("")))]
    pub async fn refresh(&mut self) {
        match self.api.list_conversations(&self.viewer_wallet).await {
            Ok(conversations) => self.conversations = conversations,
            Err(e) => tracing::warn!(error = %e, "Failed to refresh conversation list"),
        }

        if let Some(session) = self.session.as_mut() {
            match self.api.list_messages(&self.viewer_wallet, session.other_pseudonym()).await {
                Ok(messages) => session.apply_snapshot(messages).await,
                Err(e) => tracing::warn!(error = %e, "Failed to refresh active conversation"),
            }
        }
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        let (active, messages) = match &self.session {
            Some(session) => (Some(session.other_pseudonym().to_string()), session.messages().await),
            None => (None, Vec::new()),
        };
        ViewSnapshot { conversations: self.conversations.clone(), active, messages }
    }

    /// Polls until `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    self.refresh().instrument(tracing::debug_span!("poll_iteration")).await;
                    let snapshot = self.snapshot().await;
                    tracing::info!(
                        conversations = snapshot.conversations.len(),
                        active = snapshot.active.as_deref().unwrap_or(""),
                        messages = snapshot.messages.len(),
                        "View refreshed"
                    );
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Conversation poller shutting down...");
    }
}
