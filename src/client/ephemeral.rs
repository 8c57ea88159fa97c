use crate::api::schemas::messaging::MessageResponse;
use crate::client::MessagingApi;
use crate::domain::ttl::EphemeralTtl;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Local ephemeral bookkeeping for one displayed incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EphemeralState {
    pub read: bool,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<MessageResponse>,
    scheduled: HashMap<Uuid, EphemeralState>,
}

/// Expiry scheduler for the conversation currently on screen.
///
/// A session is created when a conversation is opened and dropped when it is
/// closed. Every incoming message it sees is marked read and gets exactly one
/// deletion timer for the lifetime of the session. Deadlines are persisted on
/// the server, so a message seen again in a later session resumes its
/// remaining countdown instead of starting a fresh one. Dropping the session
/// aborts its outstanding timers.
#[derive(Debug)]
pub struct EphemeralSession {
    api: Arc<dyn MessagingApi>,
    viewer_wallet: String,
    other_pseudonym: String,
    ttl: EphemeralTtl,
    state: Arc<Mutex<SessionState>>,
    tasks: JoinSet<()>,
}

impl EphemeralSession {
    #[must_use]
    pub fn new(
        api: Arc<dyn MessagingApi>,
        viewer_wallet: impl Into<String>,
        other_pseudonym: impl Into<String>,
        ttl: EphemeralTtl,
    ) -> Self {
        Self {
            api,
            viewer_wallet: viewer_wallet.into(),
            other_pseudonym: other_pseudonym.into(),
            ttl,
            state: Arc::new(Mutex::new(SessionState::default())),
            tasks: JoinSet::new(),
        }
    }

    #[must_use]
    pub fn other_pseudonym(&self) -> &str {
        &self.other_pseudonym
    }

    /// Replaces the session's message list with a freshly fetched one and
    /// schedules deletion of every incoming message not seen before.
    #[tracing::instrument(skip(self, messages), fields(other = %self.other_pseudonym, count = messages.len()))]
    pub async fn apply_snapshot(&mut self, messages: Vec<MessageResponse>) {
        let ttl = self.ttl.duration();
        let now = Instant::now();
        let wall_now = OffsetDateTime::now_utc();

        let mut armed = Vec::new();
        let mut to_stamp = Vec::new();
        {
            let mut state = self.state.lock().await;
            state.messages = messages;

            let candidates: Vec<(Uuid, Option<OffsetDateTime>)> =
                state.messages.iter().filter(|m| !m.is_own).map(|m| (m.id, m.expires_at)).collect();

            for (id, persisted) in candidates {
                if state.scheduled.contains_key(&id) {
                    continue;
                }
                let (expires_at, delay) = match persisted {
                    Some(expires_at) => (expires_at, remaining(expires_at, wall_now)),
                    None => {
                        to_stamp.push(id);
                        (wall_now + ttl, ttl)
                    }
                };
                state.scheduled.insert(id, EphemeralState { read: true, expires_at });
                armed.push((id, now + delay));
            }
        }

        self.reap_finished();

        for (id, deadline) in armed {
            self.arm(id, deadline);
        }

        if !to_stamp.is_empty() {
            self.persist_deadlines(&to_stamp).await;
        }
    }

    /// Messages currently visible in this conversation.
    pub async fn messages(&self) -> Vec<MessageResponse> {
        self.state.lock().await.messages.clone()
    }

    pub async fn contains(&self, message_id: Uuid) -> bool {
        self.state.lock().await.messages.iter().any(|m| m.id == message_id)
    }

    pub async fn ephemeral_state(&self, message_id: Uuid) -> Option<EphemeralState> {
        self.state.lock().await.scheduled.get(&message_id).copied()
    }

    /// Number of messages this session has armed a timer for.
    pub async fn scheduled_count(&self) -> usize {
        self.state.lock().await.scheduled.len()
    }

    fn arm(&mut self, message_id: Uuid, deadline: Instant) {
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);

        self.tasks.spawn(
            async move {
                tokio::time::sleep_until(deadline).await;
                match api.delete_messages(&[message_id]).await {
                    Ok(_) => {
                        state.lock().await.messages.retain(|m| m.id != message_id);
                        tracing::debug!("Ephemeral message deleted");
                    }
                    // No retry: the row stays in the store and may show up again on the next poll.
                    Err(e) => tracing::warn!(error = %e, "Ephemeral deletion failed"),
                }
            }
            .instrument(tracing::debug_span!("ephemeral_expiry", message_id = %message_id)),
        );
    }

    /// Stores the new deadlines on the server before the snapshot is considered applied,
    /// so a session dropped right after displaying a message cannot lose them.
    async fn persist_deadlines(&self, message_ids: &[Uuid]) {
        match self.api.stamp_expiry(&self.viewer_wallet, message_ids, self.ttl.as_millis()).await {
            Ok(stamps) => tracing::debug!(stamped = stamps.len(), "Persisted ephemeral deadlines"),
            Err(e) => tracing::warn!(error = %e, "Failed to persist ephemeral deadlines"),
        }
    }

    fn reap_finished(&mut self) {
        while self.tasks.try_join_next().is_some() {}
    }
}

fn remaining(expires_at: OffsetDateTime, now: OffsetDateTime) -> Duration {
    Duration::try_from(expires_at - now).unwrap_or(Duration::ZERO)
}
