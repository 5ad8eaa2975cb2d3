//! Per-session locking and per-participant conversation tracking

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::model::Role;
use crate::protocol::{ParticipantId, SessionId};

/// One async mutex per session; different sessions never contend
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session
    pub async fn lock(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(id.clone()).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drop mutexes nobody holds or waits on
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Where a participant is in the setup conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    GameChoice,
    RoundChoice,
    StakeTypeChoice,
    PointsSubmission,
    MediaSubmission,
    Confirmation,
}

/// What the bot expects next from a participant in their private chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    Setup {
        session_id: SessionId,
        role: Role,
        step: SetupStep,
    },
    Placement {
        session_id: SessionId,
        last_activity: Instant,
    },
}

impl Conversation {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Conversation::Setup { session_id, .. } | Conversation::Placement { session_id, .. } => {
                session_id
            }
        }
    }
}

/// Registry of open conversations, one per participant
#[derive(Default)]
pub struct ConversationRegistry {
    conversations: DashMap<ParticipantId, Conversation>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, participant: ParticipantId) -> Option<Conversation> {
        self.conversations.get(&participant).map(|c| c.clone())
    }

    /// Start or replace a participant's conversation
    pub fn begin(&self, participant: ParticipantId, conversation: Conversation) {
        self.conversations.insert(participant, conversation);
    }

    pub fn set_step(&self, participant: ParticipantId, session_id: &SessionId, role: Role, step: SetupStep) {
        self.begin(
            participant,
            Conversation::Setup {
                session_id: session_id.clone(),
                role,
                step,
            },
        );
    }

    pub fn end(&self, participant: ParticipantId) -> Option<Conversation> {
        self.conversations.remove(&participant).map(|(_, c)| c)
    }

    /// End every conversation tied to a session
    pub fn end_for_session(&self, session_id: &SessionId) -> Vec<ParticipantId> {
        let participants: Vec<ParticipantId> = self
            .conversations
            .iter()
            .filter(|entry| entry.value().session_id() == session_id)
            .map(|entry| *entry.key())
            .collect();
        for participant in &participants {
            self.conversations
                .remove_if(participant, |_, c| c.session_id() == session_id);
        }
        participants
    }

    /// Record placement activity
    pub fn touch(&self, participant: ParticipantId, now: Instant) {
        if let Some(mut entry) = self.conversations.get_mut(&participant) {
            if let Conversation::Placement { last_activity, .. } = entry.value_mut() {
                *last_activity = now;
            }
        }
    }

    /// Placement conversations idle for longer than `timeout`, longest idle first
    pub fn expired_placements(&self, now: Instant, timeout: Duration) -> Vec<(ParticipantId, SessionId)> {
        let mut expired: Vec<(Instant, ParticipantId, SessionId)> = self
            .conversations
            .iter()
            .filter_map(|entry| match entry.value() {
                Conversation::Placement {
                    session_id,
                    last_activity,
                } if now.saturating_duration_since(*last_activity) > timeout => {
                    Some((*last_activity, *entry.key(), session_id.clone()))
                }
                _ => None,
            })
            .collect();
        expired.sort_by_key(|(last_activity, participant, _)| (*last_activity, *participant));
        expired
            .into_iter()
            .map(|(_, participant, session_id)| (participant, session_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
