//! Durable session storage
//!
//! [`SessionStore`] is the only way the core reads or writes game sessions.
//! Besides the records it owns one append-only log per session of the
//! messages the bot sent for it, so they can be cleaned up exactly once.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::model::GameSession;
use crate::error::{Error, Result};
use crate::persistence::{read_json, write_json_atomic};
use crate::protocol::{ChatId, MessageRef, ParticipantId, SessionId};

/// Storage contract for game sessions; last writer wins
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session, failing if the id is taken
    async fn create(&self, session: GameSession) -> Result<()>;

    async fn get(&self, id: &SessionId) -> Result<Option<GameSession>>;

    /// Full overwrite; refreshes `updated_at`
    async fn save(&self, session: &mut GameSession) -> Result<()>;

    /// Remove a session and whatever is left of its message log
    async fn delete(&self, id: &SessionId) -> Result<bool>;

    /// Active sessions in `room` involving `participant`, oldest first
    async fn list_active_for(
        &self,
        room: ChatId,
        participant: ParticipantId,
    ) -> Result<Vec<GameSession>>;

    async fn list(&self) -> Result<Vec<GameSession>>;

    /// Remove every complete session, returning how many went
    async fn purge_complete(&self) -> Result<usize>;

    async fn track_message(&self, id: &SessionId, message: MessageRef) -> Result<()>;

    /// Take the message log; a second drain returns nothing
    async fn drain_messages(&self, id: &SessionId) -> Result<Vec<MessageRef>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    sessions: BTreeMap<SessionId, GameSession>,
    #[serde(default)]
    messages: BTreeMap<SessionId, Vec<MessageRef>>,
}

/// JSON file backed store with an in-memory cache
pub struct FileSessionStore {
    path: Option<PathBuf>,
    document: RwLock<StoreDocument>,
}

impl FileSessionStore {
    /// Open (or start) the store at `path`
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let document: StoreDocument = read_json(&path).await?.unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            sessions = document.sessions.len(),
            "Opened session store"
        );
        Ok(Self {
            path: Some(path),
            document: RwLock::new(document),
        })
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: RwLock::new(StoreDocument::default()),
        }
    }

    async fn persist(&self, document: &StoreDocument) -> Result<()> {
        if let Some(path) = &self.path {
            write_json_atomic(path, document).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self, session: GameSession) -> Result<()> {
        let mut document = self.document.write().await;
        if document.sessions.contains_key(&session.id) {
            return Err(Error::DuplicateSession(session.id));
        }
        tracing::debug!(session = %session.id, room = %session.room_id, "Creating session");
        document.sessions.insert(session.id.clone(), session);
        self.persist(&document).await
    }

    async fn get(&self, id: &SessionId) -> Result<Option<GameSession>> {
        Ok(self.document.read().await.sessions.get(id).cloned())
    }

    async fn save(&self, session: &mut GameSession) -> Result<()> {
        session.updated_at = Utc::now();
        let mut document = self.document.write().await;
        document.sessions.insert(session.id.clone(), session.clone());
        tracing::trace!(session = %session.id, status = %session.status, "Saved session");
        self.persist(&document).await
    }

    async fn delete(&self, id: &SessionId) -> Result<bool> {
        let mut document = self.document.write().await;
        let removed = document.sessions.remove(id).is_some();
        document.messages.remove(id);
        if removed {
            tracing::debug!(session = %id, "Deleted session");
            self.persist(&document).await?;
        }
        Ok(removed)
    }

    async fn list_active_for(
        &self,
        room: ChatId,
        participant: ParticipantId,
    ) -> Result<Vec<GameSession>> {
        let document = self.document.read().await;
        let mut sessions: Vec<GameSession> = document
            .sessions
            .values()
            .filter(|s| s.status.is_active() && s.room_id == room)
            .filter(|s| s.role_of(participant).is_some())
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn list(&self) -> Result<Vec<GameSession>> {
        let document = self.document.read().await;
        let mut sessions: Vec<GameSession> = document.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn purge_complete(&self) -> Result<usize> {
        let mut document = self.document.write().await;
        let before = document.sessions.len();
        document.sessions.retain(|_, s| !s.status.is_terminal());
        let StoreDocument { sessions, messages } = &mut *document;
        messages.retain(|id, _| sessions.contains_key(id));

        let removed = before - document.sessions.len();
        if removed > 0 {
            tracing::info!(removed, "Purged complete sessions");
            self.persist(&document).await?;
        }
        Ok(removed)
    }

    async fn track_message(&self, id: &SessionId, message: MessageRef) -> Result<()> {
        let mut document = self.document.write().await;
        document.messages.entry(id.clone()).or_default().push(message);
        self.persist(&document).await
    }

    async fn drain_messages(&self, id: &SessionId) -> Result<Vec<MessageRef>> {
        let mut document = self.document.write().await;
        let drained = document.messages.remove(id).unwrap_or_default();
        if !drained.is_empty() {
            self.persist(&document).await?;
        }
        Ok(drained)
    }
}
