//! Shared handles used by every game handler

use std::sync::Arc;

use futures::future::join_all;

use crate::config::GameConfig;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::protocol::{ChatId, Keyboard, MessageRef, ParticipantId, SessionId};
use crate::session::{ConversationRegistry, GameSession, SessionLocks, SessionStore};
use crate::token::PointsLedger;
use crate::transport::Transport;

pub struct GameContext {
    pub store: Arc<dyn SessionStore>,
    pub ledger: Arc<dyn PointsLedger>,
    pub transport: Arc<dyn Transport>,
    pub directory: Arc<dyn Directory>,
    pub locks: SessionLocks,
    pub conversations: ConversationRegistry,
    pub settings: GameConfig,
}

impl GameContext {
    pub fn new(
        store: Arc<dyn SessionStore>,
        ledger: Arc<dyn PointsLedger>,
        transport: Arc<dyn Transport>,
        directory: Arc<dyn Directory>,
        settings: GameConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            transport,
            directory,
            locks: SessionLocks::new(),
            conversations: ConversationRegistry::new(),
            settings,
        }
    }

    /// Fetch a session or fail with `SessionNotFound`
    pub async fn load(&self, id: &SessionId) -> Result<GameSession> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.clone()))
    }

    pub async fn name(&self, room: ChatId, participant: ParticipantId) -> String {
        self.directory.display_name(room, participant).await
    }

    /// Send a message that is cleaned up with the session
    pub async fn post_tracked(
        &self,
        session_id: &SessionId,
        chat: ChatId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<MessageRef> {
        let message = self.transport.send_text(chat, text, keyboard).await?;
        self.store.track_message(session_id, message).await?;
        Ok(message)
    }

    /// Private message to a participant, tracked with the session
    pub async fn dm(
        &self,
        session_id: &SessionId,
        participant: ParticipantId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<MessageRef> {
        self.post_tracked(session_id, participant.private_chat(), text, keyboard)
            .await
    }

    /// Tracked private message whose failure never stops the caller
    pub async fn dm_or_warn(&self, session_id: &SessionId, participant: ParticipantId, text: &str) {
        if let Err(e) = self.dm(session_id, participant, text, Keyboard::none()).await {
            log::warn!(
                "Could not message {} for session {}: {}",
                participant,
                session_id,
                e
            );
        }
    }

    /// Best effort message; failures are logged and dropped
    pub async fn say(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.transport.send_text(chat, text, Keyboard::none()).await {
            log::warn!("Could not deliver message to chat {}: {}", chat, e);
        }
    }

    /// Best effort transient notice
    pub async fn notice(&self, participant: ParticipantId, text: &str) {
        if let Err(e) = self.transport.notify(participant, text).await {
            log::warn!("Could not notify {}: {}", participant, e);
        }
    }

    /// Drain the session's message log and delete every entry
    pub async fn purge_messages(&self, session_id: &SessionId) -> Result<usize> {
        let messages = self.store.drain_messages(session_id).await?;
        let count = messages.len();
        let results = join_all(messages.into_iter().map(|m| self.transport.delete_message(m))).await;
        for error in results.into_iter().filter_map(|r| r.err()) {
            log::warn!("Failed to delete message for session {}: {}", session_id, error);
        }
        Ok(count)
    }

    /// Remove a session that never reached settlement
    pub async fn discard(&self, session_id: &SessionId) -> Result<()> {
        self.purge_messages(session_id).await?;
        self.conversations.end_for_session(session_id);
        self.store.delete(session_id).await?;
        log::info!("Discarded session {}", session_id);
        Ok(())
    }
}
