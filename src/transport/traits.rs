//! Transport trait definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::protocol::{ChatId, Keyboard, MediaKind, MessageRef, ParticipantId};

/// Outbound side of the messaging platform
///
/// Private messages are sent to `participant.private_chat()`; platforms
/// report an undeliverable private message (the user never opened a chat
/// with the bot) as an `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message with optional inline buttons
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Keyboard) -> Result<MessageRef>;

    /// Replace the text and buttons of a message the bot sent
    async fn edit_text(&self, message: MessageRef, text: &str, keyboard: Keyboard) -> Result<()>;

    async fn send_media(
        &self,
        chat: ChatId,
        kind: MediaKind,
        reference: &str,
        caption: &str,
    ) -> Result<MessageRef>;

    async fn delete_message(&self, message: MessageRef) -> Result<()>;

    /// Transient alert shown only to one participant
    async fn notify(&self, participant: ParticipantId, text: &str) -> Result<()>;

    /// Stop a participant from posting in `chat` until `until`
    async fn restrict(&self, chat: ChatId, participant: ParticipantId, until: DateTime<Utc>) -> Result<()>;
}
