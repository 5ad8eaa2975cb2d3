//! JSON-lines transport for the console host
//!
//! Every outbound call is written as one JSON object per line, e.g.
//! `{"op":"send_text","chat":-100,"message_id":3,"text":"...","keyboard":[]}`.

use std::io::Write;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::traits::Transport;
use crate::error::{Error, Result};
use crate::protocol::{ChatId, Keyboard, MediaKind, MessageRef, ParticipantId};

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Outbound<'a> {
    SendText {
        chat: ChatId,
        message_id: i64,
        text: &'a str,
        keyboard: &'a Keyboard,
    },
    EditText {
        chat: ChatId,
        message_id: i64,
        text: &'a str,
        keyboard: &'a Keyboard,
    },
    SendMedia {
        chat: ChatId,
        message_id: i64,
        kind: MediaKind,
        reference: &'a str,
        caption: &'a str,
    },
    DeleteMessage {
        chat: ChatId,
        message_id: i64,
    },
    Notify {
        participant: ParticipantId,
        text: &'a str,
    },
    Restrict {
        chat: ChatId,
        participant: ParticipantId,
        until: DateTime<Utc>,
    },
}

pub struct ConsoleTransport {
    next_message_id: AtomicI64,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleTransport {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            next_message_id: AtomicI64::new(1),
            out: Mutex::new(out),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    fn emit(&self, event: &Outbound<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut out = self.out.lock();
        writeln!(out, "{}", line)
            .and_then(|_| out.flush())
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Keyboard) -> Result<MessageRef> {
        let message_id = self.allocate_id();
        self.emit(&Outbound::SendText {
            chat,
            message_id,
            text,
            keyboard: &keyboard,
        })?;
        Ok(MessageRef { chat, message_id })
    }

    async fn edit_text(&self, message: MessageRef, text: &str, keyboard: Keyboard) -> Result<()> {
        self.emit(&Outbound::EditText {
            chat: message.chat,
            message_id: message.message_id,
            text,
            keyboard: &keyboard,
        })
    }

    async fn send_media(
        &self,
        chat: ChatId,
        kind: MediaKind,
        reference: &str,
        caption: &str,
    ) -> Result<MessageRef> {
        let message_id = self.allocate_id();
        self.emit(&Outbound::SendMedia {
            chat,
            message_id,
            kind,
            reference,
            caption,
        })?;
        Ok(MessageRef { chat, message_id })
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        self.emit(&Outbound::DeleteMessage {
            chat: message.chat,
            message_id: message.message_id,
        })
    }

    async fn notify(&self, participant: ParticipantId, text: &str) -> Result<()> {
        self.emit(&Outbound::Notify { participant, text })
    }

    async fn restrict(&self, chat: ChatId, participant: ParticipantId, until: DateTime<Utc>) -> Result<()> {
        self.emit(&Outbound::Restrict {
            chat,
            participant,
            until,
        })
    }
}
