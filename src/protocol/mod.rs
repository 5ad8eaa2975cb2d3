//! Protocol types shared by every WagerBot component
//!
//! This module defines the vocabulary the core speaks with its host:
//! - identifier newtypes for participants, chats, sessions and messages
//! - inbound [`Action`] events (typed text, button presses, attachments, dice)
//! - inline keyboards and the callback payload codec ([`callback`])
//! - board coordinates in the compact `B7` notation

pub mod callback;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use callback::Callback;

/// Platform identifier of a person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub i64);

impl ParticipantId {
    /// The private chat between the bot and this participant
    pub fn private_chat(self) -> ChatId {
        ChatId(self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .trim_start_matches('@')
            .parse::<i64>()
            .map(ParticipantId)
            .map_err(|_| Error::InvalidInput(format!("Could not find user {}.", s)))
    }
}

/// Platform identifier of a chat; groups and private chats share the space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque game session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message the bot sent, addressable for edits and deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat: ChatId,
    pub message_id: i64,
}

/// Kinds of media that can be staked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Voice,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Voice => "voice note",
        };
        f.write_str(name)
    }
}

/// Kind of an inbound attachment; anything unknown maps to `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Photo,
    Video,
    Voice,
    #[serde(other)]
    Other,
}

/// An uploaded file, referenced by the platform's opaque handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub reference: String,
}

impl Attachment {
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self.kind {
            AttachmentKind::Photo => Some(MediaKind::Photo),
            AttachmentKind::Video => Some(MediaKind::Video),
            AttachmentKind::Voice => Some(MediaKind::Voice),
            AttachmentKind::Other => None,
        }
    }
}

/// Inbound event delivered by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub chat: ChatId,
    pub from: ParticipantId,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    /// Private chats share their id with the participant
    pub fn is_private(&self) -> bool {
        self.chat.0 == self.from.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// `/name arg1 arg2`, optionally sent as a reply to someone's message
    Command {
        name: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        reply_to: Option<ParticipantId>,
    },
    Text {
        text: String,
    },
    Button {
        payload: String,
        message: MessageRef,
    },
    Attachment {
        attachment: Attachment,
    },
    /// Platform dice throw (the 🎲 animation) with its face value
    Dice {
        value: u8,
    },
}

/// One inline button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback: &Callback) -> Self {
        Self {
            label: label.into(),
            payload: callback.encode(),
        }
    }
}

/// Rows of inline buttons attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyboard(pub Vec<Vec<Button>>);

impl Keyboard {
    pub fn none() -> Self {
        Self::default()
    }

    /// One button per row
    pub fn column(buttons: Vec<Button>) -> Self {
        Self(buttons.into_iter().map(|b| vec![b]).collect())
    }

    pub fn row(buttons: Vec<Button>) -> Self {
        Self(vec![buttons])
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|row| row.is_empty())
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.0.iter().flatten()
    }
}

/// Cell on a 10x10 board; `row` and `col` are zero based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    pub const BOARD_SIZE: u8 = 10;

    pub fn new(row: u8, col: u8) -> Option<Self> {
        (row < Self::BOARD_SIZE && col < Self::BOARD_SIZE).then_some(Self { row, col })
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.col) as char, self.row + 1)
    }
}

impl FromStr for Coord {
    type Err = Error;

    /// Parse `A1`..`J10`, case-insensitive
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || Error::InvalidCoordinate(trimmed.to_string());

        let mut chars = trimmed.chars();
        let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        let digits = chars.as_str();
        if !('A'..='J').contains(&letter)
            || digits.is_empty()
            || digits.len() > 2
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let row: u8 = digits.parse().map_err(|_| invalid())?;
        if !(1..=10).contains(&row) {
            return Err(invalid());
        }
        Ok(Coord {
            row: row - 1,
            col: letter as u8 - b'A',
        })
    }
}
