//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use wagerbot::config::{GameConfig, ModerationConfig};
use wagerbot::protocol::{
    Attachment, AttachmentKind, Callback, Keyboard, MediaKind,
};
use wagerbot::{
    Action, ActionKind, ChatId, Error, FileSessionStore, GameContext, GameOrchestrator,
    GameSession, MessageRef, ParticipantId, PointsLedger, Result, SessionStore,
    StaticDirectory, Transport,
};

pub const ROOM: ChatId = ChatId(-1001);
pub const ALICE: ParticipantId = ParticipantId(11);
pub const BOB: ParticipantId = ParticipantId(22);
pub const CAROL: ParticipantId = ParticipantId(33);
pub const ADMIN: ParticipantId = ParticipantId(99);

/// One outbound transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        message: MessageRef,
        text: String,
        keyboard: Keyboard,
    },
    Edit {
        message: MessageRef,
        text: String,
        keyboard: Keyboard,
    },
    Media {
        chat: ChatId,
        kind: MediaKind,
        reference: String,
        caption: String,
    },
    Delete {
        message: MessageRef,
    },
    Notice {
        participant: ParticipantId,
        text: String,
    },
    Restrict {
        chat: ChatId,
        participant: ParticipantId,
        until: DateTime<Utc>,
    },
}

/// Transport that records every call; chats can be made unreachable
#[derive(Default)]
pub struct RecordingTransport {
    next_id: AtomicI64,
    sent: Mutex<Vec<Sent>>,
    unreachable: Mutex<HashSet<ChatId>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send to this chat, like a member who never opened a DM
    pub fn block(&self, chat: ChatId) {
        self.unreachable.lock().insert(chat);
    }

    pub fn unblock(&self, chat: ChatId) {
        self.unreachable.lock().remove(&chat);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    /// Texts sent to a chat, in order
    pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { message, text, .. } if message.chat == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn any_text_to(&self, chat: ChatId, needle: &str) -> bool {
        self.texts_to(chat).iter().any(|t| t.contains(needle))
    }

    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Edit { message, text, .. } => Some((message, text)),
                _ => None,
            })
            .collect()
    }

    pub fn media(&self) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| matches!(s, Sent::Media { .. }))
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Delete { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn notices_for(&self, participant: ParticipantId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Notice { participant: p, text } if p == participant => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Newest message (sent or edited) in `chat` carrying a button labelled `label`
    pub fn find_button(&self, chat: ChatId, label: &str) -> Option<(MessageRef, Callback)> {
        self.sent().into_iter().rev().find_map(|s| {
            let (message, keyboard) = match s {
                Sent::Text {
                    message, keyboard, ..
                } => (message, keyboard),
                Sent::Edit {
                    message, keyboard, ..
                } => (message, keyboard),
                _ => return None,
            };
            if message.chat != chat {
                return None;
            }
            let found = keyboard
                .buttons()
                .find(|b| b.label == label)
                .and_then(|b| Callback::parse(&b.payload).ok())
                .map(|callback| (message, callback));
            found
        })
    }

    fn check(&self, chat: ChatId) -> Result<()> {
        if self.unreachable.lock().contains(&chat) {
            Err(Error::Transport(format!("Forbidden: cannot message chat {}", chat)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Keyboard) -> Result<MessageRef> {
        self.check(chat)?;
        let message = MessageRef {
            chat,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        self.sent.lock().push(Sent::Text {
            message,
            text: text.to_string(),
            keyboard,
        });
        Ok(message)
    }

    async fn edit_text(&self, message: MessageRef, text: &str, keyboard: Keyboard) -> Result<()> {
        self.check(message.chat)?;
        self.sent.lock().push(Sent::Edit {
            message,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn send_media(
        &self,
        chat: ChatId,
        kind: MediaKind,
        reference: &str,
        caption: &str,
    ) -> Result<MessageRef> {
        self.check(chat)?;
        self.sent.lock().push(Sent::Media {
            chat,
            kind,
            reference: reference.to_string(),
            caption: caption.to_string(),
        });
        Ok(MessageRef {
            chat,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        self.sent.lock().push(Sent::Delete { message });
        Ok(())
    }

    async fn notify(&self, participant: ParticipantId, text: &str) -> Result<()> {
        self.sent.lock().push(Sent::Notice {
            participant,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn restrict(
        &self,
        chat: ChatId,
        participant: ParticipantId,
        until: DateTime<Utc>,
    ) -> Result<()> {
        self.sent.lock().push(Sent::Restrict {
            chat,
            participant,
            until,
        });
        Ok(())
    }
}

/// Ledger keeping plain balances and a log of every delta
#[derive(Default)]
pub struct MemoryLedger {
    balances: Mutex<HashMap<(ChatId, ParticipantId), i64>>,
    deltas: Mutex<Vec<(ParticipantId, i64)>>,
}

impl MemoryLedger {
    pub fn set(&self, room: ChatId, participant: ParticipantId, balance: i64) {
        self.balances.lock().insert((room, participant), balance);
    }

    pub fn get(&self, room: ChatId, participant: ParticipantId) -> i64 {
        self.balances
            .lock()
            .get(&(room, participant))
            .copied()
            .unwrap_or(0)
    }

    pub fn deltas(&self) -> Vec<(ParticipantId, i64)> {
        self.deltas.lock().clone()
    }
}

#[async_trait]
impl PointsLedger for MemoryLedger {
    async fn balance(&self, room: ChatId, participant: ParticipantId) -> Result<i64> {
        Ok(self.get(room, participant))
    }

    async fn add_points(&self, room: ChatId, participant: ParticipantId, delta: i64) -> Result<i64> {
        self.deltas.lock().push((participant, delta));
        let mut balances = self.balances.lock();
        let balance = balances.entry((room, participant)).or_insert(0);
        *balance += delta;
        Ok(*balance)
    }
}

pub struct Harness {
    pub transport: Arc<RecordingTransport>,
    pub ledger: Arc<MemoryLedger>,
    pub store: Arc<FileSessionStore>,
    pub orchestrator: Arc<GameOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(GameConfig::default())
    }

    pub fn with_settings(settings: GameConfig) -> Self {
        let moderation = ModerationConfig {
            owner: Some(ADMIN.0),
            ..ModerationConfig::default()
        };
        let transport = Arc::new(RecordingTransport::new());
        let ledger = Arc::new(MemoryLedger::default());
        let store = Arc::new(FileSessionStore::in_memory());
        let ctx = Arc::new(GameContext::new(
            store.clone(),
            ledger.clone(),
            transport.clone(),
            Arc::new(StaticDirectory::new(&moderation)),
            settings,
        ));
        Self {
            transport,
            ledger,
            store,
            orchestrator: Arc::new(GameOrchestrator::new(ctx)),
        }
    }

    pub async fn send(&self, action: Action) {
        self.orchestrator
            .handle(action)
            .await
            .expect("action should not fail with an infrastructure error");
    }

    /// Press the newest button with this label in `chat`
    pub async fn press(&self, from: ParticipantId, chat: ChatId, label: &str) {
        let (message, callback) = self
            .transport
            .find_button(chat, label)
            .unwrap_or_else(|| panic!("no '{}' button in chat {}", label, chat));
        self.send(button(from, chat, &callback, message)).await;
    }

    pub async fn session(&self) -> GameSession {
        let mut sessions = self.store.list().await.unwrap();
        assert_eq!(sessions.len(), 1, "expected exactly one session");
        sessions.remove(0)
    }

    pub async fn session_count(&self) -> usize {
        self.store.list().await.unwrap().len()
    }

    /// `/newgame` from ALICE in reply to BOB
    pub async fn challenge(&self) {
        self.send(command(ROOM, ALICE, "newgame", &[], Some(BOB))).await;
    }

    /// Walk the challenger through setup up to the confirmation summary
    pub async fn challenger_points_setup(&self, game: &str, amount: u64) {
        self.challenge().await;
        self.press(ALICE, ALICE.private_chat(), "Start Game Setup").await;
        self.press(ALICE, ALICE.private_chat(), game).await;
        if game == "Dice" {
            self.press(ALICE, ALICE.private_chat(), "Best of 3").await;
        }
        self.press(ALICE, ALICE.private_chat(), "Points").await;
        self.send(text(ALICE, &amount.to_string())).await;
    }

    /// Full flow to an active game with both players staking points
    pub async fn start_points_game(&self, game: &str, amount: u64) {
        self.challenger_points_setup(game, amount).await;
        self.press(ALICE, ALICE.private_chat(), "✅ Confirm").await;
        self.press(BOB, ROOM, "Accept").await;
        self.press(BOB, BOB.private_chat(), "Set your stake").await;
        self.press(BOB, BOB.private_chat(), "Points").await;
        self.send(text(BOB, &amount.to_string())).await;
    }
}

pub fn command(
    chat: ChatId,
    from: ParticipantId,
    name: &str,
    args: &[&str],
    reply_to: Option<ParticipantId>,
) -> Action {
    Action {
        chat,
        from,
        from_name: None,
        kind: ActionKind::Command {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            reply_to,
        },
    }
}

/// Private text reply
pub fn text(from: ParticipantId, text: &str) -> Action {
    Action {
        chat: from.private_chat(),
        from,
        from_name: None,
        kind: ActionKind::Text {
            text: text.to_string(),
        },
    }
}

pub fn upload(from: ParticipantId, kind: AttachmentKind, reference: &str) -> Action {
    Action {
        chat: from.private_chat(),
        from,
        from_name: None,
        kind: ActionKind::Attachment {
            attachment: Attachment {
                kind,
                reference: reference.to_string(),
            },
        },
    }
}

pub fn dice(from: ParticipantId, value: u8) -> Action {
    Action {
        chat: ROOM,
        from,
        from_name: None,
        kind: ActionKind::Dice { value },
    }
}

pub fn button(from: ParticipantId, chat: ChatId, callback: &Callback, message: MessageRef) -> Action {
    Action {
        chat,
        from,
        from_name: None,
        kind: ActionKind::Button {
            payload: callback.encode(),
            message,
        },
    }
}
