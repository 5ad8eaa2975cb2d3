//! File-backed points ledger with punishment thresholds and strikes
//!
//! Balances, strike counters and triggered punishments are stored together
//! in one JSON document. After every balance change:
//! - a non-negative balance clears the strike counter
//! - falling below a room's punishment threshold announces it once
//! - a negative balance earns a strike; strikes below the limit mute the
//!   member and reset them to zero, the final strike alerts the admins

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::PointsLedger;
use crate::config::{ModerationConfig, PunishmentRule};
use crate::directory::Directory;
use crate::error::Result;
use crate::persistence::{read_json, write_json_atomic};
use crate::protocol::{ChatId, Keyboard, ParticipantId};
use crate::transport::Transport;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerBook {
    #[serde(default)]
    balances: BTreeMap<ChatId, BTreeMap<ParticipantId, i64>>,
    #[serde(default)]
    strikes: BTreeMap<ChatId, BTreeMap<ParticipantId, u32>>,
    /// Punishment messages already announced, per member
    #[serde(default)]
    triggered: BTreeMap<ChatId, BTreeMap<ParticipantId, BTreeSet<String>>>,
}

/// Notices decided under the lock and delivered after it is released
#[derive(Debug, Clone, PartialEq, Eq)]
enum Consequence {
    Punished(PunishmentRule),
    Muted { strike: u32 },
    FinalStrike,
}

pub struct FilePointsLedger {
    path: Option<PathBuf>,
    book: RwLock<LedgerBook>,
    moderation: ModerationConfig,
    transport: Arc<dyn Transport>,
    directory: Arc<dyn Directory>,
}

impl FilePointsLedger {
    pub async fn open<P: AsRef<Path>>(
        path: P,
        moderation: ModerationConfig,
        transport: Arc<dyn Transport>,
        directory: Arc<dyn Directory>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let book: LedgerBook = read_json(&path).await?.unwrap_or_default();
        tracing::info!(path = %path.display(), rooms = book.balances.len(), "Opened points ledger");
        Ok(Self {
            path: Some(path),
            book: RwLock::new(book),
            moderation,
            transport,
            directory,
        })
    }

    pub fn in_memory(
        moderation: ModerationConfig,
        transport: Arc<dyn Transport>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            path: None,
            book: RwLock::new(LedgerBook::default()),
            moderation,
            transport,
            directory,
        }
    }

    pub async fn strikes(&self, room: ChatId, participant: ParticipantId) -> u32 {
        let book = self.book.read().await;
        book.strikes
            .get(&room)
            .and_then(|m| m.get(&participant))
            .copied()
            .unwrap_or(0)
    }

    /// Apply the delta and decide the consequences; caller holds the lock
    fn apply(
        &self,
        book: &mut LedgerBook,
        room: ChatId,
        participant: ParticipantId,
        delta: i64,
    ) -> (i64, Vec<Consequence>) {
        let mut consequences = Vec::new();
        let balance = book.balances.entry(room).or_default().entry(participant).or_insert(0);
        *balance += delta;
        let points = *balance;

        let strikes = book.strikes.entry(room).or_default().entry(participant).or_insert(0);
        if points >= 0 {
            *strikes = 0;
        }

        let triggered = book.triggered.entry(room).or_default().entry(participant).or_default();
        for rule in self.moderation.punishments_for(room) {
            if points < rule.threshold {
                if triggered.insert(rule.message.clone()) {
                    consequences.push(Consequence::Punished(rule.clone()));
                }
            } else {
                triggered.remove(&rule.message);
            }
        }

        let mut final_balance = points;
        if points < 0 {
            *strikes += 1;
            if *strikes < self.moderation.strike_limit {
                consequences.push(Consequence::Muted { strike: *strikes });
                final_balance = 0;
                if let Some(balance) = book.balances.get_mut(&room).and_then(|m| m.get_mut(&participant)) {
                    *balance = 0;
                }
            } else {
                *strikes = 0;
                consequences.push(Consequence::FinalStrike);
            }
        }

        (final_balance, consequences)
    }

    async fn deliver(&self, room: ChatId, participant: ParticipantId, consequence: Consequence) {
        let name = self.directory.display_name(room, participant).await;
        match consequence {
            Consequence::Punished(rule) => {
                let announcement = format!(
                    "🚨 Punishment Issued! 🚨\n{} has fallen below {} points. Punishment: {}",
                    name, rule.threshold, rule.message
                );
                self.announce(room, &announcement).await;
                let notice = format!(
                    "User {} (ID: {}) in room {} triggered punishment '{}' by falling below {} points.",
                    name, participant, room, rule.message, rule.threshold
                );
                self.notify_admins(&notice).await;
            }
            Consequence::Muted { strike } => {
                let until = Utc::now()
                    + chrono::Duration::from_std(self.moderation.mute_duration)
                        .unwrap_or_else(|_| chrono::Duration::hours(24));
                if let Err(e) = self.transport.restrict(room, participant, until).await {
                    tracing::warn!(%room, %participant, error = %e, "Failed to mute member");
                }
                let hours = self.moderation.mute_duration.as_secs() / 3600;
                let announcement = format!(
                    "{} has dropped into negative points (Strike {}/{}). They have been muted for {} hours and their points reset to 0.",
                    name, strike, self.moderation.strike_limit, hours
                );
                self.announce(room, &announcement).await;
            }
            Consequence::FinalStrike => {
                let announcement = format!(
                    "🚨 Final Strike! 🚨\n{} has reached negative points {} times. A special punishment from the admins is coming.",
                    name, self.moderation.strike_limit
                );
                self.announce(room, &announcement).await;
                let notice = format!(
                    "User {} (ID: {}) in room {} has reached negative points {} times and requires a special punishment. Their strike counter has been reset.",
                    name, participant, room, self.moderation.strike_limit
                );
                self.notify_admins(&notice).await;
            }
        }
    }

    async fn announce(&self, room: ChatId, text: &str) {
        if let Err(e) = self.transport.send_text(room, text, Keyboard::none()).await {
            tracing::warn!(%room, error = %e, "Failed to post moderation announcement");
        }
    }

    async fn notify_admins(&self, text: &str) {
        for admin in self.directory.admins() {
            if let Err(e) = self
                .transport
                .send_text(admin.private_chat(), text, Keyboard::none())
                .await
            {
                tracing::warn!(%admin, error = %e, "Failed to notify admin");
            }
        }
    }
}

#[async_trait]
impl PointsLedger for FilePointsLedger {
    async fn balance(&self, room: ChatId, participant: ParticipantId) -> Result<i64> {
        let book = self.book.read().await;
        Ok(book
            .balances
            .get(&room)
            .and_then(|m| m.get(&participant))
            .copied()
            .unwrap_or(0))
    }

    async fn add_points(&self, room: ChatId, participant: ParticipantId, delta: i64) -> Result<i64> {
        let (balance, consequences) = {
            let mut book = self.book.write().await;
            let outcome = self.apply(&mut book, room, participant, delta);
            if let Some(path) = &self.path {
                write_json_atomic(path, &*book).await?;
            }
            outcome
        };
        tracing::debug!(%room, %participant, delta, balance, "Applied points delta");

        for consequence in consequences {
            self.deliver(room, participant, consequence).await;
        }
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::transport::ConsoleTransport;
    use tempfile::TempDir;

    const ROOM: ChatId = ChatId(-100);
    const ALICE: ParticipantId = ParticipantId(5);

    fn moderation() -> ModerationConfig {
        ModerationConfig {
            owner: Some(1),
            punishments: vec![PunishmentRule {
                room: ROOM.0,
                threshold: 10,
                message: "Buy everyone a round".to_string(),
            }],
            ..ModerationConfig::default()
        }
    }

    fn ledger() -> FilePointsLedger {
        let moderation = moderation();
        let directory = Arc::new(StaticDirectory::new(&moderation));
        let transport = Arc::new(ConsoleTransport::new(Box::new(std::io::sink())));
        FilePointsLedger::in_memory(moderation, transport, directory)
    }

    #[tokio::test]
    async fn test_punishment_triggers_once_and_rearms() {
        let ledger = ledger();
        let mut book = ledger.book.write().await;

        let (_, c) = ledger.apply(&mut book, ROOM, ALICE, 20);
        assert!(c.is_empty());
        let (_, c) = ledger.apply(&mut book, ROOM, ALICE, -15);
        assert!(matches!(c.as_slice(), [Consequence::Punished(_)]));
        let (_, c) = ledger.apply(&mut book, ROOM, ALICE, -1);
        assert!(c.is_empty());
        // Climbing back clears the mark, falling again re-announces
        ledger.apply(&mut book, ROOM, ALICE, 10);
        let (_, c) = ledger.apply(&mut book, ROOM, ALICE, -10);
        assert!(matches!(c.as_slice(), [Consequence::Punished(_)]));
    }

    #[tokio::test]
    async fn test_strikes_mute_then_final_strike() {
        let ledger = ledger();
        ledger.add_points(ROOM, ALICE, 50).await.unwrap();

        // First strike: muted and reset to zero
        assert_eq!(ledger.add_points(ROOM, ALICE, -60).await.unwrap(), 0);
        assert_eq!(ledger.strikes(ROOM, ALICE).await, 1);
        assert_eq!(ledger.balance(ROOM, ALICE).await.unwrap(), 0);

        // Second strike
        assert_eq!(ledger.add_points(ROOM, ALICE, -5).await.unwrap(), 0);
        assert_eq!(ledger.strikes(ROOM, ALICE).await, 2);

        // Third strike: balance stays negative, counter resets
        assert_eq!(ledger.add_points(ROOM, ALICE, -5).await.unwrap(), -5);
        assert_eq!(ledger.strikes(ROOM, ALICE).await, 0);
        assert_eq!(ledger.balance(ROOM, ALICE).await.unwrap(), -5);
    }

    #[tokio::test]
    async fn test_non_negative_balance_clears_strikes() {
        let ledger = ledger();
        ledger.add_points(ROOM, ALICE, -1).await.unwrap();
        assert_eq!(ledger.strikes(ROOM, ALICE).await, 1);
        ledger.add_points(ROOM, ALICE, 3).await.unwrap();
        assert_eq!(ledger.strikes(ROOM, ALICE).await, 0);
    }

    #[tokio::test]
    async fn test_balances_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        let moderation = moderation();
        let directory: Arc<dyn Directory> = Arc::new(StaticDirectory::new(&moderation));
        let transport: Arc<dyn Transport> = Arc::new(ConsoleTransport::new(Box::new(std::io::sink())));

        {
            let ledger = FilePointsLedger::open(&path, moderation.clone(), transport.clone(), directory.clone())
                .await
                .unwrap();
            ledger.add_points(ROOM, ALICE, 42).await.unwrap();
        }

        let ledger = FilePointsLedger::open(&path, moderation, transport, directory)
            .await
            .unwrap();
        assert_eq!(ledger.balance(ROOM, ALICE).await.unwrap(), 42);
        assert_eq!(ledger.balance(ChatId(-1), ALICE).await.unwrap(), 0);
    }
}
