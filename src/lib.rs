//! WagerBot - wager games for moderated group chats
//!
//! Two members of a group agree on a game and a stake, play it out through
//! chat buttons and dice throws, and the loser's stake moves to the winner:
//! - protocol: inbound actions, button payloads and board coordinates
//! - session: the persistent game session record and its store
//! - gaming: play engines, the challenge flow and settlement
//! - token: the points ledger with punishments and strikes
//! - transport: the messaging seam the bot talks through
//! - directory: display names and admin status

pub mod config;
pub mod directory;
pub mod error;
pub mod gaming;
pub mod logging;
pub mod persistence;
pub mod protocol;
pub mod session;
pub mod token;
pub mod transport;

// Re-export commonly used types for easy access
pub use config::Config;
pub use directory::{Directory, StaticDirectory};
pub use error::{Error, ErrorClass, Result};
pub use gaming::{GameContext, GameOrchestrator, PayoutEngine, Settlement};
pub use protocol::{Action, ActionKind, ChatId, MessageRef, ParticipantId, SessionId};
pub use session::{FileSessionStore, GameSession, SessionStatus, SessionStore, Stake};
pub use token::{FilePointsLedger, PointsLedger};
pub use transport::{ConsoleTransport, Transport};
