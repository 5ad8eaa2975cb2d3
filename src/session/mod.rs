//! Game session management for WagerBot
//!
//! A [`GameSession`] is the single record every challenge lives in, from the
//! `/newgame` reply until settlement. This module provides:
//! - the record and its status machine
//! - the [`SessionStore`] contract with a JSON file implementation
//! - per-session locks and the per-participant conversation registry

pub mod lifecycle;
pub mod model;
pub mod state;
pub mod store;

pub use lifecycle::{Conversation, ConversationRegistry, SessionLocks, SetupStep};
pub use model::{GameKind, GameSession, PlayState, Role, Stake, StakeType};
pub use state::SessionStatus;
pub use store::{FileSessionStore, SessionStore};
