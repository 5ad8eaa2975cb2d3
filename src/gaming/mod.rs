//! Gaming module for group-chat wager games
//!
//! ## Play engines
//! - Dice duels over a best-of-N series
//! - Connect Four on a 6×7 grid
//! - Battleship with private fleet placement and a two-step attack keyboard
//!
//! ## Coordination
//! - The orchestrator routes inbound actions and classifies failures
//! - The challenge flow walks both participants through stake setup
//! - The payout engine is the single settlement path for every outcome

pub mod battleship;
pub mod challenge;
pub mod connect_four;
pub mod context;
pub mod dice;
pub mod game_orchestrator;
pub mod payout_engine;
pub mod play;
pub mod render;

pub use battleship::{BattleshipState, Placement, ShipClass, Shot, Waters};
pub use connect_four::{ConnectFourState, Disc, MoveOutcome};
pub use context::GameContext;
pub use dice::{DiceState, RollOutcome};
pub use game_orchestrator::GameOrchestrator;
pub use payout_engine::{PayoutEngine, PayoutEngineStats, Settlement};
