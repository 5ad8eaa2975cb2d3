//! Points economy for WagerBot
//!
//! Points live per room and per participant and may go negative. The core
//! only sees the [`PointsLedger`] boundary; punishment and strike handling
//! happens behind it, inside `add_points`.

pub mod persistent_ledger;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{ChatId, ParticipantId};

pub use persistent_ledger::FilePointsLedger;

#[async_trait]
pub trait PointsLedger: Send + Sync {
    async fn balance(&self, room: ChatId, participant: ParticipantId) -> Result<i64>;

    /// Apply a signed delta and run the moderation hooks; returns the
    /// balance after any resets those hooks applied
    async fn add_points(&self, room: ChatId, participant: ParticipantId, delta: i64) -> Result<i64>;
}
