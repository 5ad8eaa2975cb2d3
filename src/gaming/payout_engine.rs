//! Settlement engine
//!
//! The one place stakes change hands. Every terminal path (a finished game,
//! a refused challenge, an admin `/loser`) ends up here. Callers hold the
//! session lock and pass the freshly loaded record.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::context::GameContext;
use crate::error::{Error, Result};
use crate::protocol::ParticipantId;
use crate::session::{GameSession, SessionStatus, Stake};

/// What a settlement did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The session was already complete; nothing moved
    AlreadyComplete,
    Points { amount: u64 },
    Media,
}

/// Statistics for the payout engine
#[derive(Debug, Default, Clone)]
pub struct PayoutEngineStats {
    pub total_settlements: u64,
    pub total_refusals: u64,
    pub total_points_moved: u64,
    pub total_media_released: u64,
    pub total_aborted: u64,
}

#[derive(Clone)]
pub struct PayoutEngine {
    ctx: Arc<GameContext>,
    stats: Arc<RwLock<PayoutEngineStats>>,
}

impl PayoutEngine {
    pub fn new(ctx: Arc<GameContext>) -> Self {
        Self {
            ctx,
            stats: Arc::new(RwLock::new(PayoutEngineStats::default())),
        }
    }

    /// Transfer the loser's stake to the winner and complete the session
    pub async fn settle(
        &self,
        session: &mut GameSession,
        winner: ParticipantId,
        loser: ParticipantId,
    ) -> Result<Settlement> {
        if session.status.is_terminal() {
            log::debug!("Session {} already settled", session.id);
            return Ok(Settlement::AlreadyComplete);
        }

        let stake = match self.resolve_stake(session, winner, loser) {
            Ok(stake) => stake,
            Err(e) => {
                log::error!("Aborting settlement of session {}: {}", session.id, e);
                self.stats.write().await.total_aborted += 1;
                return Err(e);
            }
        };

        let room = session.room_id;
        let winner_name = self.ctx.name(room, winner).await;
        let loser_name = self.ctx.name(room, loser).await;

        let settlement = match stake {
            Stake::Points { amount } => {
                self.move_points(session, winner, amount as i64).await;
                self.move_points(session, loser, -(amount as i64)).await;
                self.ctx
                    .say(
                        room,
                        &format!(
                            "🏆 {} has won the game! {} lost {} points.",
                            winner_name, loser_name, amount
                        ),
                    )
                    .await;
                Settlement::Points { amount }
            }
            media => {
                let caption = format!(
                    "🏆 {} won the game! This is the loser's stake from {}.",
                    winner_name, loser_name
                );
                self.release_media(session, &media, &caption).await;
                Settlement::Media
            }
        };

        session.status = SessionStatus::Complete;
        self.ctx.store.save(session).await?;
        self.ctx.purge_messages(&session.id).await?;
        self.ctx.conversations.end_for_session(&session.id);

        {
            let mut stats = self.stats.write().await;
            stats.total_settlements += 1;
            match &settlement {
                Settlement::Points { amount } => stats.total_points_moved += amount,
                Settlement::Media => stats.total_media_released += 1,
                Settlement::AlreadyComplete => {}
            }
        }

        log::info!(
            "Settled session {}: winner {}, loser {}, {:?}",
            session.id,
            winner,
            loser,
            settlement
        );
        Ok(settlement)
    }

    /// The invited opponent refused: the challenger forfeits their own stake
    /// to nobody, the challenger is told, and the session is deleted
    pub async fn settle_refusal(&self, session: &GameSession) -> Result<()> {
        let stake = session
            .challenger_stake
            .clone()
            .ok_or_else(|| Error::UnresolvedStake(session.id.clone()))?;

        let room = session.room_id;
        let challenger = session.challenger_id;
        let challenger_name = self.ctx.name(room, challenger).await;
        let opponent_name = self.ctx.name(room, session.opponent_id).await;

        self.ctx
            .say(
                challenger.private_chat(),
                &format!("Your challenge was refused by {}.", opponent_name),
            )
            .await;

        match stake {
            Stake::Points { amount } => {
                self.move_points(session, challenger, -(amount as i64)).await;
                self.ctx
                    .say(
                        room,
                        &format!(
                            "{} is a loser for being refused! They lost {} points.",
                            challenger_name, amount
                        ),
                    )
                    .await;
                self.stats.write().await.total_points_moved += amount;
            }
            media => {
                let caption = format!(
                    "{} is a loser for being refused! This was their stake.",
                    challenger_name
                );
                self.release_media(session, &media, &caption).await;
                self.stats.write().await.total_media_released += 1;
            }
        }

        self.ctx.discard(&session.id).await?;
        self.stats.write().await.total_refusals += 1;
        log::info!("Session {} refused by {}", session.id, session.opponent_id);
        Ok(())
    }

    fn resolve_stake(
        &self,
        session: &GameSession,
        winner: ParticipantId,
        loser: ParticipantId,
    ) -> Result<Stake> {
        let loser_role = session.role_of(loser).ok_or(Error::NotParticipant(loser))?;
        if session.participant(loser_role.other()) != winner {
            return Err(Error::NotParticipant(winner));
        }
        session
            .stake_of(loser_role)
            .cloned()
            .ok_or_else(|| Error::UnresolvedStake(session.id.clone()))
    }

    async fn move_points(&self, session: &GameSession, participant: ParticipantId, delta: i64) {
        if let Err(e) = self
            .ctx
            .ledger
            .add_points(session.room_id, participant, delta)
            .await
        {
            log::warn!(
                "Points transfer of {} for {} in session {} failed: {}",
                delta,
                participant,
                session.id,
                e
            );
        }
    }

    async fn release_media(&self, session: &GameSession, stake: &Stake, caption: &str) {
        let Some((kind, reference)) = stake.as_media() else {
            return;
        };
        if let Err(e) = self
            .ctx
            .transport
            .send_media(session.room_id, kind, reference, caption)
            .await
        {
            log::warn!("Could not broadcast {} stake for session {}: {}", kind, session.id, e);
        }
    }

    /// Get payout engine statistics
    pub async fn get_stats(&self) -> PayoutEngineStats {
        self.stats.read().await.clone()
    }
}
