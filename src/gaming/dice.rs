//! Best-of-N dice duel
//!
//! Each round both players throw one die. The higher value takes the round,
//! equal values replay it. The first to win `best_of / 2 + 1` rounds wins.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::ParticipantId;
use crate::session::Role;

/// First throw of the current round, waiting for the other side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRoll {
    pub participant: ParticipantId,
    pub role: Role,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceState {
    pub best_of: u8,
    pub challenger_score: u8,
    pub opponent_score: u8,
    pub current_round: u32,
    pub pending_roll: Option<PendingRoll>,
}

/// What a throw did to the match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollOutcome {
    /// First throw of the round
    Pending,
    /// Same value on both sides; the round is replayed
    Tie { value: u8 },
    RoundWon { winner: Role, high: u8, low: u8 },
    MatchWon { winner: Role, high: u8, low: u8 },
}

impl DiceState {
    pub fn new(best_of: u8) -> Result<Self> {
        if best_of == 0 || best_of % 2 == 0 {
            return Err(Error::InvalidRoundCount(best_of));
        }
        Ok(Self {
            best_of,
            challenger_score: 0,
            opponent_score: 0,
            current_round: 1,
            pending_roll: None,
        })
    }

    pub fn rounds_to_win(&self) -> u8 {
        self.best_of / 2 + 1
    }

    /// Clear scores for a fresh match, keeping `best_of`
    pub fn reset(&mut self) {
        self.challenger_score = 0;
        self.opponent_score = 0;
        self.current_round = 1;
        self.pending_roll = None;
    }

    pub fn score(&self, role: Role) -> u8 {
        match role {
            Role::Challenger => self.challenger_score,
            Role::Opponent => self.opponent_score,
        }
    }

    /// Apply one throw
    pub fn record_roll(&mut self, participant: ParticipantId, role: Role, value: u8) -> Result<RollOutcome> {
        if !(1..=6).contains(&value) {
            return Err(Error::InvalidDiceValue(value));
        }

        let first = match self.pending_roll {
            None => {
                self.pending_roll = Some(PendingRoll {
                    participant,
                    role,
                    value,
                });
                return Ok(RollOutcome::Pending);
            }
            Some(pending) if pending.participant == participant => return Err(Error::NotYourTurn),
            Some(pending) => pending,
        };

        self.pending_roll = None;
        if first.value == value {
            return Ok(RollOutcome::Tie { value });
        }

        let (winner, high, low) = if first.value > value {
            (first.role, first.value, value)
        } else {
            (role, value, first.value)
        };

        match winner {
            Role::Challenger => self.challenger_score += 1,
            Role::Opponent => self.opponent_score += 1,
        }

        if self.score(winner) >= self.rounds_to_win() {
            Ok(RollOutcome::MatchWon { winner, high, low })
        } else {
            self.current_round += 1;
            Ok(RollOutcome::RoundWon { winner, high, low })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: ParticipantId = ParticipantId(1);
    const BOB: ParticipantId = ParticipantId(2);

    fn round(state: &mut DiceState, a: u8, b: u8) -> RollOutcome {
        assert_eq!(state.record_roll(ALICE, Role::Challenger, a).unwrap(), RollOutcome::Pending);
        state.record_roll(BOB, Role::Opponent, b).unwrap()
    }

    #[test]
    fn test_best_of_five_ends_at_three() {
        let mut state = DiceState::new(5).unwrap();
        assert_eq!(state.rounds_to_win(), 3);

        assert!(matches!(round(&mut state, 6, 2), RollOutcome::RoundWon { winner: Role::Challenger, .. }));
        assert!(matches!(round(&mut state, 1, 5), RollOutcome::RoundWon { winner: Role::Opponent, .. }));
        assert!(matches!(round(&mut state, 4, 3), RollOutcome::RoundWon { .. }));
        assert_eq!(state.current_round, 4);
        assert_eq!(
            round(&mut state, 5, 1),
            RollOutcome::MatchWon { winner: Role::Challenger, high: 5, low: 1 }
        );
        assert_eq!(state.challenger_score, 3);
        assert_eq!(state.opponent_score, 1);
    }

    #[test]
    fn test_tie_replays_round() {
        let mut state = DiceState::new(3).unwrap();
        assert_eq!(round(&mut state, 4, 4), RollOutcome::Tie { value: 4 });
        assert_eq!(state.current_round, 1);
        assert_eq!(state.challenger_score + state.opponent_score, 0);
        assert!(state.pending_roll.is_none());
    }

    #[test]
    fn test_same_roller_twice_rejected() {
        let mut state = DiceState::new(3).unwrap();
        state.record_roll(ALICE, Role::Challenger, 3).unwrap();
        assert!(matches!(state.record_roll(ALICE, Role::Challenger, 5), Err(Error::NotYourTurn)));
        assert_eq!(state.pending_roll.map(|p| p.value), Some(3));
    }

    #[test]
    fn test_either_player_may_open_round() {
        let mut state = DiceState::new(3).unwrap();
        assert_eq!(state.record_roll(BOB, Role::Opponent, 6).unwrap(), RollOutcome::Pending);
        assert_eq!(
            state.record_roll(ALICE, Role::Challenger, 2).unwrap(),
            RollOutcome::RoundWon { winner: Role::Opponent, high: 6, low: 2 }
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(DiceState::new(4).is_err());
        assert!(DiceState::new(0).is_err());
        let mut state = DiceState::new(9).unwrap();
        assert_eq!(state.rounds_to_win(), 5);
        assert!(matches!(state.record_roll(ALICE, Role::Challenger, 7), Err(Error::InvalidDiceValue(7))));
    }
}
