use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    AwaitingGameChoice,
    AwaitingChallengerStake,
    AwaitingConfirmation,
    AwaitingOpponentResponse,
    AwaitingOpponentStake,
    Active,
    Complete,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Complete)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }

    /// The challenger's private setup conversation is still open
    pub fn in_challenger_setup(&self) -> bool {
        matches!(
            self,
            SessionStatus::AwaitingGameChoice
                | SessionStatus::AwaitingChallengerStake
                | SessionStatus::AwaitingConfirmation
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::AwaitingGameChoice => "awaiting_game_choice",
            SessionStatus::AwaitingChallengerStake => "awaiting_challenger_stake",
            SessionStatus::AwaitingConfirmation => "awaiting_confirmation",
            SessionStatus::AwaitingOpponentResponse => "awaiting_opponent_response",
            SessionStatus::AwaitingOpponentStake => "awaiting_opponent_stake",
            SessionStatus::Active => "active",
            SessionStatus::Complete => "complete",
        };
        f.write_str(label)
    }
}
