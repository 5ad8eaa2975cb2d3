//! The persistent game session record

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionStatus;
use crate::error::{Error, Result};
use crate::gaming::battleship::BattleshipState;
use crate::gaming::connect_four::ConnectFourState;
use crate::gaming::dice::DiceState;
use crate::protocol::{ChatId, MediaKind, MessageRef, ParticipantId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Dice,
    ConnectFour,
    Battleship,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::Dice, GameKind::ConnectFour, GameKind::Battleship];

    pub fn title(&self) -> &'static str {
        match self {
            GameKind::Dice => "Dice",
            GameKind::ConnectFour => "Connect Four",
            GameKind::Battleship => "Battleship",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            GameKind::Dice => "dice",
            GameKind::ConnectFour => "connect_four",
            GameKind::Battleship => "battleship",
        };
        f.write_str(code)
    }
}

impl FromStr for GameKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dice" => Ok(GameKind::Dice),
            "connect_four" => Ok(GameKind::ConnectFour),
            "battleship" => Ok(GameKind::Battleship),
            other => Err(Error::InvalidInput(format!("Unknown game: {}", other))),
        }
    }
}

/// What a participant chose to put up, before submitting it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeType {
    Points,
    Media,
}

impl fmt::Display for StakeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakeType::Points => f.write_str("points"),
            StakeType::Media => f.write_str("media"),
        }
    }
}

impl FromStr for StakeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "points" => Ok(StakeType::Points),
            "media" => Ok(StakeType::Media),
            other => Err(Error::InvalidInput(format!("Unknown stake type: {}", other))),
        }
    }
}

/// A submitted stake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stake {
    Points { amount: u64 },
    Photo { reference: String },
    Video { reference: String },
    Voice { reference: String },
}

impl Stake {
    pub fn media(kind: MediaKind, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        match kind {
            MediaKind::Photo => Stake::Photo { reference },
            MediaKind::Video => Stake::Video { reference },
            MediaKind::Voice => Stake::Voice { reference },
        }
    }

    /// Media kind and handle, or `None` for points
    pub fn as_media(&self) -> Option<(MediaKind, &str)> {
        match self {
            Stake::Points { .. } => None,
            Stake::Photo { reference } => Some((MediaKind::Photo, reference)),
            Stake::Video { reference } => Some((MediaKind::Video, reference)),
            Stake::Voice { reference } => Some((MediaKind::Voice, reference)),
        }
    }
}

impl fmt::Display for Stake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stake::Points { amount } => write!(f, "{} points", amount),
            Stake::Photo { .. } => f.write_str("a photo"),
            Stake::Video { .. } => f.write_str("a video"),
            Stake::Voice { .. } => f.write_str("a voice note"),
        }
    }
}

/// Side of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Challenger,
    Opponent,
}

impl Role {
    pub fn other(self) -> Role {
        match self {
            Role::Challenger => Role::Opponent,
            Role::Opponent => Role::Challenger,
        }
    }
}

/// Per game play state, present once the game has started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum PlayState {
    Dice(DiceState),
    ConnectFour(ConnectFourState),
    Battleship(BattleshipState),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: SessionId,
    pub room_id: ChatId,
    pub challenger_id: ParticipantId,
    pub opponent_id: ParticipantId,
    pub game_kind: Option<GameKind>,
    pub challenger_stake: Option<Stake>,
    pub opponent_stake: Option<Stake>,
    pub status: SessionStatus,
    #[serde(default)]
    pub play: Option<PlayState>,
    /// Room message showing both Battleship boards
    #[serde(default)]
    pub public_board: Option<MessageRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(room_id: ChatId, challenger_id: ParticipantId, opponent_id: ParticipantId) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            room_id,
            challenger_id,
            opponent_id,
            game_kind: None,
            challenger_stake: None,
            opponent_stake: None,
            status: SessionStatus::AwaitingGameChoice,
            play: None,
            public_board: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role_of(&self, participant: ParticipantId) -> Option<Role> {
        if participant == self.challenger_id {
            Some(Role::Challenger)
        } else if participant == self.opponent_id {
            Some(Role::Opponent)
        } else {
            None
        }
    }

    /// Role of a participant, or `NotParticipant`
    pub fn require_role(&self, participant: ParticipantId) -> Result<Role> {
        self.role_of(participant)
            .ok_or(Error::NotParticipant(participant))
    }

    pub fn participant(&self, role: Role) -> ParticipantId {
        match role {
            Role::Challenger => self.challenger_id,
            Role::Opponent => self.opponent_id,
        }
    }

    pub fn stake_of(&self, role: Role) -> Option<&Stake> {
        match role {
            Role::Challenger => self.challenger_stake.as_ref(),
            Role::Opponent => self.opponent_stake.as_ref(),
        }
    }

    pub fn set_stake(&mut self, role: Role, stake: Stake) {
        match role {
            Role::Challenger => self.challenger_stake = Some(stake),
            Role::Opponent => self.opponent_stake = Some(stake),
        }
    }

    /// Back to game choice; id, room and both identities are kept
    pub fn restart(&mut self) {
        self.game_kind = None;
        self.challenger_stake = None;
        self.opponent_stake = None;
        self.play = None;
        self.public_board = None;
        self.status = SessionStatus::AwaitingGameChoice;
    }

    pub fn dice_mut(&mut self) -> Result<&mut DiceState> {
        match self.play.as_mut() {
            Some(PlayState::Dice(state)) => Ok(state),
            _ => Err(Error::MissingPlayState(self.id.clone())),
        }
    }

    pub fn connect_four_mut(&mut self) -> Result<&mut ConnectFourState> {
        match self.play.as_mut() {
            Some(PlayState::ConnectFour(state)) => Ok(state),
            _ => Err(Error::MissingPlayState(self.id.clone())),
        }
    }

    pub fn battleship_mut(&mut self) -> Result<&mut BattleshipState> {
        match self.play.as_mut() {
            Some(PlayState::Battleship(state)) => Ok(state),
            _ => Err(Error::MissingPlayState(self.id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_keeps_identities() {
        let mut session = GameSession::new(ChatId(-100), ParticipantId(1), ParticipantId(2));
        let id = session.id.clone();
        session.game_kind = Some(GameKind::ConnectFour);
        session.play = Some(PlayState::ConnectFour(ConnectFourState::new(ParticipantId(1))));
        session.set_stake(Role::Challenger, Stake::Points { amount: 10 });
        session.status = SessionStatus::AwaitingConfirmation;

        session.restart();

        assert_eq!(session.id, id);
        assert_eq!(session.challenger_id, ParticipantId(1));
        assert_eq!(session.opponent_id, ParticipantId(2));
        assert_eq!(session.game_kind, None);
        assert_eq!(session.challenger_stake, None);
        assert_eq!(session.play, None);
        assert_eq!(session.status, SessionStatus::AwaitingGameChoice);
    }

    #[test]
    fn test_stake_serialization_is_tagged() {
        let stake = Stake::media(MediaKind::Photo, "file-1");
        let json = serde_json::to_value(&stake).unwrap();
        assert_eq!(json["kind"], "photo");
        assert_eq!(json["reference"], "file-1");

        let points: Stake = serde_json::from_str(r#"{"kind":"points","amount":50}"#).unwrap();
        assert_eq!(points, Stake::Points { amount: 50 });
        assert_eq!(points.to_string(), "50 points");
    }

    #[test]
    fn test_roles() {
        let session = GameSession::new(ChatId(-1), ParticipantId(1), ParticipantId(2));
        assert_eq!(session.role_of(ParticipantId(2)), Some(Role::Opponent));
        assert!(matches!(
            session.require_role(ParticipantId(3)),
            Err(Error::NotParticipant(ParticipantId(3)))
        ));
        assert_eq!(session.participant(Role::Challenger.other()), ParticipantId(2));
    }
}
