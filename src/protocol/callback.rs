//! Inline button payload codec
//!
//! Every button the bot sends carries a colon separated payload naming the
//! action and the session it belongs to. Payloads stay under the 64 byte
//! limit common to chat platforms.

use std::fmt;

use crate::error::{Error, Result};
use crate::protocol::{Coord, SessionId};
use crate::session::{GameKind, StakeType};

/// Decoded button payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// `setup:start:<sid>` - challenger opens the setup conversation
    SetupStart(SessionId),
    /// `setup:opponent:<sid>` - invited opponent opens stake selection
    SetupOpponent(SessionId),
    /// `setup:game:<kind>:<sid>`
    ChooseGame(SessionId, GameKind),
    /// `setup:rounds:<n>:<sid>`
    ChooseRounds(SessionId, u8),
    /// `setup:stake:<points|media>:<sid>`
    ChooseStake(SessionId, StakeType),
    /// `setup:confirm:<sid>`
    Confirm(SessionId),
    /// `setup:cancel:<sid>`
    Cancel(SessionId),
    /// `setup:restart:<sid>`
    Restart(SessionId),
    /// `challenge:accept:<sid>`
    Accept(SessionId),
    /// `challenge:refuse:<sid>`
    Refuse(SessionId),
    /// `c4:move:<sid>:<col>`
    DropDisc(SessionId, usize),
    /// `bs:place:<sid>`
    BeginPlacement(SessionId),
    /// `bs:col:<sid>:<col>` - first step of an attack
    PickColumn(SessionId, u8),
    /// `bs:attack:<sid>:<row>:<col>`
    Attack(SessionId, Coord),
}

impl Callback {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Callback::SetupStart(id)
            | Callback::SetupOpponent(id)
            | Callback::ChooseGame(id, _)
            | Callback::ChooseRounds(id, _)
            | Callback::ChooseStake(id, _)
            | Callback::Confirm(id)
            | Callback::Cancel(id)
            | Callback::Restart(id)
            | Callback::Accept(id)
            | Callback::Refuse(id)
            | Callback::DropDisc(id, _)
            | Callback::BeginPlacement(id)
            | Callback::PickColumn(id, _)
            | Callback::Attack(id, _) => id,
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(payload: &str) -> Result<Self> {
        let unknown = || Error::InvalidInput(format!("Unrecognised button: {}", payload));
        let parts: Vec<&str> = payload.split(':').collect();

        let callback = match parts.as_slice() {
            ["setup", "start", sid] => Callback::SetupStart(session(sid)?),
            ["setup", "opponent", sid] => Callback::SetupOpponent(session(sid)?),
            ["setup", "game", kind, sid] => {
                Callback::ChooseGame(session(sid)?, kind.parse().map_err(|_| unknown())?)
            }
            ["setup", "rounds", n, sid] => {
                Callback::ChooseRounds(session(sid)?, n.parse().map_err(|_| unknown())?)
            }
            ["setup", "stake", kind, sid] => {
                Callback::ChooseStake(session(sid)?, kind.parse().map_err(|_| unknown())?)
            }
            ["setup", "confirm", sid] => Callback::Confirm(session(sid)?),
            ["setup", "cancel", sid] => Callback::Cancel(session(sid)?),
            ["setup", "restart", sid] => Callback::Restart(session(sid)?),
            ["challenge", "accept", sid] => Callback::Accept(session(sid)?),
            ["challenge", "refuse", sid] => Callback::Refuse(session(sid)?),
            ["c4", "move", sid, col] => {
                Callback::DropDisc(session(sid)?, col.parse().map_err(|_| unknown())?)
            }
            ["bs", "place", sid] => Callback::BeginPlacement(session(sid)?),
            ["bs", "col", sid, col] => {
                Callback::PickColumn(session(sid)?, col.parse().map_err(|_| unknown())?)
            }
            ["bs", "attack", sid, row, col] => {
                let row: u8 = row.parse().map_err(|_| unknown())?;
                let col: u8 = col.parse().map_err(|_| unknown())?;
                let coord = Coord::new(row, col).ok_or_else(unknown)?;
                Callback::Attack(session(sid)?, coord)
            }
            _ => return Err(unknown()),
        };
        Ok(callback)
    }
}

fn session(raw: &str) -> Result<SessionId> {
    if raw.is_empty() {
        return Err(Error::InvalidInput("Button is missing its game".to_string()));
    }
    Ok(SessionId::from(raw))
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::SetupStart(id) => write!(f, "setup:start:{}", id),
            Callback::SetupOpponent(id) => write!(f, "setup:opponent:{}", id),
            Callback::ChooseGame(id, kind) => write!(f, "setup:game:{}:{}", kind, id),
            Callback::ChooseRounds(id, n) => write!(f, "setup:rounds:{}:{}", n, id),
            Callback::ChooseStake(id, kind) => write!(f, "setup:stake:{}:{}", kind, id),
            Callback::Confirm(id) => write!(f, "setup:confirm:{}", id),
            Callback::Cancel(id) => write!(f, "setup:cancel:{}", id),
            Callback::Restart(id) => write!(f, "setup:restart:{}", id),
            Callback::Accept(id) => write!(f, "challenge:accept:{}", id),
            Callback::Refuse(id) => write!(f, "challenge:refuse:{}", id),
            Callback::DropDisc(id, col) => write!(f, "c4:move:{}:{}", id, col),
            Callback::BeginPlacement(id) => write!(f, "bs:place:{}", id),
            Callback::PickColumn(id, col) => write!(f, "bs:col:{}:{}", id, col),
            Callback::Attack(id, coord) => {
                write!(f, "bs:attack:{}:{}:{}", id, coord.row, coord.col)
            }
        }
    }
}
