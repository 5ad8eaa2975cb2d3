//! Connect Four rules
//!
//! Six rows (row 0 is the top) by seven columns. Discs fall to the lowest
//! empty row of a column. Red belongs to the challenger and moves first.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::ParticipantId;
use crate::session::Role;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disc {
    #[default]
    Empty,
    Red,
    Yellow,
}

impl Disc {
    pub fn for_role(role: Role) -> Disc {
        match role {
            Role::Challenger => Disc::Red,
            Role::Opponent => Disc::Yellow,
        }
    }
}

/// Result of a legal move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Continue,
    Win,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectFourState {
    pub board: [[Disc; COLS]; ROWS],
    pub turn: ParticipantId,
}

// Order matters: horizontal, vertical, down-right, up-right
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

impl ConnectFourState {
    pub fn new(first: ParticipantId) -> Self {
        Self {
            board: [[Disc::Empty; COLS]; ROWS],
            turn: first,
        }
    }

    /// Drop a disc, returning the row it landed in
    pub fn drop_disc(&mut self, col: usize, disc: Disc) -> Result<usize> {
        if col >= COLS {
            return Err(Error::InvalidColumn(col));
        }
        let row = (0..ROWS)
            .rev()
            .find(|&row| self.board[row][col] == Disc::Empty)
            .ok_or(Error::ColumnFull(col))?;
        self.board[row][col] = disc;
        Ok(row)
    }

    /// Drop a disc and evaluate the board for that disc
    pub fn play(&mut self, col: usize, disc: Disc) -> Result<MoveOutcome> {
        self.drop_disc(col, disc)?;
        if self.check_win(disc) {
            Ok(MoveOutcome::Win)
        } else if self.check_draw() {
            Ok(MoveOutcome::Draw)
        } else {
            Ok(MoveOutcome::Continue)
        }
    }

    /// Four in a row anywhere on the board
    pub fn check_win(&self, disc: Disc) -> bool {
        if disc == Disc::Empty {
            return false;
        }
        DIRECTIONS.iter().any(|&(dr, dc)| {
            (0..ROWS).any(|row| (0..COLS).any(|col| self.line_from(row, col, dr, dc, disc)))
        })
    }

    fn line_from(&self, row: usize, col: usize, dr: isize, dc: isize, disc: Disc) -> bool {
        (0..4).all(|step| {
            let r = row as isize + dr * step;
            let c = col as isize + dc * step;
            (0..ROWS as isize).contains(&r)
                && (0..COLS as isize).contains(&c)
                && self.board[r as usize][c as usize] == disc
        })
    }

    /// Top row full; combined with no line this is a draw
    pub fn check_draw(&self) -> bool {
        self.board[0].iter().all(|&d| d != Disc::Empty)
    }
}
