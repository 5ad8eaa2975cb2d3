//! Battleship rules
//!
//! Each side has a 10x10 grid of its own waters. Ships are placed in roster
//! order, then players alternate single shots at each other's waters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{Coord, ParticipantId};
use crate::session::Role;

const SIZE: usize = Coord::BOARD_SIZE as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipClass {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

impl ShipClass {
    /// Placement order
    pub const ROSTER: [ShipClass; 5] = [
        ShipClass::Carrier,
        ShipClass::Battleship,
        ShipClass::Cruiser,
        ShipClass::Submarine,
        ShipClass::Destroyer,
    ];

    pub fn size(&self) -> usize {
        match self {
            ShipClass::Carrier => 5,
            ShipClass::Battleship => 4,
            ShipClass::Cruiser | ShipClass::Submarine => 3,
            ShipClass::Destroyer => 2,
        }
    }
}

impl fmt::Display for ShipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShipClass::Carrier => "Carrier",
            ShipClass::Battleship => "Battleship",
            ShipClass::Cruiser => "Cruiser",
            ShipClass::Submarine => "Submarine",
            ShipClass::Destroyer => "Destroyer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Ship bow plus direction, typed as `A1 H` or `a1 v`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub bow: Coord,
    pub orientation: Orientation,
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [coord, orientation] = parts.as_slice() else {
            return Err(Error::InvalidPlacementFormat);
        };
        let orientation = match orientation.to_ascii_uppercase().as_str() {
            "H" => Orientation::Horizontal,
            "V" => Orientation::Vertical,
            _ => return Err(Error::InvalidPlacementFormat),
        };
        Ok(Placement {
            bow: coord.parse()?,
            orientation,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Water,
    Ship,
    Hit,
    Miss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetEntry {
    pub ship: ShipClass,
    pub cells: Vec<Coord>,
}

/// Result of a shot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shot {
    Miss,
    Hit { sunk: Option<ShipClass> },
}

/// One side's grid and fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waters {
    pub board: [[Cell; SIZE]; SIZE],
    pub fleet: Vec<FleetEntry>,
    pub placement_done: bool,
}

impl Default for Waters {
    fn default() -> Self {
        Self {
            board: [[Cell::Water; SIZE]; SIZE],
            fleet: Vec::new(),
            placement_done: false,
        }
    }
}

impl Waters {
    pub fn cell(&self, coord: Coord) -> Cell {
        self.board[coord.row as usize][coord.col as usize]
    }

    /// Next ship to place, if any
    pub fn next_ship(&self) -> Option<ShipClass> {
        ShipClass::ROSTER.get(self.fleet.len()).copied()
    }

    /// Place the next ship of the roster
    pub fn place(&mut self, placement: Placement) -> Result<ShipClass> {
        let ship = self
            .next_ship()
            .ok_or_else(|| Error::InvalidState("All your ships are already placed.".to_string()))?;

        let cells: Vec<Coord> = (0..ship.size() as u8)
            .map(|i| match placement.orientation {
                Orientation::Horizontal => {
                    Coord::new(placement.bow.row, placement.bow.col.saturating_add(i))
                }
                Orientation::Vertical => {
                    Coord::new(placement.bow.row.saturating_add(i), placement.bow.col)
                }
            })
            .collect::<Option<Vec<_>>>()
            .ok_or(Error::InvalidPlacement)?;

        if cells.iter().any(|&c| self.cell(c) != Cell::Water) {
            return Err(Error::InvalidPlacement);
        }

        for &c in &cells {
            self.board[c.row as usize][c.col as usize] = Cell::Ship;
        }
        self.fleet.push(FleetEntry { ship, cells });
        self.placement_done = self.fleet.len() == ShipClass::ROSTER.len();
        Ok(ship)
    }

    /// Take a shot at these waters
    pub fn fire(&mut self, target: Coord) -> Result<Shot> {
        let cell = &mut self.board[target.row as usize][target.col as usize];
        match *cell {
            Cell::Hit | Cell::Miss => Err(Error::AlreadyTargeted(target)),
            Cell::Water => {
                *cell = Cell::Miss;
                Ok(Shot::Miss)
            }
            Cell::Ship => {
                *cell = Cell::Hit;
                let sunk = self
                    .fleet
                    .iter()
                    .find(|entry| entry.cells.contains(&target))
                    .filter(|entry| self.is_sunk(entry))
                    .map(|entry| entry.ship);
                Ok(Shot::Hit { sunk })
            }
        }
    }

    pub fn is_sunk(&self, entry: &FleetEntry) -> bool {
        entry.cells.iter().all(|&c| self.cell(c) == Cell::Hit)
    }

    /// Every ship sunk
    pub fn all_sunk(&self) -> bool {
        !self.fleet.is_empty() && self.fleet.iter().all(|entry| self.is_sunk(entry))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleshipState {
    pub challenger: Waters,
    pub opponent: Waters,
    pub turn: ParticipantId,
}

impl BattleshipState {
    pub fn new(first: ParticipantId) -> Self {
        Self {
            challenger: Waters::default(),
            opponent: Waters::default(),
            turn: first,
        }
    }

    pub fn waters(&self, role: Role) -> &Waters {
        match role {
            Role::Challenger => &self.challenger,
            Role::Opponent => &self.opponent,
        }
    }

    pub fn waters_mut(&mut self, role: Role) -> &mut Waters {
        match role {
            Role::Challenger => &mut self.challenger,
            Role::Opponent => &mut self.opponent,
        }
    }

    pub fn both_placed(&self) -> bool {
        self.challenger.placement_done && self.opponent.placement_done
    }
}
