//! Text boards and play keyboards

use crate::gaming::battleship::{Cell, Waters};
use crate::gaming::connect_four::{ConnectFourState, Disc, COLS};
use crate::protocol::{Button, Callback, Coord, Keyboard, SessionId};

const COLUMN_DIGITS: [&str; COLS] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣"];

pub fn connect_four_board(state: &ConnectFourState) -> String {
    let mut out = String::new();
    for row in &state.board {
        for disc in row {
            out.push_str(match disc {
                Disc::Empty => "⚪",
                Disc::Red => "🔴",
                Disc::Yellow => "🟡",
            });
        }
        out.push('\n');
    }
    out.push_str(&COLUMN_DIGITS.concat());
    out
}

/// One button per column
pub fn connect_four_keyboard(session_id: &SessionId) -> Keyboard {
    Keyboard::row(
        (0..COLS)
            .map(|col| Button::new((col + 1).to_string(), &Callback::DropDisc(session_id.clone(), col)))
            .collect(),
    )
}

/// A grid with ships visible, for the owner
pub fn own_waters(waters: &Waters) -> String {
    grid(waters, true)
}

/// A grid as the enemy sees it: ships hidden
pub fn target_waters(waters: &Waters) -> String {
    grid(waters, false)
}

fn grid(waters: &Waters, reveal_ships: bool) -> String {
    let mut out = String::from("   A B C D E F G H I J\n");
    for (row, cells) in waters.board.iter().enumerate() {
        out.push_str(&format!("{:>2} ", row + 1));
        let line: Vec<&str> = cells
            .iter()
            .map(|cell| match cell {
                Cell::Water => "~",
                Cell::Ship if reveal_ships => "S",
                Cell::Ship => "~",
                Cell::Hit => "X",
                Cell::Miss => "o",
            })
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

/// Room message showing both sides' shots
pub fn public_boards(
    challenger_name: &str,
    challenger: &Waters,
    opponent_name: &str,
    opponent: &Waters,
    turn_name: &str,
) -> String {
    format!(
        "🚢 Battleship\n\n{}'s waters:\n{}\n{}'s waters:\n{}\nIt's {}'s turn to fire.",
        challenger_name,
        target_waters(challenger),
        opponent_name,
        target_waters(opponent),
        turn_name
    )
}

/// First attack step: choose a column
pub fn column_picker(session_id: &SessionId) -> Keyboard {
    let buttons: Vec<Button> = (0..Coord::BOARD_SIZE)
        .map(|col| {
            Button::new(
                ((b'A' + col) as char).to_string(),
                &Callback::PickColumn(session_id.clone(), col),
            )
        })
        .collect();
    Keyboard(buttons.chunks(5).map(|chunk| chunk.to_vec()).collect())
}

/// Second attack step: choose a row within the picked column
pub fn row_picker(session_id: &SessionId, col: u8) -> Keyboard {
    let buttons: Vec<Button> = (0..Coord::BOARD_SIZE)
        .filter_map(|row| Coord::new(row, col))
        .map(|coord| Button::new(coord.to_string(), &Callback::Attack(session_id.clone(), coord)))
        .collect();
    Keyboard(buttons.chunks(5).map(|chunk| chunk.to_vec()).collect())
}
