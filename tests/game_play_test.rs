//! Dice, Connect Four and Battleship played through the orchestrator

mod common;

use std::time::{Duration, Instant};

use common::*;
use wagerbot::gaming::connect_four::{ConnectFourState, Disc};
use wagerbot::gaming::Settlement;
use wagerbot::protocol::{Callback, Coord, MessageRef};
use wagerbot::session::{PlayState, SessionStatus};
use wagerbot::{ParticipantId, SessionId, SessionStore};

const FLEET: [&str; 5] = ["A1 H", "A2 H", "A3 H", "A4 H", "A5 H"];

async fn active_game(game: &str, stake: u64) -> Harness {
    let h = Harness::new();
    h.ledger.set(ROOM, ALICE, 100);
    h.ledger.set(ROOM, BOB, 100);
    h.start_points_game(game, stake).await;
    assert_eq!(h.session().await.status, SessionStatus::Active);
    h
}

async fn place_fleets(h: &Harness) {
    for player in [ALICE, BOB] {
        h.press(player, player.private_chat(), "Begin Ship Placement").await;
        for placement in FLEET {
            h.send(text(player, placement)).await;
        }
    }
}

async fn fire(h: &Harness, who: ParticipantId, session_id: &SessionId, target: &str) {
    let target: Coord = target.parse().unwrap();
    let message = MessageRef {
        chat: who.private_chat(),
        message_id: 0,
    };
    h.send(button(
        who,
        who.private_chat(),
        &Callback::Attack(session_id.clone(), target),
        message,
    ))
    .await;
}

#[tokio::test]
async fn test_dice_best_of_three_settles_points() {
    let h = active_game("Dice", 50).await;

    h.send(dice(ALICE, 6)).await;
    h.send(dice(BOB, 2)).await;
    h.send(dice(BOB, 3)).await;
    h.send(dice(ALICE, 5)).await;

    let mut session = h.session().await;
    assert_eq!(session.status, SessionStatus::Complete);
    assert_eq!(h.ledger.deltas(), vec![(ALICE, 50), (BOB, -50)]);
    assert_eq!(h.ledger.get(ROOM, ALICE), 150);
    assert_eq!(h.ledger.get(ROOM, BOB), 50);
    assert!(h.transport.any_text_to(ROOM, "lost 50 points"));
    assert!(h.transport.deleted().iter().any(|m| m.chat == ROOM));

    // Settling again moves nothing
    let again = h
        .orchestrator
        .payout()
        .settle(&mut session, ALICE, BOB)
        .await
        .unwrap();
    assert_eq!(again, Settlement::AlreadyComplete);
    assert_eq!(h.ledger.deltas().len(), 2);
}

#[tokio::test]
async fn test_dice_tie_replays_round() {
    let h = active_game("Dice", 10).await;

    h.send(dice(ALICE, 4)).await;
    h.send(dice(ALICE, 2)).await;
    assert_eq!(h.transport.notices_for(ALICE), vec!["It's not your turn!"]);

    h.send(dice(BOB, 4)).await;
    match h.session().await.play {
        Some(PlayState::Dice(dice)) => {
            assert_eq!(dice.current_round, 1);
            assert_eq!((dice.challenger_score, dice.opponent_score), (0, 0));
            assert!(dice.pending_roll.is_none());
        }
        other => panic!("unexpected play state {:?}", other),
    }
    assert!(h.transport.any_text_to(ROOM, "It's a tie"));
}

#[tokio::test]
async fn test_dice_from_outsiders_is_ignored() {
    let h = active_game("Dice", 10).await;
    h.send(dice(CAROL, 6)).await;

    match h.session().await.play {
        Some(PlayState::Dice(dice)) => assert!(dice.pending_roll.is_none()),
        other => panic!("unexpected play state {:?}", other),
    }
}

#[tokio::test]
async fn test_connect_four_vertical_win_settles() {
    let h = active_game("Connect Four", 10).await;

    for (player, column) in [(ALICE, "1"), (BOB, "2"), (ALICE, "1"), (BOB, "2"), (ALICE, "1"), (BOB, "2")] {
        h.press(player, ROOM, column).await;
    }
    assert_eq!(h.session().await.status, SessionStatus::Active);
    assert!(!h.transport.edits().is_empty());

    h.press(ALICE, ROOM, "1").await;
    assert_eq!(h.session().await.status, SessionStatus::Complete);
    assert_eq!(h.ledger.deltas(), vec![(ALICE, 10), (BOB, -10)]);
    assert!(h.transport.any_text_to(ROOM, "connects four!"));
}

#[tokio::test]
async fn test_connect_four_turns_and_full_column() {
    let h = active_game("Connect Four", 10).await;

    h.press(BOB, ROOM, "1").await;
    assert_eq!(h.transport.notices_for(BOB), vec!["It's not your turn!"]);

    for player in [ALICE, BOB, ALICE, BOB, ALICE, BOB] {
        h.press(player, ROOM, "1").await;
    }
    let before = h.session().await;
    h.press(ALICE, ROOM, "1").await;
    assert!(h
        .transport
        .notices_for(ALICE)
        .contains(&"This column is full!".to_string()));

    let after = h.session().await;
    assert_eq!(after.play, before.play);
    match after.play {
        Some(PlayState::ConnectFour(state)) => assert_eq!(state.turn, ALICE),
        other => panic!("unexpected play state {:?}", other),
    }
}

#[test]
fn test_connect_four_yellow_column_line() {
    let mut state = ConnectFourState::new(ALICE);
    for _ in 0..4 {
        state.drop_disc(3, Disc::Yellow).unwrap();
    }
    assert!((2..=5).all(|row| state.board[row][3] == Disc::Yellow));
    assert!(state.check_win(Disc::Yellow));
    assert!(!state.check_win(Disc::Red));
}

#[tokio::test]
async fn test_battleship_placement_validation() {
    let h = active_game("Battleship", 10).await;
    h.press(ALICE, ALICE.private_chat(), "Begin Ship Placement").await;

    h.send(text(ALICE, "A1 X")).await;
    h.send(text(ALICE, "G1 H")).await;
    h.send(text(ALICE, "A1 H")).await;
    h.send(text(ALICE, "A1 V")).await;

    let dm = h.transport.texts_to(ALICE.private_chat());
    assert!(dm.iter().any(|t| t.contains("Invalid format")));
    assert!(dm.iter().any(|t| t.contains("Invalid placement")));
    match h.session().await.play {
        Some(PlayState::Battleship(state)) => {
            assert_eq!(state.challenger.fleet.len(), 1);
            assert!(!state.challenger.placement_done);
        }
        other => panic!("unexpected play state {:?}", other),
    }
}

#[tokio::test]
async fn test_battleship_refire_changes_nothing() {
    let h = active_game("Battleship", 10).await;
    place_fleets(&h).await;
    let sid = h.session().await.id;
    assert!(h.transport.any_text_to(ROOM, "Battleship"));
    assert!(h.transport.find_button(ALICE.private_chat(), "A").is_some());

    fire(&h, ALICE, &sid, "A1").await;
    fire(&h, BOB, &sid, "J10").await;

    let before = h.session().await;
    fire(&h, ALICE, &sid, "A1").await;
    let after = h.session().await;

    assert!(h
        .transport
        .notices_for(ALICE)
        .contains(&"You have already fired at A1.".to_string()));
    assert_eq!(after.play, before.play);
    match after.play {
        Some(PlayState::Battleship(state)) => assert_eq!(state.turn, ALICE),
        other => panic!("unexpected play state {:?}", other),
    }
}

#[tokio::test]
async fn test_battleship_out_of_turn_attack_is_refused() {
    let h = active_game("Battleship", 10).await;
    place_fleets(&h).await;
    let sid = h.session().await.id;

    fire(&h, BOB, &sid, "A1").await;
    assert_eq!(h.transport.notices_for(BOB), vec!["It's not your turn!"]);
}

#[tokio::test]
async fn test_battleship_column_then_row() {
    let h = active_game("Battleship", 10).await;
    place_fleets(&h).await;

    h.press(ALICE, ALICE.private_chat(), "C").await;
    assert!(h.transport.find_button(ALICE.private_chat(), "C10").is_some());

    h.press(ALICE, ALICE.private_chat(), "C1").await;
    assert!(h.transport.any_text_to(BOB.private_chat(), "fired at C1. It's a HIT!"));
    match h.session().await.play {
        Some(PlayState::Battleship(state)) => assert_eq!(state.turn, BOB),
        other => panic!("unexpected play state {:?}", other),
    }
}

#[tokio::test]
async fn test_battleship_sinking_the_fleet_settles() {
    let h = active_game("Battleship", 10).await;
    place_fleets(&h).await;
    let sid = h.session().await.id;

    let targets: Vec<String> = [("A", 1), ("B", 1), ("C", 1), ("D", 1), ("E", 1)]
        .iter()
        .chain(&[("A", 2), ("B", 2), ("C", 2), ("D", 2)])
        .chain(&[("A", 3), ("B", 3), ("C", 3)])
        .chain(&[("A", 4), ("B", 4), ("C", 4)])
        .chain(&[("A", 5), ("B", 5)])
        .map(|(col, row)| format!("{}{}", col, row))
        .collect();
    let misses: Vec<String> = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]
        .iter()
        .flat_map(|col| [9, 10].map(|row| format!("{}{}", col, row)))
        .collect();

    for (i, target) in targets.iter().enumerate() {
        fire(&h, ALICE, &sid, target).await;
        if i + 1 < targets.len() {
            fire(&h, BOB, &sid, &misses[i]).await;
        }
    }

    assert_eq!(h.session().await.status, SessionStatus::Complete);
    assert_eq!(h.ledger.deltas(), vec![(ALICE, 10), (BOB, -10)]);
    assert!(h.transport.any_text_to(ROOM, "has won the battle!"));
    assert!(h.transport.any_text_to(ALICE.private_chat(), "You are victorious!"));
    assert!(h.transport.any_text_to(BOB.private_chat(), "You sunk their Carrier!"));
}

#[tokio::test]
async fn test_idle_placement_is_swept() {
    let h = active_game("Battleship", 10).await;
    h.press(ALICE, ALICE.private_chat(), "Begin Ship Placement").await;
    for placement in FLEET {
        h.send(text(ALICE, placement)).await;
    }

    assert_eq!(h.orchestrator.sweep_idle_placements(Instant::now()).await, 0);
    assert_eq!(h.session_count().await, 1);

    // BOB never opened placement at all
    let later = Instant::now() + Duration::from_secs(601);
    assert_eq!(h.orchestrator.sweep_idle_placements(later).await, 1);
    assert_eq!(h.session_count().await, 0);
    assert!(h.transport.any_text_to(ALICE.private_chat(), "did not place their ships in time"));
    assert!(h.transport.any_text_to(BOB.private_chat(), "Ship placement timed out"));
    assert!(h.ledger.deltas().is_empty());
}

#[tokio::test]
async fn test_both_players_idle_aborts_once() {
    let h = active_game("Battleship", 10).await;

    let later = Instant::now() + Duration::from_secs(601);
    assert_eq!(h.orchestrator.sweep_idle_placements(later).await, 1);
    assert_eq!(h.session_count().await, 0);

    let notices = h
        .transport
        .texts_to(ROOM)
        .into_iter()
        .filter(|t| t.contains("cancelled during ship placement"))
        .count();
    assert_eq!(notices, 1);
    assert_eq!(h.orchestrator.sweep_idle_placements(later).await, 0);
}

#[tokio::test]
async fn test_cancel_during_placement() {
    let h = active_game("Battleship", 10).await;
    h.press(BOB, BOB.private_chat(), "Begin Ship Placement").await;
    h.send(text(BOB, "A1 H")).await;

    h.send(command(BOB.private_chat(), BOB, "cancel", &[], None)).await;
    assert_eq!(h.session_count().await, 0);
    assert!(h.transport.any_text_to(ALICE.private_chat(), "cancelled ship placement"));
    assert!(h.ledger.deltas().is_empty());
}

#[tokio::test]
async fn test_admin_declares_loser() {
    let h = active_game("Dice", 25).await;

    h.send(command(ROOM, ALICE, "loser", &["22"], None)).await;
    assert_eq!(h.transport.notices_for(ALICE), vec!["Only admins can use this command."]);
    assert_eq!(h.session().await.status, SessionStatus::Active);

    h.send(command(ROOM, ADMIN, "loser", &[], Some(BOB))).await;
    assert_eq!(h.session().await.status, SessionStatus::Complete);
    assert_eq!(h.ledger.deltas(), vec![(ALICE, 25), (BOB, -25)]);

    h.send(command(ROOM, ADMIN, "cleangames", &[], None)).await;
    assert_eq!(h.session_count().await, 0);
    assert!(h.transport.any_text_to(ADMIN.private_chat(), "Removed 1 finished games."));
}

#[tokio::test]
async fn test_missing_session_is_reported() {
    let h = Harness::new();
    let message = MessageRef {
        chat: ROOM,
        message_id: 1,
    };
    let stale = Callback::Accept(SessionId::from("gone"));
    h.send(button(BOB, ROOM, &stale, message)).await;
    assert_eq!(h.transport.notices_for(BOB), vec!["This game is no longer available."]);
}

#[tokio::test]
async fn test_sweeper_starts_and_stops() {
    let h = Harness::new();
    h.orchestrator.start();
    tokio::task::yield_now().await;
    h.orchestrator.stop().await;
}

#[tokio::test]
async fn test_connect_four_draw_completes_without_settlement() {
    let h = active_game("Connect Four", 10).await;
    let (board_message, _) = h.transport.find_button(ROOM, "7").unwrap();

    // Alternating rows, flipped every two rows; only the top right cell is open
    let (r, y) = (Disc::Red, Disc::Yellow);
    let normal = [r, y, r, y, r, y, r];
    let flipped = [y, r, y, r, y, r, y];
    let mut state = ConnectFourState::new(ALICE);
    for row in 0..6 {
        state.board[row] = if (row / 2) % 2 == 0 { normal } else { flipped };
    }
    state.board[0][6] = Disc::Empty;

    let mut session = h.session().await;
    session.play = Some(PlayState::ConnectFour(state));
    h.store.save(&mut session).await.unwrap();

    h.press(ALICE, ROOM, "7").await;

    let session = h.session().await;
    assert_eq!(session.status, SessionStatus::Complete);
    assert!(h.ledger.deltas().is_empty());
    assert!(h.transport.any_text_to(ROOM, "It's a draw!"));
    assert!(h.transport.deleted().contains(&board_message));
    assert!(h.store.drain_messages(&session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_battleship_activates_when_stake_receipt_is_undeliverable() {
    let h = Harness::new();
    h.ledger.set(ROOM, ALICE, 100);
    h.ledger.set(ROOM, BOB, 100);
    h.challenger_points_setup("Battleship", 10).await;
    h.press(ALICE, ALICE.private_chat(), "✅ Confirm").await;
    h.press(BOB, ROOM, "Accept").await;
    h.press(BOB, BOB.private_chat(), "Set your stake").await;
    h.press(BOB, BOB.private_chat(), "Points").await;

    h.transport.block(BOB.private_chat());
    h.send(text(BOB, "10")).await;

    let session = h.session().await;
    assert_eq!(session.status, SessionStatus::Active);
    assert!(matches!(session.play, Some(PlayState::Battleship(_))));
    assert!(h
        .transport
        .find_button(ALICE.private_chat(), "Begin Ship Placement")
        .is_some());
    assert!(h.transport.any_text_to(ROOM, "I can't send you a private message"));
}

#[tokio::test]
async fn test_connect_four_board_posted_when_stake_receipt_is_undeliverable() {
    let h = Harness::new();
    h.ledger.set(ROOM, ALICE, 100);
    h.ledger.set(ROOM, BOB, 100);
    h.challenger_points_setup("Connect Four", 10).await;
    h.press(ALICE, ALICE.private_chat(), "✅ Confirm").await;
    h.press(BOB, ROOM, "Accept").await;
    h.press(BOB, BOB.private_chat(), "Set your stake").await;
    h.press(BOB, BOB.private_chat(), "Points").await;

    h.transport.block(BOB.private_chat());
    h.send(text(BOB, "10")).await;

    assert_eq!(h.session().await.status, SessionStatus::Active);
    assert!(h.transport.find_button(ROOM, "1").is_some());
}

#[tokio::test]
async fn test_battle_begins_when_final_placement_receipt_is_undeliverable() {
    let h = active_game("Battleship", 10).await;
    h.press(ALICE, ALICE.private_chat(), "Begin Ship Placement").await;
    for placement in FLEET {
        h.send(text(ALICE, placement)).await;
    }
    h.press(BOB, BOB.private_chat(), "Begin Ship Placement").await;
    for placement in &FLEET[..4] {
        h.send(text(BOB, placement)).await;
    }

    h.transport.block(BOB.private_chat());
    h.send(text(BOB, FLEET[4])).await;

    let session = h.session().await;
    assert!(session.public_board.is_some());
    match session.play {
        Some(PlayState::Battleship(state)) => {
            assert!(state.both_placed());
            assert_eq!(state.turn, ALICE);
        }
        other => panic!("unexpected play state {:?}", other),
    }
    assert!(h.transport.any_text_to(ALICE.private_chat(), "Select a column to attack:"));
}
