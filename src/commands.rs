//! Maintenance commands for the WagerBot CLI

use wagerbot::{PointsLedger, Result, SessionStore};

use crate::app_config::balance_key;
use crate::app_state::WagerBotApp;

/// Print every stored session, oldest first
pub async fn list_sessions(app: &WagerBotApp) -> Result<()> {
    let mut sessions = app.store.list().await?;
    sessions.sort_by_key(|s| s.created_at);

    if sessions.is_empty() {
        println!("No game sessions.");
        return Ok(());
    }

    println!("{:<36}  {:<14}  {:<12}  {:<27}  PLAYERS", "ID", "ROOM", "GAME", "STATUS");
    for session in sessions {
        let game = session
            .game_kind
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36}  {:<14}  {:<12}  {:<27}  {} vs {}",
            session.id.to_string(),
            session.room_id.to_string(),
            game,
            session.status.to_string(),
            session.challenger_id,
            session.opponent_id
        );
    }
    Ok(())
}

/// Purge finished sessions from the store
pub async fn clean_games(app: &WagerBotApp) -> Result<()> {
    let removed = app.store.purge_complete().await?;
    log::info!("Removed {} finished sessions", removed);
    println!("Removed {} finished game sessions.", removed);
    Ok(())
}

pub async fn show_balance(app: &WagerBotApp, room: i64, participant: i64) -> Result<()> {
    let (room, participant) = balance_key(room, participant);
    let balance = app.ledger.balance(room, participant).await?;
    let strikes = app.ledger.strikes(room, participant).await;
    println!(
        "{} in room {}: {} points, {} strike(s)",
        participant, room, balance, strikes
    );
    Ok(())
}
