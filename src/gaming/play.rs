//! Handlers for moves in active games
//!
//! Each handler takes the session lock, reloads the record, checks turn and
//! status, applies the move to the play state, saves, and only then talks to
//! the transport. Terminal outcomes go through the payout engine.

use std::time::Instant;

use crate::error::{Error, Result};
use crate::gaming::battleship::{BattleshipState, Placement, ShipClass, Shot};
use crate::gaming::connect_four::{ConnectFourState, Disc, MoveOutcome};
use crate::gaming::dice::RollOutcome;
use crate::gaming::game_orchestrator::GameOrchestrator;
use crate::gaming::render;
use crate::protocol::{Action, Coord, Keyboard, MessageRef, ParticipantId, SessionId};
use crate::session::{Conversation, GameKind, GameSession, PlayState, SessionStatus};

fn battleship_state(session: &GameSession) -> Result<&BattleshipState> {
    match &session.play {
        Some(PlayState::Battleship(state)) => Ok(state),
        _ => Err(Error::MissingPlayState(session.id.clone())),
    }
}

fn ensure_active(session: &GameSession) -> Result<()> {
    if session.status.is_active() {
        Ok(())
    } else {
        Err(Error::InvalidState("This game is no longer active.".to_string()))
    }
}

fn placement_prompt(own_board: &str, intro: &str, next: Option<ShipClass>) -> String {
    match next {
        Some(ship) => format!(
            "{}YOUR BOARD:\n{}\nPlace your {} ({} cells). Send the bow coordinate and a direction, e.g. A1 H or B2 V. Send /cancel to abort.",
            intro,
            own_board,
            ship,
            ship.size()
        ),
        None => format!("{}YOUR BOARD:\n{}", intro, own_board),
    }
}

impl GameOrchestrator {
    /// A die thrown in the room by someone with an active dice game there
    pub(crate) async fn roll_dice(&self, action: &Action, value: u8) -> Result<()> {
        let ctx = self.context();
        let candidate = ctx
            .store
            .list_active_for(action.chat, action.from)
            .await?
            .into_iter()
            .find(|s| s.game_kind == Some(GameKind::Dice));
        let Some(candidate) = candidate else {
            log::debug!("Ignoring dice from {} with no active dice game", action.from);
            return Ok(());
        };

        let (_guard, mut session) = self.lock_and_load(&candidate.id).await?;
        ensure_active(&session)?;
        let role = session.require_role(action.from)?;
        let outcome = session.dice_mut()?.record_roll(action.from, role, value)?;
        ctx.store.save(&mut session).await?;

        let room = session.room_id;
        let roller = ctx.name(room, action.from).await;
        let other = ctx.name(room, session.participant(role.other())).await;
        match outcome {
            RollOutcome::Pending => {
                ctx.post_tracked(
                    &session.id,
                    room,
                    &format!("{} rolled a {}. Waiting for {} to roll...", roller, value, other),
                    Keyboard::none(),
                )
                .await?;
            }
            RollOutcome::Tie { value } => {
                let round = session.dice_mut()?.current_round;
                ctx.post_tracked(
                    &session.id,
                    room,
                    &format!(
                        "Both players rolled a {}! It's a tie. Roll again for round {}.",
                        value, round
                    ),
                    Keyboard::none(),
                )
                .await?;
            }
            RollOutcome::RoundWon { winner, high, low } => {
                let (round, challenger_score, opponent_score) = {
                    let dice = session.dice_mut()?;
                    (dice.current_round, dice.challenger_score, dice.opponent_score)
                };
                let winner_name = ctx.name(room, session.participant(winner)).await;
                let challenger_name = ctx.name(room, session.challenger_id).await;
                let opponent_name = ctx.name(room, session.opponent_id).await;
                ctx.post_tracked(
                    &session.id,
                    room,
                    &format!(
                        "{} wins round {} ({} vs {})!\nScore: {} {} - {} {}\nRound {}: both players roll again.",
                        winner_name,
                        round - 1,
                        high,
                        low,
                        challenger_name,
                        challenger_score,
                        opponent_score,
                        opponent_name,
                        round
                    ),
                    Keyboard::none(),
                )
                .await?;
            }
            RollOutcome::MatchWon { winner, high, low } => {
                log::info!(
                    "Dice match {} won by {:?} with {} vs {}",
                    session.id,
                    winner,
                    high,
                    low
                );
                let winner_id = session.participant(winner);
                let loser_id = session.participant(winner.other());
                self.payout().settle(&mut session, winner_id, loser_id).await?;
            }
        }
        Ok(())
    }

    pub(crate) async fn connect_four_text(&self, session: &GameSession, state: &ConnectFourState) -> String {
        let ctx = self.context();
        let room = session.room_id;
        let challenger = ctx.name(room, session.challenger_id).await;
        let opponent = ctx.name(room, session.opponent_id).await;
        let turn = ctx.name(room, state.turn).await;
        format!(
            "🔴 {} vs 🟡 {}\n\n{}\n\nIt's {}'s turn.",
            challenger,
            opponent,
            render::connect_four_board(state),
            turn
        )
    }

    /// Column button under the Connect Four board
    pub(crate) async fn drop_disc(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        col: usize,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        ensure_active(&session)?;
        let role = session.require_role(actor)?;
        let next = session.participant(role.other());

        let state = session.connect_four_mut()?;
        if state.turn != actor {
            return Err(Error::NotYourTurn);
        }
        let outcome = state.play(col, Disc::for_role(role))?;
        if outcome == MoveOutcome::Continue {
            state.turn = next;
        }
        let snapshot = state.clone();

        let ctx = self.context();
        let room = session.room_id;
        match outcome {
            MoveOutcome::Continue => {
                ctx.store.save(&mut session).await?;
                let text = self.connect_four_text(&session, &snapshot).await;
                if let Err(e) = ctx
                    .transport
                    .edit_text(message, &text, render::connect_four_keyboard(session_id))
                    .await
                {
                    log::warn!("Could not update Connect Four board for {}: {}", session_id, e);
                }
            }
            MoveOutcome::Win => {
                ctx.store.save(&mut session).await?;
                let winner = ctx.name(room, actor).await;
                ctx.say(
                    room,
                    &format!(
                        "{}\n\n{} connects four!",
                        render::connect_four_board(&snapshot),
                        winner
                    ),
                )
                .await;
                self.payout().settle(&mut session, actor, next).await?;
            }
            MoveOutcome::Draw => {
                session.status = SessionStatus::Complete;
                ctx.store.save(&mut session).await?;
                ctx.say(
                    room,
                    &format!(
                        "{}\n\nThe board is full. It's a draw! No stakes change hands.",
                        render::connect_four_board(&snapshot)
                    ),
                )
                .await;
                ctx.purge_messages(session_id).await?;
                ctx.conversations.end_for_session(session_id);
                log::info!("Connect Four session {} ended in a draw", session_id);
            }
        }
        Ok(())
    }

    /// "Begin Ship Placement" button in a private chat
    pub(crate) async fn begin_placement(&self, actor: ParticipantId, session_id: &SessionId) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        ensure_active(&session)?;
        let role = session.require_role(actor)?;
        let waters = session.battleship_mut()?.waters(role);
        if waters.placement_done {
            return Err(Error::InvalidState("Your fleet is already in position.".to_string()));
        }
        let prompt = placement_prompt(&render::own_waters(waters), "", waters.next_ship());

        let ctx = self.context();
        ctx.conversations.begin(
            actor,
            Conversation::Placement {
                session_id: session_id.clone(),
                last_activity: Instant::now(),
            },
        );
        ctx.dm(session_id, actor, &prompt, Keyboard::none()).await?;
        Ok(())
    }

    /// Typed placement such as "A1 H"
    pub(crate) async fn place_ship(&self, actor: ParticipantId, session_id: &SessionId, text: &str) -> Result<()> {
        let ctx = self.context();
        ctx.conversations.touch(actor, Instant::now());

        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        ensure_active(&session)?;
        let role = session.require_role(actor)?;
        let placement: Placement = text.parse()?;

        let state = session.battleship_mut()?;
        let waters = state.waters_mut(role);
        let ship = waters.place(placement)?;
        let done = waters.placement_done;
        let own = render::own_waters(waters);
        let next = waters.next_ship();
        let both_placed = state.both_placed();
        ctx.store.save(&mut session).await?;

        if !done {
            let prompt = placement_prompt(&own, &format!("{} placed.\n\n", ship), next);
            ctx.dm(session_id, actor, &prompt, Keyboard::none()).await?;
            return Ok(());
        }

        ctx.conversations.end(actor);
        if both_placed {
            ctx.dm_or_warn(
                session_id,
                actor,
                &format!("All ships placed!\n\nYOUR BOARD:\n{}\nThe battle begins!", own),
            )
            .await;
            self.start_battle(&mut session).await
        } else {
            ctx.dm(
                session_id,
                actor,
                &format!(
                    "All ships placed!\n\nYOUR BOARD:\n{}\nWaiting for your opponent to finish placing their ships.",
                    own
                ),
                Keyboard::none(),
            )
            .await?;
            Ok(())
        }
    }

    async fn battleship_public_text(&self, session: &GameSession) -> Result<String> {
        let ctx = self.context();
        let state = battleship_state(session)?;
        let room = session.room_id;
        let challenger = ctx.name(room, session.challenger_id).await;
        let opponent = ctx.name(room, session.opponent_id).await;
        let turn = ctx.name(room, state.turn).await;
        Ok(render::public_boards(
            &challenger,
            &state.challenger,
            &opponent,
            &state.opponent,
            &turn,
        ))
    }

    async fn start_battle(&self, session: &mut GameSession) -> Result<()> {
        let ctx = self.context();
        let text = self.battleship_public_text(session).await?;
        let board = ctx
            .post_tracked(&session.id, session.room_id, &text, Keyboard::none())
            .await?;
        session.public_board = Some(board);
        ctx.store.save(session).await?;
        log::info!("Battleship session {} started", session.id);
        self.send_turn_prompt(session).await
    }

    fn attack_prompt(session: &GameSession, attacker: ParticipantId) -> Result<String> {
        let state = battleship_state(session)?;
        let role = session.require_role(attacker)?;
        Ok(format!(
            "YOUR BOARD:\n{}\nOPPONENT'S BOARD:\n{}\nSelect a column to attack:",
            render::own_waters(state.waters(role)),
            render::target_waters(state.waters(role.other()))
        ))
    }

    async fn send_turn_prompt(&self, session: &GameSession) -> Result<()> {
        let attacker = battleship_state(session)?.turn;
        let prompt = Self::attack_prompt(session, attacker)?;
        self.context()
            .dm(&session.id, attacker, &prompt, render::column_picker(&session.id))
            .await?;
        Ok(())
    }

    /// First attack step: swap the column picker for a row picker
    pub(crate) async fn pick_column(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        col: u8,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, session) = self.lock_and_load(session_id).await?;
        ensure_active(&session)?;
        session.require_role(actor)?;
        if battleship_state(&session)?.turn != actor {
            return Err(Error::NotYourTurn);
        }
        let column = Coord::new(0, col).ok_or_else(|| Error::InvalidCoordinate(col.to_string()))?;

        let prompt = Self::attack_prompt(&session, actor)?.replace(
            "Select a column to attack:",
            &format!("Column {} selected. Select a row to attack:", (b'A' + column.col) as char),
        );
        self.context()
            .transport
            .edit_text(message, &prompt, render::row_picker(session_id, col))
            .await?;
        Ok(())
    }

    /// Second attack step: fire at the chosen cell
    pub(crate) async fn attack(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        target: Coord,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        ensure_active(&session)?;
        let role = session.require_role(actor)?;
        let defender = session.participant(role.other());

        let state = session.battleship_mut()?;
        if !state.both_placed() {
            return Err(Error::InvalidState("Ships are still being placed.".to_string()));
        }
        if state.turn != actor {
            return Err(Error::NotYourTurn);
        }
        let shot = state.waters_mut(role.other()).fire(target)?;
        let defeated = state.waters(role.other()).all_sunk();
        if !defeated {
            state.turn = defender;
        }

        let result = match shot {
            Shot::Miss => "It's a MISS!".to_string(),
            Shot::Hit { sunk: None } => "It's a HIT!".to_string(),
            Shot::Hit { sunk: Some(ship) } => format!("It's a HIT!\nYou sunk their {}!", ship),
        };

        let ctx = self.context();
        let room = session.room_id;
        let attacker_name = ctx.name(room, actor).await;

        if defeated {
            ctx.say(
                room,
                &format!("The game is over! {} has won the battle!", attacker_name),
            )
            .await;
            self.payout().settle(&mut session, actor, defender).await?;
            ctx.say(
                actor.private_chat(),
                "You are victorious! See the group for the result.",
            )
            .await;
            return Ok(());
        }

        ctx.store.save(&mut session).await?;

        if let Some(board) = session.public_board {
            let text = self.battleship_public_text(&session).await?;
            if let Err(e) = ctx.transport.edit_text(board, &text, Keyboard::none()).await {
                log::warn!("Could not update public board for {}: {}", session_id, e);
            }
        }
        self.acknowledge(
            message,
            &format!(
                "You fired at {}. {}\n\nYour turn is over. The board in the group has been updated.",
                target, result
            ),
        )
        .await;
        ctx.say(
            defender.private_chat(),
            &format!("{} fired at {}. {}", attacker_name, target, result),
        )
        .await;
        self.send_turn_prompt(&session).await
    }

    /// Cancel a game stuck in ship placement, by `/cancel` or the idle sweep.
    /// Returns whether the session was aborted.
    pub(crate) async fn abort_placement(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        timed_out: bool,
    ) -> Result<bool> {
        let ctx = self.context();
        let (_guard, session) = self.lock_and_load(session_id).await?;
        if !matches!(ctx.conversations.get(actor), Some(Conversation::Placement { session_id: ref s, .. }) if s == session_id)
        {
            log::debug!("Placement for {} already finished; nothing to abort", actor);
            return Ok(false);
        }
        let role = session.require_role(actor)?;
        let other = session.participant(role.other());
        let room = session.room_id;
        let name = ctx.name(room, actor).await;

        ctx.discard(session_id).await?;

        let (own, theirs) = if timed_out {
            (
                "Ship placement timed out. The game has been cancelled.".to_string(),
                format!("{} did not place their ships in time. The game has been cancelled.", name),
            )
        } else {
            (
                "You cancelled ship placement. The game has been cancelled.".to_string(),
                format!("{} cancelled ship placement. The game has been cancelled.", name),
            )
        };
        ctx.say(actor.private_chat(), &own).await;
        ctx.say(other.private_chat(), &theirs).await;
        ctx.say(room, "The Battleship game was cancelled during ship placement.").await;
        log::info!(
            "Aborted placement in session {} (participant {}, timed out: {})",
            session_id,
            actor,
            timed_out
        );
        Ok(true)
    }
}
