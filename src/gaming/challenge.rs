//! Challenge setup flow
//!
//! `/newgame` in reply to someone creates the session. The challenger then
//! picks a game (and a round count for dice), a stake type and a stake, and
//! confirms. The opponent accepts, submits a stake of their own, and the game
//! starts. The session status is the source of truth for which step is
//! allowed; the conversation registry only routes typed text and uploads.

use std::time::Instant;

use crate::error::{Error, Result};
use crate::gaming::battleship::BattleshipState;
use crate::gaming::connect_four::ConnectFourState;
use crate::gaming::dice::DiceState;
use crate::gaming::game_orchestrator::GameOrchestrator;
use crate::gaming::render;
use crate::protocol::{
    Action, Attachment, Button, Callback, Keyboard, MessageRef, ParticipantId, SessionId,
};
use crate::session::{
    Conversation, GameKind, GameSession, PlayState, Role, SessionStatus, SetupStep, Stake,
    StakeType,
};

fn game_keyboard(session_id: &SessionId) -> Keyboard {
    Keyboard::column(
        GameKind::ALL
            .iter()
            .map(|&kind| Button::new(kind.title(), &Callback::ChooseGame(session_id.clone(), kind)))
            .collect(),
    )
}

fn rounds_keyboard(session_id: &SessionId, allowed: &[u8]) -> Keyboard {
    Keyboard::row(
        allowed
            .iter()
            .map(|&n| Button::new(format!("Best of {}", n), &Callback::ChooseRounds(session_id.clone(), n)))
            .collect(),
    )
}

fn stake_keyboard(session_id: &SessionId) -> Keyboard {
    Keyboard::row(vec![
        Button::new("Points", &Callback::ChooseStake(session_id.clone(), StakeType::Points)),
        Button::new("Media", &Callback::ChooseStake(session_id.clone(), StakeType::Media)),
    ])
}

fn confirm_keyboard(session_id: &SessionId) -> Keyboard {
    Keyboard::column(vec![
        Button::new("✅ Confirm", &Callback::Confirm(session_id.clone())),
        Button::new("🔄 Restart", &Callback::Restart(session_id.clone())),
        Button::new("❌ Cancel", &Callback::Cancel(session_id.clone())),
    ])
}

fn challenge_keyboard(session_id: &SessionId) -> Keyboard {
    Keyboard::row(vec![
        Button::new("Accept", &Callback::Accept(session_id.clone())),
        Button::new("Refuse", &Callback::Refuse(session_id.clone())),
    ])
}

/// Parse a points stake; only whole positive numbers are accepted
pub fn parse_points(text: &str) -> Result<u64> {
    match text.trim().parse::<u64>() {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(Error::InvalidPointsAmount(text.trim().to_string())),
    }
}

/// Human readable game description, e.g. "Dice (best of 5)"
fn describe_game(session: &GameSession) -> String {
    match (session.game_kind, &session.play) {
        (Some(GameKind::Dice), Some(PlayState::Dice(dice))) => {
            format!("Dice (best of {})", dice.best_of)
        }
        (Some(kind), _) => kind.title().to_string(),
        (None, _) => "a game".to_string(),
    }
}

fn require_challenger(session: &GameSession, actor: ParticipantId) -> Result<()> {
    match session.role_of(actor) {
        Some(Role::Challenger) => Ok(()),
        Some(Role::Opponent) => Err(Error::InvalidState(
            "Only the challenger can set up this game.".to_string(),
        )),
        None => Err(Error::NotParticipant(actor)),
    }
}

fn require_invited(session: &GameSession, actor: ParticipantId) -> Result<()> {
    if actor == session.opponent_id {
        Ok(())
    } else {
        Err(Error::NotInvited(actor))
    }
}

/// The status in which `role` may pick or submit a stake
fn ensure_stake_phase(session: &GameSession, role: Role) -> Result<()> {
    let expected = match role {
        Role::Challenger => SessionStatus::AwaitingChallengerStake,
        Role::Opponent => SessionStatus::AwaitingOpponentStake,
    };
    if session.status != expected {
        return Err(Error::InvalidState("You can't set a stake right now.".to_string()));
    }
    if role == Role::Challenger
        && session.game_kind == Some(GameKind::Dice)
        && session.play.is_none()
    {
        return Err(Error::InvalidState("Choose the number of rounds first.".to_string()));
    }
    Ok(())
}

impl GameOrchestrator {
    /// `/newgame` sent as a reply to the opponent's message in a group
    pub(crate) async fn create_challenge(
        &self,
        action: &Action,
        reply_to: Option<ParticipantId>,
    ) -> Result<()> {
        if action.is_private() {
            return Err(Error::InvalidInput(
                "Use /newgame in a group chat, replying to your opponent's message.".to_string(),
            ));
        }
        let opponent = reply_to.ok_or_else(|| {
            Error::InvalidInput(
                "Reply to your opponent's message with /newgame to challenge them.".to_string(),
            )
        })?;
        if opponent == action.from {
            return Err(Error::SelfChallenge);
        }

        let ctx = self.context();
        let session = GameSession::new(action.chat, action.from, opponent);
        let session_id = session.id.clone();
        ctx.store.create(session).await?;

        let challenger_name = ctx.name(action.chat, action.from).await;
        let opponent_name = ctx.name(action.chat, opponent).await;
        ctx.post_tracked(
            &session_id,
            action.chat,
            &format!(
                "⚔️ {} has challenged {} to a game! {}, check your private messages to set it up.",
                challenger_name, opponent_name, challenger_name
            ),
            Keyboard::none(),
        )
        .await?;

        let start = Keyboard::column(vec![Button::new(
            "Start Game Setup",
            &Callback::SetupStart(session_id.clone()),
        )]);
        let invite = format!(
            "You challenged {}. Press the button below to set up the game.",
            opponent_name
        );
        match ctx.dm(&session_id, action.from, &invite, start).await {
            Ok(_) => {
                log::info!(
                    "Challenge {} created in room {}: {} vs {}",
                    session_id,
                    action.chat,
                    action.from,
                    opponent
                );
            }
            Err(e) => {
                log::warn!("Could not reach challenger {} privately: {}", action.from, e);
                ctx.discard(&session_id).await?;
                ctx.say(
                    action.chat,
                    &format!(
                        "{}, I can't send you a private message. Please start a private chat with me, then use /newgame again.",
                        challenger_name
                    ),
                )
                .await;
            }
        }
        Ok(())
    }

    pub(crate) async fn start_setup(&self, actor: ParticipantId, session_id: &SessionId) -> Result<()> {
        let (_guard, session) = self.lock_and_load(session_id).await?;
        require_challenger(&session, actor)?;
        if session.status != SessionStatus::AwaitingGameChoice {
            return Err(Error::InvalidState("This game has already been set up.".to_string()));
        }

        let ctx = self.context();
        ctx.conversations
            .set_step(actor, session_id, Role::Challenger, SetupStep::GameChoice);
        ctx.dm(session_id, actor, "Choose a game:", game_keyboard(session_id))
            .await?;
        Ok(())
    }

    pub(crate) async fn choose_game(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        kind: GameKind,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        require_challenger(&session, actor)?;
        if session.status != SessionStatus::AwaitingGameChoice {
            return Err(Error::InvalidState("The game has already been chosen.".to_string()));
        }

        session.game_kind = Some(kind);
        if kind == GameKind::ConnectFour {
            session.play = Some(PlayState::ConnectFour(ConnectFourState::new(
                session.challenger_id,
            )));
        }
        session.status = SessionStatus::AwaitingChallengerStake;

        let ctx = self.context();
        ctx.store.save(&mut session).await?;
        self.acknowledge(message, &format!("You chose {}.", kind.title()))
            .await;

        if kind == GameKind::Dice {
            ctx.conversations
                .set_step(actor, session_id, Role::Challenger, SetupStep::RoundChoice);
            ctx.dm(
                session_id,
                actor,
                "How many rounds?",
                rounds_keyboard(session_id, &ctx.settings.allowed_best_of),
            )
            .await?;
        } else {
            ctx.conversations
                .set_step(actor, session_id, Role::Challenger, SetupStep::StakeTypeChoice);
            ctx.dm(session_id, actor, "What do you want to stake?", stake_keyboard(session_id))
                .await?;
        }
        Ok(())
    }

    pub(crate) async fn choose_rounds(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        best_of: u8,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        require_challenger(&session, actor)?;
        if session.status != SessionStatus::AwaitingChallengerStake
            || session.game_kind != Some(GameKind::Dice)
        {
            return Err(Error::InvalidState(
                "The round count can only be chosen while setting up a dice game.".to_string(),
            ));
        }

        let ctx = self.context();
        if !ctx.settings.allowed_best_of.contains(&best_of) {
            return Err(Error::InvalidRoundCount(best_of));
        }
        session.play = Some(PlayState::Dice(DiceState::new(best_of)?));
        ctx.store.save(&mut session).await?;

        self.acknowledge(message, &format!("Best of {} it is.", best_of))
            .await;
        ctx.conversations
            .set_step(actor, session_id, Role::Challenger, SetupStep::StakeTypeChoice);
        ctx.dm(session_id, actor, "What do you want to stake?", stake_keyboard(session_id))
            .await?;
        Ok(())
    }

    pub(crate) async fn choose_stake(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        stake_type: StakeType,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, session) = self.lock_and_load(session_id).await?;
        let role = session.require_role(actor)?;
        ensure_stake_phase(&session, role)?;

        let ctx = self.context();
        self.acknowledge(message, &format!("You will stake {}.", stake_type))
            .await;
        match stake_type {
            StakeType::Points => {
                let balance = ctx.ledger.balance(session.room_id, actor).await?;
                ctx.conversations
                    .set_step(actor, session_id, role, SetupStep::PointsSubmission);
                ctx.dm(
                    session_id,
                    actor,
                    &format!(
                        "How many points do you want to stake? You have {} points.",
                        balance
                    ),
                    Keyboard::none(),
                )
                .await?;
            }
            StakeType::Media => {
                ctx.conversations
                    .set_step(actor, session_id, role, SetupStep::MediaSubmission);
                ctx.dm(
                    session_id,
                    actor,
                    "Send the photo, video or voice note you want to stake.",
                    Keyboard::none(),
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Typed points amount during stake submission
    pub(crate) async fn submit_points(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        role: Role,
        text: &str,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        ensure_stake_phase(&session, role)?;

        let amount = parse_points(text)?;
        let balance = self
            .context()
            .ledger
            .balance(session.room_id, actor)
            .await?;
        if i128::from(amount) > i128::from(balance) {
            return Err(Error::InsufficientBalance {
                balance,
                requested: amount,
            });
        }

        session.set_stake(role, Stake::Points { amount });
        self.after_stake(actor, session, role).await
    }

    /// Uploaded file during stake submission
    pub(crate) async fn submit_media(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        role: Role,
        attachment: &Attachment,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        ensure_stake_phase(&session, role)?;

        let kind = attachment.media_kind().ok_or(Error::InvalidMediaStake)?;
        session.set_stake(role, Stake::media(kind, attachment.reference.clone()));
        self.after_stake(actor, session, role).await
    }

    async fn after_stake(&self, actor: ParticipantId, mut session: GameSession, role: Role) -> Result<()> {
        let ctx = self.context();
        match role {
            Role::Challenger => {
                session.status = SessionStatus::AwaitingConfirmation;
                ctx.store.save(&mut session).await?;
                ctx.conversations
                    .set_step(actor, &session.id, role, SetupStep::Confirmation);

                let opponent_name = ctx.name(session.room_id, session.opponent_id).await;
                let stake = session
                    .challenger_stake
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let summary = format!(
                    "Please confirm your game:\n\nGame: {}\nYour stake: {}\nOpponent: {}",
                    describe_game(&session),
                    stake,
                    opponent_name
                );
                ctx.dm(&session.id, actor, &summary, confirm_keyboard(&session.id))
                    .await?;
            }
            Role::Opponent => {
                session.status = SessionStatus::Active;
                ctx.store.save(&mut session).await?;
                ctx.conversations.end(actor);
                ctx.dm_or_warn(
                    &session.id,
                    actor,
                    "Your stake is set. The game is starting in the group!",
                )
                .await;
                log::info!("Session {} is now active", session.id);
                self.activate(session).await?;
            }
        }
        Ok(())
    }

    pub(crate) async fn confirm(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        require_challenger(&session, actor)?;
        if session.status != SessionStatus::AwaitingConfirmation {
            return Err(Error::InvalidState("There is nothing to confirm.".to_string()));
        }
        let stake = session
            .challenger_stake
            .clone()
            .ok_or_else(|| Error::UnresolvedStake(session.id.clone()))?;

        let ctx = self.context();
        session.status = SessionStatus::AwaitingOpponentResponse;
        ctx.store.save(&mut session).await?;
        ctx.conversations.end(actor);

        let room = session.room_id;
        let challenger_name = ctx.name(room, session.challenger_id).await;
        let opponent_name = ctx.name(room, session.opponent_id).await;
        self.acknowledge(
            message,
            &format!("Challenge sent! Waiting for {} to respond.", opponent_name),
        )
        .await;
        ctx.post_tracked(
            session_id,
            room,
            &format!(
                "{}, {} challenges you to {}! Their stake: {}. Do you accept?",
                opponent_name,
                challenger_name,
                describe_game(&session),
                stake
            ),
            challenge_keyboard(session_id),
        )
        .await?;
        Ok(())
    }

    /// Cancel button or `/cancel` while the challenger is still setting up
    pub(crate) async fn cancel_setup(&self, actor: ParticipantId, session_id: &SessionId) -> Result<()> {
        let (_guard, session) = self.lock_and_load(session_id).await?;
        require_challenger(&session, actor)?;
        if !session.status.in_challenger_setup() {
            return Err(Error::InvalidState("This game can no longer be cancelled.".to_string()));
        }

        let ctx = self.context();
        ctx.discard(session_id).await?;
        ctx.say(actor.private_chat(), "Game setup cancelled.").await;
        Ok(())
    }

    pub(crate) async fn restart_setup(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        require_challenger(&session, actor)?;
        if !session.status.in_challenger_setup() {
            return Err(Error::InvalidState("This game can no longer be restarted.".to_string()));
        }

        let ctx = self.context();
        session.restart();
        ctx.store.save(&mut session).await?;
        self.acknowledge(message, "Starting over.").await;
        ctx.conversations
            .set_step(actor, session_id, Role::Challenger, SetupStep::GameChoice);
        ctx.dm(session_id, actor, "Choose a game:", game_keyboard(session_id))
            .await?;
        Ok(())
    }

    /// Accept may be pressed again while the stake is outstanding
    pub(crate) async fn accept(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
        message: MessageRef,
    ) -> Result<()> {
        let (_guard, mut session) = self.lock_and_load(session_id).await?;
        require_invited(&session, actor)?;
        if !matches!(
            session.status,
            SessionStatus::AwaitingOpponentResponse | SessionStatus::AwaitingOpponentStake
        ) {
            return Err(Error::InvalidState("This challenge is no longer open.".to_string()));
        }

        let ctx = self.context();
        session.status = SessionStatus::AwaitingOpponentStake;
        ctx.store.save(&mut session).await?;

        let opponent_name = ctx.name(session.room_id, actor).await;
        let keyboard = Keyboard::column(vec![Button::new(
            "Set your stake",
            &Callback::SetupOpponent(session_id.clone()),
        )]);
        match ctx
            .dm(
                session_id,
                actor,
                "You have accepted the challenge! Press the button below to set your stake.",
                keyboard,
            )
            .await
        {
            Ok(_) => {
                self.acknowledge(
                    message,
                    &format!(
                        "Challenge accepted! {}, check your private messages to set your stake.",
                        opponent_name
                    ),
                )
                .await;
            }
            Err(e) => {
                log::warn!("Could not reach opponent {} privately: {}", actor, e);
                ctx.post_tracked(
                    session_id,
                    session.room_id,
                    &format!(
                        "{}, I can't send you a private message because you haven't started a chat with me. Please start a chat with me and then press Accept on the challenge again.",
                        opponent_name
                    ),
                    Keyboard::none(),
                )
                .await?;
            }
        }
        Ok(())
    }

    /// "Set your stake" button in the opponent's private chat
    pub(crate) async fn start_opponent_setup(
        &self,
        actor: ParticipantId,
        session_id: &SessionId,
    ) -> Result<()> {
        let (_guard, session) = self.lock_and_load(session_id).await?;
        require_invited(&session, actor)?;
        if session.status != SessionStatus::AwaitingOpponentStake {
            return Err(Error::InvalidState("Your stake can't be set right now.".to_string()));
        }

        let ctx = self.context();
        ctx.conversations
            .set_step(actor, session_id, Role::Opponent, SetupStep::StakeTypeChoice);
        ctx.dm(session_id, actor, "What do you want to stake?", stake_keyboard(session_id))
            .await?;
        Ok(())
    }

    pub(crate) async fn refuse(&self, actor: ParticipantId, session_id: &SessionId) -> Result<()> {
        let (_guard, session) = self.lock_and_load(session_id).await?;
        require_invited(&session, actor)?;
        if !matches!(
            session.status,
            SessionStatus::AwaitingOpponentResponse | SessionStatus::AwaitingOpponentStake
        ) {
            return Err(Error::InvalidState("This challenge is no longer open.".to_string()));
        }
        self.payout().settle_refusal(&session).await
    }

    /// Both stakes are in: start the chosen game
    async fn activate(&self, mut session: GameSession) -> Result<()> {
        let ctx = self.context();
        let room = session.room_id;
        let challenger_name = ctx.name(room, session.challenger_id).await;
        let opponent_name = ctx.name(room, session.opponent_id).await;

        match session.game_kind {
            Some(GameKind::Dice) => {
                let best_of = {
                    let dice = session.dice_mut()?;
                    dice.reset();
                    dice.best_of
                };
                ctx.store.save(&mut session).await?;
                ctx.post_tracked(
                    &session.id,
                    room,
                    &format!(
                        "🎲 Dice duel: {} vs {}, best of {}!\nRound 1: both players send a 🎲.",
                        challenger_name, opponent_name, best_of
                    ),
                    Keyboard::none(),
                )
                .await?;
            }
            Some(GameKind::ConnectFour) => {
                let state = session.connect_four_mut()?.clone();
                let text = self.connect_four_text(&session, &state).await;
                ctx.post_tracked(
                    &session.id,
                    room,
                    &text,
                    render::connect_four_keyboard(&session.id),
                )
                .await?;
            }
            Some(GameKind::Battleship) => {
                session.play = Some(PlayState::Battleship(BattleshipState::new(
                    session.challenger_id,
                )));
                ctx.store.save(&mut session).await?;
                // The idle clock runs from activation, pressed button or not
                let now = Instant::now();
                for player in [session.challenger_id, session.opponent_id] {
                    ctx.conversations.begin(
                        player,
                        Conversation::Placement {
                            session_id: session.id.clone(),
                            last_activity: now,
                        },
                    );
                }
                let keyboard = Keyboard::column(vec![Button::new(
                    "Begin Ship Placement",
                    &Callback::BeginPlacement(session.id.clone()),
                )]);
                for (player, other) in [
                    (session.challenger_id, &opponent_name),
                    (session.opponent_id, &challenger_name),
                ] {
                    let text = format!(
                        "Your Battleship game against {} is ready. Press the button below to place your ships.",
                        other
                    );
                    if let Err(e) = ctx.dm(&session.id, player, &text, keyboard.clone()).await {
                        log::warn!("Could not send placement invite to {}: {}", player, e);
                        let name = ctx.name(room, player).await;
                        ctx.say(
                            room,
                            &format!(
                                "{}, I can't send you a private message. Please start a chat with me so you can place your ships.",
                                name
                            ),
                        )
                        .await;
                    }
                }
                ctx.say(
                    room,
                    &format!(
                        "🚢 Battleship: {} vs {}! Both players are placing their ships.",
                        challenger_name, opponent_name
                    ),
                )
                .await;
            }
            None => return Err(Error::MissingPlayState(session.id.clone())),
        }
        Ok(())
    }
}
