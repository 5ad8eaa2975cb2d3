//! Game Orchestrator
//!
//! Entry point for every inbound action. It routes commands, button presses,
//! private replies, uploads and dice throws to the setup and play handlers,
//! then turns handler errors into user feedback according to their class:
//! - validation errors re-prompt the acting participant
//! - authorization errors become a transient notice
//! - integrity errors are logged and the action is dropped
//! - collaborator failures are logged and reported as undeliverable
//!
//! A background task aborts ship placements that have gone idle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio::time::interval;

use super::context::GameContext;
use super::payout_engine::PayoutEngine;
use crate::error::{Error, ErrorClass, Result};
use crate::protocol::{
    Action, ActionKind, Attachment, Callback, Keyboard, MessageRef, ParticipantId, SessionId,
};
use crate::session::{Conversation, GameSession, Role, SetupStep};

pub struct GameOrchestrator {
    ctx: Arc<GameContext>,
    payout: PayoutEngine,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl GameOrchestrator {
    pub fn new(ctx: Arc<GameContext>) -> Self {
        Self {
            payout: PayoutEngine::new(ctx.clone()),
            ctx,
            shutdown_tx: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    pub fn payout(&self) -> &PayoutEngine {
        &self.payout
    }

    /// Start the idle placement sweeper
    pub fn start(self: &Arc<Self>) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        let orchestrator = Arc::clone(self);
        let period = self.ctx.settings.sweep_interval;
        tokio::spawn(async move {
            let mut sweep_interval = interval(period);

            loop {
                tokio::select! {
                    _ = sweep_interval.tick() => {
                        let aborted = orchestrator.sweep_idle_placements(Instant::now()).await;
                        if aborted > 0 {
                            log::info!("Aborted {} idle ship placements", aborted);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        log::info!("Game orchestrator started");
    }

    pub async fn stop(&self) {
        let shutdown_tx = self.shutdown_tx.lock().take();
        if let Some(tx) = shutdown_tx {
            let _ = tx.send(()).await;
        }
        log::info!("Game orchestrator stopped");
    }

    /// Handle one inbound action to completion
    pub async fn handle(&self, action: Action) -> Result<()> {
        if let Some(name) = &action.from_name {
            self.ctx.directory.observe(action.from, name);
        }

        match self.dispatch(&action).await {
            Ok(()) => Ok(()),
            Err(e) => self.react(&action, e).await,
        }
    }

    /// Abort placement conversations idle for longer than the timeout
    pub async fn sweep_idle_placements(&self, now: Instant) -> usize {
        let expired = self
            .ctx
            .conversations
            .expired_placements(now, self.ctx.settings.placement_timeout);

        let mut handled = HashSet::new();
        let mut aborted = 0;
        for (participant, session_id) in expired {
            if !handled.insert(session_id.clone()) {
                continue;
            }
            match self.abort_placement(participant, &session_id, true).await {
                Ok(true) => aborted += 1,
                Ok(false) => {}
                Err(e) => {
                    log::warn!(
                        "Could not abort idle placement of {} in session {}: {}",
                        participant,
                        session_id,
                        e
                    );
                    self.ctx.conversations.end(participant);
                }
            }
        }
        self.ctx.locks.prune();
        aborted
    }

    pub(crate) async fn lock_and_load(
        &self,
        session_id: &SessionId,
    ) -> Result<(OwnedMutexGuard<()>, GameSession)> {
        let guard = self.ctx.locks.lock(session_id).await;
        let session = self.ctx.load(session_id).await?;
        Ok((guard, session))
    }

    /// Replace a pressed message's text and drop its buttons
    pub(crate) async fn acknowledge(&self, message: MessageRef, text: &str) {
        if let Err(e) = self
            .ctx
            .transport
            .edit_text(message, text, Keyboard::none())
            .await
        {
            log::warn!("Could not edit message {}: {}", message.message_id, e);
        }
    }

    async fn dispatch(&self, action: &Action) -> Result<()> {
        match &action.kind {
            ActionKind::Command {
                name,
                args,
                reply_to,
            } => self.command(action, name, args, *reply_to).await,
            ActionKind::Button { payload, message } => {
                let callback = Callback::parse(payload)?;
                self.button(action.from, callback, *message).await
            }
            ActionKind::Text { text } if action.is_private() => {
                self.conversation_text(action.from, text).await
            }
            ActionKind::Attachment { attachment } if action.is_private() => {
                self.conversation_attachment(action.from, attachment).await
            }
            ActionKind::Dice { value } if !action.is_private() => {
                self.roll_dice(action, *value).await
            }
            _ => {
                log::trace!("Ignoring action from {} in chat {}", action.from, action.chat);
                Ok(())
            }
        }
    }

    async fn button(&self, actor: ParticipantId, callback: Callback, message: MessageRef) -> Result<()> {
        log::debug!("Button {} pressed by {}", callback, actor);
        match callback {
            Callback::SetupStart(sid) => self.start_setup(actor, &sid).await,
            Callback::SetupOpponent(sid) => self.start_opponent_setup(actor, &sid).await,
            Callback::ChooseGame(sid, kind) => self.choose_game(actor, &sid, kind, message).await,
            Callback::ChooseRounds(sid, n) => self.choose_rounds(actor, &sid, n, message).await,
            Callback::ChooseStake(sid, kind) => self.choose_stake(actor, &sid, kind, message).await,
            Callback::Confirm(sid) => self.confirm(actor, &sid, message).await,
            Callback::Cancel(sid) => self.cancel_setup(actor, &sid).await,
            Callback::Restart(sid) => self.restart_setup(actor, &sid, message).await,
            Callback::Accept(sid) => self.accept(actor, &sid, message).await,
            Callback::Refuse(sid) => self.refuse(actor, &sid).await,
            Callback::DropDisc(sid, col) => self.drop_disc(actor, &sid, col, message).await,
            Callback::BeginPlacement(sid) => self.begin_placement(actor, &sid).await,
            Callback::PickColumn(sid, col) => self.pick_column(actor, &sid, col, message).await,
            Callback::Attack(sid, target) => self.attack(actor, &sid, target, message).await,
        }
    }

    async fn conversation_text(&self, actor: ParticipantId, text: &str) -> Result<()> {
        match self.ctx.conversations.get(actor) {
            Some(Conversation::Setup {
                session_id,
                role,
                step: SetupStep::PointsSubmission,
            }) => self.submit_points(actor, &session_id, role, text).await,
            Some(Conversation::Setup {
                step: SetupStep::MediaSubmission,
                ..
            }) => Err(Error::InvalidMediaStake),
            Some(Conversation::Placement { session_id, .. }) => {
                self.place_ship(actor, &session_id, text).await
            }
            _ => Ok(()),
        }
    }

    async fn conversation_attachment(&self, actor: ParticipantId, attachment: &Attachment) -> Result<()> {
        match self.ctx.conversations.get(actor) {
            Some(Conversation::Setup {
                session_id,
                role,
                step: SetupStep::MediaSubmission,
            }) => self.submit_media(actor, &session_id, role, attachment).await,
            Some(Conversation::Setup {
                step: SetupStep::PointsSubmission,
                ..
            }) => Err(Error::InvalidInput(
                "Please type the number of points you want to stake.".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn command(
        &self,
        action: &Action,
        name: &str,
        args: &[String],
        reply_to: Option<ParticipantId>,
    ) -> Result<()> {
        match name.trim_start_matches('/').to_ascii_lowercase().as_str() {
            "newgame" => self.create_challenge(action, reply_to).await,
            "loser" => self.declare_loser(action, args, reply_to).await,
            "cleangames" => self.clean_games(action.from).await.map(|_| ()),
            "cancel" if action.is_private() => self.cancel_command(action.from).await,
            "roll" if !action.is_private() => {
                let value = rand::thread_rng().gen_range(1..=6);
                let roller = self.ctx.name(action.chat, action.from).await;
                self.ctx
                    .say(action.chat, &format!("🎲 {} rolled a {}.", roller, value))
                    .await;
                self.roll_dice(action, value).await
            }
            other => {
                log::debug!("Ignoring command /{} from {}", other, action.from);
                Ok(())
            }
        }
    }

    /// `/cancel` in a private chat
    async fn cancel_command(&self, actor: ParticipantId) -> Result<()> {
        match self.ctx.conversations.get(actor) {
            Some(Conversation::Setup {
                session_id,
                role: Role::Challenger,
                ..
            }) => self.cancel_setup(actor, &session_id).await,
            Some(Conversation::Setup {
                role: Role::Opponent,
                ..
            }) => {
                self.ctx.conversations.end(actor);
                self.ctx
                    .say(
                        actor.private_chat(),
                        "Stake setup stopped. Press \"Set your stake\" again when you are ready.",
                    )
                    .await;
                Ok(())
            }
            Some(Conversation::Placement { session_id, .. }) => {
                self.abort_placement(actor, &session_id, false).await?;
                Ok(())
            }
            None => {
                self.ctx
                    .say(actor.private_chat(), "There is nothing to cancel.")
                    .await;
                Ok(())
            }
        }
    }

    /// `/loser <id>` or `/loser` in reply: force-settle against that participant
    async fn declare_loser(
        &self,
        action: &Action,
        args: &[String],
        reply_to: Option<ParticipantId>,
    ) -> Result<()> {
        if !self.ctx.directory.is_admin(action.from) {
            return Err(Error::NotAuthorized(action.from));
        }
        let loser = match args.first() {
            Some(arg) => arg.parse::<ParticipantId>()?,
            None => reply_to.ok_or_else(|| {
                Error::InvalidInput(
                    "Usage: /loser <participant id>, or reply to the loser's message.".to_string(),
                )
            })?,
        };

        let latest = self
            .ctx
            .store
            .list_active_for(action.chat, loser)
            .await?
            .pop();
        let Some(latest) = latest else {
            let name = self.ctx.name(action.chat, loser).await;
            return Err(Error::InvalidInput(format!("{} is not in an active game.", name)));
        };

        let (_guard, mut session) = self.lock_and_load(&latest.id).await?;
        let role = session.require_role(loser)?;
        let winner = session.participant(role.other());
        log::info!(
            "Admin {} declared {} the loser of session {}",
            action.from,
            loser,
            session.id
        );
        self.payout.settle(&mut session, winner, loser).await?;
        Ok(())
    }

    /// `/cleangames`: drop every complete session
    pub async fn clean_games(&self, actor: ParticipantId) -> Result<usize> {
        if !self.ctx.directory.is_admin(actor) {
            return Err(Error::NotAuthorized(actor));
        }
        let removed = self.ctx.store.purge_complete().await?;
        self.ctx.locks.prune();
        log::info!("Admin {} removed {} finished sessions", actor, removed);
        self.ctx
            .say(
                actor.private_chat(),
                &format!("Removed {} finished games.", removed),
            )
            .await;
        Ok(removed)
    }

    /// Session the participant is working on, if it can be told
    fn session_hint(&self, action: &Action) -> Option<SessionId> {
        match &action.kind {
            ActionKind::Button { payload, .. } => Callback::parse(payload)
                .ok()
                .map(|callback| callback.session_id().clone()),
            _ => self
                .ctx
                .conversations
                .get(action.from)
                .map(|conversation| conversation.session_id().clone()),
        }
    }

    async fn react(&self, action: &Action, error: Error) -> Result<()> {
        match error.class() {
            ErrorClass::Validation => {
                log::debug!("Rejected input from {}: {}", action.from, error);
                let text = error.to_string();
                if matches!(action.kind, ActionKind::Button { .. }) {
                    self.ctx.notice(action.from, &text).await;
                    return Ok(());
                }
                match self.session_hint(action) {
                    Some(session_id) => {
                        if let Err(e) = self
                            .ctx
                            .post_tracked(&session_id, action.chat, &text, Keyboard::none())
                            .await
                        {
                            log::warn!("Could not re-prompt {}: {}", action.from, e);
                        }
                    }
                    None => self.ctx.say(action.chat, &text).await,
                }
                Ok(())
            }
            ErrorClass::Authorization => {
                log::debug!("Refused action from {}: {}", action.from, error);
                self.ctx.notice(action.from, &error.to_string()).await;
                Ok(())
            }
            ErrorClass::Integrity => {
                log::error!("Dropping action from {}: {}", action.from, error);
                self.ctx
                    .notice(action.from, "This game is no longer available.")
                    .await;
                Ok(())
            }
            ErrorClass::Collaborator => {
                log::warn!("Delivery failed while handling action from {}: {}", action.from, error);
                self.ctx
                    .notice(action.from, "Sorry, I could not deliver a message for this game.")
                    .await;
                Ok(())
            }
            ErrorClass::Infrastructure => {
                log::error!("Failed to handle action from {}: {}", action.from, error);
                Err(error)
            }
        }
    }
}
