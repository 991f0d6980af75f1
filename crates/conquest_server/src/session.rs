//! The session actor.
//!
//! One task owns the [`Game`] and the [`BotController`]. Everything else talks
//! to it through a [`SessionHandle`]: commands go in over an `mpsc` queue with
//! `oneshot` replies, events come out over a `broadcast` channel. Because only
//! the actor touches the game, actions, ticks and bot passes never interleave
//! and every published snapshot sits on an action or tick boundary.
//!
//! # Timers
//!
//! - The tick timer fires every `rules.tick_period_ms`.
//! - The bot timer polls the controller every `bot_poll_ms`; each bot still
//!   acts on its own cadence measured on the simulation clock.
//!
//! Both skip missed ticks instead of bursting to catch up.
//!
//! # Shutdown
//!
//! [`SessionHandle::shutdown`] flips a `watch` flag. The loop checks it before
//! any other work, so a tick that has started always finishes and no new one
//! begins.

use std::sync::Arc;

use conquest_core::bot::{BotController, BotDifficulty};
use conquest_core::math::derive_seed;
use conquest_core::prelude::{ActionMessage, Game, GameEvent, PlayerId, WorldSnapshot};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::error::{Result, ServerError};
use crate::lobby::{JoinKind, Lobby, SessionMode};
use crate::network::{ActionReply, Envelope, ServerEvent};
use crate::ServerConfig;

const RESET_STREAM: u64 = 16;

/// What a successful join hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTicket {
    /// The new human player.
    pub player: PlayerId,
    /// Bots added alongside a single-player join.
    pub bots: Vec<PlayerId>,
}

enum Command {
    Join {
        name: String,
        kind: JoinKind,
        reply: oneshot::Sender<Result<JoinTicket>>,
    },
    Leave {
        player: PlayerId,
        reply: oneshot::Sender<bool>,
    },
    Submit {
        sender: PlayerId,
        message: ActionMessage,
        reply: oneshot::Sender<ActionReply>,
    },
    Snapshot {
        reply: oneshot::Sender<WorldSnapshot>,
    },
    Mode {
        reply: oneshot::Sender<SessionMode>,
    },
    Reset {
        seed: Option<u64>,
        reply: oneshot::Sender<Result<()>>,
    },
    StartBotMatch {
        bots: Vec<BotDifficulty>,
        reply: oneshot::Sender<Result<Vec<PlayerId>>>,
    },
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Envelope>,
    shutdown: Arc<watch::Sender<bool>>,
}

/// Start a session task.
///
/// The session runs until [`SessionHandle::shutdown`] is called or every
/// handle is dropped.
///
/// # Errors
///
/// Returns an error if the config or rules are invalid.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn spawn(config: ServerConfig) -> Result<(SessionHandle, JoinHandle<()>)> {
    config.validate()?;
    let game = Game::new(config.rules.clone(), config.seed)?;
    let bots = BotController::new(config.seed);

    let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
    let (event_tx, _) = broadcast::channel(config.event_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let session = Session {
        config,
        game,
        bots,
        lobby: Lobby::new(),
        events: event_tx.clone(),
        resets: 0,
    };
    let task = tokio::spawn(session.run(command_rx, shutdown_rx));

    Ok((
        SessionHandle {
            commands: command_tx,
            events: event_tx,
            shutdown: Arc::new(shutdown_tx),
        },
        task,
    ))
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| ServerError::SessionClosed)?;
        response.await.map_err(|_| ServerError::SessionClosed)
    }

    /// Seat a human player.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::JoinRejected`] if the join would mix session
    /// modes, a game error if the map is full, or
    /// [`ServerError::SessionClosed`].
    pub async fn join(&self, name: impl Into<String>, kind: JoinKind) -> Result<JoinTicket> {
        let name = name.into();
        self.request(|reply| Command::Join { name, kind, reply })
            .await?
    }

    /// Remove a player. Returns false if the player was not in the world.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::SessionClosed`] if the session is gone.
    pub async fn leave(&self, player: PlayerId) -> Result<bool> {
        self.request(|reply| Command::Leave { player, reply }).await
    }

    /// Submit a decoded action message from an authenticated sender.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::SessionClosed`] if the session is gone. Refused
    /// actions are reported in the reply, not as errors.
    pub async fn submit(&self, sender: PlayerId, message: ActionMessage) -> Result<ActionReply> {
        self.request(|reply| Command::Submit {
            sender,
            message,
            reply,
        })
        .await
    }

    /// Submit a raw JSON action frame from an authenticated sender.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::SessionClosed`] if the session is gone.
    pub async fn submit_json(&self, sender: PlayerId, frame: &str) -> Result<ActionReply> {
        match ActionMessage::from_json(frame) {
            Ok(message) => self.submit(sender, message).await,
            Err(err) => {
                tracing::debug!(sender = %sender, %err, "Malformed action frame");
                let _ = self.events.send(Envelope::to(
                    sender,
                    ServerEvent::ActionFailed {
                        reason: err.public_reason(),
                    },
                ));
                Ok(ActionReply::failed(&err))
            }
        }
    }

    /// Current world state.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::SessionClosed`] if the session is gone.
    pub async fn snapshot(&self) -> Result<WorldSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Current lobby mode.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::SessionClosed`] if the session is gone.
    pub async fn mode(&self) -> Result<SessionMode> {
        self.request(|reply| Command::Mode { reply }).await
    }

    /// Replace the world with a fresh one and forget every player.
    ///
    /// Without a seed the next seed in the session's sequence is used.
    ///
    /// # Errors
    ///
    /// Returns an error if map generation fails or the session is gone.
    pub async fn reset(&self, seed: Option<u64>) -> Result<()> {
        self.request(|reply| Command::Reset { seed, reply }).await?
    }

    /// Reset into a bots-only match with one bot per difficulty. Joins are
    /// refused until the next [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::JoinRejected`] if humans are playing or another
    /// bot match is running, a game
    /// error if the map cannot hold the bots, or
    /// [`ServerError::SessionClosed`].
    pub async fn start_bot_match(&self, bots: Vec<BotDifficulty>) -> Result<Vec<PlayerId>> {
        self.request(|reply| Command::StartBotMatch { bots, reply })
            .await?
    }

    /// Receive every event the session publishes from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.events.subscribe()
    }

    /// Stop the session after any work in progress.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Whether the session task has stopped accepting commands.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

struct Session {
    config: ServerConfig,
    game: Game,
    bots: BotController,
    lobby: Lobby,
    events: broadcast::Sender<Envelope>,
    resets: u64,
}

fn timer(start: Instant, period: std::time::Duration) -> Interval {
    let mut interval = time::interval_at(start + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl Session {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let start = Instant::now();
        let mut ticks = timer(start, self.config.tick_period());
        let mut bot_polls = timer(start, self.config.bot_poll_period());

        tracing::info!(seed = self.game.seed(), "Session started");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = ticks.tick() => self.on_tick(),
                _ = bot_polls.tick() => self.on_bot_poll(),
            }
        }
        tracing::info!(tick = self.game.world().tick(), "Session stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Join { name, kind, reply } => {
                let _ = reply.send(self.join(&name, &kind));
            }
            Command::Leave { player, reply } => {
                let _ = reply.send(self.leave(player));
            }
            Command::Submit {
                sender,
                message,
                reply,
            } => {
                let _ = reply.send(self.submit(sender, &message));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.game.snapshot());
            }
            Command::Mode { reply } => {
                let _ = reply.send(self.lobby.mode());
            }
            Command::Reset { seed, reply } => {
                let seed = seed.unwrap_or_else(|| self.next_seed());
                let _ = reply.send(self.reset_world(seed));
            }
            Command::StartBotMatch { bots, reply } => {
                let _ = reply.send(self.start_bot_match(&bots));
            }
        }
    }

    fn next_seed(&mut self) -> u64 {
        self.resets += 1;
        derive_seed(self.config.seed, RESET_STREAM, self.resets)
    }

    fn join(&mut self, name: &str, kind: &JoinKind) -> Result<JoinTicket> {
        self.lobby.admit(kind)?;
        if matches!(kind, JoinKind::SinglePlayer { .. }) {
            let seed = self.next_seed();
            self.reset_world(seed)?;
        }

        let player = self.game.add_player(name, false)?;
        self.lobby.joined(player, kind);
        self.announce_join(player);

        let mut bots = Vec::new();
        if let JoinKind::SinglePlayer {
            bots: count,
            difficulty,
        } = kind
        {
            for _ in 0..*count {
                match self.bots.add_bot(&mut self.game, *difficulty) {
                    Ok(bot) => {
                        self.announce_join(bot);
                        bots.push(bot);
                    }
                    Err(err) => {
                        tracing::warn!(%err, added = bots.len(), "Could not seat every bot");
                        break;
                    }
                }
            }
        }

        tracing::info!(player = %player, mode = %self.lobby.mode(), bots = bots.len(), "Human joined");
        self.publish_snapshot();
        Ok(JoinTicket { player, bots })
    }

    fn leave(&mut self, player: PlayerId) -> bool {
        let removed = if self.bots.brain(player).is_some() {
            self.bots.remove_bot(&mut self.game, player)
        } else {
            self.game.remove_player(player)
        };
        match removed {
            Ok(removed) => tracing::info!(player = %player, name = %removed.name, "Player left"),
            Err(err) => {
                tracing::debug!(player = %player, %err, "Leave for unknown player");
                return false;
            }
        }
        self.publish(Envelope::broadcast(ServerEvent::PlayerLeft { player_id: player }));

        if self.lobby.left(player) {
            tracing::info!("Last human left, resetting session");
            let seed = self.next_seed();
            if let Err(err) = self.reset_world(seed) {
                tracing::error!(%err, "Failed to reset session");
            }
        } else {
            self.publish_snapshot();
        }
        true
    }

    fn submit(&mut self, sender: PlayerId, message: &ActionMessage) -> ActionReply {
        let result = self.game.dispatch(sender, message);
        match &result {
            Ok(outcome) => {
                self.publish_events(outcome.events.iter().cloned());
                self.publish_snapshot();
            }
            Err(err) => self.publish(Envelope::to(
                sender,
                ServerEvent::ActionFailed {
                    reason: err.public_reason(),
                },
            )),
        }
        ActionReply::from(&result)
    }

    fn reset_world(&mut self, seed: u64) -> Result<()> {
        self.regenerate(seed)?;
        self.lobby.clear();
        Ok(())
    }

    /// Fresh map and bots, lobby untouched.
    fn regenerate(&mut self, seed: u64) -> Result<()> {
        self.game.reset(seed)?;
        self.bots = BotController::new(seed);
        self.publish_snapshot();
        Ok(())
    }

    fn start_bot_match(&mut self, difficulties: &[BotDifficulty]) -> Result<Vec<PlayerId>> {
        self.lobby.start_bot_match()?;
        let seed = self.next_seed();
        if let Err(err) = self.regenerate(seed) {
            self.lobby.clear();
            return Err(err);
        }
        let mut ids = Vec::with_capacity(difficulties.len());
        for difficulty in difficulties {
            let id = self.bots.add_bot(&mut self.game, *difficulty)?;
            self.announce_join(id);
            ids.push(id);
        }
        tracing::info!(bots = ids.len(), seed, "Bot match started");
        self.publish_snapshot();
        Ok(ids)
    }

    fn on_tick(&mut self) {
        let report = self.game.tick();
        if report.faulted {
            tracing::warn!(tick = report.tick, "Tick rolled back");
        }
        self.publish_events(report.events);
        self.publish_snapshot();
    }

    /// Every accepted bot action is followed by its own snapshot, taken
    /// right after that action.
    fn on_bot_poll(&mut self) {
        if self.bots.is_empty() {
            return;
        }
        let rules = &self.config.rules;
        let mut applied = Vec::new();
        self.bots.update_with(&mut self.game, |world, decision| {
            if let Ok(outcome) = decision.result {
                applied.push((outcome.events, WorldSnapshot::capture(world, rules)));
            }
        });
        for (events, snapshot) in applied {
            self.publish_events(events);
            self.publish(Envelope::broadcast(ServerEvent::GameState(snapshot)));
        }
    }

    fn announce_join(&self, player: PlayerId) {
        if let Some(p) = self.game.world().player(player) {
            self.publish(Envelope::broadcast(ServerEvent::PlayerJoined {
                player_id: player,
                name: p.name.clone(),
                is_bot: p.is_bot,
            }));
        }
    }

    fn publish_events(&self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.publish(Envelope::broadcast(event.into()));
        }
    }

    fn publish_snapshot(&self) {
        self.publish(Envelope::broadcast(ServerEvent::GameState(
            self.game.snapshot(),
        )));
    }

    fn publish(&self, envelope: Envelope) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(envelope);
    }
}
