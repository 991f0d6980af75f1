//! Session lobby rules.
//!
//! A session is either empty, a private single-player game against bots, a
//! shared multiplayer world, or a bots-only match. They never mix: a
//! multiplayer join is refused while a single-player game runs and the other
//! way round, and a bot match admits no humans until the session is reset.

use std::collections::BTreeSet;
use std::fmt;

use conquest_core::bot::BotDifficulty;
use conquest_core::world::PlayerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What kind of game the session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Nobody has joined.
    #[default]
    Idle,
    /// One human against bots.
    SinglePlayer,
    /// Humans sharing one world.
    Multiplayer,
    /// Bots only. Ends on an explicit reset.
    BotMatch,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::SinglePlayer => "single_player",
            Self::Multiplayer => "multiplayer",
            Self::BotMatch => "bot_match",
        })
    }
}

/// How a human wants to join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JoinKind {
    /// Start a fresh private game with `bots` opponents.
    SinglePlayer {
        /// Number of bot opponents.
        bots: usize,
        /// Their difficulty.
        difficulty: BotDifficulty,
    },
    /// Join the shared world.
    Multiplayer,
}

impl JoinKind {
    const fn mode(&self) -> SessionMode {
        match self {
            Self::SinglePlayer { .. } => SessionMode::SinglePlayer,
            Self::Multiplayer => SessionMode::Multiplayer,
        }
    }
}

/// Why a join was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinRejection {
    /// A single-player game owns the session.
    #[error("a single-player game is in progress")]
    SinglePlayerInProgress,
    /// A multiplayer game owns the session.
    #[error("a multiplayer game is in progress")]
    MultiplayerInProgress,
    /// A bots-only match owns the session.
    #[error("a bot match is in progress")]
    BotMatchInProgress,
}

/// Tracks the session mode and the humans in it.
#[derive(Debug, Clone, Default)]
pub struct Lobby {
    mode: SessionMode,
    humans: BTreeSet<PlayerId>,
}

impl Lobby {
    /// An idle lobby.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Humans currently seated.
    #[must_use]
    pub const fn humans(&self) -> &BTreeSet<PlayerId> {
        &self.humans
    }

    /// Check whether a join of `kind` may proceed.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the session is owned by the other mode, by
    /// another single-player game, or by a bot match.
    pub const fn admit(&self, kind: &JoinKind) -> Result<(), JoinRejection> {
        match (self.mode, kind) {
            (SessionMode::Idle, _) | (SessionMode::Multiplayer, JoinKind::Multiplayer) => Ok(()),
            (SessionMode::SinglePlayer, _) => Err(JoinRejection::SinglePlayerInProgress),
            (SessionMode::BotMatch, _) => Err(JoinRejection::BotMatchInProgress),
            (SessionMode::Multiplayer, JoinKind::SinglePlayer { .. }) => {
                Err(JoinRejection::MultiplayerInProgress)
            }
        }
    }

    /// Record an admitted human.
    pub fn joined(&mut self, player: PlayerId, kind: &JoinKind) {
        self.mode = kind.mode();
        self.humans.insert(player);
    }

    /// Hand an idle session to a bots-only match.
    ///
    /// # Errors
    ///
    /// Returns the rejection for whatever mode already owns the session.
    pub fn start_bot_match(&mut self) -> Result<(), JoinRejection> {
        match self.mode {
            SessionMode::Idle => {
                self.mode = SessionMode::BotMatch;
                Ok(())
            }
            SessionMode::SinglePlayer => Err(JoinRejection::SinglePlayerInProgress),
            SessionMode::Multiplayer => Err(JoinRejection::MultiplayerInProgress),
            SessionMode::BotMatch => Err(JoinRejection::BotMatchInProgress),
        }
    }

    /// Record a departure. Returns true if the last human left and the
    /// session went back to idle.
    pub fn left(&mut self, player: PlayerId) -> bool {
        if !self.humans.remove(&player) {
            return false;
        }
        if self.humans.is_empty() && self.mode != SessionMode::Idle {
            self.mode = SessionMode::Idle;
            return true;
        }
        false
    }

    /// Forget everyone and go idle.
    pub fn clear(&mut self) {
        self.mode = SessionMode::Idle;
        self.humans.clear();
    }
}
