//! # Conquest Dedicated Server
//!
//! Headless authoritative server for the territory-conquest game.
//!
//! Runs the simulation on a single session task that owns the [`Game`],
//! drives the tick and bot timers, and fans events out to players.
//!
//! [`Game`]: conquest_core::simulation::Game

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod lobby;
pub mod network;
pub mod session;

use std::path::Path;
use std::time::Duration;

use conquest_core::rules::GameRules;

pub use error::{Result, ServerError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Rules for every world this server creates.
    pub rules: GameRules,
    /// Master seed for map generation and bots.
    pub seed: u64,
    /// How often bots are polled. Each bot still acts on its own cadence.
    pub bot_poll_ms: u64,
    /// Capacity of the inbound command queue.
    pub command_capacity: usize,
    /// Capacity of the outbound event channel.
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            seed: 0,
            bot_poll_ms: 250,
            command_capacity: 64,
            event_capacity: 256,
        }
    }
}

impl ServerConfig {
    /// Load rules from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_rules(path: &Path) -> Result<GameRules> {
        let source = std::fs::read_to_string(path).map_err(|source| ServerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = GameRules::from_ron_str(&source, &path.display().to_string())?;
        tracing::info!(path = %path.display(), "Loaded rules");
        Ok(rules)
    }

    /// Period of the simulation tick.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.rules.tick_period_ms)
    }

    /// Period of the bot poll.
    #[must_use]
    pub const fn bot_poll_period(&self) -> Duration {
        Duration::from_millis(self.bot_poll_ms)
    }

    /// Check the settings before a session starts.
    ///
    /// # Errors
    ///
    /// Returns an error if a period or capacity is zero or the rules are invalid.
    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;
        if self.bot_poll_ms == 0 {
            return Err(ServerError::InvalidConfig(
                "bot_poll_ms must be positive".to_string(),
            ));
        }
        if self.command_capacity == 0 || self.event_capacity == 0 {
            return Err(ServerError::InvalidConfig(
                "channel capacities must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
