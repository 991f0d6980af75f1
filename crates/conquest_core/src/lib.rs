//! # Conquest Core
//!
//! Authoritative simulation core for the territory-conquest game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No network IO or file IO
//! - No unseeded randomness (every random choice comes from a seeded stream)
//!
//! This separation enables:
//! - A headless authoritative server
//! - Bots that play through exactly the same action surface as humans
//! - Reproducible games for testing (same seed + same actions = same world)
//!
//! ## Crate Structure
//!
//! - [`world`] - Tiles, players, buildings, missiles and their invariants
//! - [`economy`] - Population allocation, construction, income and cooldowns
//! - [`combat`] - Territorial attack resolution
//! - [`diplomacy`] - Alliance bookkeeping
//! - [`ballistics`] - Nuke launch, interception and impact
//! - [`simulation`] - Action dispatch and the tick scheduler
//! - [`bot`] - Heuristic bot decision engine
//! - [`snapshot`] - Read-only world snapshots for collaborators

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod ballistics;
pub mod bot;
pub mod combat;
pub mod diplomacy;
pub mod economy;
pub mod error;
pub mod map_generation;
pub mod math;
pub mod player_facade;
pub mod rules;
pub mod simulation;
pub mod snapshot;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{Action, ActionKind, ActionMessage};
    pub use crate::bot::{BotController, BotDifficulty, BotProfile};
    pub use crate::error::{ActionError, GameError, Rejection, Result};
    pub use crate::player_facade::PlayerFacade;
    pub use crate::rules::GameRules;
    pub use crate::simulation::{ActionOutcome, Game, GameEvent, TickReport};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::world::{
        Building, BuildingId, BuildingType, Missile, MissileId, Player, PlayerId, Position,
        Terrain, Tile, TileId, World,
    };
}
