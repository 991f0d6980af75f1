//! Error types for the game simulation.
//!
//! Three layers:
//! - [`GameError`] for setup, configuration and state problems.
//! - [`Rejection`] for a single failed precondition of an action.
//! - [`ActionError`] for everything that can go wrong at the action-dispatch
//!   boundary. None of them ever leaves the world partially mutated.

use thiserror::Error;

use crate::world::{BuildingType, PlayerId, Position, Terrain, TileId};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for simulation setup and state errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Rules failed validation.
    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    /// No unowned plains tile is left for a joining player.
    #[error("No starting tile available for player '{0}'")]
    NoStartingTile(String),

    /// Player does not exist.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Snapshot or message (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// A precondition an action failed to meet.
///
/// Rejections are always recoverable and are reported only to the actor that
/// issued the action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The acting or targeted player does not exist.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// Eliminated players cannot act.
    #[error("player {0} has been eliminated")]
    PlayerEliminated(PlayerId),

    /// The tile id is outside the map.
    #[error("unknown tile {0}")]
    UnknownTile(TileId),

    /// A target position is outside the map.
    #[error("position ({}, {}) is outside the map", .0.x, .0.y)]
    OutOfBounds(Position),

    /// The player does not own the tile.
    #[error("tile {tile} is not owned by player {player}")]
    NotTileOwner {
        /// The acting player.
        player: PlayerId,
        /// The tile in question.
        tile: TileId,
    },

    /// Not enough gold.
    #[error("insufficient gold: need {required}, have {available}")]
    InsufficientGold {
        /// Gold required.
        required: u64,
        /// Gold available.
        available: u64,
    },

    /// Not enough mobile troops.
    #[error("insufficient troops: need {required}, have {available}")]
    InsufficientTroops {
        /// Troops requested.
        required: u32,
        /// Troops available.
        available: u32,
    },

    /// Attacks must commit at least one troop.
    #[error("an attack must commit at least one troop")]
    NoTroopsCommitted,

    /// Worker/troop split does not sum to the population.
    #[error("allocation of {workers} workers + {troops} troops does not match population {population}")]
    AllocationMismatch {
        /// Requested workers.
        workers: u32,
        /// Requested troops.
        troops: u32,
        /// Actual population.
        population: u32,
    },

    /// Terrain does not allow the building type.
    #[error("{building} cannot be built on {terrain}")]
    TerrainForbids {
        /// Requested building.
        building: BuildingType,
        /// Terrain of the tile.
        terrain: Terrain,
    },

    /// Water tiles can never be owned.
    #[error("tile {0} cannot be owned")]
    Unownable(TileId),

    /// A building of this type already stands on the tile.
    #[error("tile {tile} already has a {building}")]
    DuplicateBuilding {
        /// Tile in question.
        tile: TileId,
        /// Requested building.
        building: BuildingType,
    },

    /// The target tile is already owned by the attacker.
    #[error("tile {0} is already yours")]
    AlreadyOwned(TileId),

    /// No zero-cooldown missile silo on the launch tile.
    #[error("no ready missile silo on tile {0}")]
    NoReadySilo(TileId),

    /// Alliance already exists.
    #[error("already allied with player {0}")]
    AlreadyAllied(PlayerId),

    /// A player cannot target itself with diplomacy.
    #[error("a player cannot target itself")]
    SelfTarget,
}

/// Failure at the action-dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// A precondition failed; nothing was mutated.
    #[error("invalid action: {0}")]
    Invalid(#[from] Rejection),

    /// The action payload could not be decoded.
    #[error("malformed action: {0}")]
    Malformed(String),

    /// The action type is not one the simulation understands.
    #[error("unknown action type '{0}'")]
    UnknownActionType(String),

    /// The message claims to come from a different player than the sender.
    #[error("action claims player {claimed} but was sent by {sender}")]
    SenderMismatch {
        /// Player id in the payload.
        claimed: PlayerId,
        /// Authenticated sender.
        sender: PlayerId,
    },

    /// An unexpected fault; the world was rolled back.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Reason string reported to the originating actor.
    ///
    /// Internal faults are reported generically.
    #[must_use]
    pub fn public_reason(&self) -> String {
        match self {
            Self::Internal(_) => "Server error".to_string(),
            other => other.to_string(),
        }
    }
}
