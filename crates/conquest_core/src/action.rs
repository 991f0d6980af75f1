//! Actions: the single command surface shared by humans and bots.
//!
//! On the wire an action arrives as an [`ActionMessage`]:
//!
//! ```json
//! { "type": "ATTACK_TERRITORY", "playerId": 3, "data": { "targetTerritoryId": "4-7", "troopCount": 6 } }
//! ```
//!
//! The message is decoded into a typed [`Action`] before it reaches any
//! resolver. The claimed `playerId` is never trusted on its own; see
//! [`crate::simulation::Game::dispatch`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, GameError};
use crate::world::{BuildingType, PlayerId, Position, TileId};

/// A typed player command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Re-split population between workers and troops.
    #[serde(rename_all = "camelCase")]
    AllocatePopulation {
        /// New worker count.
        workers: u32,
        /// New troop count.
        troops: u32,
    },
    /// Construct a building on an owned tile.
    #[serde(rename_all = "camelCase")]
    BuildStructure {
        /// Building type.
        building_type: BuildingType,
        /// Tile to build on.
        territory_id: TileId,
    },
    /// Launch a nuke from a silo.
    #[serde(rename_all = "camelCase")]
    LaunchNuke {
        /// Impact center.
        target_position: Position,
        /// Tile holding the silo.
        launch_site_id: TileId,
    },
    /// Attack a tile.
    #[serde(rename_all = "camelCase")]
    AttackTerritory {
        /// Tile to attack.
        target_territory_id: TileId,
        /// Troops to commit.
        troop_count: u32,
    },
    /// Propose (and auto-form) an alliance.
    #[serde(rename_all = "camelCase")]
    RequestAlliance {
        /// Prospective ally.
        target_player_id: PlayerId,
    },
    /// Dissolve an alliance.
    #[serde(rename_all = "camelCase")]
    BreakAlliance {
        /// Current ally.
        target_player_id: PlayerId,
    },
}

impl Action {
    /// The discriminant of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::AllocatePopulation { .. } => ActionKind::AllocatePopulation,
            Self::BuildStructure { .. } => ActionKind::BuildStructure,
            Self::LaunchNuke { .. } => ActionKind::LaunchNuke,
            Self::AttackTerritory { .. } => ActionKind::AttackTerritory,
            Self::RequestAlliance { .. } => ActionKind::RequestAlliance,
            Self::BreakAlliance { .. } => ActionKind::BreakAlliance,
        }
    }
}

/// Action type names as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// `ALLOCATE_POPULATION`
    AllocatePopulation,
    /// `BUILD_STRUCTURE`
    BuildStructure,
    /// `LAUNCH_NUKE`
    LaunchNuke,
    /// `ATTACK_TERRITORY`
    AttackTerritory,
    /// `REQUEST_ALLIANCE`
    RequestAlliance,
    /// `BREAK_ALLIANCE`
    BreakAlliance,
}

impl ActionKind {
    /// Every action kind.
    pub const ALL: [Self; 6] = [
        Self::AllocatePopulation,
        Self::BuildStructure,
        Self::LaunchNuke,
        Self::AttackTerritory,
        Self::RequestAlliance,
        Self::BreakAlliance,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllocatePopulation => "ALLOCATE_POPULATION",
            Self::BuildStructure => "BUILD_STRUCTURE",
            Self::LaunchNuke => "LAUNCH_NUKE",
            Self::AttackTerritory => "ATTACK_TERRITORY",
            Self::RequestAlliance => "REQUEST_ALLIANCE",
            Self::BreakAlliance => "BREAK_ALLIANCE",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An undecoded action as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMessage {
    /// Wire name of the action type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Player the payload claims to act for.
    pub player_id: PlayerId,
    /// Type-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ActionMessage {
    /// Wrap a typed action for `player`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if the payload cannot be encoded.
    pub fn new(player_id: PlayerId, action: &Action) -> Result<Self, GameError> {
        let mut value =
            serde_json::to_value(action).map_err(|e| GameError::Serialization(e.to_string()))?;
        let data = value
            .get_mut("data")
            .map(serde_json::Value::take)
            .unwrap_or_default();
        Ok(Self {
            kind: action.kind().as_str().to_string(),
            player_id,
            data,
        })
    }

    /// Parse a message from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Malformed`] if the envelope itself is invalid.
    pub fn from_json(text: &str) -> Result<Self, ActionError> {
        serde_json::from_str(text).map_err(|e| ActionError::Malformed(e.to_string()))
    }

    /// Decode the payload into a typed action.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownActionType`] for unrecognized type names
    /// and [`ActionError::Malformed`] when the payload does not match the type.
    pub fn decode(&self) -> Result<Action, ActionError> {
        let kind = ActionKind::parse(&self.kind)
            .ok_or_else(|| ActionError::UnknownActionType(self.kind.clone()))?;
        let tagged = serde_json::json!({ "type": kind.as_str(), "data": self.data });
        serde_json::from_value(tagged)
            .map_err(|e| ActionError::Malformed(format!("{kind}: {e}")))
    }
}
