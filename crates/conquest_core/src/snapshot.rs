//! Read-only world snapshots.
//!
//! A snapshot is a complete, owned copy of the world at an action or tick
//! boundary. Collaborators (broadcast, rendering, bots on another thread)
//! only ever see snapshots, never the live [`World`].

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::rules::GameRules;
use crate::world::{Building, Missile, Player, PlayerId, Tile, TileId, World};

/// One player as seen by observers, with the derived building list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Driven by the bot engine.
    pub is_bot: bool,
    /// Gold.
    pub gold: u64,
    /// `workers + troops`.
    pub population: u32,
    /// Capacity.
    pub max_population: u32,
    /// Workers.
    pub workers: u32,
    /// Mobile troops.
    pub troops: u32,
    /// Owned tiles in id order.
    pub territories: Vec<TileId>,
    /// Buildings on owned tiles.
    pub buildings: Vec<Building>,
    /// Allies.
    pub alliances: Vec<PlayerId>,
    /// Players that attacked this one.
    pub attacked_by: Vec<PlayerId>,
    /// Out of the game.
    pub eliminated: bool,
}

impl PlayerSnapshot {
    fn capture(world: &World, player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            color: player.color.clone(),
            is_bot: player.is_bot,
            gold: player.gold,
            population: player.population,
            max_population: player.max_population,
            workers: player.workers,
            troops: player.troops,
            territories: player.territories.iter().copied().collect(),
            buildings: world.buildings_of(player.id).into_iter().cloned().collect(),
            alliances: player.alliances.iter().copied().collect(),
            attacked_by: player.attacked_by.iter().copied().collect(),
            eliminated: player.eliminated,
        }
    }
}

/// Complete world state at one boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    /// Ticks processed.
    pub tick: u64,
    /// Simulation clock.
    pub now_ms: u64,
    /// Map width.
    pub width: u32,
    /// Map height.
    pub height: u32,
    /// Players in id order.
    pub players: Vec<PlayerSnapshot>,
    /// Tiles in row-major order.
    pub tiles: Vec<Tile>,
    /// In-flight missiles in id order.
    pub missiles: Vec<Missile>,
    /// Winner, once decided.
    pub winner: Option<PlayerId>,
    /// Flight time of every missile, for client-side interpolation.
    pub missile_travel_time_ms: u64,
}

impl WorldSnapshot {
    /// Copy the world.
    #[must_use]
    pub fn capture(world: &World, rules: &GameRules) -> Self {
        Self {
            tick: world.tick(),
            now_ms: world.now_ms(),
            width: world.width(),
            height: world.height(),
            players: world
                .players()
                .map(|p| PlayerSnapshot::capture(world, p))
                .collect(),
            tiles: world.tiles().to_vec(),
            missiles: world.missiles().cloned().collect(),
            winner: world.winner(),
            missile_travel_time_ms: rules.nuke.travel_time_ms,
        }
    }

    /// Look up a player.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Look up a tile.
    #[must_use]
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        if id.x >= self.width || id.y >= self.height {
            return None;
        }
        self.tiles
            .get((id.y as usize) * (self.width as usize) + (id.x as usize))
    }

    /// Encode as JSON for the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Encode compactly with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Decode a snapshot produced by [`WorldSnapshot::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| GameError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Game;
    use crate::world::BuildingType;
    use crate::action::Action;

    #[test]
    fn test_snapshot_mirrors_world() {
        let mut game = Game::new(GameRules::default(), 3).unwrap();
        let a = game.add_player("A", false).unwrap();
        let tile = *game.world().player(a).unwrap().territories.iter().next().unwrap();
        game.apply(
            a,
            Action::BuildStructure {
                building_type: BuildingType::City,
                territory_id: tile,
            },
        )
        .unwrap();

        let snap = game.snapshot();
        assert_eq!(snap.width, 30);
        assert_eq!(snap.tiles.len(), 600);
        let player = snap.player(a).unwrap();
        assert_eq!(player.territories, vec![tile]);
        assert_eq!(player.buildings.len(), 1);
        assert_eq!(player.buildings[0].kind, BuildingType::City);
        assert_eq!(snap.tile(tile).unwrap().owner, Some(a));
        assert_eq!(snap.missile_travel_time_ms, 5_000);
    }

    #[test]
    fn test_json_field_names() {
        let mut game = Game::new(GameRules::default(), 3).unwrap();
        game.add_player("A", false).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&game.snapshot().to_json().unwrap()).unwrap();
        assert!(json["players"][0]["maxPopulation"].is_number());
        assert!(json["players"][0]["isBot"].is_boolean());
        assert!(json["tiles"][0]["id"].as_str().is_some_and(|id| id == "0-0"));
        assert!(json["winner"].is_null());
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut game = Game::new(GameRules::default(), 5).unwrap();
        game.add_player("A", false).unwrap();
        game.tick();
        let snap = game.snapshot();
        let decoded = WorldSnapshot::from_bytes(&snap.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, snap);
    }
}
