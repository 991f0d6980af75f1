//! World model: tiles, players, buildings, missiles.
//!
//! The [`World`] exclusively owns every entity. Accessors are read-only for
//! collaborators; all mutation goes through the resolver modules
//! ([`crate::economy`], [`crate::combat`], [`crate::diplomacy`],
//! [`crate::ballistics`]) or the tick scheduler in [`crate::simulation`].
//!
//! Tile ownership has a single mutation point, [`World::set_owner`], which
//! keeps each player's territory set in step with the tile owner fields.
//! Player building lists are derived from the tiles on demand.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Integer grid position. Also used for nuke targets, which may be any cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two positions.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Stable, position-derived tile identifier. Rendered as `"x-y"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TileId {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TileId {
    /// Create a tile id from grid coordinates.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Grid position of this tile.
    #[must_use]
    pub const fn position(self) -> Position {
        Position::new(self.x as i32, self.y as i32)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x, self.y)
    }
}

impl FromStr for TileId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (x, y) = s
            .split_once('-')
            .ok_or_else(|| format!("tile id '{s}' is not of the form x-y"))?;
        let x = x
            .parse()
            .map_err(|_| format!("tile id '{s}' has an invalid column"))?;
        let y = y
            .parse()
            .map_err(|_| format!("tile id '{s}' has an invalid row"))?;
        Ok(Self { x, y })
    }
}

impl From<TileId> for String {
    fn from(value: TileId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for TileId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Unique identifier for players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for buildings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub u64);

/// Unique identifier for missiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissileId(pub u64);

impl fmt::Display for MissileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missile-{}", self.0)
    }
}

/// Terrain category of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open ground. Starting tiles are always plains.
    #[default]
    Plains,
    /// Doubles the defense of the garrison.
    Mountains,
    /// Never ownable, never buildable.
    Water,
    /// Land next to water; the only terrain that can host a port.
    Coast,
}

impl Terrain {
    /// Whether a player may own a tile of this terrain.
    #[must_use]
    pub const fn is_ownable(self) -> bool {
        !matches!(self, Self::Water)
    }

    /// Whether a building type may be placed on this terrain.
    #[must_use]
    pub const fn allows(self, building: BuildingType) -> bool {
        match (self, building) {
            (Self::Water, _) => false,
            (Self::Coast, BuildingType::Port) => true,
            (_, BuildingType::Port) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plains => "plains",
            Self::Mountains => "mountains",
            Self::Water => "water",
            Self::Coast => "coast",
        };
        f.write_str(name)
    }
}

/// Building catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    /// Raises population capacity.
    City,
    /// Multiplies tile defense.
    DefensePost,
    /// Trade income each tick. Coast only.
    Port,
    /// Launches nukes.
    MissileSilo,
    /// Intercepts hostile nukes.
    SamSite,
}

impl BuildingType {
    /// Every building type, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::City,
        Self::DefensePost,
        Self::Port,
        Self::MissileSilo,
        Self::SamSite,
    ];
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::City => "city",
            Self::DefensePost => "defense_post",
            Self::Port => "port",
            Self::MissileSilo => "missile_silo",
            Self::SamSite => "sam_site",
        };
        f.write_str(name)
    }
}

/// A structure standing on a tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    /// Unique id.
    pub id: BuildingId,
    /// Building type.
    #[serde(rename = "type")]
    pub kind: BuildingType,
    /// Tile the building stands on.
    pub tile: TileId,
    /// Owning player.
    pub owner: PlayerId,
    /// Remaining cooldown in milliseconds. Zero means ready.
    pub cooldown_ms: u64,
}

impl Building {
    /// Whether the building is off cooldown.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.cooldown_ms == 0
    }
}

/// One grid cell; the unit of territorial ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    /// Position-derived id.
    pub id: TileId,
    /// Terrain category.
    pub terrain: Terrain,
    /// Owning player, `None` when neutral.
    pub owner: Option<PlayerId>,
    /// Garrison size.
    pub troops: u32,
    /// At most one building of each type.
    pub buildings: Vec<Building>,
}

impl Tile {
    /// Create an unowned, empty tile.
    #[must_use]
    pub const fn new(id: TileId, terrain: Terrain) -> Self {
        Self {
            id,
            terrain,
            owner: None,
            troops: 0,
            buildings: Vec::new(),
        }
    }

    /// Whether a building of this type stands on the tile.
    #[must_use]
    pub fn has_building(&self, kind: BuildingType) -> bool {
        self.buildings.iter().any(|b| b.kind == kind)
    }

    /// Number of buildings of a type (0 or 1 while invariants hold).
    #[must_use]
    pub fn count(&self, kind: BuildingType) -> usize {
        self.buildings.iter().filter(|b| b.kind == kind).count()
    }

    /// First zero-cooldown building of a type.
    #[must_use]
    pub fn ready_building(&self, kind: BuildingType) -> Option<&Building> {
        self.buildings.iter().find(|b| b.kind == kind && b.is_ready())
    }

    /// Whether `player` owns this tile.
    #[must_use]
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }
}

/// A participant, human or bot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Unique id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Display color (`#RRGGBB`).
    pub color: String,
    /// Whether the bot engine drives this player.
    pub is_bot: bool,
    /// Economic currency.
    pub gold: u64,
    /// Always `workers + troops`.
    pub population: u32,
    /// Population capacity.
    pub max_population: u32,
    /// Economic population.
    pub workers: u32,
    /// Mobile troop pool.
    pub troops: u32,
    /// Tiles this player owns. Mirrors the tile owner fields.
    pub territories: BTreeSet<TileId>,
    /// Allied players. Symmetric.
    pub alliances: BTreeSet<PlayerId>,
    /// Players that have attacked this player.
    pub attacked_by: BTreeSet<PlayerId>,
    /// Monotonic.
    pub eliminated: bool,
}

impl Player {
    /// Rewrite the worker/troop split and recompute population.
    pub fn set_forces(&mut self, workers: u32, troops: u32) {
        self.workers = workers;
        self.troops = troops;
        self.recompute_population();
    }

    /// Restore `population == workers + troops`.
    pub fn recompute_population(&mut self) {
        self.population = self.workers + self.troops;
    }

    /// Whether `other` is an ally.
    #[must_use]
    pub fn is_allied_with(&self, other: PlayerId) -> bool {
        self.alliances.contains(&other)
    }

    /// Whether the player is still in the game.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.eliminated
    }
}

/// One in-flight nuclear strike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Missile {
    /// Unique id.
    pub id: MissileId,
    /// Launching player.
    pub owner: PlayerId,
    /// Launch silo position.
    pub origin: Position,
    /// Impact center.
    pub target: Position,
    /// Simulation clock at launch.
    pub launched_at_ms: u64,
    /// Set when a SAM site stops it.
    pub intercepted: bool,
}

/// The aggregate world state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct World {
    width: u32,
    height: u32,
    /// Row-major, one entry per grid cell, never resized.
    tiles: Vec<Tile>,
    players: BTreeMap<PlayerId, Player>,
    missiles: BTreeMap<MissileId, Missile>,
    winner: Option<PlayerId>,
    tick: u64,
    now_ms: u64,
    next_player_id: u32,
    next_building_id: u64,
    next_missile_id: u64,
}

impl World {
    /// Build a world from row-major terrain.
    ///
    /// # Errors
    ///
    /// Returns an error if `terrain.len() != width * height` or a dimension is zero.
    pub fn from_terrain(width: u32, height: u32, terrain: Vec<Terrain>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidState(
                "world dimensions must be positive".to_string(),
            ));
        }
        if terrain.len() != (width as usize) * (height as usize) {
            return Err(GameError::InvalidState(format!(
                "expected {} terrain cells, got {}",
                width * height,
                terrain.len()
            )));
        }

        let tiles = terrain
            .into_iter()
            .enumerate()
            .map(|(index, terrain)| {
                let x = (index % width as usize) as u32;
                let y = (index / width as usize) as u32;
                Tile::new(TileId::new(x, y), terrain)
            })
            .collect();

        Ok(Self {
            width,
            height,
            tiles,
            players: BTreeMap::new(),
            missiles: BTreeMap::new(),
            winner: None,
            tick: 0,
            now_ms: 0,
            next_player_id: 1,
            next_building_id: 1,
            next_missile_id: 1,
        })
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Ticks processed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulation clock in milliseconds.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Recorded winner, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Whether a position lies on the map.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }

    #[inline]
    fn index(&self, id: TileId) -> Option<usize> {
        if id.x < self.width && id.y < self.height {
            Some((id.y as usize) * (self.width as usize) + (id.x as usize))
        } else {
            None
        }
    }

    /// Get a tile by id.
    #[must_use]
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.index(id).map(|i| &self.tiles[i])
    }

    /// Get a mutable tile by id.
    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.index(id).map(move |i| &mut self.tiles[i])
    }

    /// Tile at a position, if on the map.
    #[must_use]
    pub fn tile_at(&self, position: Position) -> Option<&Tile> {
        if self.contains(position) {
            self.tile(TileId::new(position.x as u32, position.y as u32))
        } else {
            None
        }
    }

    /// All tiles in row-major order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub(crate) fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// Orthogonal neighbours of a tile that lie on the map.
    #[must_use]
    pub fn neighbors(&self, id: TileId) -> Vec<TileId> {
        let p = id.position();
        [(0, 1), (0, -1), (1, 0), (-1, 0)]
            .into_iter()
            .map(|(dx, dy)| Position::new(p.x + dx, p.y + dy))
            .filter(|&n| self.contains(n))
            .map(|n| TileId::new(n.x as u32, n.y as u32))
            .collect()
    }

    /// Tiles within a Manhattan radius of a position, in row-major order.
    #[must_use]
    pub fn tiles_within(&self, center: Position, radius: u32) -> Vec<TileId> {
        self.tiles
            .iter()
            .filter(|t| t.id.position().manhattan_distance(center) <= radius)
            .map(|t| t.id)
            .collect()
    }

    /// Get a player by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get a mutable player by id.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// All players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub(crate) fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Players that are not eliminated, in id order.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_alive())
    }

    /// Number of players currently in the world.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// In-flight missiles in id order.
    pub fn missiles(&self) -> impl Iterator<Item = &Missile> {
        self.missiles.values()
    }

    /// Get a missile by id.
    #[must_use]
    pub fn missile(&self, id: MissileId) -> Option<&Missile> {
        self.missiles.get(&id)
    }

    /// Buildings on the player's tiles, in tile order.
    #[must_use]
    pub fn buildings_of(&self, player: PlayerId) -> Vec<&Building> {
        let Some(p) = self.players.get(&player) else {
            return Vec::new();
        };
        p.territories
            .iter()
            .filter_map(|&id| self.tile(id))
            .flat_map(|t| t.buildings.iter())
            .collect()
    }

    /// Insert a new player and return its id. The player owns no tiles yet.
    pub fn insert_player(&mut self, mut player: Player) -> PlayerId {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        player.id = id;
        player.territories.clear();
        player.recompute_population();
        self.players.insert(id, player);
        id
    }

    /// Remove a player: their tiles turn neutral and empty, and every alliance
    /// and attacker record pointing at them is dropped.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        for tile in &mut self.tiles {
            if tile.owner == Some(id) {
                tile.owner = None;
                tile.troops = 0;
                tile.buildings.clear();
            }
        }
        for other in self.players.values_mut() {
            other.alliances.remove(&id);
            other.attacked_by.remove(&id);
        }
        Some(player)
    }

    /// Transfer tile ownership, keeping territory sets in sync.
    ///
    /// # Errors
    ///
    /// Fails if the tile does not exist, the tile is water, or the new owner is unknown.
    pub fn set_owner(&mut self, id: TileId, owner: Option<PlayerId>) -> Result<()> {
        let index = self
            .index(id)
            .ok_or_else(|| GameError::InvalidState(format!("unknown tile {id}")))?;
        if let Some(new_owner) = owner {
            if !self.tiles[index].terrain.is_ownable() {
                return Err(GameError::InvalidState(format!("tile {id} is not ownable")));
            }
            if !self.players.contains_key(&new_owner) {
                return Err(GameError::UnknownPlayer(new_owner));
            }
        }

        let previous = self.tiles[index].owner;
        if previous == owner {
            return Ok(());
        }
        if let Some(old) = previous.and_then(|p| self.players.get_mut(&p)) {
            old.territories.remove(&id);
        }
        if let Some(new) = owner.and_then(|p| self.players.get_mut(&p)) {
            new.territories.insert(id);
        }
        self.tiles[index].owner = owner;
        Ok(())
    }

    pub(crate) fn allocate_building_id(&mut self) -> BuildingId {
        let id = BuildingId(self.next_building_id);
        self.next_building_id += 1;
        id
    }

    /// Store a missile under the id it was launched with.
    pub(crate) fn insert_missile(&mut self, missile: Missile) -> MissileId {
        let id = missile.id;
        self.next_missile_id = self.next_missile_id.max(id.0 + 1);
        self.missiles.insert(id, missile);
        id
    }

    pub(crate) fn allocate_missile_id(&mut self) -> MissileId {
        let id = MissileId(self.next_missile_id);
        self.next_missile_id += 1;
        id
    }

    pub(crate) fn remove_missile(&mut self, id: MissileId) -> Option<Missile> {
        self.missiles.remove(&id)
    }

    pub(crate) fn missile_ids(&self) -> Vec<MissileId> {
        self.missiles.keys().copied().collect()
    }

    /// Mark a player eliminated. Never reverts.
    pub(crate) fn eliminate(&mut self, id: PlayerId) -> bool {
        match self.players.get_mut(&id) {
            Some(p) if !p.eliminated => {
                p.eliminated = true;
                true
            }
            _ => false,
        }
    }

    /// Record the winner. Only the first call has an effect.
    pub(crate) fn declare_winner(&mut self, id: PlayerId) -> bool {
        if self.winner.is_some() {
            return false;
        }
        self.winner = Some(id);
        true
    }

    pub(crate) fn advance_clock(&mut self, elapsed_ms: u64) {
        self.tick += 1;
        self.now_ms += elapsed_ms;
    }

    /// Verify every cross-entity invariant.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] naming the first violation found.
    pub fn check_invariants(&self) -> Result<()> {
        let fail = |msg: String| Err(GameError::InvalidState(msg));

        for tile in &self.tiles {
            if let Some(owner) = tile.owner {
                if !tile.terrain.is_ownable() {
                    return fail(format!("water tile {} is owned", tile.id));
                }
                match self.players.get(&owner) {
                    Some(p) if p.territories.contains(&tile.id) => {}
                    Some(_) => {
                        return fail(format!(
                            "tile {} owned by {owner} missing from territory list",
                            tile.id
                        ))
                    }
                    None => return fail(format!("tile {} owned by unknown {owner}", tile.id)),
                }
            }
            if tile.terrain == Terrain::Water && !tile.buildings.is_empty() {
                return fail(format!("water tile {} has buildings", tile.id));
            }
            for kind in BuildingType::ALL {
                if tile.count(kind) > 1 {
                    return fail(format!("tile {} has more than one {kind}", tile.id));
                }
            }
            for building in &tile.buildings {
                if Some(building.owner) != tile.owner || building.tile != tile.id {
                    return fail(format!(
                        "building {:?} on tile {} has inconsistent owner or tile",
                        building.id, tile.id
                    ));
                }
                if !tile.terrain.allows(building.kind) {
                    return fail(format!("{} not allowed on tile {}", building.kind, tile.id));
                }
            }
        }

        for player in self.players.values() {
            if player.population != player.workers + player.troops {
                return fail(format!(
                    "player {} population {} != {} + {}",
                    player.id, player.population, player.workers, player.troops
                ));
            }
            for id in &player.territories {
                if self.tile(*id).and_then(|t| t.owner) != Some(player.id) {
                    return fail(format!(
                        "player {} lists tile {id} it does not own",
                        player.id
                    ));
                }
            }
            for ally in &player.alliances {
                let symmetric = self
                    .players
                    .get(ally)
                    .is_some_and(|a| a.alliances.contains(&player.id));
                if !symmetric {
                    return fail(format!("alliance {} -> {ally} is not symmetric", player.id));
                }
            }
        }

        Ok(())
    }
}
