//! Test fixtures and helpers.
//!
//! Hand-made worlds for scenario tests. Generated maps are random; these are
//! not, so a test can say exactly which tile is a mountain and who owns it.

use std::collections::BTreeSet;

use conquest_core::economy;
use conquest_core::prelude::*;

/// Builder for small, fully specified games.
///
/// # Example
///
/// ```
/// use conquest_test_utils::fixtures::Scenario;
/// use conquest_core::prelude::*;
///
/// let mut scenario = Scenario::plains(4, 4);
/// let a = scenario.player("A", 100, 5, 10);
/// scenario.own(a, TileId::new(0, 0), 3);
/// let game = scenario.build();
/// assert_eq!(game.world().player(a).unwrap().troops, 10);
/// ```
#[derive(Debug, Clone)]
pub struct Scenario {
    world: World,
    rules: GameRules,
    seed: u64,
}

impl Scenario {
    /// A `width × height` world of plains.
    ///
    /// # Panics
    ///
    /// Panics on zero dimensions.
    #[must_use]
    pub fn plains(width: u32, height: u32) -> Self {
        let terrain = vec![Terrain::Plains; (width * height) as usize];
        Self {
            world: World::from_terrain(width, height, terrain).expect("valid dimensions"),
            rules: GameRules::default(),
            seed: 0,
        }
    }

    /// Override the rules.
    #[must_use]
    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Override the seed handed to the game.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the terrain of one tile.
    ///
    /// # Panics
    ///
    /// Panics if the tile is off the map.
    pub fn terrain(&mut self, tile: TileId, terrain: Terrain) -> &mut Self {
        self.world.tile_mut(tile).expect("tile on map").terrain = terrain;
        self
    }

    /// Add a player with the given gold and forces.
    pub fn player(&mut self, name: &str, gold: u64, workers: u32, troops: u32) -> PlayerId {
        self.world.insert_player(Player {
            id: PlayerId(0),
            name: name.to_string(),
            color: "#FF6B6B".to_string(),
            is_bot: false,
            gold,
            population: workers + troops,
            max_population: 50,
            workers,
            troops,
            territories: BTreeSet::new(),
            alliances: BTreeSet::new(),
            attacked_by: BTreeSet::new(),
            eliminated: false,
        })
    }

    /// Hand a tile to `player` with a garrison.
    ///
    /// # Panics
    ///
    /// Panics if the tile is water or off the map.
    pub fn own(&mut self, player: PlayerId, tile: TileId, garrison: u32) -> &mut Self {
        self.world
            .set_owner(tile, Some(player))
            .expect("ownable tile");
        self.garrison(tile, garrison)
    }

    /// Set the garrison of a tile.
    ///
    /// # Panics
    ///
    /// Panics if the tile is off the map.
    pub fn garrison(&mut self, tile: TileId, troops: u32) -> &mut Self {
        self.world.tile_mut(tile).expect("tile on map").troops = troops;
        self
    }

    /// Construct a building on an owned tile without touching the owner's gold.
    ///
    /// # Panics
    ///
    /// Panics if construction is illegal for any reason other than cost.
    pub fn building(&mut self, tile: TileId, kind: BuildingType) -> BuildingId {
        let owner = self
            .world
            .tile(tile)
            .and_then(|t| t.owner)
            .expect("building on an owned tile");
        let cost = self.rules.buildings.cost(kind);
        let player = self.world.player_mut(owner).expect("owner exists");
        player.gold += cost;
        let id = economy::construct_building(&mut self.world, &self.rules, owner, kind, tile)
            .expect("legal construction");
        // Undo the city bonus too, so the fixture only adds the building.
        if kind == BuildingType::City {
            if let Some(p) = self.world.player_mut(owner) {
                p.max_population -= self.rules.buildings.city_population_bonus;
            }
        }
        id
    }

    /// Read-only view of the world being built.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Finish and wrap the world in a [`Game`].
    ///
    /// # Panics
    ///
    /// Panics if the world violates an invariant.
    #[must_use]
    pub fn build(self) -> Game {
        Game::from_world(self.rules, self.world, self.seed).expect("consistent scenario")
    }
}

/// A generated game with `humans` human players and nothing else.
///
/// # Panics
///
/// Panics if the map cannot hold that many players.
#[must_use]
pub fn generated_game(seed: u64, humans: usize) -> (Game, Vec<PlayerId>) {
    let mut game = Game::new(GameRules::default(), seed).expect("default rules are valid");
    let ids = (0..humans)
        .map(|i| {
            game.add_player(&format!("Player {}", i + 1), false)
                .expect("room on the map")
        })
        .collect();
    (game, ids)
}

/// The single starting tile of a freshly joined player.
///
/// # Panics
///
/// Panics if the player owns no tiles.
#[must_use]
pub fn home_tile(game: &Game, player: PlayerId) -> TileId {
    *game
        .world()
        .player(player)
        .and_then(|p| p.territories.iter().next())
        .expect("player owns a tile")
}
