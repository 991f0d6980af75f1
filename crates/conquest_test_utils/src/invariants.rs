//! Invariant assertions.
//!
//! These checks are written against the public read-only API and do not
//! reuse [`World::check_invariants`], so a bug there cannot hide a bug in the
//! resolvers.

use std::collections::BTreeMap;

use conquest_core::prelude::*;

/// Assert every cross-entity invariant of the world.
///
/// # Panics
///
/// Panics with a description of the first violation.
pub fn assert_world_consistent(world: &World) {
    for player in world.players() {
        assert_eq!(
            player.population,
            player.workers + player.troops,
            "player {} population drifted",
            player.id
        );
        for tile in &player.territories {
            assert_eq!(
                world.tile(*tile).and_then(|t| t.owner),
                Some(player.id),
                "player {} lists tile {tile} it does not own",
                player.id
            );
        }
        for ally in &player.alliances {
            assert!(
                world
                    .player(*ally)
                    .is_some_and(|a| a.alliances.contains(&player.id)),
                "alliance {} -> {ally} is one-sided",
                player.id
            );
        }
    }

    for tile in world.tiles() {
        if let Some(owner) = tile.owner {
            assert_ne!(tile.terrain, Terrain::Water, "water tile {} is owned", tile.id);
            assert!(
                world
                    .player(owner)
                    .is_some_and(|p| p.territories.contains(&tile.id)),
                "tile {} missing from owner {owner}'s territories",
                tile.id
            );
        }
        let mut seen = BTreeMap::new();
        for building in &tile.buildings {
            *seen.entry(building.kind).or_insert(0) += 1;
            assert_eq!(Some(building.owner), tile.owner, "building owner mismatch on {}", tile.id);
            if building.kind == BuildingType::Port {
                assert_eq!(tile.terrain, Terrain::Coast, "port off the coast on {}", tile.id);
            }
        }
        assert!(
            seen.values().all(|n| *n <= 1),
            "duplicate building type on {}",
            tile.id
        );
        if tile.terrain == Terrain::Water {
            assert!(tile.buildings.is_empty(), "building on water tile {}", tile.id);
        }
    }

    for missile in world.missiles() {
        assert!(
            !missile.intercepted,
            "intercepted missile {} still in flight",
            missile.id
        );
    }
}

/// Tracks properties that must hold across a sequence of observations.
///
/// Feed it the world after every step; it panics the moment elimination
/// reverts or the winner changes.
#[derive(Debug, Default, Clone)]
pub struct MonotonicWatch {
    eliminated: BTreeMap<PlayerId, bool>,
    winner: Option<PlayerId>,
}

impl MonotonicWatch {
    /// Create an empty watch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the world after one step.
    ///
    /// # Panics
    ///
    /// Panics if a player was un-eliminated or the winner changed.
    pub fn observe(&mut self, world: &World) {
        for player in world.players() {
            let was = self.eliminated.insert(player.id, player.eliminated);
            if was == Some(true) {
                assert!(player.eliminated, "player {} was un-eliminated", player.id);
            }
        }
        if let Some(previous) = self.winner {
            assert_eq!(world.winner(), Some(previous), "winner changed");
        }
        self.winner = world.winner();
    }
}
