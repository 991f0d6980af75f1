//! Unified player interface for humans and bots.
//!
//! This module defines the `PlayerFacade` trait that both the transport layer
//! and the bot engine use to act on the game. By going through the same
//! interface, we ensure:
//!
//! - **Fair play:** bots pass the same ownership and affordability checks
//! - **One entry point:** every action ends up in [`Game::apply`]
//! - **Fast testing:** facade calls run against a plain [`Game`] with no runtime

use std::collections::BTreeSet;

use crate::action::Action;
use crate::error::ActionError;
use crate::rules::GameRules;
use crate::simulation::{ActionOutcome, Game};
use crate::world::{BuildingType, Player, PlayerId, Position, Tile, TileId, World};

/// Result of submitting an action through a facade.
pub type ActionResult = Result<ActionOutcome, ActionError>;

/// What a player (human or bot) can see and do.
///
/// All state changes flow through [`submit`](Self::submit). There are no
/// backdoor APIs that bypass validation.
pub trait PlayerFacade {
    /// The player this facade acts for.
    fn player_id(&self) -> PlayerId;

    /// Read-only view of the world.
    fn world(&self) -> &World;

    /// Rules in force.
    fn rules(&self) -> &GameRules;

    /// Submit an action.
    ///
    /// # Errors
    ///
    /// Whatever [`Game::apply`] rejects.
    fn submit(&mut self, action: Action) -> ActionResult;

    /// The acting player's own record.
    fn me(&self) -> Option<&Player> {
        self.world().player(self.player_id())
    }

    /// Tiles the player owns, in id order.
    fn own_tiles(&self) -> Vec<&Tile> {
        let world = self.world();
        self.me()
            .map(|p| {
                p.territories
                    .iter()
                    .filter_map(|&id| world.tile(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ownable tiles adjacent to the player's territory that the player does
    /// not own yet, in id order.
    fn frontier(&self) -> Vec<TileId> {
        let world = self.world();
        let me = self.player_id();
        let mut out = BTreeSet::new();
        for tile in self.own_tiles() {
            for id in world.neighbors(tile.id) {
                if let Some(n) = world.tile(id) {
                    if n.terrain.is_ownable() && !n.is_owned_by(me) {
                        out.insert(id);
                    }
                }
            }
        }
        out.into_iter().collect()
    }

    /// Re-split population.
    fn allocate(&mut self, workers: u32, troops: u32) -> ActionResult {
        self.submit(Action::AllocatePopulation { workers, troops })
    }

    /// Construct a building.
    fn build(&mut self, building_type: BuildingType, territory_id: TileId) -> ActionResult {
        self.submit(Action::BuildStructure {
            building_type,
            territory_id,
        })
    }

    /// Attack a tile.
    fn attack(&mut self, target_territory_id: TileId, troop_count: u32) -> ActionResult {
        self.submit(Action::AttackTerritory {
            target_territory_id,
            troop_count,
        })
    }

    /// Launch a nuke.
    fn launch(&mut self, launch_site_id: TileId, target_position: Position) -> ActionResult {
        self.submit(Action::LaunchNuke {
            target_position,
            launch_site_id,
        })
    }

    /// Request an alliance.
    fn request_alliance(&mut self, target_player_id: PlayerId) -> ActionResult {
        self.submit(Action::RequestAlliance { target_player_id })
    }

    /// Break an alliance.
    fn break_alliance(&mut self, target_player_id: PlayerId) -> ActionResult {
        self.submit(Action::BreakAlliance { target_player_id })
    }
}

/// A [`Game`] bound to one player.
#[derive(Debug)]
pub struct GameSeat<'a> {
    game: &'a mut Game,
    player: PlayerId,
}

impl<'a> GameSeat<'a> {
    pub(crate) fn new(game: &'a mut Game, player: PlayerId) -> Self {
        Self { game, player }
    }
}

impl PlayerFacade for GameSeat<'_> {
    fn player_id(&self) -> PlayerId {
        self.player
    }

    fn world(&self) -> &World {
        self.game.world()
    }

    fn rules(&self) -> &GameRules {
        self.game.rules()
    }

    fn submit(&mut self, action: Action) -> ActionResult {
        self.game.apply(self.player, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_acts_for_its_player() {
        let mut game = Game::new(GameRules::default(), 11).unwrap();
        let a = game.add_player("A", false).unwrap();

        let mut seat = game.seat(a);
        assert_eq!(seat.player_id(), a);
        assert_eq!(seat.own_tiles().len(), 1);
        seat.allocate(3, 7).unwrap();
        assert_eq!(seat.me().unwrap().troops, 7);
    }

    #[test]
    fn test_frontier_is_adjacent_and_unowned() {
        let mut game = Game::new(GameRules::default(), 11).unwrap();
        let a = game.add_player("A", false).unwrap();
        let seat = game.seat(a);
        let home = seat.own_tiles()[0].id;

        let frontier = seat.frontier();
        assert!(!frontier.is_empty());
        for id in &frontier {
            assert_eq!(id.position().manhattan_distance(home.position()), 1);
            assert!(!seat.world().tile(*id).unwrap().is_owned_by(a));
        }
    }

    #[test]
    fn test_seat_cannot_bypass_checks() {
        let mut game = Game::new(GameRules::default(), 11).unwrap();
        let a = game.add_player("A", false).unwrap();
        let mut seat = game.seat(a);
        let home = seat.own_tiles()[0].id;
        assert!(seat.build(BuildingType::MissileSilo, home).is_err());
        assert_eq!(seat.me().unwrap().gold, 100);
    }
}
