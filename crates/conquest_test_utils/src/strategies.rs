//! Property-based testing strategies.
//!
//! Generate arbitrary (often invalid) actions against a game with a known
//! number of players so property tests can hammer the resolvers.

use conquest_core::prelude::*;
use proptest::prelude::*;

/// Any building type.
pub fn arb_building_type() -> impl Strategy<Value = BuildingType> {
    prop::sample::select(BuildingType::ALL.to_vec())
}

/// A tile id, sometimes one step off the map.
pub fn arb_tile_id(width: u32, height: u32) -> impl Strategy<Value = TileId> {
    (0..=width, 0..=height).prop_map(|(x, y)| TileId::new(x, y))
}

/// A position, sometimes off the map.
pub fn arb_position(width: u32, height: u32) -> impl Strategy<Value = Position> {
    (-1..=width as i32, -1..=height as i32).prop_map(|(x, y)| Position::new(x, y))
}

/// A player id among `1..=players`, plus one that does not exist.
pub fn arb_player_id(players: u32) -> impl Strategy<Value = PlayerId> {
    (1..=players + 1).prop_map(PlayerId)
}

/// Any action on a `width × height` map with `players` players.
pub fn arb_action(width: u32, height: u32, players: u32) -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..30u32, 0..30u32)
            .prop_map(|(workers, troops)| Action::AllocatePopulation { workers, troops }),
        (arb_building_type(), arb_tile_id(width, height)).prop_map(|(building_type, territory_id)| {
            Action::BuildStructure {
                building_type,
                territory_id,
            }
        }),
        (arb_position(width, height), arb_tile_id(width, height)).prop_map(
            |(target_position, launch_site_id)| Action::LaunchNuke {
                target_position,
                launch_site_id,
            }
        ),
        (arb_tile_id(width, height), 0..20u32).prop_map(|(target_territory_id, troop_count)| {
            Action::AttackTerritory {
                target_territory_id,
                troop_count,
            }
        }),
        arb_player_id(players).prop_map(|target_player_id| Action::RequestAlliance {
            target_player_id
        }),
        arb_player_id(players).prop_map(|target_player_id| Action::BreakAlliance {
            target_player_id
        }),
    ]
}

/// One step of a random game: either a tick or an action by some player.
#[derive(Debug, Clone)]
pub enum Step {
    /// Advance the scheduler.
    Tick,
    /// Apply an action.
    Act(PlayerId, Action),
}

/// A sequence of steps for a game with `players` players.
pub fn arb_steps(
    width: u32,
    height: u32,
    players: u32,
    len: usize,
) -> impl Strategy<Value = Vec<Step>> {
    let step = prop_oneof![
        1 => Just(Step::Tick),
        4 => (arb_player_id(players), arb_action(width, height, players))
            .prop_map(|(p, a)| Step::Act(p, a)),
    ];
    prop::collection::vec(step, 1..len)
}
