//! Economy resolution: population split, construction, income, cooldowns.
//!
//! Every action resolver in this crate follows the same shape: all checks run
//! against an immutable view first, and mutation only starts once nothing can
//! fail any more. A rejected action therefore never touches the world.

use std::collections::BTreeMap;

use crate::error::Rejection;
use crate::rules::GameRules;
use crate::world::{Building, BuildingId, BuildingType, Player, PlayerId, TileId, World};

/// Look up a player that is allowed to act.
pub(crate) fn require_active(world: &World, id: PlayerId) -> Result<&Player, Rejection> {
    let player = world.player(id).ok_or(Rejection::UnknownPlayer(id))?;
    if player.eliminated {
        return Err(Rejection::PlayerEliminated(id));
    }
    Ok(player)
}

/// Rewrite a player's worker/troop split.
///
/// # Errors
///
/// Rejected unless `workers + troops` equals the current population.
pub fn allocate_population(
    world: &mut World,
    player: PlayerId,
    workers: u32,
    troops: u32,
) -> Result<(), Rejection> {
    let population = require_active(world, player)?.population;
    if workers.checked_add(troops) != Some(population) {
        return Err(Rejection::AllocationMismatch {
            workers,
            troops,
            population,
        });
    }

    if let Some(p) = world.player_mut(player) {
        p.set_forces(workers, troops);
    }
    tracing::debug!(player = %player, workers, troops, "Population allocated");
    Ok(())
}

/// Construct a building on an owned tile.
///
/// Deducts the cost and applies one-time effects (a city raises capacity).
///
/// # Errors
///
/// Rejected if the tile is unknown or not owned by the player, the terrain
/// forbids the type, the type already stands there, or gold is short.
pub fn construct_building(
    world: &mut World,
    rules: &GameRules,
    player: PlayerId,
    kind: BuildingType,
    tile_id: TileId,
) -> Result<BuildingId, Rejection> {
    let gold = require_active(world, player)?.gold;
    let tile = world.tile(tile_id).ok_or(Rejection::UnknownTile(tile_id))?;
    if !tile.is_owned_by(player) {
        return Err(Rejection::NotTileOwner {
            player,
            tile: tile_id,
        });
    }
    if !tile.terrain.allows(kind) {
        return Err(Rejection::TerrainForbids {
            building: kind,
            terrain: tile.terrain,
        });
    }
    if tile.has_building(kind) {
        return Err(Rejection::DuplicateBuilding {
            tile: tile_id,
            building: kind,
        });
    }
    let cost = rules.buildings.cost(kind);
    if gold < cost {
        return Err(Rejection::InsufficientGold {
            required: cost,
            available: gold,
        });
    }

    let id = world.allocate_building_id();
    if let Some(tile) = world.tile_mut(tile_id) {
        tile.buildings.push(Building {
            id,
            kind,
            tile: tile_id,
            owner: player,
            cooldown_ms: 0,
        });
    }
    if let Some(p) = world.player_mut(player) {
        p.gold -= cost;
        if kind == BuildingType::City {
            p.max_population += rules.buildings.city_population_bonus;
        }
    }
    tracing::debug!(player = %player, building = %kind, tile = %tile_id, "Building constructed");
    Ok(id)
}

/// Per-tick income of one player.
#[must_use]
pub fn income_of(world: &World, rules: &GameRules, player: &Player) -> u64 {
    let ports = player
        .territories
        .iter()
        .filter_map(|&id| world.tile(id))
        .map(|t| t.count(BuildingType::Port) as u64)
        .sum::<u64>();
    u64::from(player.workers / rules.workers_per_gold) + ports * rules.buildings.port_trade_income
}

/// Credit worker output and port trade to every player still in the game.
pub fn credit_income(world: &mut World, rules: &GameRules) {
    let incomes: BTreeMap<PlayerId, u64> = world
        .alive_players()
        .map(|p| (p.id, income_of(world, rules, p)))
        .collect();
    for player in world.players_mut() {
        if let Some(income) = incomes.get(&player.id) {
            player.gold = player.gold.saturating_add(*income);
        }
    }
}

/// Move every building cooldown toward zero.
pub fn advance_cooldowns(world: &mut World, elapsed_ms: u64) {
    for tile in world.tiles_mut() {
        for building in &mut tile.buildings {
            building.cooldown_ms = building.cooldown_ms.saturating_sub(elapsed_ms);
        }
    }
}
