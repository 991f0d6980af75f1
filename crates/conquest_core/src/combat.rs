//! Territorial attack resolution.
//!
//! Combat is deterministic. There is no dice roll: the committed troops are
//! compared against the defense power of the tile and the strictly larger side
//! wins.
//!
//! ```text
//! defense = garrison × (2 if mountains else 1) × (1 + defense_posts × bonus_per_post)
//! ```

use serde::{Deserialize, Serialize};

use crate::economy::require_active;
use crate::error::Rejection;
use crate::rules::GameRules;
use crate::world::{BuildingType, PlayerId, Terrain, Tile, TileId, World};

/// Result of one resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackOutcome {
    /// Attacked tile.
    pub tile: TileId,
    /// Attacking player.
    pub attacker: PlayerId,
    /// Previous owner, `None` for neutral tiles.
    pub defender: Option<PlayerId>,
    /// Committed troops.
    pub attack_power: u64,
    /// Computed defense of the tile before the attack.
    pub defense_power: u64,
    /// Whether ownership changed hands.
    pub captured: bool,
    /// Garrison left on the tile afterwards.
    pub garrison: u32,
}

/// Defense power of a tile.
#[must_use]
pub fn defense_power(tile: &Tile, rules: &GameRules) -> u64 {
    let terrain_multiplier = if tile.terrain == Terrain::Mountains { 2 } else { 1 };
    let posts = tile.count(BuildingType::DefensePost) as u64;
    let post_multiplier = 1 + posts * u64::from(rules.buildings.defense_bonus_per_post);
    u64::from(tile.troops) * terrain_multiplier * post_multiplier
}

/// Attack a tile with troops from the mobile pool.
///
/// The committed troops are always spent. On a win the tile changes hands,
/// loses every building, and keeps the surplus as its garrison. On a loss the
/// garrison becomes the remaining defense surplus. Attacking another player's
/// tile records the attacker in that player's `attacked_by` set.
///
/// # Errors
///
/// Rejected if no troops are committed, the attacker lacks the troops, the
/// tile is unknown, water, or already the attacker's.
pub fn resolve_attack(
    world: &mut World,
    rules: &GameRules,
    attacker: PlayerId,
    target: TileId,
    committed: u32,
) -> Result<AttackOutcome, Rejection> {
    let available = require_active(world, attacker)?.troops;
    if committed == 0 {
        return Err(Rejection::NoTroopsCommitted);
    }
    let tile = world.tile(target).ok_or(Rejection::UnknownTile(target))?;
    if !tile.terrain.is_ownable() {
        return Err(Rejection::Unownable(target));
    }
    if tile.is_owned_by(attacker) {
        return Err(Rejection::AlreadyOwned(target));
    }
    if available < committed {
        return Err(Rejection::InsufficientTroops {
            required: committed,
            available,
        });
    }

    let defender = tile.owner;
    let attack_power = u64::from(committed);
    let defense_power = defense_power(tile, rules);
    let captured = attack_power > defense_power;
    let surplus = if captured {
        attack_power - defense_power
    } else {
        defense_power - attack_power
    };
    let garrison = u32::try_from(surplus).unwrap_or(u32::MAX);

    if captured {
        world
            .set_owner(target, Some(attacker))
            .map_err(|_| Rejection::Unownable(target))?;
        if let Some(tile) = world.tile_mut(target) {
            tile.buildings.clear();
        }
    }
    if let Some(tile) = world.tile_mut(target) {
        tile.troops = garrison;
    }
    if let Some(p) = world.player_mut(attacker) {
        p.troops -= committed;
        p.recompute_population();
    }
    if let Some(d) = defender.and_then(|d| world.player_mut(d)) {
        d.attacked_by.insert(attacker);
        d.recompute_population();
    }

    tracing::debug!(
        attacker = %attacker,
        tile = %target,
        attack_power,
        defense_power,
        captured,
        "Attack resolved"
    );

    Ok(AttackOutcome {
        tile: target,
        attacker,
        defender,
        attack_power,
        defense_power,
        captured,
        garrison,
    })
}
