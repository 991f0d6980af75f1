//! Ballistics: nuke launch, interception, flight and impact.
//!
//! A missile has exactly one terminal outcome. Interception is evaluated at
//! launch and an intercepted missile never enters the active set, so it can
//! never impact. Missiles that reach their flight-time budget are removed from
//! the active set before their impact is applied.
//!
//! When several SAM sites could intercept, the one nearest to the missile's
//! target (Manhattan distance) fires; equal distances go to the lowest
//! building id. Only that site's cooldown is consumed.

use serde::{Deserialize, Serialize};

use crate::economy::require_active;
use crate::error::Rejection;
use crate::rules::GameRules;
use crate::world::{BuildingId, BuildingType, Missile, MissileId, PlayerId, Position, TileId, World};

/// A SAM site stopping a missile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interception {
    /// Intercepted missile.
    pub missile: MissileId,
    /// SAM site that fired.
    pub building: BuildingId,
    /// Tile the SAM site stands on.
    pub tile: TileId,
    /// Owner of the SAM site.
    pub interceptor: PlayerId,
}

/// Result of a successful launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchReport {
    /// The missile as launched.
    pub missile: Missile,
    /// Set when a SAM site stopped the missile on launch.
    pub interception: Option<Interception>,
}

/// Damage applied by one impact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    /// Missile that detonated.
    pub missile: MissileId,
    /// Launching player.
    pub owner: PlayerId,
    /// Impact center.
    pub target: Position,
    /// Land tiles inside the blast radius.
    pub tiles_hit: Vec<TileId>,
    /// Garrison troops removed.
    pub troops_killed: u64,
    /// Buildings destroyed.
    pub buildings_destroyed: usize,
}

/// Launch a nuke from a ready silo on `origin` toward `target`.
///
/// Deducts the nuke cost, starts the silo cooldown and immediately checks for
/// interception.
///
/// # Errors
///
/// Rejected if the origin tile is unknown or not owned, the target lies off
/// the map, the origin has no ready silo, or gold is short.
pub fn launch_nuke(
    world: &mut World,
    rules: &GameRules,
    player: PlayerId,
    origin: TileId,
    target: Position,
) -> Result<LaunchReport, Rejection> {
    let gold = require_active(world, player)?.gold;
    let tile = world.tile(origin).ok_or(Rejection::UnknownTile(origin))?;
    if !tile.is_owned_by(player) {
        return Err(Rejection::NotTileOwner {
            player,
            tile: origin,
        });
    }
    if !world.contains(target) {
        return Err(Rejection::OutOfBounds(target));
    }
    let silo = tile
        .ready_building(BuildingType::MissileSilo)
        .ok_or(Rejection::NoReadySilo(origin))?
        .id;
    if gold < rules.nuke.cost {
        return Err(Rejection::InsufficientGold {
            required: rules.nuke.cost,
            available: gold,
        });
    }

    if let Some(p) = world.player_mut(player) {
        p.gold -= rules.nuke.cost;
    }
    if let Some(b) = world
        .tile_mut(origin)
        .and_then(|t| t.buildings.iter_mut().find(|b| b.id == silo))
    {
        b.cooldown_ms = rules.buildings.silo_cooldown_ms;
    }

    let mut missile = Missile {
        id: world.allocate_missile_id(),
        owner: player,
        origin: origin.position(),
        target,
        launched_at_ms: world.now_ms(),
        intercepted: false,
    };

    let interception =
        find_interceptor(world, rules, player, target).map(|(building, tile, interceptor)| {
            Interception {
                missile: missile.id,
                building,
                tile,
                interceptor,
            }
        });

    if let Some(hit) = &interception {
        missile.intercepted = true;
        if let Some(b) = world
            .tile_mut(hit.tile)
            .and_then(|t| t.buildings.iter_mut().find(|b| b.id == hit.building))
        {
            b.cooldown_ms = rules.buildings.sam_cooldown_ms;
        }
        tracing::info!(
            missile = %missile.id,
            player = %player,
            interceptor = %hit.interceptor,
            "Missile intercepted at launch"
        );
    } else {
        world.insert_missile(missile.clone());
        tracing::info!(
            missile = %missile.id,
            player = %player,
            target_x = target.x,
            target_y = target.y,
            "Missile launched"
        );
    }

    Ok(LaunchReport {
        missile,
        interception,
    })
}

/// Pick the SAM site that intercepts a missile aimed at `target`, if any.
///
/// Eligible sites have zero cooldown, stand on a tile the launcher does not
/// own, and lie within the intercept radius of the target.
#[must_use]
pub fn find_interceptor(
    world: &World,
    rules: &GameRules,
    launcher: PlayerId,
    target: Position,
) -> Option<(BuildingId, TileId, PlayerId)> {
    let radius = rules.buildings.sam_intercept_radius;
    world
        .tiles()
        .iter()
        .filter(|t| t.owner.is_some_and(|o| o != launcher))
        .filter_map(|t| {
            let distance = t.id.position().manhattan_distance(target);
            if distance > radius {
                return None;
            }
            let owner = t.owner?;
            t.buildings
                .iter()
                .filter(|b| b.kind == BuildingType::SamSite && b.is_ready())
                .map(|b| (distance, b.id, t.id, owner))
                .min()
        })
        .min()
        .map(|(_, building, tile, owner)| (building, tile, owner))
}

/// Advance all in-flight missiles and apply the impacts that are due.
pub fn advance_missiles(world: &mut World, rules: &GameRules) -> Vec<ImpactReport> {
    let now = world.now_ms();
    let mut impacts = Vec::new();

    for id in world.missile_ids() {
        let Some(missile) = world.missile(id) else {
            continue;
        };
        if missile.intercepted {
            world.remove_missile(id);
            continue;
        }
        if now.saturating_sub(missile.launched_at_ms) < rules.nuke.travel_time_ms {
            continue;
        }
        if let Some(missile) = world.remove_missile(id) {
            impacts.push(apply_impact(world, rules, &missile));
        }
    }

    impacts
}

/// Apply area damage around the missile's target.
///
/// Every tile within the damage radius loses all buildings and its whole
/// garrison; the owner's troop pool loses the same amount and the tile reverts
/// to neutral.
pub fn apply_impact(world: &mut World, rules: &GameRules, missile: &Missile) -> ImpactReport {
    let mut report = ImpactReport {
        missile: missile.id,
        owner: missile.owner,
        target: missile.target,
        tiles_hit: Vec::new(),
        troops_killed: 0,
        buildings_destroyed: 0,
    };

    for id in world.tiles_within(missile.target, rules.nuke.damage_radius) {
        let Some(tile) = world.tile_mut(id) else {
            continue;
        };
        if !tile.terrain.is_ownable() {
            continue;
        }
        report.tiles_hit.push(id);
        report.buildings_destroyed += tile.buildings.len();
        tile.buildings.clear();
        let garrison = tile.troops;
        tile.troops = 0;
        let owner = tile.owner;
        report.troops_killed += u64::from(garrison);

        if let Some(p) = owner.and_then(|o| world.player_mut(o)) {
            p.troops = p.troops.saturating_sub(garrison);
            p.recompute_population();
        }
        if owner.is_some() {
            if let Err(err) = world.set_owner(id, None) {
                tracing::error!(tile = %id, %err, "Failed to neutralize tile after impact");
            }
        }
    }

    tracing::info!(
        missile = %missile.id,
        tiles = report.tiles_hit.len(),
        troops_killed = report.troops_killed,
        "Nuke impact"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Building, Player, Terrain};
    use std::collections::BTreeSet;

    fn player(gold: u64) -> Player {
        Player {
            id: PlayerId(0),
            name: "p".to_string(),
            color: "#96CEB4".to_string(),
            is_bot: false,
            gold,
            population: 0,
            max_population: 50,
            workers: 5,
            troops: 20,
            territories: BTreeSet::new(),
            alliances: BTreeSet::new(),
            attacked_by: BTreeSet::new(),
            eliminated: false,
        }
    }

    fn place(world: &mut World, tile: TileId, owner: PlayerId, kind: BuildingType) -> BuildingId {
        world.set_owner(tile, Some(owner)).unwrap();
        let id = world.allocate_building_id();
        world.tile_mut(tile).unwrap().buildings.push(Building {
            id,
            kind,
            tile,
            owner,
            cooldown_ms: 0,
        });
        id
    }

    fn arena() -> (World, PlayerId, PlayerId, TileId) {
        let mut world = World::from_terrain(12, 12, vec![Terrain::Plains; 144]).unwrap();
        let a = world.insert_player(player(100));
        let b = world.insert_player(player(0));
        let silo = TileId::new(0, 0);
        place(&mut world, silo, a, BuildingType::MissileSilo);
        (world, a, b, silo)
    }

    #[test]
    fn test_launch_with_exact_gold_then_cooldown() {
        let rules = GameRules::default();
        let (mut world, a, _, silo) = arena();

        let report = launch_nuke(&mut world, &rules, a, silo, Position::new(8, 8)).unwrap();
        assert!(report.interception.is_none());
        assert_eq!(world.player(a).unwrap().gold, 0);
        assert_eq!(world.missiles().count(), 1);

        world.player_mut(a).unwrap().gold = 1_000;
        assert_eq!(
            launch_nuke(&mut world, &rules, a, silo, Position::new(8, 8)),
            Err(Rejection::NoReadySilo(silo))
        );
    }

    #[test]
    fn test_launch_rejections() {
        let rules = GameRules::default();
        let (mut world, a, b, silo) = arena();
        let before = world.clone();

        assert_eq!(
            launch_nuke(&mut world, &rules, b, silo, Position::new(5, 5)),
            Err(Rejection::NotTileOwner { player: b, tile: silo })
        );
        assert_eq!(
            launch_nuke(&mut world, &rules, a, silo, Position::new(-1, 5)),
            Err(Rejection::OutOfBounds(Position::new(-1, 5)))
        );
        world.player_mut(a).unwrap().gold = 99;
        assert!(matches!(
            launch_nuke(&mut world, &rules, a, silo, Position::new(5, 5)),
            Err(Rejection::InsufficientGold { .. })
        ));
        world.player_mut(a).unwrap().gold = 100;
        assert_eq!(world, before);
    }

    #[test]
    fn test_sam_in_radius_intercepts() {
        let rules = GameRules::default();
        let (mut world, a, b, silo) = arena();
        let sam = place(&mut world, TileId::new(8, 5), b, BuildingType::SamSite);

        // Distance (8,5) -> (8,8) = 3, on the radius boundary.
        let report = launch_nuke(&mut world, &rules, a, silo, Position::new(8, 8)).unwrap();
        let hit = report.interception.unwrap();
        assert_eq!(hit.building, sam);
        assert!(report.missile.intercepted);
        assert_eq!(world.missiles().count(), 0);
        let site = &world.tile(TileId::new(8, 5)).unwrap().buildings[0];
        assert_eq!(site.cooldown_ms, rules.buildings.sam_cooldown_ms);
    }

    #[test]
    fn test_sam_outside_radius_never_intercepts() {
        let rules = GameRules::default();
        let (mut world, a, b, silo) = arena();
        place(&mut world, TileId::new(8, 4), b, BuildingType::SamSite);

        let report = launch_nuke(&mut world, &rules, a, silo, Position::new(8, 8)).unwrap();
        assert!(report.interception.is_none());
        assert_eq!(world.missiles().count(), 1);
    }

    #[test]
    fn test_own_sam_does_not_intercept() {
        let rules = GameRules::default();
        let (mut world, a, _, silo) = arena();
        place(&mut world, TileId::new(8, 7), a, BuildingType::SamSite);
        let report = launch_nuke(&mut world, &rules, a, silo, Position::new(8, 8)).unwrap();
        assert!(report.interception.is_none());
    }

    #[test]
    fn test_nearest_sam_wins_and_only_one_fires() {
        let rules = GameRules::default();
        let (mut world, a, b, silo) = arena();
        let far = place(&mut world, TileId::new(8, 5), b, BuildingType::SamSite);
        let near = place(&mut world, TileId::new(8, 7), b, BuildingType::SamSite);

        let report = launch_nuke(&mut world, &rules, a, silo, Position::new(8, 8)).unwrap();
        assert_eq!(report.interception.unwrap().building, near);

        let far_site = world.tile(TileId::new(8, 5)).unwrap();
        assert!(far_site.buildings.iter().all(|b| b.id != far || b.cooldown_ms == 0));
    }

    #[test]
    fn test_equal_distance_goes_to_lowest_id() {
        let rules = GameRules::default();
        let (mut world, a, b, silo) = arena();
        let first = place(&mut world, TileId::new(7, 8), b, BuildingType::SamSite);
        place(&mut world, TileId::new(9, 8), b, BuildingType::SamSite);

        let report = launch_nuke(&mut world, &rules, a, silo, Position::new(8, 8)).unwrap();
        assert_eq!(report.interception.unwrap().building, first);
    }

    #[test]
    fn test_impact_after_travel_time() {
        let rules = GameRules::default();
        let (mut world, a, b, silo) = arena();
        let target = TileId::new(8, 8);
        place(&mut world, target, b, BuildingType::City);
        world.tile_mut(target).unwrap().troops = 7;
        world.set_owner(TileId::new(8, 9), Some(b)).unwrap();
        world.tile_mut(TileId::new(8, 9)).unwrap().troops = 3;

        launch_nuke(&mut world, &rules, a, silo, target.position()).unwrap();

        for _ in 0..4 {
            world.advance_clock(1_000);
            assert!(advance_missiles(&mut world, &rules).is_empty());
        }
        world.advance_clock(1_000);
        let impacts = advance_missiles(&mut world, &rules);
        assert_eq!(impacts.len(), 1);
        assert_eq!(impacts[0].troops_killed, 10);
        assert_eq!(impacts[0].buildings_destroyed, 1);
        assert_eq!(world.missiles().count(), 0);

        let defender = world.player(b).unwrap();
        assert_eq!(defender.troops, 10);
        assert_eq!(defender.population, 15);
        assert!(defender.territories.is_empty());
        assert_eq!(world.tile(target).unwrap().owner, None);
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_intercepted_missile_is_discarded_without_impact() {
        let rules = GameRules::default();
        let (mut world, a, b, _) = arena();
        let target = TileId::new(5, 5);
        world.set_owner(target, Some(b)).unwrap();
        world.tile_mut(target).unwrap().troops = 4;
        let id = world.allocate_missile_id();
        world.insert_missile(Missile {
            id,
            owner: a,
            origin: Position::new(0, 0),
            target: target.position(),
            launched_at_ms: 0,
            intercepted: true,
        });

        world.advance_clock(10_000);
        assert!(advance_missiles(&mut world, &rules).is_empty());
        assert_eq!(world.missiles().count(), 0);
        assert_eq!(world.tile(target).unwrap().troops, 4);
    }
}
