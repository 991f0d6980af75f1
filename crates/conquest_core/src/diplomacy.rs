//! Alliance bookkeeping.
//!
//! Alliances are symmetric and auto-accepted: both sides always gain or lose
//! the relation together.

use crate::economy::require_active;
use crate::error::Rejection;
use crate::world::{PlayerId, World};

/// Form an alliance between `player` and `target`.
///
/// # Errors
///
/// Rejected if either player is unknown, the acting player is eliminated, the
/// target is the player itself, or the two are already allied.
pub fn request_alliance(
    world: &mut World,
    player: PlayerId,
    target: PlayerId,
) -> Result<(), Rejection> {
    if player == target {
        return Err(Rejection::SelfTarget);
    }
    let acting = require_active(world, player)?;
    if world.player(target).is_none() {
        return Err(Rejection::UnknownPlayer(target));
    }
    if acting.is_allied_with(target) {
        return Err(Rejection::AlreadyAllied(target));
    }

    if let Some(p) = world.player_mut(player) {
        p.alliances.insert(target);
    }
    if let Some(t) = world.player_mut(target) {
        t.alliances.insert(player);
    }
    tracing::info!(player = %player, target = %target, "Alliance formed");
    Ok(())
}

/// Dissolve the alliance between `player` and `target`, if any.
///
/// # Errors
///
/// Rejected only for unknown or eliminated actors and self-targeting.
pub fn break_alliance(
    world: &mut World,
    player: PlayerId,
    target: PlayerId,
) -> Result<(), Rejection> {
    if player == target {
        return Err(Rejection::SelfTarget);
    }
    require_active(world, player)?;

    let was_allied = world
        .player_mut(player)
        .is_some_and(|p| p.alliances.remove(&target));
    if let Some(t) = world.player_mut(target) {
        t.alliances.remove(&player);
    }
    if was_allied {
        tracing::info!(player = %player, target = %target, "Alliance broken");
    }
    Ok(())
}
