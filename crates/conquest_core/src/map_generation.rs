//! Procedural map generation.
//!
//! Generates the fixed grid every game is played on:
//! - An outer ring of water
//! - A ring of coast just inside it (the only port sites)
//! - An interior of plains, scattered with mountains

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::rules::MapRules;
use crate::world::{Terrain, World};

/// Terrain for one cell, before any randomness is applied.
#[must_use]
pub const fn base_terrain(x: u32, y: u32, width: u32, height: u32) -> Terrain {
    let ring = min4(x, y, width - 1 - x, height - 1 - y);
    match ring {
        0 => Terrain::Water,
        1 => Terrain::Coast,
        _ => Terrain::Plains,
    }
}

const fn min4(a: u32, b: u32, c: u32, d: u32) -> u32 {
    let ab = if a < b { a } else { b };
    let cd = if c < d { c } else { d };
    if ab < cd {
        ab
    } else {
        cd
    }
}

/// Generate the terrain layout in row-major order.
///
/// Deterministic for a given RNG state.
#[must_use]
pub fn generate_terrain(rules: &MapRules, rng: &mut ChaCha8Rng) -> Vec<Terrain> {
    let mut terrain = Vec::with_capacity((rules.width * rules.height) as usize);
    for y in 0..rules.height {
        for x in 0..rules.width {
            let mut cell = base_terrain(x, y, rules.width, rules.height);
            if cell == Terrain::Plains && rng.gen_range(0..100u8) < rules.mountain_chance_percent {
                cell = Terrain::Mountains;
            }
            terrain.push(cell);
        }
    }
    terrain
}

/// Generate a fresh, empty world.
///
/// # Errors
///
/// Returns an error if the dimensions are degenerate.
pub fn generate_world(rules: &MapRules, rng: &mut ChaCha8Rng) -> Result<World> {
    let terrain = generate_terrain(rules, rng);
    let world = World::from_terrain(rules.width, rules.height, terrain)?;
    tracing::debug!(
        width = rules.width,
        height = rules.height,
        "Generated map"
    );
    Ok(world)
}
