//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a seeded game produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism this harness is meant to catch:
//!
//! - **Unseeded randomness**: every random choice must come from a stream
//!   derived from the game seed.
//! - **Hash-ordered iteration**: players, tiles and missiles must be walked
//!   in id order.
//! - **Wall-clock time**: bots and missiles must only look at the
//!   simulation clock.

use std::thread;

use conquest_core::bot::{BotController, BotDifficulty};
use conquest_core::prelude::*;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic game).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the game was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Game is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one step
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// A seeded game plus the bots driving it.
#[derive(Debug, Clone)]
pub struct BotMatch {
    /// The game.
    pub game: Game,
    /// Its bots.
    pub bots: BotController,
}

impl BotMatch {
    /// A generated map with one bot per listed difficulty.
    ///
    /// # Panics
    ///
    /// Panics if the map cannot hold the bots.
    #[must_use]
    pub fn new(seed: u64, difficulties: &[BotDifficulty]) -> Self {
        let mut game = Game::new(GameRules::default(), seed).expect("default rules are valid");
        let mut bots = BotController::new(seed);
        for difficulty in difficulties {
            bots.add_bot(&mut game, *difficulty)
                .expect("room for every bot");
        }
        Self { game, bots }
    }

    /// One tick followed by one bot pass.
    pub fn step(&mut self) -> TickReport {
        let report = self.game.tick();
        self.bots.update(&mut self.game);
        report
    }
}

/// Play the same bot match twice and compare final state hashes.
#[must_use]
pub fn verify_bot_match_determinism(
    seed: u64,
    difficulties: &[BotDifficulty],
    ticks: u64,
) -> DeterminismResult {
    verify_determinism(
        2,
        ticks,
        || BotMatch::new(seed, difficulties),
        |m| {
            m.step();
        },
        |m| m.game.state_hash(),
    )
}

/// Run N copies of a bot match on separate threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// variations or memory layout differences.
#[must_use]
pub fn run_parallel_bot_matches(
    seed: u64,
    difficulties: &[BotDifficulty],
    copies: usize,
    ticks: u64,
) -> DeterminismResult {
    let hashes: Vec<u64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..copies)
            .map(|_| {
                scope.spawn(|| {
                    let mut m = BotMatch::new(seed, difficulties);
                    for _ in 0..ticks {
                        m.step();
                    }
                    m.game.state_hash()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    tracing::debug!(copies, ticks, "Parallel bot matches finished");
    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_determinism_with_counter() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![10, 10, 10]);
        result.assert_deterministic();
    }

    #[test]
    fn test_detects_divergence() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let runs = AtomicU64::new(0);
        let result = verify_determinism(
            2,
            1,
            || runs.fetch_add(1, Ordering::SeqCst),
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }
}
