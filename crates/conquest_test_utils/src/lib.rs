//! # Conquest Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Scenario builder for hand-made worlds
//! - Invariant assertions
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod invariants;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
