//! Action dispatch and the tick scheduler.
//!
//! [`Game`] owns the one canonical [`World`] together with the rules and the
//! seeded random stream. Every mutation enters through one of three doors:
//!
//! - [`Game::apply`] / [`Game::dispatch`] for player and bot actions
//! - [`Game::tick`] for time-based state
//! - [`Game::add_player`] / [`Game::remove_player`] / [`Game::reset`] for the
//!   session lifecycle
//!
//! All of them take `&mut self`, so the borrow checker enforces the
//! single-writer rule: an action and a tick can never interleave.
//!
//! # Tick Order
//!
//! 1. Credit income to every living player
//! 2. Decrement building cooldowns
//! 3. Advance missiles and apply due impacts
//! 4. Eliminate players with no tiles
//! 5. Record the winner once one living player remains
//!
//! # Determinism
//!
//! All randomness comes from a `ChaCha8Rng` seeded from the master seed.
//! Players, tiles and missiles are iterated in id order, so the same seed and
//! the same sequence of calls always produce the same world.
//!
//! # Example
//!
//! ```
//! use conquest_core::prelude::*;
//!
//! let mut game = Game::new(GameRules::default(), 42).unwrap();
//! let alice = game.add_player("Alice", false).unwrap();
//!
//! game.apply(alice, Action::AllocatePopulation { workers: 8, troops: 2 }).unwrap();
//! let report = game.tick();
//! assert_eq!(report.tick, 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionMessage};
use crate::ballistics::{self, ImpactReport, Interception};
use crate::combat::{self, AttackOutcome};
use crate::diplomacy;
use crate::economy;
use crate::error::{ActionError, GameError, Rejection, Result};
use crate::map_generation;
use crate::math::derive_seed;
use crate::player_facade::GameSeat;
use crate::rules::GameRules;
use crate::snapshot::WorldSnapshot;
use crate::world::{Missile, Player, PlayerId, Terrain, World};

/// Display colors handed out in join order.
pub const PLAYER_COLORS: [&str; 7] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8",
];

const MAP_STREAM: u64 = 1;
const SPAWN_STREAM: u64 = 2;

/// Something observers should hear about besides the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A nuke left its silo. Sent even if it was intercepted immediately.
    MissileLaunched {
        /// The missile as launched.
        missile: Missile,
        /// Flight time until impact.
        travel_time_ms: u64,
    },
    /// A SAM site stopped a missile.
    MissileIntercepted(Interception),
    /// A missile detonated.
    NukeImpact(ImpactReport),
    /// An attack was resolved.
    AttackResolved(AttackOutcome),
    /// A player lost their last tile.
    PlayerEliminated {
        /// Eliminated player.
        player: PlayerId,
    },
    /// One player remains.
    GameWon {
        /// The winner.
        player: PlayerId,
    },
}

/// Events produced by one successful action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Events in the order they happened.
    pub events: Vec<GameEvent>,
}

/// Result of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number after this tick.
    pub tick: u64,
    /// Simulation clock after this tick.
    pub now_ms: u64,
    /// Events in the order they happened.
    pub events: Vec<GameEvent>,
    /// Set if the tick hit an internal fault and was rolled back.
    pub faulted: bool,
}

impl TickReport {
    /// Winner declared during this tick, if any.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.events.iter().find_map(|e| match e {
            GameEvent::GameWon { player } => Some(*player),
            _ => None,
        })
    }
}

/// The authoritative game: rules, world and random stream.
#[derive(Debug, Clone)]
pub struct Game {
    rules: GameRules,
    world: World,
    rng: ChaCha8Rng,
    seed: u64,
    joined: usize,
}

impl Game {
    /// Create a game with a freshly generated map.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules fail validation.
    pub fn new(rules: GameRules, seed: u64) -> Result<Self> {
        rules.validate()?;
        let world = generate(&rules, seed)?;
        Ok(Self {
            rules,
            world,
            rng: ChaCha8Rng::seed_from_u64(derive_seed(seed, SPAWN_STREAM, 0)),
            seed,
            joined: 0,
        })
    }

    /// Create a game around an existing world.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules fail validation or the world is inconsistent.
    pub fn from_world(rules: GameRules, world: World, seed: u64) -> Result<Self> {
        rules.validate()?;
        world.check_invariants()?;
        let joined = world.player_count();
        Ok(Self {
            rules,
            world,
            rng: ChaCha8Rng::seed_from_u64(derive_seed(seed, SPAWN_STREAM, 0)),
            seed,
            joined,
        })
    }

    /// Replace the world with a fresh map generated from `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if map generation fails.
    pub fn reset(&mut self, seed: u64) -> Result<()> {
        self.world = generate(&self.rules, seed)?;
        self.rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, SPAWN_STREAM, 0));
        self.seed = seed;
        self.joined = 0;
        tracing::info!(seed, "Game reset");
        Ok(())
    }

    /// The rules in force.
    #[must_use]
    pub const fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Read-only view of the world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Master seed of the current world.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Capture a consistent snapshot for collaborators.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.world, &self.rules)
    }

    /// An action surface bound to one player.
    pub fn seat(&mut self, player: PlayerId) -> GameSeat<'_> {
        GameSeat::new(self, player)
    }

    /// Add a player on a random unowned plains tile.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NoStartingTile`] if no unowned plains tile is left.
    pub fn add_player(&mut self, name: &str, is_bot: bool) -> Result<PlayerId> {
        let free: Vec<_> = self
            .world
            .tiles()
            .iter()
            .filter(|t| t.terrain == Terrain::Plains && t.owner.is_none())
            .map(|t| t.id)
            .collect();
        if free.is_empty() {
            return Err(GameError::NoStartingTile(name.to_string()));
        }
        let start = free[self.rng.gen_range(0..free.len())];

        let s = &self.rules.start;
        let id = self.world.insert_player(Player {
            id: PlayerId(0),
            name: name.to_string(),
            color: PLAYER_COLORS[self.joined % PLAYER_COLORS.len()].to_string(),
            is_bot,
            gold: s.gold,
            population: s.workers + s.troops,
            max_population: s.max_population,
            workers: s.workers,
            troops: s.troops,
            territories: Default::default(),
            alliances: Default::default(),
            attacked_by: Default::default(),
            eliminated: false,
        });
        self.joined += 1;
        self.world.set_owner(start, Some(id))?;
        if let Some(tile) = self.world.tile_mut(start) {
            tile.troops = s.garrison;
        }

        tracing::info!(player = %id, name, is_bot, tile = %start, "Player joined");
        Ok(id)
    }

    /// Remove a player and neutralize everything they owned.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] if the player is not in the game.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player> {
        let player = self
            .world
            .remove_player(id)
            .ok_or(GameError::UnknownPlayer(id))?;
        tracing::info!(player = %id, name = %player.name, "Player left");
        Ok(player)
    }

    /// Apply an action on behalf of an authenticated player.
    ///
    /// Any fault during resolution rolls the world back to its state before
    /// the call and is reported as [`ActionError::Internal`].
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Invalid`] for failed preconditions and
    /// [`ActionError::Internal`] for faults.
    pub fn apply(
        &mut self,
        player: PlayerId,
        action: Action,
    ) -> std::result::Result<ActionOutcome, ActionError> {
        let kind = action.kind();
        let backup = self.world.clone();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.resolve(player, action)));

        let fault = match result {
            Ok(Ok(events)) => match self.world.check_invariants() {
                Ok(()) => {
                    tracing::debug!(player = %player, action = %kind, "Action applied");
                    return Ok(ActionOutcome { events });
                }
                Err(err) => err.to_string(),
            },
            Ok(Err(rejection)) => {
                tracing::debug!(player = %player, action = %kind, %rejection, "Action rejected");
                return Err(ActionError::Invalid(rejection));
            }
            Err(payload) => panic_message(payload.as_ref()),
        };

        self.world = backup;
        tracing::error!(player = %player, action = %kind, fault = %fault, "Action faulted, world restored");
        Err(ActionError::Internal(fault))
    }

    /// Decode and apply a wire message from `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::SenderMismatch`] if the payload claims another
    /// player, plus everything [`ActionMessage::decode`] and [`Game::apply`]
    /// can return.
    pub fn dispatch(
        &mut self,
        sender: PlayerId,
        message: &ActionMessage,
    ) -> std::result::Result<ActionOutcome, ActionError> {
        if message.player_id != sender {
            tracing::warn!(sender = %sender, claimed = %message.player_id, "Rejected action with forged player id");
            return Err(ActionError::SenderMismatch {
                claimed: message.player_id,
                sender,
            });
        }
        let action = match message.decode() {
            Ok(action) => action,
            Err(err) => {
                if let ActionError::UnknownActionType(kind) = &err {
                    tracing::warn!(sender = %sender, kind = %kind, "Unknown action type");
                }
                return Err(err);
            }
        };
        self.apply(sender, action)
    }

    fn resolve(
        &mut self,
        player: PlayerId,
        action: Action,
    ) -> std::result::Result<Vec<GameEvent>, Rejection> {
        let rules = &self.rules;
        let world = &mut self.world;

        match action {
            Action::AllocatePopulation { workers, troops } => {
                economy::allocate_population(world, player, workers, troops)?;
                Ok(Vec::new())
            }
            Action::BuildStructure {
                building_type,
                territory_id,
            } => {
                economy::construct_building(world, rules, player, building_type, territory_id)?;
                Ok(Vec::new())
            }
            Action::LaunchNuke {
                target_position,
                launch_site_id,
            } => {
                let report =
                    ballistics::launch_nuke(world, rules, player, launch_site_id, target_position)?;
                let mut events = vec![GameEvent::MissileLaunched {
                    missile: report.missile,
                    travel_time_ms: rules.nuke.travel_time_ms,
                }];
                events.extend(report.interception.map(GameEvent::MissileIntercepted));
                Ok(events)
            }
            Action::AttackTerritory {
                target_territory_id,
                troop_count,
            } => {
                let outcome =
                    combat::resolve_attack(world, rules, player, target_territory_id, troop_count)?;
                Ok(vec![GameEvent::AttackResolved(outcome)])
            }
            Action::RequestAlliance { target_player_id } => {
                diplomacy::request_alliance(world, player, target_player_id)?;
                Ok(Vec::new())
            }
            Action::BreakAlliance { target_player_id } => {
                diplomacy::break_alliance(world, player, target_player_id)?;
                Ok(Vec::new())
            }
        }
    }

    /// Advance the simulation by one tick.
    ///
    /// A fault inside the tick restores the world to its pre-tick state and
    /// is flagged on the report; the scheduler keeps running.
    pub fn tick(&mut self) -> TickReport {
        let backup = self.world.clone();
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_tick())) {
            Ok(report) => report,
            Err(payload) => {
                self.world = backup;
                tracing::error!(
                    tick = self.world.tick(),
                    fault = %panic_message(payload.as_ref()),
                    "Tick faulted, world restored"
                );
                TickReport {
                    tick: self.world.tick(),
                    now_ms: self.world.now_ms(),
                    events: Vec::new(),
                    faulted: true,
                }
            }
        }
    }

    fn run_tick(&mut self) -> TickReport {
        let period = self.rules.tick_period_ms;
        self.world.advance_clock(period);
        let mut events = Vec::new();

        // 1. Income
        economy::credit_income(&mut self.world, &self.rules);

        // 2. Cooldowns
        economy::advance_cooldowns(&mut self.world, period);

        // 3. Missiles
        events.extend(
            ballistics::advance_missiles(&mut self.world, &self.rules)
                .into_iter()
                .map(GameEvent::NukeImpact),
        );

        // 4. Elimination
        let landless: Vec<PlayerId> = self
            .world
            .alive_players()
            .filter(|p| p.territories.is_empty())
            .map(|p| p.id)
            .collect();
        for player in landless {
            if self.world.eliminate(player) {
                tracing::info!(player = %player, "Player eliminated");
                events.push(GameEvent::PlayerEliminated { player });
            }
        }

        // 5. Victory
        if self.world.winner().is_none() {
            let alive: Vec<PlayerId> = self.world.alive_players().map(|p| p.id).collect();
            if let [last] = alive.as_slice() {
                let last = *last;
                if self.world.declare_winner(last) {
                    tracing::info!(player = %last, tick = self.world.tick(), "Game won");
                    events.push(GameEvent::GameWon { player: last });
                }
            }
        }

        #[cfg(feature = "debug-validation")]
        {
            if let Err(err) = self.world.check_invariants() {
                tracing::error!(tick = self.world.tick(), %err, "Invariant violated after tick");
            }
            tracing::debug!(tick = self.world.tick(), state_hash = self.state_hash(), "Simulation state hash");
        }

        TickReport {
            tick: self.world.tick(),
            now_ms: self.world.now_ms(),
            events,
            faulted: false,
        }
    }

    /// Hash of the world state.
    ///
    /// Two games with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.world.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the world for snapshot storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize_world(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.world)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize world: {e}")))
    }

    /// Deserialize a world produced by [`Game::serialize_world`].
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize_world(data: &[u8]) -> Result<World> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize world: {e}")))
    }
}

fn generate(rules: &GameRules, seed: u64) -> Result<World> {
    let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, MAP_STREAM, 0));
    map_generation::generate_world(&rules.map, &mut rng)
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
