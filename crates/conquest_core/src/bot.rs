//! Heuristic bot decision engine.
//!
//! Bots are players like any other. A [`BotBrain`] looks at the world through
//! a [`PlayerFacade`] and submits ordinary [`Action`]s, so bots are held to the
//! same ownership and affordability checks as humans.
//!
//! Difficulty is pure data: a [`BotProfile`] per [`BotDifficulty`] holds the
//! decision cadence, worker ratio, strategy weights and build order, and one
//! generic routine ([`BotBrain::decide`]) consults it.
//!
//! # Brain States
//!
//! ```text
//! Idle ──▶ Deciding ──▶ Cooldown { ready_at_ms } ──▶ Idle
//! ```
//!
//! Time is the simulation clock, so the same seed and action stream produce
//! the same bot behavior.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::combat::defense_power;
use crate::error::{GameError, Result};
use crate::math::{derive_seed, percent_of};
use crate::player_facade::{ActionResult, PlayerFacade};
use crate::simulation::{panic_message, Game};
use crate::world::{BuildingType, Player, PlayerId, Terrain, Tile, TileId, World};

const BOT_STREAM: u64 = 3;
const NAME_STREAM: u64 = 4;

/// Bot difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotDifficulty {
    /// Slow, timid.
    Easy,
    /// Balanced.
    Medium,
    /// Fast, aggressive, uses nukes.
    Hard,
    /// Never starts a fight, but retaliates.
    Peaceful,
}

impl BotDifficulty {
    /// Every difficulty.
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Peaceful];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Peaceful => "peaceful",
        }
    }
}

impl fmt::Display for BotDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BotDifficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GameError::InvalidRules(format!("unknown bot difficulty '{s}'")))
    }
}

/// Behavior table for one difficulty.
///
/// All weights are percentages (0-100): the chance that the strategy is tried
/// on a decision pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotProfile {
    /// Time between decision passes.
    pub decision_interval_ms: u64,
    /// Share of population kept as workers.
    pub worker_percent: u8,
    /// Chance to expand into an adjacent tile.
    pub expand_percent: u8,
    /// Chance to construct a building.
    pub build_percent: u8,
    /// Chance to attack the best hostile tile.
    pub attack_percent: u8,
    /// Chance to launch a nuke.
    pub nuke_percent: u8,
    /// Chance to seek an alliance.
    pub alliance_percent: u8,
    /// Buildings to try, most wanted first.
    pub build_order: Vec<BuildingType>,
    /// Only treat players that attacked this bot as hostile.
    #[serde(default)]
    pub retaliation_only: bool,
    /// Display names to pick from.
    pub names: Vec<String>,
}

impl BotProfile {
    fn names(list: [&str; 4]) -> Vec<String> {
        list.iter().map(|n| (*n).to_string()).collect()
    }

    /// Default easy profile.
    #[must_use]
    pub fn easy() -> Self {
        Self {
            decision_interval_ms: 5_000,
            worker_percent: 50,
            expand_percent: 30,
            build_percent: 20,
            attack_percent: 10,
            nuke_percent: 0,
            alliance_percent: 0,
            build_order: vec![BuildingType::City, BuildingType::DefensePost],
            retaliation_only: false,
            names: Self::names(["EasyBot", "Newbie", "Rookie", "Amateur"]),
        }
    }

    /// Default medium profile.
    #[must_use]
    pub fn medium() -> Self {
        Self {
            decision_interval_ms: 3_000,
            worker_percent: 50,
            expand_percent: 50,
            build_percent: 40,
            attack_percent: 30,
            nuke_percent: 10,
            alliance_percent: 20,
            build_order: vec![
                BuildingType::City,
                BuildingType::DefensePost,
                BuildingType::Port,
            ],
            retaliation_only: false,
            names: Self::names(["MediumBot", "Soldier", "Warrior", "Fighter"]),
        }
    }

    /// Default hard profile.
    #[must_use]
    pub fn hard() -> Self {
        Self {
            decision_interval_ms: 2_000,
            worker_percent: 40,
            expand_percent: 70,
            build_percent: 60,
            attack_percent: 50,
            nuke_percent: 30,
            alliance_percent: 30,
            build_order: vec![
                BuildingType::City,
                BuildingType::MissileSilo,
                BuildingType::SamSite,
                BuildingType::DefensePost,
                BuildingType::Port,
            ],
            retaliation_only: false,
            names: Self::names(["HardBot", "General", "Commander", "Strategist"]),
        }
    }

    /// Default peaceful profile.
    #[must_use]
    pub fn peaceful() -> Self {
        Self {
            decision_interval_ms: 4_000,
            worker_percent: 60,
            expand_percent: 40,
            build_percent: 30,
            attack_percent: 40,
            nuke_percent: 0,
            alliance_percent: 30,
            build_order: vec![
                BuildingType::City,
                BuildingType::SamSite,
                BuildingType::DefensePost,
                BuildingType::Port,
            ],
            retaliation_only: true,
            names: Self::names(["PeacefulBot", "Diplomat", "Pacifist", "Neutral"]),
        }
    }

    fn validate(&self, difficulty: BotDifficulty) -> Result<()> {
        let weights = [
            self.worker_percent,
            self.expand_percent,
            self.build_percent,
            self.attack_percent,
            self.nuke_percent,
            self.alliance_percent,
        ];
        if weights.iter().any(|w| *w > 100) {
            return Err(GameError::InvalidRules(format!(
                "{difficulty} bot weights must be within 0..=100"
            )));
        }
        if self.decision_interval_ms == 0 {
            return Err(GameError::InvalidRules(format!(
                "{difficulty} bot decision_interval_ms must be positive"
            )));
        }
        if self.names.is_empty() {
            return Err(GameError::InvalidRules(format!(
                "{difficulty} bot needs at least one name"
            )));
        }
        Ok(())
    }
}

/// Constants shared by every difficulty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    /// Largest share of mobile troops committed to one attack.
    pub max_commit_percent: u8,
    /// Troops sent relative to the defense (150 = 1.5×).
    pub attack_margin_percent: u16,
    /// Troops needed before an aggressive attack is considered.
    pub min_attack_troops: u32,
    /// Garrison above which a tile is worth a nuke.
    pub nuke_min_garrison: u32,
    /// Building count above which a tile is worth a nuke.
    pub nuke_min_buildings: usize,
    /// Chance to propose an alliance once the alliance strategy is picked.
    pub alliance_chance_percent: u8,
}

impl Default for BotTuning {
    fn default() -> Self {
        Self {
            max_commit_percent: 40,
            attack_margin_percent: 150,
            min_attack_troops: 10,
            nuke_min_garrison: 20,
            nuke_min_buildings: 2,
            alliance_chance_percent: 30,
        }
    }
}

/// The difficulty table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotRules {
    /// Easy profile.
    pub easy: BotProfile,
    /// Medium profile.
    pub medium: BotProfile,
    /// Hard profile.
    pub hard: BotProfile,
    /// Peaceful profile.
    pub peaceful: BotProfile,
    /// Shared constants.
    pub tuning: BotTuning,
}

impl Default for BotRules {
    fn default() -> Self {
        Self {
            easy: BotProfile::easy(),
            medium: BotProfile::medium(),
            hard: BotProfile::hard(),
            peaceful: BotProfile::peaceful(),
            tuning: BotTuning::default(),
        }
    }
}

impl BotRules {
    /// Profile for a difficulty.
    #[must_use]
    pub const fn profile(&self, difficulty: BotDifficulty) -> &BotProfile {
        match difficulty {
            BotDifficulty::Easy => &self.easy,
            BotDifficulty::Medium => &self.medium,
            BotDifficulty::Hard => &self.hard,
            BotDifficulty::Peaceful => &self.peaceful,
        }
    }

    /// Validate every profile.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidRules`] for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        for difficulty in BotDifficulty::ALL {
            self.profile(difficulty).validate(difficulty)?;
        }
        if self.tuning.max_commit_percent > 100 || self.tuning.alliance_chance_percent > 100 {
            return Err(GameError::InvalidRules(
                "bot tuning percentages must be within 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a brain is in its decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    /// Ready to decide.
    Idle,
    /// Running a decision pass.
    Deciding,
    /// Waiting for the next pass.
    Cooldown {
        /// Simulation time at which the brain becomes idle again.
        ready_at_ms: u64,
    },
}

/// One action a bot submitted and how it fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotDecision {
    /// Acting bot.
    pub player: PlayerId,
    /// Submitted action.
    pub action: Action,
    /// What the game said.
    pub result: ActionResult,
}

/// Receives each decision with the world as it stands right after it.
pub type DecisionSink<'a> = dyn FnMut(&World, BotDecision) + 'a;

/// Troops to commit against `defense`: just over the defense with a margin,
/// capped at a share of the mobile pool.
#[must_use]
pub fn attack_troops(defense: u64, available: u32, tuning: &BotTuning) -> u32 {
    let cap = percent_of(available, u16::from(tuning.max_commit_percent));
    let wanted = defense
        .saturating_mul(u64::from(tuning.attack_margin_percent))
        .div_ceil(100)
        .max(defense.saturating_add(1));
    u32::try_from(wanted).map_or(cap, |w| w.min(cap))
}

/// Score a hostile tile for an aggressive attack. Higher is better.
#[must_use]
pub fn target_score(tile: &Tile, me: &Player, profile: &BotProfile) -> i64 {
    let mut score = -2 * i64::from(tile.troops);
    score += match tile.terrain {
        Terrain::Plains => 10,
        Terrain::Coast => 5,
        Terrain::Mountains | Terrain::Water => 0,
    };
    score += 5 * tile.buildings.len() as i64;
    if profile.retaliation_only && tile.owner.is_some_and(|o| me.attacked_by.contains(&o)) {
        score += 50;
    }
    score
}

/// Per-bot decision state.
#[derive(Debug, Clone)]
pub struct BotBrain {
    player: PlayerId,
    difficulty: BotDifficulty,
    profile: BotProfile,
    tuning: BotTuning,
    state: BotState,
    rng: ChaCha8Rng,
}

impl BotBrain {
    /// Create a brain whose first decision comes one interval after `now_ms`.
    #[must_use]
    pub fn new(
        player: PlayerId,
        difficulty: BotDifficulty,
        rules: &BotRules,
        seed: u64,
        now_ms: u64,
    ) -> Self {
        let profile = rules.profile(difficulty).clone();
        let ready_at_ms = now_ms + profile.decision_interval_ms;
        Self {
            player,
            difficulty,
            profile,
            tuning: rules.tuning.clone(),
            state: BotState::Cooldown { ready_at_ms },
            rng: ChaCha8Rng::seed_from_u64(derive_seed(seed, BOT_STREAM, u64::from(player.0))),
        }
    }

    /// The bot's player.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// The bot's difficulty.
    #[must_use]
    pub const fn difficulty(&self) -> BotDifficulty {
        self.difficulty
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BotState {
        self.state
    }

    /// Advance the state machine to `now_ms`; true if a decision is due.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if let BotState::Cooldown { ready_at_ms } = self.state {
            if now_ms >= ready_at_ms {
                self.state = BotState::Idle;
            }
        }
        self.state == BotState::Idle
    }

    fn roll(&mut self, chance: u8) -> bool {
        chance > 0 && self.rng.gen_range(0..100u8) < chance
    }

    /// Run one decision pass through `facade` and start the cooldown.
    pub fn decide<F: PlayerFacade>(&mut self, facade: &mut F, now_ms: u64) -> Vec<BotDecision> {
        let mut decisions = Vec::new();
        self.decide_with(facade, now_ms, &mut |_: &World, decision: BotDecision| {
            decisions.push(decision);
        });
        decisions
    }

    /// Run one decision pass, handing each decision to `on_decision` along
    /// with the world as it stands right after that action.
    pub fn decide_with<F: PlayerFacade>(
        &mut self,
        facade: &mut F,
        now_ms: u64,
        on_decision: &mut DecisionSink<'_>,
    ) {
        self.state = BotState::Deciding;
        let mut actions = 0usize;
        let mut out = |world: &World, decision: BotDecision| {
            actions += 1;
            on_decision(world, decision);
        };
        let decisions: &mut DecisionSink<'_> = &mut out;

        if facade.me().is_some_and(Player::is_alive) {
            self.rebalance(facade, decisions);

            if self.roll(self.profile.expand_percent) {
                self.expand(facade, decisions);
            }
            if self.roll(self.profile.build_percent) {
                self.construct(facade, decisions);
            }
            let attack_weight = match facade.me() {
                Some(me) if self.profile.retaliation_only && me.attacked_by.is_empty() => 0,
                _ => self.profile.attack_percent,
            };
            if self.roll(attack_weight) {
                self.attack(facade, decisions);
            }
            if self.roll(self.profile.nuke_percent) {
                self.nuke(facade, decisions);
            }
            if self.roll(self.profile.alliance_percent) {
                self.seek_alliance(facade, decisions);
            }
        }

        tracing::debug!(
            bot = %self.player,
            difficulty = %self.difficulty,
            actions,
            "Bot decision pass"
        );
        self.back_off(now_ms);
    }

    /// Start the cooldown from `now_ms`.
    fn back_off(&mut self, now_ms: u64) {
        self.state = BotState::Cooldown {
            ready_at_ms: now_ms + self.profile.decision_interval_ms,
        };
    }

    fn submit<F: PlayerFacade>(
        &self,
        facade: &mut F,
        action: Action,
        out: &mut DecisionSink<'_>,
    ) {
        let result = facade.submit(action.clone());
        out(
            facade.world(),
            BotDecision {
                player: self.player,
                action,
                result,
            },
        );
    }

    fn is_hostile(&self, me: &Player, owner: PlayerId) -> bool {
        owner != me.id
            && !me.is_allied_with(owner)
            && (!self.profile.retaliation_only || me.attacked_by.contains(&owner))
    }

    fn rebalance<F: PlayerFacade>(&self, facade: &mut F, out: &mut DecisionSink<'_>) {
        let Some(me) = facade.me() else { return };
        let workers = percent_of(me.population, u16::from(self.profile.worker_percent));
        let troops = me.population - workers;
        if workers != me.workers {
            self.submit(facade, Action::AllocatePopulation { workers, troops }, out);
        }
    }

    fn expand<F: PlayerFacade>(&mut self, facade: &mut F, out: &mut DecisionSink<'_>) {
        let choice = {
            let world = facade.world();
            let Some(me) = facade.me() else { return };
            let candidates: Vec<&Tile> = facade
                .frontier()
                .into_iter()
                .filter_map(|id| world.tile(id))
                .filter(|t| t.owner.map_or(true, |o| self.is_hostile(me, o)))
                .collect();
            let Some(tile) = candidates.choose(&mut self.rng) else {
                return;
            };
            let defense = defense_power(tile, facade.rules());
            let troops = attack_troops(defense, me.troops, &self.tuning);
            (tile.id, troops, defense)
        };

        let (target, troops, defense) = choice;
        if u64::from(troops) > defense {
            self.submit(
                facade,
                Action::AttackTerritory {
                    target_territory_id: target,
                    troop_count: troops,
                },
                out,
            );
        }
    }

    fn construct<F: PlayerFacade>(&self, facade: &mut F, out: &mut DecisionSink<'_>) {
        let Some(gold) = facade.me().map(|p| p.gold) else {
            return;
        };
        let choice = self.profile.build_order.iter().find_map(|&kind| {
            if gold < facade.rules().buildings.cost(kind) {
                return None;
            }
            facade
                .own_tiles()
                .into_iter()
                .find(|t| t.terrain.allows(kind) && !t.has_building(kind))
                .map(|t| (kind, t.id))
        });
        if let Some((building_type, territory_id)) = choice {
            self.submit(
                facade,
                Action::BuildStructure {
                    building_type,
                    territory_id,
                },
                out,
            );
        }
    }

    fn attack<F: PlayerFacade>(&self, facade: &mut F, out: &mut DecisionSink<'_>) {
        let choice = {
            let world = facade.world();
            let Some(me) = facade.me() else { return };
            if me.troops < self.tuning.min_attack_troops {
                return;
            }
            let best = facade
                .frontier()
                .into_iter()
                .filter_map(|id| world.tile(id))
                .filter(|t| t.owner.is_some_and(|o| self.is_hostile(me, o)))
                .map(|t| (target_score(t, me, &self.profile), std::cmp::Reverse(t.id), t))
                .max_by_key(|(score, id, _)| (*score, *id));
            let Some((_, _, tile)) = best else { return };
            let defense = defense_power(tile, facade.rules());
            (tile.id, attack_troops(defense, me.troops, &self.tuning), defense)
        };

        let (target, troops, defense) = choice;
        if u64::from(troops) > defense {
            self.submit(
                facade,
                Action::AttackTerritory {
                    target_territory_id: target,
                    troop_count: troops,
                },
                out,
            );
        }
    }

    fn nuke<F: PlayerFacade>(&mut self, facade: &mut F, out: &mut DecisionSink<'_>) {
        let choice = {
            let world = facade.world();
            let Some(me) = facade.me() else { return };
            if me.gold < facade.rules().nuke.cost {
                return;
            }
            let Some(silo) = facade
                .own_tiles()
                .into_iter()
                .find(|t| t.ready_building(BuildingType::MissileSilo).is_some())
                .map(|t| t.id)
            else {
                return;
            };
            let targets = nuke_targets(world, me, &self.tuning, |o| self.is_hostile(me, o));
            let Some(target) = targets.choose(&mut self.rng) else {
                return;
            };
            (silo, target.position())
        };

        let (launch_site_id, target_position) = choice;
        self.submit(
            facade,
            Action::LaunchNuke {
                target_position,
                launch_site_id,
            },
            out,
        );
    }

    fn seek_alliance<F: PlayerFacade>(&mut self, facade: &mut F, out: &mut DecisionSink<'_>) {
        let choice = {
            let Some(me) = facade.me() else { return };
            if !me.alliances.is_empty() || !self.roll(self.tuning.alliance_chance_percent) {
                return;
            }
            let candidates: Vec<PlayerId> = facade
                .world()
                .alive_players()
                .filter(|p| !p.is_bot && p.id != me.id && !me.is_allied_with(p.id))
                .map(|p| p.id)
                .collect();
            let Some(target) = candidates.choose(&mut self.rng) else {
                return;
            };
            *target
        };
        self.submit(
            facade,
            Action::RequestAlliance {
                target_player_id: choice,
            },
            out,
        );
    }
}

/// Hostile tiles worth a nuke, in id order.
fn nuke_targets(
    world: &World,
    me: &Player,
    tuning: &BotTuning,
    hostile: impl Fn(PlayerId) -> bool,
) -> Vec<TileId> {
    world
        .tiles()
        .iter()
        .filter(|t| t.owner.is_some_and(|o| o != me.id && hostile(o)))
        .filter(|t| {
            t.troops > tuning.nuke_min_garrison || t.buildings.len() > tuning.nuke_min_buildings
        })
        .map(|t| t.id)
        .collect()
}

/// Owns every bot brain and drives them from the simulation clock.
#[derive(Debug, Clone)]
pub struct BotController {
    brains: BTreeMap<PlayerId, BotBrain>,
    rng: ChaCha8Rng,
    seed: u64,
    added: u32,
}

impl BotController {
    /// Create an empty controller. `seed` decorrelates bot randomness per game.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            brains: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(derive_seed(seed, NAME_STREAM, 0)),
            seed,
            added: 0,
        }
    }

    /// Add a bot player to `game` and start driving it.
    ///
    /// # Errors
    ///
    /// Returns an error if the game has no starting tile left.
    pub fn add_bot(&mut self, game: &mut Game, difficulty: BotDifficulty) -> Result<PlayerId> {
        let rules = &game.rules().bots;
        let names = &rules.profile(difficulty).names;
        let base = names
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| difficulty.to_string());
        let name = format!("{base} #{}", self.added + 1);

        let brain_rules = rules.clone();
        let id = game.add_player(&name, true)?;
        self.added += 1;
        let brain = BotBrain::new(id, difficulty, &brain_rules, self.seed, game.world().now_ms());
        self.brains.insert(id, brain);
        tracing::info!(bot = %id, name = %name, difficulty = %difficulty, "Bot added");
        Ok(id)
    }

    /// Stop driving a bot and take its player out of the game.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] if `player` is not a bot driven
    /// by this controller or is no longer in the game.
    pub fn remove_bot(&mut self, game: &mut Game, player: PlayerId) -> Result<Player> {
        if self.brains.remove(&player).is_none() {
            return Err(GameError::UnknownPlayer(player));
        }
        let removed = game.remove_player(player)?;
        tracing::info!(bot = %player, name = %removed.name, "Bot removed");
        Ok(removed)
    }

    /// Drop every brain.
    pub fn clear(&mut self) {
        self.brains.clear();
    }

    /// Number of bots being driven.
    #[must_use]
    pub fn len(&self) -> usize {
        self.brains.len()
    }

    /// Whether no bots are being driven.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brains.is_empty()
    }

    /// Brain for a bot player.
    #[must_use]
    pub fn brain(&self, player: PlayerId) -> Option<&BotBrain> {
        self.brains.get(&player)
    }

    /// Run every bot whose cooldown has elapsed on the game clock.
    ///
    /// Brains whose player has left or been eliminated are dropped first.
    pub fn update(&mut self, game: &mut Game) -> Vec<BotDecision> {
        let mut decisions = Vec::new();
        self.update_with(game, |_, decision| decisions.push(decision));
        decisions
    }

    /// Like [`update`](Self::update), handing each decision to `on_decision`
    /// with the world right after that action.
    ///
    /// A brain that panics mid-pass is put back on cooldown. Actions it
    /// already submitted stand.
    pub fn update_with(
        &mut self,
        game: &mut Game,
        mut on_decision: impl FnMut(&World, BotDecision),
    ) {
        self.brains.retain(|id, _| {
            let keep = game.world().player(*id).is_some_and(Player::is_alive);
            if !keep {
                tracing::debug!(bot = %id, "Dropping bot brain");
            }
            keep
        });

        let now = game.world().now_ms();
        for (id, brain) in &mut self.brains {
            if !brain.poll(now) {
                continue;
            }
            let pass = panic::catch_unwind(AssertUnwindSafe(|| {
                brain.decide_with(&mut game.seat(*id), now, &mut on_decision);
            }));
            if let Err(payload) = pass {
                tracing::error!(
                    bot = %id,
                    reason = %panic_message(payload.as_ref()),
                    "Bot decision pass panicked"
                );
                brain.back_off(now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::GameRules;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("hard".parse::<BotDifficulty>().unwrap(), BotDifficulty::Hard);
        assert_eq!("Peaceful".parse::<BotDifficulty>().unwrap(), BotDifficulty::Peaceful);
        assert!("insane".parse::<BotDifficulty>().is_err());
    }

    #[test]
    fn test_default_table() {
        let rules = BotRules::default();
        assert_eq!(rules.profile(BotDifficulty::Easy).decision_interval_ms, 5_000);
        assert_eq!(rules.profile(BotDifficulty::Medium).decision_interval_ms, 3_000);
        assert_eq!(rules.profile(BotDifficulty::Hard).decision_interval_ms, 2_000);
        assert_eq!(rules.profile(BotDifficulty::Peaceful).decision_interval_ms, 4_000);
        assert_eq!(rules.profile(BotDifficulty::Hard).worker_percent, 40);
        assert!(rules.profile(BotDifficulty::Peaceful).retaliation_only);
        assert_eq!(rules.profile(BotDifficulty::Easy).nuke_percent, 0);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_attack_troops_margin_and_cap() {
        let tuning = BotTuning::default();
        // ceil(4 × 1.5) = 6, cap floor(20 × 0.4) = 8.
        assert_eq!(attack_troops(4, 20, &tuning), 6);
        // Cap binds.
        assert_eq!(attack_troops(10, 20, &tuning), 8);
        // Empty tile still needs one troop.
        assert_eq!(attack_troops(0, 20, &tuning), 1);
        // ceil(1 × 1.5) = 2.
        assert_eq!(attack_troops(1, 20, &tuning), 2);
    }

    #[test]
    fn test_attack_troops_against_enormous_defenses() {
        let tuning = BotTuning::default();
        let fortress = u64::from(u32::MAX) * 2 * 5;
        assert_eq!(attack_troops(fortress, 30, &tuning), 12);
        assert_eq!(attack_troops(u64::MAX, 30, &tuning), 12);
        assert_eq!(attack_troops(u64::MAX, u32::MAX, &tuning), 1_717_986_918);

        let greedy = BotTuning {
            attack_margin_percent: u16::MAX,
            max_commit_percent: 100,
            ..BotTuning::default()
        };
        assert_eq!(attack_troops(u64::MAX / 2, u32::MAX, &greedy), u32::MAX);
    }

    #[test]
    fn test_target_score() {
        let profile = BotProfile::peaceful();
        let mut me = Player {
            id: PlayerId(1),
            name: "me".to_string(),
            color: String::new(),
            is_bot: true,
            gold: 0,
            population: 0,
            max_population: 0,
            workers: 0,
            troops: 0,
            territories: Default::default(),
            alliances: Default::default(),
            attacked_by: Default::default(),
            eliminated: false,
        };
        let mut tile = Tile::new(TileId::new(3, 3), Terrain::Plains);
        tile.troops = 4;
        tile.owner = Some(PlayerId(2));
        assert_eq!(target_score(&tile, &me, &profile), -8 + 10);

        me.attacked_by.insert(PlayerId(2));
        assert_eq!(target_score(&tile, &me, &profile), -8 + 10 + 50);
        assert_eq!(target_score(&tile, &me, &BotProfile::hard()), -8 + 10);
    }

    #[test]
    fn test_brain_cycle() {
        let mut game = Game::new(GameRules::default(), 5).unwrap();
        let id = game.add_player("bot", true).unwrap();
        let rules = BotRules::default();
        let mut brain = BotBrain::new(id, BotDifficulty::Medium, &rules, 5, 0);

        assert!(!brain.poll(2_999));
        assert!(brain.poll(3_000));
        assert_eq!(brain.state(), BotState::Idle);

        brain.decide(&mut game.seat(id), 3_000);
        assert_eq!(brain.state(), BotState::Cooldown { ready_at_ms: 6_000 });
    }

    #[test]
    fn test_rebalance_uses_worker_ratio() {
        let mut game = Game::new(GameRules::default(), 5).unwrap();
        let id = game.add_player("bot", true).unwrap();
        let mut brain = BotBrain::new(id, BotDifficulty::Hard, &BotRules::default(), 5, 0);
        brain.poll(2_000);
        let decisions = brain.decide(&mut game.seat(id), 2_000);

        assert_eq!(
            decisions[0].action,
            Action::AllocatePopulation {
                workers: 4,
                troops: 6
            }
        );
        assert!(decisions[0].result.is_ok());
    }

    #[test]
    fn test_controller_names_and_drops_departed_bots() {
        let mut game = Game::new(GameRules::default(), 9).unwrap();
        let mut bots = BotController::new(9);
        let a = bots.add_bot(&mut game, BotDifficulty::Hard).unwrap();
        let b = bots.add_bot(&mut game, BotDifficulty::Easy).unwrap();

        let name_a = &game.world().player(a).unwrap().name;
        assert!(name_a.ends_with(" #1"));
        assert!(BotProfile::hard()
            .names
            .iter()
            .any(|n| name_a.starts_with(n.as_str())));
        assert!(game.world().player(b).unwrap().name.ends_with(" #2"));
        assert!(game.world().player(b).unwrap().is_bot);

        game.remove_player(b).unwrap();
        bots.update(&mut game);
        assert_eq!(bots.len(), 1);
        assert!(bots.brain(a).is_some());
    }

    #[test]
    fn test_remove_bot_takes_the_player_out() {
        let mut game = Game::new(GameRules::default(), 9).unwrap();
        let mut bots = BotController::new(9);
        let human = game.add_player("human", false).unwrap();
        let bot = bots.add_bot(&mut game, BotDifficulty::Medium).unwrap();
        let home = *game.world().player(bot).unwrap().territories.iter().next().unwrap();

        let removed = bots.remove_bot(&mut game, bot).unwrap();
        assert_eq!(removed.id, bot);
        assert!(bots.is_empty());
        assert!(game.world().player(bot).is_none());
        assert_eq!(game.world().tile(home).unwrap().owner, None);

        assert!(matches!(
            bots.remove_bot(&mut game, bot),
            Err(GameError::UnknownPlayer(_))
        ));
        assert!(matches!(
            bots.remove_bot(&mut game, human),
            Err(GameError::UnknownPlayer(_))
        ));
        assert!(game.world().player(human).is_some());
    }
}
