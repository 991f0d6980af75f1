//! Game rules: every tunable constant of the simulation.
//!
//! All structs are designed to be deserialized from RON files. Missing fields
//! fall back to the defaults, so a rules file only needs to name what it changes.
//!
//! **Note:** This module contains no IO - it only parses strings.
//! File loading is handled by `conquest_server`.
//!
//! # Example RON
//!
//! ```ron
//! GameRules(
//!     map: (width: 40, height: 24),
//!     nuke: (cost: 150),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::bot::BotRules;
use crate::error::{GameError, Result};
use crate::world::BuildingType;

/// Map dimensions and terrain generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapRules {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Chance (0-100) that an interior plains tile becomes mountains.
    pub mountain_chance_percent: u8,
}

impl Default for MapRules {
    fn default() -> Self {
        Self {
            width: 30,
            height: 20,
            mountain_chance_percent: 15,
        }
    }
}

/// Resources every player starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingResources {
    /// Starting gold.
    pub gold: u64,
    /// Starting population capacity.
    pub max_population: u32,
    /// Starting workers.
    pub workers: u32,
    /// Starting mobile troops.
    pub troops: u32,
    /// Garrison placed on the starting tile.
    pub garrison: u32,
}

impl Default for StartingResources {
    fn default() -> Self {
        Self {
            gold: 100,
            max_population: 50,
            workers: 5,
            troops: 5,
            garrison: 5,
        }
    }
}

/// Building costs and effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingRules {
    /// Cost of a city.
    pub city_cost: u64,
    /// Cost of a defense post.
    pub defense_post_cost: u64,
    /// Cost of a port.
    pub port_cost: u64,
    /// Cost of a missile silo.
    pub missile_silo_cost: u64,
    /// Cost of a SAM site.
    pub sam_site_cost: u64,
    /// Population capacity added by each city.
    pub city_population_bonus: u32,
    /// Defense multiplier added per defense post.
    pub defense_bonus_per_post: u32,
    /// Gold per tick from each port.
    pub port_trade_income: u64,
    /// Silo recovery after a launch.
    pub silo_cooldown_ms: u64,
    /// SAM recovery after an interception.
    pub sam_cooldown_ms: u64,
    /// Manhattan radius a SAM site covers around a missile target.
    pub sam_intercept_radius: u32,
}

impl BuildingRules {
    /// Gold cost for a building type.
    #[must_use]
    pub const fn cost(&self, kind: BuildingType) -> u64 {
        match kind {
            BuildingType::City => self.city_cost,
            BuildingType::DefensePost => self.defense_post_cost,
            BuildingType::Port => self.port_cost,
            BuildingType::MissileSilo => self.missile_silo_cost,
            BuildingType::SamSite => self.sam_site_cost,
        }
    }
}

impl Default for BuildingRules {
    fn default() -> Self {
        Self {
            city_cost: 100,
            defense_post_cost: 50,
            port_cost: 75,
            missile_silo_cost: 200,
            sam_site_cost: 150,
            city_population_bonus: 50,
            defense_bonus_per_post: 2,
            port_trade_income: 5,
            silo_cooldown_ms: 10_000,
            sam_cooldown_ms: 10_000,
            sam_intercept_radius: 3,
        }
    }
}

/// Nuclear strike parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NukeRules {
    /// Gold cost per launch.
    pub cost: u64,
    /// Manhattan radius of the impact area.
    pub damage_radius: u32,
    /// Flight time from launch to impact.
    pub travel_time_ms: u64,
}

impl Default for NukeRules {
    fn default() -> Self {
        Self {
            cost: 100,
            damage_radius: 2,
            travel_time_ms: 5_000,
        }
    }
}

/// Complete rule set for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Map shape.
    pub map: MapRules,
    /// Per-player starting resources.
    pub start: StartingResources,
    /// Scheduler period.
    pub tick_period_ms: u64,
    /// Workers needed per gold of income each tick (income is floored).
    pub workers_per_gold: u32,
    /// Building catalog.
    pub buildings: BuildingRules,
    /// Ballistics.
    pub nuke: NukeRules,
    /// Bot difficulty table.
    pub bots: BotRules,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            map: MapRules::default(),
            start: StartingResources::default(),
            tick_period_ms: 1_000,
            workers_per_gold: 2,
            buildings: BuildingRules::default(),
            nuke: NukeRules::default(),
            bots: BotRules::default(),
        }
    }
}

impl GameRules {
    /// Parse rules from RON text and validate them.
    ///
    /// `label` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed RON or
    /// [`GameError::InvalidRules`] when validation fails.
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        let rules: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Render the rules as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if encoding fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Check that the rules describe a playable game.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidRules`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(GameError::InvalidRules(msg.to_string()));

        if self.map.width < 5 || self.map.height < 5 {
            return invalid("map must be at least 5x5 so the interior holds plains");
        }
        if self.map.mountain_chance_percent > 100 {
            return invalid("mountain_chance_percent must be within 0..=100");
        }
        if self.tick_period_ms == 0 {
            return invalid("tick_period_ms must be positive");
        }
        if self.workers_per_gold == 0 {
            return invalid("workers_per_gold must be positive");
        }
        if self.start.workers + self.start.troops > self.start.max_population {
            return invalid("starting population exceeds starting capacity");
        }
        if self.nuke.travel_time_ms == 0 {
            return invalid("nuke travel_time_ms must be positive");
        }
        self.bots.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_catalog() {
        let rules = GameRules::default();
        assert_eq!(rules.buildings.cost(BuildingType::City), 100);
        assert_eq!(rules.buildings.cost(BuildingType::DefensePost), 50);
        assert_eq!(rules.buildings.cost(BuildingType::Port), 75);
        assert_eq!(rules.buildings.cost(BuildingType::MissileSilo), 200);
        assert_eq!(rules.buildings.cost(BuildingType::SamSite), 150);
        assert_eq!(rules.nuke.cost, 100);
        assert_eq!(rules.tick_period_ms, 1_000);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let rules =
            GameRules::from_ron_str("(map: (width: 40), nuke: (cost: 150))", "inline").unwrap();
        assert_eq!(rules.map.width, 40);
        assert_eq!(rules.map.height, 20);
        assert_eq!(rules.nuke.cost, 150);
        assert_eq!(rules.nuke.travel_time_ms, 5_000);
    }

    #[test]
    fn test_ron_round_trip() {
        let rules = GameRules::default();
        let text = rules.to_ron_string().unwrap();
        let parsed = GameRules::from_ron_str(&text, "roundtrip").unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_malformed_ron_reports_label() {
        let err = GameRules::from_ron_str("(map: (width: ", "broken.ron").unwrap_err();
        match err {
            GameError::DataParseError { path, .. } => assert_eq!(path, "broken.ron"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_tiny_map() {
        let mut rules = GameRules::default();
        rules.map.width = 3;
        assert!(matches!(rules.validate(), Err(GameError::InvalidRules(_))));
    }

    #[test]
    fn test_validate_rejects_zero_tick_period() {
        let mut rules = GameRules::default();
        rules.tick_period_ms = 0;
        assert!(rules.validate().is_err());
    }
}
