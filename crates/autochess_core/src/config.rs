//! Battle configuration.
//!
//! Every field has a default, so a RON config file only needs to name the
//! values it changes:
//!
//! ```ron
//! (
//!     distance_metric: Chebyshev,
//!     random_seed: 7,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::DistanceMetric;

/// Default tick limit before a battle times out.
pub const DEFAULT_MAX_TICKS: u64 = 500;
/// Default RNG seed.
pub const DEFAULT_SEED: u64 = 42;
/// Default lifetime of a sticky target choice, in ticks.
pub const DEFAULT_STICKY_TICKS: u64 = 10;

/// Order in which living units act within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TieBreakRule {
    /// Highest movement speed first, then lowest id.
    #[default]
    SpeedThenId,
    /// Lowest id first.
    IdOnly,
    /// Board position, top row first, left to right.
    RowMajor,
}

/// How a battle that reaches the tick limit is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeoutRule {
    /// Always a draw.
    #[default]
    Draw,
    /// The team with more total remaining health wins; equal totals draw.
    HealthTotal,
}

/// Tunable rules for a single battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Metric used for range checks and movement cost.
    pub distance_metric: DistanceMetric,
    /// Tick limit. The battle always ends on or before this tick.
    pub max_ticks: u64,
    /// Seed for the battle RNG (crit rolls).
    pub random_seed: u64,
    /// Acting order within a tick.
    pub tie_break: TieBreakRule,
    /// Scoring of a battle that hits the tick limit.
    pub timeout_rule: TimeoutRule,
    /// Whether basic attacks need an unobstructed line.
    pub line_of_sight: bool,
    /// How long a chosen target stays preferred.
    pub sticky_target_ticks: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            distance_metric: DistanceMetric::default(),
            max_ticks: DEFAULT_MAX_TICKS,
            random_seed: DEFAULT_SEED,
            tie_break: TieBreakRule::default(),
            timeout_rule: TimeoutRule::default(),
            line_of_sight: false,
            sticky_target_ticks: DEFAULT_STICKY_TICKS,
        }
    }
}

impl BattleConfig {
    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Set the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Set the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    /// Set the acting order rule.
    #[must_use]
    pub fn with_tie_break(mut self, rule: TieBreakRule) -> Self {
        self.tie_break = rule;
        self
    }

    /// Set the timeout scoring rule.
    #[must_use]
    pub fn with_timeout_rule(mut self, rule: TimeoutRule) -> Self {
        self.timeout_rule = rule;
        self
    }

    /// Enable or disable line-of-sight checks for attacks.
    #[must_use]
    pub fn with_line_of_sight(mut self, enabled: bool) -> Self {
        self.line_of_sight = enabled;
        self
    }

    /// Set how long a chosen target stays preferred.
    #[must_use]
    pub fn with_sticky_target_ticks(mut self, ticks: u64) -> Self {
        self.sticky_target_ticks = ticks;
        self
    }

    /// Check the config is usable.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidConfig`] if `max_ticks` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_ticks == 0 {
            return Err(BattleError::InvalidConfig(
                "max_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] on malformed input.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| BattleError::parse("<inline>", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| BattleError::parse(path.display().to_string(), e))?;
        let config: Self =
            ron::from_str(&contents).map_err(|e| BattleError::parse(path.display().to_string(), e))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BattleConfig::default();
        assert_eq!(config.max_ticks, 500);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.distance_metric, DistanceMetric::Euclidean);
        assert_eq!(config.tie_break, TieBreakRule::SpeedThenId);
        assert_eq!(config.timeout_rule, TimeoutRule::Draw);
        assert!(!config.line_of_sight);
    }

    #[test]
    fn test_builders() {
        let config = BattleConfig::default()
            .with_seed(9)
            .with_max_ticks(20)
            .with_metric(DistanceMetric::Manhattan)
            .with_tie_break(TieBreakRule::IdOnly)
            .with_timeout_rule(TimeoutRule::HealthTotal)
            .with_line_of_sight(true)
            .with_sticky_target_ticks(3);
        assert_eq!(config.random_seed, 9);
        assert_eq!(config.max_ticks, 20);
        assert_eq!(config.distance_metric, DistanceMetric::Manhattan);
        assert_eq!(config.tie_break, TieBreakRule::IdOnly);
        assert_eq!(config.timeout_rule, TimeoutRule::HealthTotal);
        assert!(config.line_of_sight);
        assert_eq!(config.sticky_target_ticks, 3);
    }

    #[test]
    fn test_partial_ron() {
        let config = BattleConfig::from_ron_str("(distance_metric: Chebyshev, random_seed: 7)").unwrap();
        assert_eq!(config.distance_metric, DistanceMetric::Chebyshev);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.max_ticks, DEFAULT_MAX_TICKS);
    }

    #[test]
    fn test_zero_ticks_rejected() {
        assert!(matches!(
            BattleConfig::from_ron_str("(max_ticks: 0)"),
            Err(BattleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_ron() {
        assert!(matches!(
            BattleConfig::from_ron_str("(max_ticks: \"many\")"),
            Err(BattleError::DataParseError { .. })
        ));
    }
}
