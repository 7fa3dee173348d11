//! Scenario loading and built-in presets.
//!
//! A scenario bundles a roster with the rules it is fought under. Scenarios
//! load from RON files or come from the preset list: a mirrored duel and the
//! nine PvE enemy lineups, each facing a standard player squad.

use std::path::Path;

use autochess_core::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HeadlessError, Result};

/// A named roster plus rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Both teams and the board.
    pub roster: Roster,
    /// Battle rules.
    #[serde(default)]
    pub config: BattleConfig,
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| HeadlessError::io(path, e))?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid scenario.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::parse(ron, "<inline>")
    }

    fn parse(ron: &str, path: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|source| HeadlessError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            HeadlessError::Battle(BattleError::InvalidState(format!(
                "Failed to serialize scenario: {e}"
            )))
        })
    }

    /// Resolve a CLI argument: a preset name first, then a RON file path.
    ///
    /// # Errors
    ///
    /// Returns [`HeadlessError::UnknownScenario`] when neither matches, or
    /// the load error of an existing file.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        if let Some(preset) = preset(name_or_path) {
            debug!(scenario = name_or_path, "Using preset scenario");
            return Ok(preset);
        }
        let path = Path::new(name_or_path);
        if path.exists() {
            return Self::load(path);
        }
        Err(HeadlessError::UnknownScenario(name_or_path.to_string()))
    }

    /// Replace the seed, keeping every other rule.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Replace the tick budget.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.config.max_ticks = max_ticks;
        self
    }

    /// Validate and open a snapshot stream.
    ///
    /// # Errors
    ///
    /// Returns the engine's roster or config error.
    pub fn stream(&self) -> Result<BattleStream> {
        Ok(BattleStream::new(self.roster.clone(), self.config.clone())?)
    }
}

/// Enemy lineups of the PvE levels, on team A in the top rows.
const LEVELS: [&[(Archetype, i32, i32)]; 9] = [
    &[(Archetype::Tank, 3, 3), (Archetype::Archer, 2, 1)],
    &[
        (Archetype::Tank, 3, 3),
        (Archetype::Mage, 2, 1),
        (Archetype::Warrior, 2, 3),
    ],
    &[
        (Archetype::Tank, 3, 3),
        (Archetype::Archer, 0, 0),
        (Archetype::Archer, 1, 0),
    ],
    &[
        (Archetype::Tank, 3, 3),
        (Archetype::Warrior, 2, 3),
        (Archetype::Archer, 0, 0),
        (Archetype::Archer, 1, 0),
    ],
    &[
        (Archetype::Tank, 3, 3),
        (Archetype::Tank, 2, 3),
        (Archetype::Assassin, 0, 2),
        (Archetype::Assassin, 1, 2),
        (Archetype::Assassin, 2, 2),
    ],
    &[
        (Archetype::Archer, 0, 0),
        (Archetype::Archer, 1, 0),
        (Archetype::Archer, 2, 0),
        (Archetype::Archer, 3, 0),
        (Archetype::Archer, 4, 0),
        (Archetype::Archer, 5, 0),
        (Archetype::Archer, 6, 0),
    ],
    &[
        (Archetype::Tank, 0, 3),
        (Archetype::Tank, 1, 3),
        (Archetype::Tank, 2, 3),
        (Archetype::Tank, 3, 3),
        (Archetype::Tank, 4, 3),
        (Archetype::Tank, 5, 3),
    ],
    &[
        (Archetype::Warrior, 0, 3),
        (Archetype::Warrior, 1, 3),
        (Archetype::Warrior, 2, 3),
        (Archetype::Warrior, 3, 3),
        (Archetype::Warrior, 4, 3),
        (Archetype::Warrior, 5, 3),
        (Archetype::Warrior, 6, 3),
    ],
    &[
        (Archetype::Mage, 0, 0),
        (Archetype::Mage, 1, 0),
        (Archetype::Mage, 2, 0),
        (Archetype::Mage, 3, 0),
        (Archetype::Mage, 4, 0),
        (Archetype::Mage, 5, 0),
        (Archetype::Mage, 6, 0),
        (Archetype::Tank, 3, 3),
    ],
];

/// Player squad placed on team B in the bottom rows of every level.
const PLAYER_SQUAD: [(Archetype, i32, i32); 4] = [
    (Archetype::Warrior, 3, 4),
    (Archetype::Tank, 2, 4),
    (Archetype::Archer, 1, 7),
    (Archetype::Mage, 5, 7),
];

/// Names of every preset, in listing order.
#[must_use]
pub fn preset_names() -> Vec<String> {
    std::iter::once("duel".to_string())
        .chain((1..=LEVELS.len()).map(|n| format!("level{n}")))
        .collect()
}

/// Every preset scenario, in listing order.
#[must_use]
pub fn presets() -> Vec<Scenario> {
    preset_names().iter().filter_map(|name| preset(name)).collect()
}

/// Look up a preset by name (`duel`, `level1`..`level9`).
#[must_use]
pub fn preset(name: &str) -> Option<Scenario> {
    if name == "duel" {
        return Some(Scenario {
            name: "duel".to_string(),
            description: "Warrior against warrior across the middle of the board".to_string(),
            roster: Roster::new(7, 8)
                .with_unit(Team::A, UnitSpec::new(Archetype::Warrior, 3, 2))
                .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 3, 5)),
            config: BattleConfig::default(),
        });
    }

    let level: usize = name.strip_prefix("level")?.parse().ok()?;
    let enemies = LEVELS.get(level.checked_sub(1)?)?;

    let mut roster = Roster::new(7, 8);
    for &(archetype, x, y) in *enemies {
        roster = roster.with_unit(Team::A, UnitSpec::new(archetype, x, y));
    }
    for (archetype, x, y) in PLAYER_SQUAD {
        roster = roster.with_unit(Team::B, UnitSpec::new(archetype, x, y));
    }

    Some(Scenario {
        name: name.to_string(),
        description: format!(
            "PvE level {level}: {} enemies against the standard squad",
            enemies.len()
        ),
        roster,
        config: BattleConfig::default().with_timeout_rule(TimeoutRule::HealthTotal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_is_valid() {
        let all = presets();
        assert_eq!(all.len(), 10);
        for scenario in all {
            assert!(
                scenario.roster.validate().is_ok(),
                "{} is invalid",
                scenario.name
            );
        }
    }

    #[test]
    fn test_unknown_presets() {
        assert!(preset("level0").is_none());
        assert!(preset("level10").is_none());
        assert!(preset("levelx").is_none());
        assert!(preset("skirmish").is_none());
    }

    #[test]
    fn test_resolve_unknown_name() {
        assert!(matches!(
            Scenario::resolve("no-such-scenario"),
            Err(HeadlessError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_ron_round_trip() {
        let scenario = preset("level2").unwrap();
        let text = scenario.to_ron_string().unwrap();
        assert_eq!(Scenario::from_ron_str(&text).unwrap(), scenario);
    }

    #[test]
    fn test_config_defaults_when_omitted() {
        let scenario = Scenario::from_ron_str(
            r#"(
                name: "tiny",
                roster: (
                    board: (3, 3),
                    teams: {
                        A: [(archetype: Tank, position: (x: 0, y: 0))],
                        B: [(archetype: Mage, position: (x: 2, y: 2))],
                    },
                ),
            )"#,
        )
        .unwrap();
        assert_eq!(scenario.config, BattleConfig::default());
        assert!(scenario.description.is_empty());
        assert!(scenario.stream().is_ok());
    }
}
