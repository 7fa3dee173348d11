//! Roster input: who fights, where, and with what stats.
//!
//! Rosters are plain data and load from RON:
//!
//! ```ron
//! (
//!     board: (7, 8),
//!     teams: {
//!         A: [(archetype: Warrior, position: (x: 3, y: 2), level: 2)],
//!         B: [(archetype: Archer, position: (x: 3, y: 6))],
//!     },
//! )
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ability::Ability;
use crate::archetype::{Archetype, UnitStats, MAX_STAT_VALUE};
use crate::battlefield::{check_dimensions, Battlefield, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::{BattleError, Result};
use crate::math::{DistanceMetric, Fixed, GridPos};
use crate::state::BattleState;
use crate::unit::{Team, Unit, UnitId};

/// Highest star level.
pub const MAX_LEVEL: u8 = 3;

fn default_level() -> u8 {
    1
}

/// Absolute stat values replacing the archetype template after level scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StatOverrides {
    /// Maximum health.
    pub max_health: Option<u32>,
    /// Attack damage.
    pub attack: Option<u32>,
    /// Physical mitigation.
    pub defense: Option<u32>,
    /// Magical mitigation.
    pub resistance: Option<u32>,
    /// Attack range in cells.
    pub range: Option<u32>,
    /// Movement speed in cells per tick.
    pub speed: Option<u32>,
    /// Ticks between attacks.
    pub attack_cooldown: Option<u32>,
    /// Crit chance in percent.
    pub crit_chance: Option<u8>,
    /// Mana pool.
    pub max_mana: Option<u32>,
}

impl StatOverrides {
    /// Every override that is set, by name.
    #[must_use]
    pub fn values(&self) -> Vec<(&'static str, u32)> {
        [
            ("max_health", self.max_health),
            ("attack", self.attack),
            ("defense", self.defense),
            ("resistance", self.resistance),
            ("range", self.range),
            ("speed", self.speed),
            ("attack_cooldown", self.attack_cooldown),
            ("crit_chance", self.crit_chance.map(u32::from)),
            ("max_mana", self.max_mana),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    /// Replace every overridden stat in `stats`.
    #[must_use]
    pub fn apply(&self, mut stats: UnitStats) -> UnitStats {
        let set = |slot: &mut Fixed, value: Option<u32>| {
            if let Some(v) = value {
                *slot = Fixed::from_num(v);
            }
        };
        set(&mut stats.max_health, self.max_health);
        set(&mut stats.attack, self.attack);
        set(&mut stats.defense, self.defense);
        set(&mut stats.resistance, self.resistance);
        set(&mut stats.range, self.range);
        set(&mut stats.speed, self.speed);
        set(&mut stats.max_mana, self.max_mana);
        if let Some(cooldown) = self.attack_cooldown {
            stats.attack_cooldown = cooldown;
        }
        if let Some(chance) = self.crit_chance {
            stats.crit_chance = chance.min(100);
        }
        stats
    }
}

/// One unit entry in a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Archetype template.
    pub archetype: Archetype,
    /// Starting cell.
    pub position: GridPos,
    /// Star level, 1 to 3.
    #[serde(default = "default_level")]
    pub level: u8,
    /// Stat replacements.
    #[serde(default)]
    pub stats: StatOverrides,
    /// Ability replacing the archetype default.
    #[serde(default)]
    pub ability: Option<Ability>,
}

impl UnitSpec {
    /// Level 1 unit with template stats at `(x, y)`.
    #[must_use]
    pub const fn new(archetype: Archetype, x: i32, y: i32) -> Self {
        Self {
            archetype,
            position: GridPos::new(x, y),
            level: 1,
            stats: StatOverrides {
                max_health: None,
                attack: None,
                defense: None,
                resistance: None,
                range: None,
                speed: None,
                attack_cooldown: None,
                crit_chance: None,
                max_mana: None,
            },
            ability: None,
        }
    }

    /// Set the star level.
    #[must_use]
    pub const fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Set stat overrides.
    #[must_use]
    pub const fn with_stats(mut self, stats: StatOverrides) -> Self {
        self.stats = stats;
        self
    }

    /// Replace the ability.
    #[must_use]
    pub const fn with_ability(mut self, ability: Ability) -> Self {
        self.ability = Some(ability);
        self
    }

    /// Final stats: template, then level scaling, then overrides.
    #[must_use]
    pub fn resolved_stats(&self) -> UnitStats {
        self.stats
            .apply(self.archetype.base_stats().scaled_for_level(self.level))
    }

    /// Ability the unit will carry.
    #[must_use]
    pub fn resolved_ability(&self) -> Ability {
        self.ability
            .unwrap_or_else(|| self.archetype.default_ability())
    }
}

/// Board size plus the units of both teams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roster {
    /// Board `(width, height)` in cells.
    pub board: (u32, u32),
    /// Units per team, in placement order.
    pub teams: BTreeMap<Team, Vec<UnitSpec>>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Roster {
    /// Empty roster on a `width` x `height` board.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            board: (width, height),
            teams: BTreeMap::new(),
        }
    }

    /// Add a unit to a team.
    #[must_use]
    pub fn with_unit(mut self, team: Team, spec: UnitSpec) -> Self {
        self.teams.entry(team).or_default().push(spec);
        self
    }

    /// Units of a team (empty if the team is absent).
    #[must_use]
    pub fn team(&self, team: Team) -> &[UnitSpec] {
        self.teams.get(&team).map_or(&[], Vec::as_slice)
    }

    /// Total number of units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.teams.values().map(Vec::len).sum()
    }

    /// Specs in id order (team A first), paired with their team.
    pub fn specs(&self) -> impl Iterator<Item = (Team, &UnitSpec)> + '_ {
        Team::ALL
            .into_iter()
            .flat_map(move |team| self.team(team).iter().map(move |spec| (team, spec)))
    }

    /// Check the roster can start a battle.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidRoster`] for a zero-size board, a
    /// missing or empty team, a position outside the board or shared with
    /// another unit, a level outside 1..=3, a non-positive max health, or a
    /// stat or ability value above [`MAX_STAT_VALUE`].
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.board;
        check_dimensions(width, height)?;

        for team in Team::ALL {
            if self.team(team).is_empty() {
                return Err(BattleError::InvalidRoster(format!(
                    "team {team} has no units"
                )));
            }
        }

        let mut occupied = BTreeSet::new();
        for (team, spec) in self.specs() {
            let pos = spec.position;
            if pos.x < 0 || pos.y < 0 || pos.x as u32 >= width || pos.y as u32 >= height {
                return Err(BattleError::InvalidRoster(format!(
                    "{} of team {team} at {pos} is outside the {width}x{height} board",
                    spec.archetype
                )));
            }
            if !occupied.insert(pos) {
                return Err(BattleError::InvalidRoster(format!(
                    "more than one unit placed at {pos}"
                )));
            }
            if !(1..=MAX_LEVEL).contains(&spec.level) {
                return Err(BattleError::InvalidRoster(format!(
                    "{} of team {team} has level {}, expected 1..={MAX_LEVEL}",
                    spec.archetype, spec.level
                )));
            }
            let oversized = spec
                .stats
                .values()
                .into_iter()
                .chain(spec.ability.iter().flat_map(Ability::parameters))
                .find(|&(_, value)| value > MAX_STAT_VALUE);
            if let Some((name, value)) = oversized {
                return Err(BattleError::InvalidRoster(format!(
                    "{} of team {team} at {pos} has {name} {value}, limit is {MAX_STAT_VALUE}",
                    spec.archetype
                )));
            }
            if spec.resolved_stats().max_health <= Fixed::ZERO {
                return Err(BattleError::InvalidRoster(format!(
                    "{} of team {team} at {pos} has no health",
                    spec.archetype
                )));
            }
        }

        Ok(())
    }

    /// Validate and instantiate units on a fresh battlefield.
    ///
    /// Ids start at 1 and follow roster order, team A first.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidRoster`] if validation fails.
    pub fn build(&self, metric: DistanceMetric) -> Result<BattleState> {
        self.validate()?;

        let (width, height) = self.board;
        let mut battlefield = Battlefield::new(width, height, metric)?;
        let mut units = Vec::with_capacity(self.unit_count());

        for (index, (team, spec)) in self.specs().enumerate() {
            let id = index as UnitId + 1;
            battlefield.place(id, spec.position)?;
            units.push(Unit::new(
                id,
                team,
                spec.archetype,
                spec.level,
                spec.resolved_stats(),
                spec.resolved_ability(),
                spec.position,
            ));
        }

        Ok(BattleState::new(units, battlefield))
    }

    /// Parse a roster from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] on malformed input.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| BattleError::parse("<inline>", e))
    }

    /// Load a roster from a RON file. Validation happens when the battle starts.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| BattleError::parse(path.display().to_string(), e))?;
        ron::from_str(&contents).map_err(|e| BattleError::parse(path.display().to_string(), e))
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| BattleError::InvalidState(format!("Failed to serialize roster: {e}")))
    }
}
