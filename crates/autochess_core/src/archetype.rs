//! Unit archetypes and their base stat templates.

use serde::{Deserialize, Serialize};

use crate::ability::Ability;
use crate::math::{fixed_serde, percent, Fixed};

/// Largest value a roster may give any stat or ability parameter.
///
/// Level scaling, crit multipliers, mitigation and team health sums over a
/// full board all stay far below the `Fixed` limit under this cap.
pub const MAX_STAT_VALUE: u32 = 10_000;

/// Combat role of a unit.
///
/// The archetype selects the stat template, the default ability and the
/// decision policy used by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Archetype {
    /// Sturdy melee fighter.
    Warrior,
    /// Fragile ranged attacker that keeps its distance.
    Archer,
    /// Ranged caster with a low mana pool and a strong spell.
    Mage,
    /// High health melee frontliner.
    Tank,
    /// Melee striker with high crit chance.
    Assassin,
    /// Ranged healer.
    Support,
}

impl Archetype {
    /// All archetypes in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Warrior,
        Self::Archer,
        Self::Mage,
        Self::Tank,
        Self::Assassin,
        Self::Support,
    ];

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Warrior => "Warrior",
            Self::Archer => "Archer",
            Self::Mage => "Mage",
            Self::Tank => "Tank",
            Self::Assassin => "Assassin",
            Self::Support => "Support",
        }
    }

    /// Single-character board symbol.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Warrior => 'W',
            Self::Archer => 'R',
            Self::Mage => 'M',
            Self::Tank => 'T',
            Self::Assassin => 'X',
            Self::Support => 'S',
        }
    }

    /// Level 1 stat template.
    #[must_use]
    pub fn base_stats(self) -> UnitStats {
        let (health, attack, defense, resistance, range) = match self {
            Self::Warrior => (100, 15, 8, 8, 1),
            Self::Archer => (70, 12, 3, 3, 4),
            Self::Mage => (60, 20, 2, 2, 4),
            Self::Tank => (150, 8, 12, 12, 1),
            Self::Assassin => (80, 12, 4, 4, 1),
            Self::Support => (90, 5, 6, 6, 4),
        };
        let stats = UnitStats::new(health, attack, defense, resistance, range);

        match self {
            Self::Mage => stats.with_max_mana(50),
            Self::Support => stats.with_max_mana(80),
            Self::Assassin => stats.with_crit_chance(50),
            _ => stats,
        }
    }

    /// Ability granted when the roster does not override it.
    #[must_use]
    pub const fn default_ability(self) -> Ability {
        match self {
            Self::Warrior => Ability::SpinSlash { damage: 100 },
            Self::Archer => Ability::Frenzy {
                percent: 25,
                duration: 30,
            },
            Self::Mage => Ability::Fireball {
                damage: 250,
                range: 5,
            },
            Self::Tank => Ability::GroundSlam {
                damage: 60,
                stun_ticks: 20,
            },
            Self::Assassin => Ability::Blink {
                range: 3,
                damage: 100,
            },
            Self::Support => Ability::Mend {
                amount: 80,
                range: 4,
            },
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Combat statistics of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum health.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Basic attack damage before mitigation.
    #[serde(with = "fixed_serde")]
    pub attack: Fixed,
    /// Physical mitigation.
    #[serde(with = "fixed_serde")]
    pub defense: Fixed,
    /// Magical mitigation.
    #[serde(with = "fixed_serde")]
    pub resistance: Fixed,
    /// Basic attack range in cells.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Cells of metric distance travelled per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Ticks between basic attacks.
    pub attack_cooldown: u32,
    /// Critical hit chance in percent.
    pub crit_chance: u8,
    /// Damage multiplier on a critical hit.
    #[serde(with = "fixed_serde")]
    pub crit_multiplier: Fixed,
    /// Mana required to cast the ability.
    #[serde(with = "fixed_serde")]
    pub max_mana: Fixed,
}

impl UnitStats {
    /// Default ticks between basic attacks.
    pub const DEFAULT_ATTACK_COOLDOWN: u32 = 10;
    /// Default critical hit chance in percent.
    pub const DEFAULT_CRIT_CHANCE: u8 = 25;
    /// Default mana pool.
    pub const DEFAULT_MAX_MANA: u32 = 100;

    /// Create stats with the shared defaults for everything not given.
    #[must_use]
    pub fn new(health: u32, attack: u32, defense: u32, resistance: u32, range: u32) -> Self {
        Self {
            max_health: Fixed::from_num(health),
            attack: Fixed::from_num(attack),
            defense: Fixed::from_num(defense),
            resistance: Fixed::from_num(resistance),
            range: Fixed::from_num(range),
            speed: Fixed::ONE,
            attack_cooldown: Self::DEFAULT_ATTACK_COOLDOWN,
            crit_chance: Self::DEFAULT_CRIT_CHANCE,
            crit_multiplier: Fixed::from_num(3) / Fixed::from_num(2),
            max_mana: Fixed::from_num(Self::DEFAULT_MAX_MANA),
        }
    }

    /// Set the mana pool.
    #[must_use]
    pub fn with_max_mana(mut self, mana: u32) -> Self {
        self.max_mana = Fixed::from_num(mana);
        self
    }

    /// Set the critical hit chance (clamped to 100).
    #[must_use]
    pub fn with_crit_chance(mut self, chance: u8) -> Self {
        self.crit_chance = chance.min(100);
        self
    }

    /// Set the movement speed.
    #[must_use]
    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = Fixed::from_num(speed);
        self
    }

    /// Stats scaled for a star level.
    ///
    /// Health grows 50%, attack 30% and defense 20% per level above 1.
    /// Levels below 1 are treated as 1.
    #[must_use]
    pub fn scaled_for_level(&self, level: u8) -> Self {
        let steps = u32::from(level.max(1) - 1);
        let mut scaled = *self;
        scaled.max_health = self.max_health * (Fixed::ONE + percent(50 * steps));
        scaled.attack = self.attack * (Fixed::ONE + percent(30 * steps));
        scaled.defense = self.defense * (Fixed::ONE + percent(20 * steps));
        scaled
    }
}

impl Default for UnitStats {
    fn default() -> Self {
        Archetype::Warrior.base_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    #[test]
    fn test_templates() {
        let mage = Archetype::Mage.base_stats();
        assert_eq!(mage.max_health, fixed(60));
        assert_eq!(mage.max_mana, fixed(50));
        assert_eq!(mage.range, fixed(4));

        let assassin = Archetype::Assassin.base_stats();
        assert_eq!(assassin.crit_chance, 50);

        let tank = Archetype::Tank.base_stats();
        assert_eq!(tank.max_mana, fixed(100));
        assert_eq!(tank.crit_chance, 25);
        assert_eq!(tank.speed, Fixed::ONE);
    }

    #[test]
    fn test_level_scaling() {
        let warrior = Archetype::Warrior.base_stats();

        let level1 = warrior.scaled_for_level(1);
        assert_eq!(level1, warrior);

        let level3 = warrior.scaled_for_level(3);
        assert_eq!(level3.max_health, fixed(200));
        assert_eq!(level3.attack, fixed(15) * (Fixed::ONE + percent(60)));
        assert_eq!(level3.defense, fixed(8) * (Fixed::ONE + percent(40)));
        assert_eq!(level3.range, warrior.range);
    }

    #[test]
    fn test_symbols_unique() {
        let mut symbols: Vec<char> = Archetype::ALL.iter().map(|a| a.symbol()).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), Archetype::ALL.len());
    }
}
