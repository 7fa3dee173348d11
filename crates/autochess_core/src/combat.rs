//! Damage mitigation and basic attack rolls.
//!
//! Mitigation uses a diminishing formula rather than flat subtraction:
//! `damage * 10 / (10 + defense)`, floored at 1 so that every landed hit
//! does something. Magical damage is reduced by resistance instead of
//! defense, and true damage ignores both.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::Fixed;
use crate::unit::Unit;

/// Mitigation scale constant. Defense equal to this halves damage.
const MITIGATION_SCALE: i32 = 10;

/// Kind of damage, selecting which stat mitigates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DamageKind {
    /// Reduced by defense.
    #[default]
    Physical,
    /// Reduced by resistance.
    Magical,
    /// Not reduced.
    True,
}

impl DamageKind {
    /// Lowercase name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Magical => "magical",
            Self::True => "true",
        }
    }
}

/// Apply mitigation to raw damage.
///
/// Never negative. Positive raw damage always deals at least 1.
#[must_use]
pub fn mitigate(raw: Fixed, kind: DamageKind, defense: Fixed, resistance: Fixed) -> Fixed {
    if raw <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let armor = match kind {
        DamageKind::Physical => defense,
        DamageKind::Magical => resistance,
        DamageKind::True => return raw,
    };

    let scale = Fixed::from_num(MITIGATION_SCALE);
    let denominator = scale + armor.max(Fixed::ZERO);
    (raw * scale / denominator).max(Fixed::ONE)
}

/// Mitigate damage against a specific target's current stats.
#[must_use]
pub fn mitigate_against(raw: Fixed, kind: DamageKind, target: &Unit) -> Fixed {
    mitigate(
        raw,
        kind,
        target.effective_defense(),
        target.stats().resistance,
    )
}

/// Outcome of rolling a basic attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    /// Damage before mitigation.
    pub raw: Fixed,
    /// Whether the crit roll succeeded.
    pub crit: bool,
}

/// Roll a basic attack for `attacker` using the battle RNG.
///
/// Exactly one value is drawn from `rng` per call, crit or not.
pub fn roll_attack<R: Rng + ?Sized>(attacker: &Unit, rng: &mut R) -> AttackRoll {
    let stats = attacker.stats();
    let crit = rng.gen_range(0..100u8) < stats.crit_chance;
    let raw = if crit {
        stats.attack * stats.crit_multiplier
    } else {
        stats.attack
    };
    AttackRoll { raw, crit }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Archetype;
    use crate::math::GridPos;
    use crate::unit::Team;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn unit_with_crit(chance: u8) -> Unit {
        let stats = Archetype::Warrior.base_stats().with_crit_chance(chance);
        Unit::new(
            1,
            Team::A,
            Archetype::Warrior,
            1,
            stats,
            Archetype::Warrior.default_ability(),
            GridPos::new(0, 0),
        )
    }

    #[test]
    fn test_mitigation_formula() {
        // 20 damage vs 10 defense = 20 * 10 / 20 = 10
        assert_eq!(
            mitigate(fixed(20), DamageKind::Physical, fixed(10), fixed(0)),
            fixed(10)
        );
        // No defense leaves damage unchanged
        assert_eq!(
            mitigate(fixed(20), DamageKind::Physical, fixed(0), fixed(50)),
            fixed(20)
        );
    }

    #[test]
    fn test_magical_uses_resistance() {
        assert_eq!(
            mitigate(fixed(30), DamageKind::Magical, fixed(0), fixed(20)),
            fixed(10)
        );
    }

    #[test]
    fn test_true_damage_unmitigated() {
        assert_eq!(
            mitigate(fixed(30), DamageKind::True, fixed(90), fixed(90)),
            fixed(30)
        );
    }

    #[test]
    fn test_minimum_damage() {
        assert_eq!(
            mitigate(fixed(1), DamageKind::Physical, fixed(1000), fixed(0)),
            Fixed::ONE
        );
    }

    #[test]
    fn test_never_negative() {
        assert_eq!(
            mitigate(fixed(-5), DamageKind::Physical, fixed(0), fixed(0)),
            Fixed::ZERO
        );
        assert_eq!(
            mitigate(Fixed::ZERO, DamageKind::True, fixed(0), fixed(0)),
            Fixed::ZERO
        );
    }

    #[test]
    fn test_crit_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let never = unit_with_crit(0);
        let always = unit_with_crit(100);
        for _ in 0..50 {
            let roll = roll_attack(&never, &mut rng);
            assert!(!roll.crit);
            assert_eq!(roll.raw, fixed(15));

            let roll = roll_attack(&always, &mut rng);
            assert!(roll.crit);
            assert_eq!(roll.raw, fixed(15) * fixed(3) / fixed(2));
        }
    }

    #[test]
    fn test_roll_determinism() {
        let unit = unit_with_crit(25);
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(roll_attack(&unit, &mut a), roll_attack(&unit, &mut b));
        }
    }
}
