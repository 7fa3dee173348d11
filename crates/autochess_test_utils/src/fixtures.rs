//! Test fixtures and helpers.
//!
//! Pre-built rosters and configs for consistent testing.

use autochess_core::prelude::*;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: simulation code never uses floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Two units facing each other across the middle of a 7x8 board.
#[must_use]
pub fn duel(a: Archetype, b: Archetype) -> Roster {
    Roster::new(7, 8)
        .with_unit(Team::A, UnitSpec::new(a, 3, 2))
        .with_unit(Team::B, UnitSpec::new(b, 3, 5))
}

/// Two warriors in adjacent cells.
#[must_use]
pub fn adjacent_warriors() -> Roster {
    Roster::new(7, 8)
        .with_unit(Team::A, UnitSpec::new(Archetype::Warrior, 3, 3))
        .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 3, 4))
}

/// Every archetype once per team, mirrored across the board.
#[must_use]
pub fn mirror_lineup() -> Roster {
    let mut roster = Roster::new(7, 8);
    for (x, archetype) in Archetype::ALL.iter().copied().enumerate() {
        let x = x as i32;
        roster = roster
            .with_unit(Team::A, UnitSpec::new(archetype, x, 1))
            .with_unit(Team::B, UnitSpec::new(archetype, x, 6));
    }
    roster
}

/// Mixed 4v4 skirmish used by determinism tests and benches.
#[must_use]
pub fn skirmish() -> Roster {
    Roster::new(7, 8)
        .with_unit(Team::A, UnitSpec::new(Archetype::Tank, 3, 2))
        .with_unit(Team::A, UnitSpec::new(Archetype::Archer, 1, 0))
        .with_unit(Team::A, UnitSpec::new(Archetype::Mage, 5, 0))
        .with_unit(Team::A, UnitSpec::new(Archetype::Support, 3, 0))
        .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 2, 5))
        .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 4, 5).with_level(2))
        .with_unit(Team::B, UnitSpec::new(Archetype::Assassin, 6, 7))
        .with_unit(Team::B, UnitSpec::new(Archetype::Archer, 0, 7))
}

/// Config with the given seed and otherwise default rules.
#[must_use]
pub fn seeded(seed: u64) -> BattleConfig {
    BattleConfig::default().with_seed(seed)
}

/// Run a roster to completion with the default rules.
///
/// # Panics
///
/// Panics if the roster is invalid.
#[must_use]
pub fn run(roster: &Roster, config: BattleConfig) -> BattleResult {
    let mut battle = Battle::new(roster, config).expect("fixture roster must be valid");
    battle.run_to_end().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_valid_rosters() {
        for roster in [
            duel(Archetype::Mage, Archetype::Tank),
            adjacent_warriors(),
            mirror_lineup(),
            skirmish(),
        ] {
            assert!(roster.validate().is_ok(), "{roster:?}");
        }
    }

    #[test]
    fn mirror_lineup_fields_every_archetype() {
        let roster = mirror_lineup();
        assert_eq!(roster.team(Team::A).len(), Archetype::ALL.len());
        assert_eq!(roster.team(Team::B).len(), Archetype::ALL.len());
    }
}
