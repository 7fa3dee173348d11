//! Damage meter over the snapshot stream.
//!
//! Totals damage dealt and healing done per unit from the events each
//! snapshot carries. Resets whenever playback restarts.

use std::collections::BTreeMap;

use autochess_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Running totals for one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterEntry {
    /// Damage dealt by attacks and abilities.
    #[serde(with = "autochess_core::math::fixed_serde")]
    pub damage: Fixed,
    /// Health restored to allies or self.
    #[serde(with = "autochess_core::math::fixed_serde")]
    pub healing: Fixed,
    /// Killing blows.
    pub kills: u32,
}

/// Per-unit totals keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageMeter {
    entries: BTreeMap<UnitId, MeterEntry>,
}

impl DamageMeter {
    /// Create an empty meter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the events of one snapshot.
    pub fn record(&mut self, snapshot: &Snapshot) {
        for event in snapshot.events() {
            match *event {
                BattleEvent::Attacked {
                    attacker, damage, ..
                } => self.entry(attacker).damage += damage,
                BattleEvent::Damaged { source, amount, .. } => self.entry(source).damage += amount,
                BattleEvent::Healed { source, amount, .. } => self.entry(source).healing += amount,
                BattleEvent::Died {
                    killer: Some(killer),
                    ..
                } => self.entry(killer).kills += 1,
                _ => {}
            }
        }
    }

    /// Totals for a unit (zero if it never acted).
    #[must_use]
    pub fn get(&self, unit: UnitId) -> MeterEntry {
        self.entries.get(&unit).copied().unwrap_or_default()
    }

    /// Units ordered by damage dealt, highest first; ties by id.
    #[must_use]
    pub fn ranking(&self) -> Vec<(UnitId, MeterEntry)> {
        let mut ranking: Vec<_> = self.entries.iter().map(|(&id, &e)| (id, e)).collect();
        ranking.sort_by(|a, b| b.1.damage.cmp(&a.1.damage).then_with(|| a.0.cmp(&b.0)));
        ranking
    }

    /// Forget every total.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    fn entry(&mut self, unit: UnitId) -> &mut MeterEntry {
        self.entries.entry(unit).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_matches_health_lost() {
        let roster = Roster::new(7, 8)
            .with_unit(Team::A, UnitSpec::new(Archetype::Warrior, 3, 3))
            .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 3, 4));
        let mut stream = BattleStream::new(roster, BattleConfig::default()).unwrap();
        let mut meter = DamageMeter::new();
        let mut last = None;
        for snapshot in stream.by_ref() {
            meter.record(&snapshot);
            last = Some(snapshot);
        }
        let last = last.unwrap();

        // Warriors cannot heal, so damage dealt equals health lost
        for (attacker, victim) in [(1, 2), (2, 1)] {
            let unit = last.unit(victim).unwrap();
            assert_eq!(meter.get(attacker).damage, unit.max_health() - unit.health());
        }
        let kills: u32 = [1, 2].iter().map(|&id| meter.get(id).kills).sum();
        assert_eq!(kills, 1);
    }

    #[test]
    fn test_reset_clears() {
        let mut meter = DamageMeter::new();
        meter.entry(1).damage = Fixed::ONE;
        meter.reset();
        assert_eq!(meter.get(1), MeterEntry::default());
        assert!(meter.ranking().is_empty());
    }
}
