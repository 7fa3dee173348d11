//! Owned battle state and the read-only view handed to policies.

use crate::battlefield::Battlefield;
use crate::config::BattleConfig;
use crate::error::{BattleError, Result};
use crate::math::{range_tolerance, Fixed, GridPos};
use crate::unit::{Team, Unit, UnitId};

/// Units plus the occupancy grid, kept consistent with each other.
///
/// Units are stored in id order; ids run from 1 without gaps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BattleState {
    units: Vec<Unit>,
    battlefield: Battlefield,
}

impl BattleState {
    pub(crate) fn new(units: Vec<Unit>, battlefield: Battlefield) -> Self {
        Self { units, battlefield }
    }

    /// All units, dead ones included, in id order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// The occupancy grid.
    #[must_use]
    pub const fn battlefield(&self) -> &Battlefield {
        &self.battlefield
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        unit_by_id(&self.units, id)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        let index = (id as usize).checked_sub(1)?;
        self.units.get_mut(index).filter(|u| u.id() == id)
    }

    pub(crate) fn units_mut(&mut self) -> &mut [Unit] {
        &mut self.units
    }

    pub(crate) fn battlefield_mut(&mut self) -> &mut Battlefield {
        &mut self.battlefield
    }

    /// Living units of a team in id order.
    pub fn living(&self, team: Team) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .iter()
            .filter(move |u| u.is_alive() && u.team() == team)
    }

    /// Number of living units on a team.
    #[must_use]
    pub fn living_count(&self, team: Team) -> usize {
        self.living(team).count()
    }

    /// Sum of remaining health on a team.
    #[must_use]
    pub fn team_health(&self, team: Team) -> Fixed {
        self.living(team).map(Unit::health).sum()
    }

    /// Read-only view for decision making.
    #[must_use]
    pub fn view<'a>(&'a self, config: &'a BattleConfig, tick: u64) -> BattleView<'a> {
        BattleView {
            units: &self.units,
            battlefield: &self.battlefield,
            config,
            tick,
        }
    }

    /// Check the structural invariants that tie units to the grid.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        for (index, unit) in self.units.iter().enumerate() {
            if unit.id() as usize != index + 1 {
                return Err(BattleError::InvalidState(format!(
                    "unit at slot {index} has id {}",
                    unit.id()
                )));
            }
            if unit.health() < Fixed::ZERO || unit.health() > unit.max_health() {
                return Err(BattleError::InvalidState(format!(
                    "unit {} health {} outside 0..={}",
                    unit.id(),
                    unit.health(),
                    unit.max_health()
                )));
            }
            if unit.is_alive() != (unit.health() > Fixed::ZERO) {
                return Err(BattleError::InvalidState(format!(
                    "unit {} alive flag disagrees with health",
                    unit.id()
                )));
            }

            let on_board = self.battlefield.query(unit.position()) == Some(unit.id());
            if unit.is_alive() != on_board {
                return Err(BattleError::InvalidState(format!(
                    "unit {} (alive: {}) occupancy mismatch at {}",
                    unit.id(),
                    unit.is_alive(),
                    unit.position()
                )));
            }
        }

        let living = self.units.iter().filter(|u| u.is_alive()).count();
        if living != self.battlefield.occupied_count() {
            return Err(BattleError::InvalidState(format!(
                "{living} living units but {} occupied cells",
                self.battlefield.occupied_count()
            )));
        }

        Ok(())
    }
}

fn unit_by_id(units: &[Unit], id: UnitId) -> Option<&Unit> {
    let index = (id as usize).checked_sub(1)?;
    units.get(index).filter(|u| u.id() == id)
}

/// Everything a policy or ability may look at while deciding.
#[derive(Debug, Clone, Copy)]
pub struct BattleView<'a> {
    /// All units in id order.
    pub units: &'a [Unit],
    /// Occupancy grid.
    pub battlefield: &'a Battlefield,
    /// Battle rules.
    pub config: &'a BattleConfig,
    /// Tick being decided.
    pub tick: u64,
}

impl<'a> BattleView<'a> {
    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&'a Unit> {
        unit_by_id(self.units, id)
    }

    /// Living unit by id.
    #[must_use]
    pub fn living_unit(&self, id: UnitId) -> Option<&'a Unit> {
        self.unit(id).filter(|u| u.is_alive())
    }

    /// Distance between two cells under the battle metric.
    #[must_use]
    pub fn distance(&self, a: GridPos, b: GridPos) -> Fixed {
        self.battlefield.distance(a, b)
    }

    /// Whether `to` is within `reach` cells of `from`, including range tolerance.
    #[must_use]
    pub fn within_reach(&self, from: GridPos, to: GridPos, reach: Fixed) -> bool {
        self.distance(from, to) <= reach + range_tolerance()
    }

    /// Whether `attacker` could hit `target` with a basic attack from `from`.
    #[must_use]
    pub fn can_attack_from(&self, attacker: &Unit, from: GridPos, target: &Unit) -> bool {
        self.within_reach(from, target.position(), attacker.stats().range)
            && self.has_clear_shot(from, target.position())
    }

    /// Whether `attacker` can hit `target` from where it stands.
    #[must_use]
    pub fn can_attack(&self, attacker: &Unit, target: &Unit) -> bool {
        self.can_attack_from(attacker, attacker.position(), target)
    }

    /// Line of sight check, always true when the rule is off.
    #[must_use]
    pub fn has_clear_shot(&self, from: GridPos, to: GridPos) -> bool {
        !self.config.line_of_sight || self.battlefield.has_line_of_sight(from, to)
    }

    /// Living enemies of `unit` in id order.
    pub fn enemies_of(&self, unit: &Unit) -> impl Iterator<Item = &'a Unit> + 'a {
        let team = unit.team();
        self.units
            .iter()
            .filter(move |u| u.is_alive() && u.team() != team)
    }

    /// Living allies of `unit`, itself included, in id order.
    pub fn allies_of(&self, unit: &Unit) -> impl Iterator<Item = &'a Unit> + 'a {
        let team = unit.team();
        self.units
            .iter()
            .filter(move |u| u.is_alive() && u.team() == team)
    }

    /// Living units adjacent to `pos` under the battle metric, in id order.
    pub fn adjacent_to(&self, pos: GridPos) -> impl Iterator<Item = &'a Unit> + 'a {
        let metric = self.battlefield.metric();
        self.units
            .iter()
            .filter(move |u| u.is_alive() && metric.is_adjacent(pos, u.position()))
    }
}
