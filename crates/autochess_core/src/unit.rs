//! Unit identity and mutable combat state.
//!
//! A [`Unit`] is created from a roster entry and then owned by the battle.
//! Its fields are only readable from outside the crate; mutation goes
//! through the resolver and status logic.

use serde::{Deserialize, Serialize};

use crate::ability::Ability;
use crate::archetype::{Archetype, UnitStats};
use crate::math::{fixed_serde, percent, Fixed, GridPos};

/// Unique unit identifier, assigned in roster order starting at 1.
pub type UnitId = u32;

/// Mana gained for every basic attack that lands.
pub const MANA_PER_ATTACK: u32 = 10;

/// Percentage of post-mitigation damage taken that converts to mana.
pub const MANA_PER_DAMAGE_PERCENT: u32 = 7;

/// Side of the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// First team, placed first in id order.
    A,
    /// Second team.
    B,
}

impl Team {
    /// Both teams in id assignment order.
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// The other team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Short label used in logs and output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Timed status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffect {
    /// Unit skips its actions.
    Stunned,
    /// Attack cooldown shortened by a percentage.
    Hasted {
        /// Cooldown reduction in percent.
        percent: u8,
    },
    /// Bonus physical defense.
    Fortified {
        /// Flat defense added.
        bonus_defense: u32,
    },
}

impl StatusEffect {
    /// Whether two effects are the same kind (and therefore do not stack).
    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Human readable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Stunned => "stunned",
            Self::Hasted { .. } => "hasted",
            Self::Fortified { .. } => "fortified",
        }
    }
}

/// A status effect with its remaining duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveStatus {
    /// The effect.
    pub effect: StatusEffect,
    /// Ticks left before it expires.
    pub remaining: u32,
    /// Applied during the holder's own turn; that turn's countdown is skipped.
    #[serde(default)]
    pub fresh: bool,
}

/// Sticky target selection.
///
/// Honoured while `tick < expires_at` and the target is still a legal choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetLock {
    /// Locked enemy.
    pub target: UnitId,
    /// First tick on which the lock no longer applies.
    pub expires_at: u64,
}

/// Result of applying damage to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageTaken {
    /// Health actually removed.
    pub dealt: Fixed,
    /// True only on the hit that killed the unit.
    pub died: bool,
}

impl DamageTaken {
    const NONE: Self = Self {
        dealt: Fixed::ZERO,
        died: false,
    };
}

/// A combatant on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    team: Team,
    archetype: Archetype,
    level: u8,
    stats: UnitStats,
    ability: Ability,
    #[serde(with = "fixed_serde")]
    health: Fixed,
    #[serde(with = "fixed_serde")]
    mana: Fixed,
    position: GridPos,
    alive: bool,
    cooldown: u32,
    ability_casts: u32,
    statuses: Vec<ActiveStatus>,
    target_lock: Option<TargetLock>,
}

impl Unit {
    /// Create a unit at full health with empty mana.
    ///
    /// `stats` are used as given; level scaling happens when the roster is built.
    #[must_use]
    pub fn new(
        id: UnitId,
        team: Team,
        archetype: Archetype,
        level: u8,
        stats: UnitStats,
        ability: Ability,
        position: GridPos,
    ) -> Self {
        Self {
            id,
            team,
            archetype,
            level,
            health: stats.max_health,
            stats,
            ability,
            mana: Fixed::ZERO,
            position,
            alive: true,
            cooldown: 0,
            ability_casts: 0,
            statuses: Vec::new(),
            target_lock: None,
        }
    }

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Archetype tag.
    #[must_use]
    pub const fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Star level.
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Level-scaled stats.
    #[must_use]
    pub const fn stats(&self) -> &UnitStats {
        &self.stats
    }

    /// Equipped ability.
    #[must_use]
    pub const fn ability(&self) -> &Ability {
        &self.ability
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> Fixed {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> Fixed {
        self.stats.max_health
    }

    /// Current mana.
    #[must_use]
    pub const fn mana(&self) -> Fixed {
        self.mana
    }

    /// Current cell, or the cell the unit died on.
    #[must_use]
    pub const fn position(&self) -> GridPos {
        self.position
    }

    /// Whether the unit is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Ticks until the next basic attack is ready.
    #[must_use]
    pub const fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// How many times the ability has been cast.
    #[must_use]
    pub const fn ability_casts(&self) -> u32 {
        self.ability_casts
    }

    /// Active statuses in application order.
    #[must_use]
    pub fn statuses(&self) -> &[ActiveStatus] {
        &self.statuses
    }

    /// Current sticky target, including expired ones.
    #[must_use]
    pub const fn target_lock(&self) -> Option<TargetLock> {
        self.target_lock
    }

    /// Health as a fraction of max health.
    #[must_use]
    pub fn health_fraction(&self) -> Fixed {
        if self.stats.max_health <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        self.health / self.stats.max_health
    }

    /// Whether the unit is below max health.
    #[must_use]
    pub fn is_wounded(&self) -> bool {
        self.alive && self.health < self.stats.max_health
    }

    /// Whether a stun is active.
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        self.statuses
            .iter()
            .any(|s| matches!(s.effect, StatusEffect::Stunned))
    }

    /// Whether the basic attack is off cooldown.
    #[must_use]
    pub const fn attack_ready(&self) -> bool {
        self.cooldown == 0
    }

    /// Whether enough mana is stored to cast the ability.
    #[must_use]
    pub fn has_full_mana(&self) -> bool {
        self.mana >= self.stats.max_mana
    }

    /// Physical defense including Fortified bonuses.
    #[must_use]
    pub fn effective_defense(&self) -> Fixed {
        let bonus: u32 = self
            .statuses
            .iter()
            .filter_map(|s| match s.effect {
                StatusEffect::Fortified { bonus_defense } => Some(bonus_defense),
                _ => None,
            })
            .sum();
        self.stats.defense + Fixed::from_num(bonus)
    }

    /// Cooldown applied after a basic attack, shortened by Hasted (minimum 1).
    #[must_use]
    pub fn effective_attack_cooldown(&self) -> u32 {
        let haste = self
            .statuses
            .iter()
            .filter_map(|s| match s.effect {
                StatusEffect::Hasted { percent } => Some(u32::from(percent)),
                _ => None,
            })
            .max()
            .unwrap_or(0)
            .min(100);

        let base = self.stats.attack_cooldown;
        let reduced = base - base * haste / 100;
        reduced.max(1)
    }

    /// Remove health. Clamps at zero and marks the unit dead exactly once.
    ///
    /// Damage to a dead unit, or a non-positive amount, is a no-op.
    pub(crate) fn apply_damage(&mut self, amount: Fixed) -> DamageTaken {
        if !self.alive || amount <= Fixed::ZERO {
            return DamageTaken::NONE;
        }

        let dealt = amount.min(self.health);
        self.health -= dealt;

        let died = self.health <= Fixed::ZERO;
        if died {
            self.health = Fixed::ZERO;
            self.alive = false;
            self.statuses.clear();
            self.target_lock = None;
        }

        DamageTaken { dealt, died }
    }

    /// Restore health, clamped at max health. Returns the amount restored.
    pub(crate) fn heal(&mut self, amount: Fixed) -> Fixed {
        if !self.alive || amount <= Fixed::ZERO {
            return Fixed::ZERO;
        }

        let healed = amount.min(self.stats.max_health - self.health);
        self.health += healed;
        healed
    }

    pub(crate) fn move_to(&mut self, position: GridPos) {
        self.position = position;
    }

    /// Apply a status. A status of the same kind is replaced and its
    /// duration refreshed to the longer of the two.
    pub(crate) fn apply_status(&mut self, effect: StatusEffect, duration: u32) {
        self.insert_status(effect, duration, false);
    }

    /// Apply a status during this unit's own turn.
    ///
    /// The countdown at the end of the current turn is skipped, so the
    /// status covers `duration` later turns like one applied by another unit.
    pub(crate) fn apply_own_status(&mut self, effect: StatusEffect, duration: u32) {
        self.insert_status(effect, duration, true);
    }

    fn insert_status(&mut self, effect: StatusEffect, duration: u32, fresh: bool) {
        if !self.alive || duration == 0 {
            return;
        }

        if let Some(existing) = self.statuses.iter_mut().find(|s| s.effect.same_kind(&effect)) {
            existing.effect = effect;
            if duration >= existing.remaining {
                existing.remaining = duration;
                existing.fresh = fresh;
            }
        } else {
            self.statuses.push(ActiveStatus {
                effect,
                remaining: duration,
                fresh,
            });
        }
    }

    /// Advance status durations by one tick and return those that expired.
    pub(crate) fn tick_statuses(&mut self) -> Vec<StatusEffect> {
        let mut expired = Vec::new();
        self.statuses.retain_mut(|status| {
            if status.fresh {
                status.fresh = false;
                return true;
            }
            status.remaining = status.remaining.saturating_sub(1);
            if status.remaining == 0 {
                expired.push(status.effect);
                false
            } else {
                true
            }
        });
        expired
    }

    pub(crate) fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    pub(crate) fn start_attack_cooldown(&mut self) {
        self.cooldown = self.effective_attack_cooldown();
    }

    /// Mana for a landed basic attack. May exceed max mana.
    pub(crate) fn gain_attack_mana(&mut self) {
        if self.alive {
            self.mana = self.mana.saturating_add(Fixed::from_num(MANA_PER_ATTACK));
        }
    }

    /// Mana for damage taken. Never raises mana above max mana.
    pub(crate) fn gain_damage_mana(&mut self, damage_taken: Fixed) {
        if !self.alive || self.mana >= self.stats.max_mana {
            return;
        }
        let gained = damage_taken * percent(MANA_PER_DAMAGE_PERCENT);
        self.mana = (self.mana + gained).min(self.stats.max_mana);
    }

    /// Consume one cast worth of mana.
    pub(crate) fn spend_mana(&mut self) {
        self.mana = (self.mana - self.stats.max_mana).max(Fixed::ZERO);
        self.ability_casts = self.ability_casts.saturating_add(1);
    }

    pub(crate) fn lock_target(&mut self, target: UnitId, expires_at: u64) {
        self.target_lock = Some(TargetLock { target, expires_at });
    }

    pub(crate) fn release_target(&mut self, target: UnitId) {
        if self.target_lock.is_some_and(|lock| lock.target == target) {
            self.target_lock = None;
        }
    }
}
