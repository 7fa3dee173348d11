//! Events recorded while a tick resolves.

use serde::{Deserialize, Serialize};

use crate::ability::AbilityTarget;
use crate::combat::DamageKind;
use crate::error::MoveRejection;
use crate::math::{fixed_serde, Fixed, GridPos};
use crate::unit::{StatusEffect, UnitId};

/// Why an action was turned into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rejection {
    /// Movement refused.
    InvalidMove(MoveRejection),
    /// Attack target is dead, friendly or unknown.
    TargetUnavailable(UnitId),
    /// Attack target is beyond range or behind another unit.
    OutOfRange(UnitId),
    /// Basic attack still recharging.
    CoolingDown,
    /// Ability cast without enough mana.
    NotEnoughMana,
    /// Ability target no longer legal.
    InvalidAbilityTarget,
}

/// Something that happened during a tick, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleEvent {
    /// A unit changed cell.
    Moved {
        /// Unit moved.
        unit: UnitId,
        /// Previous cell.
        from: GridPos,
        /// New cell.
        to: GridPos,
    },
    /// A basic attack landed.
    Attacked {
        /// Attacker.
        attacker: UnitId,
        /// Unit hit.
        target: UnitId,
        /// Health removed after mitigation.
        #[serde(with = "fixed_serde")]
        damage: Fixed,
        /// Whether the hit was critical.
        crit: bool,
    },
    /// An ability was cast.
    AbilityCast {
        /// Caster.
        caster: UnitId,
        /// Ability name.
        ability: String,
        /// Where it was aimed.
        target: AbilityTarget,
    },
    /// Ability damage landed.
    Damaged {
        /// Damage source.
        source: UnitId,
        /// Unit hit.
        target: UnitId,
        /// Health removed after mitigation.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
        /// Damage kind.
        kind: DamageKind,
    },
    /// Health restored.
    Healed {
        /// Healer.
        source: UnitId,
        /// Unit healed.
        target: UnitId,
        /// Health actually restored.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
    },
    /// A status took effect.
    StatusApplied {
        /// Unit affected.
        unit: UnitId,
        /// Effect.
        effect: StatusEffect,
        /// Duration in ticks.
        duration: u32,
    },
    /// A status ran out.
    StatusExpired {
        /// Unit affected.
        unit: UnitId,
        /// Effect that ended.
        effect: StatusEffect,
    },
    /// A stunned unit lost its turn.
    Stunned {
        /// Unit that skipped.
        unit: UnitId,
    },
    /// A unit died. Emitted once per unit.
    Died {
        /// Unit that died.
        unit: UnitId,
        /// Unit that dealt the killing blow.
        killer: Option<UnitId>,
    },
    /// An action failed validation and was skipped.
    ActionRejected {
        /// Acting unit.
        unit: UnitId,
        /// Why.
        reason: Rejection,
    },
}

impl BattleEvent {
    /// Whether this is a [`BattleEvent::Died`] event.
    #[must_use]
    pub const fn is_death(&self) -> bool {
        matches!(self, Self::Died { .. })
    }

    /// Unit primarily responsible for the event.
    #[must_use]
    pub const fn actor(&self) -> UnitId {
        match *self {
            Self::Moved { unit, .. }
            | Self::StatusApplied { unit, .. }
            | Self::StatusExpired { unit, .. }
            | Self::Stunned { unit }
            | Self::Died { unit, .. }
            | Self::ActionRejected { unit, .. } => unit,
            Self::Attacked { attacker, .. } => attacker,
            Self::AbilityCast { caster, .. } => caster,
            Self::Damaged { source, .. } | Self::Healed { source, .. } => source,
        }
    }
}
