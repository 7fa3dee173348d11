//! Ability catalog.
//!
//! Abilities are data. Casting is split in two pure steps:
//! [`Ability::select_target`] picks a legal target from a [`BattleView`],
//! and [`Ability::resolve`] turns (caster, target, view) into a list of
//! [`Effect`]s. The resolver commits the effects; nothing here mutates state.

use serde::{Deserialize, Serialize};

use crate::archetype::MAX_STAT_VALUE;
use crate::combat::DamageKind;
use crate::error::{BattleError, Result};
use crate::math::{Fixed, GridPos};
use crate::state::BattleView;
use crate::unit::{StatusEffect, Unit, UnitId};

/// Special move cast when a unit's mana is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Magical damage to an enemy in range, half damage to its adjacent allies.
    Fireball {
        /// Damage to the primary target.
        damage: u32,
        /// Cast range in cells.
        range: u32,
    },
    /// Physical damage to every adjacent enemy.
    SpinSlash {
        /// Damage per enemy hit.
        damage: u32,
    },
    /// Physical damage to every adjacent enemy, stunning them.
    GroundSlam {
        /// Damage per enemy hit.
        damage: u32,
        /// Stun duration in ticks.
        stun_ticks: u32,
    },
    /// Restore the caster's own health.
    SelfHeal {
        /// Health restored.
        amount: u32,
    },
    /// Restore health of the most wounded ally in range.
    Mend {
        /// Health restored.
        amount: u32,
        /// Cast range in cells.
        range: u32,
    },
    /// Teleport next to the weakest enemy in range and strike it.
    ///
    /// Range grows by one cell per previous cast.
    Blink {
        /// Base range in cells.
        range: u32,
        /// Physical damage dealt on arrival.
        damage: u32,
    },
    /// Hasted status on the caster.
    Frenzy {
        /// Attack cooldown reduction in percent.
        percent: u8,
        /// Duration in ticks.
        duration: u32,
    },
    /// Fortified status on the caster.
    Fortify {
        /// Flat defense bonus.
        bonus_defense: u32,
        /// Duration in ticks.
        duration: u32,
    },
}

/// What an ability is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityTarget {
    /// The caster itself, or an area around it.
    SelfCast,
    /// A specific unit.
    Unit(UnitId),
}

/// A single state change produced by an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Damage before mitigation.
    Damage {
        /// Unit hit.
        target: UnitId,
        /// Raw amount.
        amount: Fixed,
        /// Mitigation kind.
        kind: DamageKind,
    },
    /// Health restored.
    Heal {
        /// Unit healed.
        target: UnitId,
        /// Amount before clamping.
        amount: Fixed,
    },
    /// Instant reposition.
    Relocate {
        /// Unit moved.
        unit: UnitId,
        /// Destination cell.
        to: GridPos,
    },
    /// Timed status.
    Status {
        /// Unit affected.
        target: UnitId,
        /// Effect applied.
        effect: StatusEffect,
        /// Duration in ticks.
        duration: u32,
    },
}

impl Ability {
    /// Display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fireball { .. } => "Fireball",
            Self::SpinSlash { .. } => "Spin Slash",
            Self::GroundSlam { .. } => "Ground Slam",
            Self::SelfHeal { .. } => "Self Heal",
            Self::Mend { .. } => "Mend",
            Self::Blink { .. } => "Blink",
            Self::Frenzy { .. } => "Frenzy",
            Self::Fortify { .. } => "Fortify",
        }
    }

    /// Pick a legal target, or `None` if casting now would do nothing.
    ///
    /// `preferred` is the caster's current attack target; single-target
    /// offensive abilities use it when it is legal.
    #[must_use]
    pub fn select_target(
        &self,
        caster: &Unit,
        view: &BattleView<'_>,
        preferred: Option<UnitId>,
    ) -> Option<AbilityTarget> {
        match *self {
            Self::Fireball { range, .. } => {
                let reach = Fixed::from_num(range);
                let legal = |u: &Unit| view.within_reach(caster.position(), u.position(), reach);
                preferred
                    .and_then(|id| view.living_unit(id))
                    .filter(|u| u.team() != caster.team() && legal(*u))
                    .or_else(|| {
                        view.enemies_of(caster).filter(|u| legal(*u)).min_by_key(|u| {
                            (view.distance(caster.position(), u.position()), u.health(), u.id())
                        })
                    })
                    .map(|u| AbilityTarget::Unit(u.id()))
            }
            Self::SpinSlash { .. } | Self::GroundSlam { .. } => {
                let has_adjacent_enemy = view
                    .adjacent_to(caster.position())
                    .any(|u| u.team() != caster.team());
                has_adjacent_enemy.then_some(AbilityTarget::SelfCast)
            }
            Self::SelfHeal { .. } => caster.is_wounded().then_some(AbilityTarget::SelfCast),
            Self::Mend { range, .. } => {
                let reach = Fixed::from_num(range);
                view.allies_of(caster)
                    .filter(|u| u.is_wounded())
                    .filter(|u| view.within_reach(caster.position(), u.position(), reach))
                    .min_by_key(|u| (u.health_fraction(), u.id()))
                    .map(|u| AbilityTarget::Unit(u.id()))
            }
            Self::Blink { .. } => {
                let reach = self.blink_reach(caster);
                view.enemies_of(caster)
                    .filter(|u| view.within_reach(caster.position(), u.position(), reach))
                    .min_by_key(|u| (u.health(), u.id()))
                    .map(|u| AbilityTarget::Unit(u.id()))
            }
            Self::Frenzy { .. } | Self::Fortify { .. } => Some(AbilityTarget::SelfCast),
        }
    }

    /// Compute the effects of casting at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidAbilityTarget`] if the target is not legal
    /// for this ability (dead, wrong team, out of range, or nothing to hit).
    pub fn resolve(
        &self,
        caster: &Unit,
        target: AbilityTarget,
        view: &BattleView<'_>,
    ) -> Result<Vec<Effect>> {
        let invalid = || BattleError::InvalidAbilityTarget {
            unit: caster.id(),
            ability: self.name(),
        };

        match (*self, target) {
            (Self::Fireball { damage, range }, AbilityTarget::Unit(id)) => {
                let primary = view
                    .living_unit(id)
                    .filter(|u| u.team() != caster.team())
                    .filter(|u| {
                        view.within_reach(caster.position(), u.position(), Fixed::from_num(range))
                    })
                    .ok_or_else(invalid)?;

                let full = Fixed::from_num(damage);
                let splash = full / Fixed::from_num(2);
                let mut effects = vec![Effect::Damage {
                    target: primary.id(),
                    amount: full,
                    kind: DamageKind::Magical,
                }];
                effects.extend(
                    view.adjacent_to(primary.position())
                        .filter(|u| u.team() == primary.team())
                        .map(|u| Effect::Damage {
                            target: u.id(),
                            amount: splash,
                            kind: DamageKind::Magical,
                        }),
                );
                Ok(effects)
            }
            (Self::SpinSlash { damage }, AbilityTarget::SelfCast) => {
                let effects = adjacent_strikes(caster, view, damage, None);
                if effects.is_empty() {
                    return Err(invalid());
                }
                Ok(effects)
            }
            (Self::GroundSlam { damage, stun_ticks }, AbilityTarget::SelfCast) => {
                let effects = adjacent_strikes(caster, view, damage, Some(stun_ticks));
                if effects.is_empty() {
                    return Err(invalid());
                }
                Ok(effects)
            }
            (Self::SelfHeal { amount }, AbilityTarget::SelfCast) => {
                if !caster.is_wounded() {
                    return Err(invalid());
                }
                Ok(vec![Effect::Heal {
                    target: caster.id(),
                    amount: Fixed::from_num(amount),
                }])
            }
            (Self::Mend { amount, range }, AbilityTarget::Unit(id)) => {
                let ally = view
                    .living_unit(id)
                    .filter(|u| u.team() == caster.team() && u.is_wounded())
                    .filter(|u| {
                        view.within_reach(caster.position(), u.position(), Fixed::from_num(range))
                    })
                    .ok_or_else(invalid)?;
                Ok(vec![Effect::Heal {
                    target: ally.id(),
                    amount: Fixed::from_num(amount),
                }])
            }
            (Self::Blink { damage, .. }, AbilityTarget::Unit(id)) => {
                let reach = self.blink_reach(caster);
                let victim = view
                    .living_unit(id)
                    .filter(|u| u.team() != caster.team())
                    .filter(|u| view.within_reach(caster.position(), u.position(), reach))
                    .ok_or_else(invalid)?;

                let mut effects = Vec::with_capacity(2);
                if let Some(landing) = blink_landing(caster, victim, view) {
                    effects.push(Effect::Relocate {
                        unit: caster.id(),
                        to: landing,
                    });
                }
                effects.push(Effect::Damage {
                    target: victim.id(),
                    amount: Fixed::from_num(damage),
                    kind: DamageKind::Physical,
                });
                Ok(effects)
            }
            (Self::Frenzy { percent, duration }, AbilityTarget::SelfCast) => Ok(vec![Effect::Status {
                target: caster.id(),
                effect: StatusEffect::Hasted { percent },
                duration,
            }]),
            (
                Self::Fortify {
                    bonus_defense,
                    duration,
                },
                AbilityTarget::SelfCast,
            ) => Ok(vec![Effect::Status {
                target: caster.id(),
                effect: StatusEffect::Fortified { bonus_defense },
                duration,
            }]),
            _ => Err(invalid()),
        }
    }

    /// Named numeric parameters, for bounds checks on roster input.
    #[must_use]
    pub fn parameters(&self) -> Vec<(&'static str, u32)> {
        match *self {
            Self::Fireball { damage, range } => vec![("damage", damage), ("range", range)],
            Self::SpinSlash { damage } => vec![("damage", damage)],
            Self::GroundSlam { damage, stun_ticks } => {
                vec![("damage", damage), ("stun_ticks", stun_ticks)]
            }
            Self::SelfHeal { amount } => vec![("amount", amount)],
            Self::Mend { amount, range } => vec![("amount", amount), ("range", range)],
            Self::Blink { range, damage } => vec![("range", range), ("damage", damage)],
            Self::Frenzy { percent, duration } => {
                vec![("percent", u32::from(percent)), ("duration", duration)]
            }
            Self::Fortify {
                bonus_defense,
                duration,
            } => vec![("bonus_defense", bonus_defense), ("duration", duration)],
        }
    }

    fn blink_reach(&self, caster: &Unit) -> Fixed {
        match *self {
            Self::Blink { range, .. } => {
                let reach = range.saturating_add(caster.ability_casts());
                Fixed::from_num(reach.min(MAX_STAT_VALUE))
            }
            _ => Fixed::ZERO,
        }
    }
}

fn adjacent_strikes(
    caster: &Unit,
    view: &BattleView<'_>,
    damage: u32,
    stun_ticks: Option<u32>,
) -> Vec<Effect> {
    let amount = Fixed::from_num(damage);
    let mut effects = Vec::new();
    for enemy in view
        .adjacent_to(caster.position())
        .filter(|u| u.team() != caster.team())
    {
        effects.push(Effect::Damage {
            target: enemy.id(),
            amount,
            kind: DamageKind::Physical,
        });
        if let Some(duration) = stun_ticks {
            effects.push(Effect::Status {
                target: enemy.id(),
                effect: StatusEffect::Stunned,
                duration,
            });
        }
    }
    effects
}

/// Free cell adjacent to `victim` furthest from the caster's current cell.
///
/// `None` when the caster already stands next to the victim or every
/// adjacent cell is taken. Ties go to the first cell in row-major order.
fn blink_landing(caster: &Unit, victim: &Unit, view: &BattleView<'_>) -> Option<GridPos> {
    let metric = view.battlefield.metric();
    if metric.is_adjacent(caster.position(), victim.position()) {
        return None;
    }

    let center = victim.position();
    let mut best: Option<(Fixed, GridPos)> = None;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let cell = center.offset(dx, dy);
            if !metric.is_adjacent(center, cell) || !view.battlefield.is_free(cell) {
                continue;
            }
            let distance = view.distance(caster.position(), cell);
            if best.map_or(true, |(d, _)| distance > d) {
                best = Some((distance, cell));
            }
        }
    }
    best.map(|(_, cell)| cell)
}
