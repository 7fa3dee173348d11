//! Action resolution.
//!
//! The resolver is the only code that mutates units and the battlefield
//! during a battle. Every action is validated against the current state
//! before anything is committed; a failed validation becomes an
//! [`BattleEvent::ActionRejected`] event and the action degrades to a wait.

use rand::Rng;
use tracing::{debug, trace, warn};

use crate::ability::{AbilityTarget, Effect};
use crate::combat::{mitigate_against, roll_attack, DamageKind};
use crate::config::BattleConfig;
use crate::error::{BattleError, MoveRejection};
use crate::event::{BattleEvent, Rejection};
use crate::math::{Fixed, GridPos};
use crate::policy::Action;
use crate::state::BattleState;
use crate::unit::UnitId;

/// Applies actions for a single tick.
pub struct CombatResolver<'a> {
    state: &'a mut BattleState,
    config: &'a BattleConfig,
    tick: u64,
}

impl<'a> CombatResolver<'a> {
    /// Create a resolver for `tick`.
    pub fn new(state: &'a mut BattleState, config: &'a BattleConfig, tick: u64) -> Self {
        Self {
            state,
            config,
            tick,
        }
    }

    /// Validate and apply one action, appending the resulting events.
    ///
    /// Dead actors do nothing. Randomness is drawn only from `rng`.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        actor: UnitId,
        action: Action,
        rng: &mut R,
        events: &mut Vec<BattleEvent>,
    ) {
        if !self.state.unit(actor).is_some_and(|u| u.is_alive()) {
            return;
        }

        trace!(tick = self.tick, unit = actor, ?action, "Resolving action");

        let outcome = match action {
            Action::Wait => Ok(()),
            Action::Move { to, toward } => self.resolve_move(actor, to, toward, events),
            Action::Attack { target } => self.resolve_attack(actor, target, rng, events),
            Action::Ability { target } => self.resolve_ability(actor, target, events),
        };

        if let Err(reason) = outcome {
            warn!(tick = self.tick, unit = actor, ?reason, "Action rejected");
            events.push(BattleEvent::ActionRejected {
                unit: actor,
                reason,
            });
        }
    }

    fn resolve_move(
        &mut self,
        actor: UnitId,
        to: GridPos,
        toward: Option<UnitId>,
        events: &mut Vec<BattleEvent>,
    ) -> Result<(), Rejection> {
        let unit = self
            .state
            .unit(actor)
            .ok_or(Rejection::InvalidMove(MoveRejection::NotOnBoard))?;
        let from = unit.position();

        let field = self.state.battlefield();
        if !field.in_bounds(to) {
            return Err(Rejection::InvalidMove(MoveRejection::OutOfBounds));
        }
        if field.distance(from, to) > unit.stats().speed {
            return Err(Rejection::InvalidMove(MoveRejection::TooFar));
        }

        self.relocate(actor, to, events)?;

        if let Some(target) = toward {
            self.lock(actor, target);
        }
        Ok(())
    }

    fn relocate(
        &mut self,
        actor: UnitId,
        to: GridPos,
        events: &mut Vec<BattleEvent>,
    ) -> Result<(), Rejection> {
        let from = self
            .state
            .unit(actor)
            .map(|u| u.position())
            .ok_or(Rejection::InvalidMove(MoveRejection::NotOnBoard))?;
        if from == to {
            return Ok(());
        }

        match self.state.battlefield_mut().move_unit(actor, to) {
            Ok(()) => {}
            Err(BattleError::InvalidMove { reason, .. }) => {
                return Err(Rejection::InvalidMove(reason));
            }
            Err(_) => return Err(Rejection::InvalidMove(MoveRejection::NotOnBoard)),
        }

        if let Some(unit) = self.state.unit_mut(actor) {
            unit.move_to(to);
        }
        events.push(BattleEvent::Moved {
            unit: actor,
            from,
            to,
        });
        Ok(())
    }

    fn resolve_attack<R: Rng + ?Sized>(
        &mut self,
        actor: UnitId,
        target: UnitId,
        rng: &mut R,
        events: &mut Vec<BattleEvent>,
    ) -> Result<(), Rejection> {
        let view = self.state.view(self.config, self.tick);
        let attacker = view
            .living_unit(actor)
            .ok_or(Rejection::TargetUnavailable(actor))?;
        let defender = view
            .living_unit(target)
            .filter(|t| t.team() != attacker.team())
            .ok_or(Rejection::TargetUnavailable(target))?;

        if !attacker.attack_ready() {
            return Err(Rejection::CoolingDown);
        }
        if !view.can_attack(attacker, defender) {
            return Err(Rejection::OutOfRange(target));
        }

        let roll = roll_attack(attacker, rng);
        let damage = mitigate_against(roll.raw, DamageKind::Physical, defender);

        if let Some(unit) = self.state.unit_mut(actor) {
            unit.start_attack_cooldown();
            unit.gain_attack_mana();
        }
        self.lock(actor, target);

        let (dealt, died) = self.damage_unit(target, damage);
        events.push(BattleEvent::Attacked {
            attacker: actor,
            target,
            damage: dealt,
            crit: roll.crit,
        });
        if died {
            self.handle_death(target, Some(actor), events);
        }
        Ok(())
    }

    fn resolve_ability(
        &mut self,
        actor: UnitId,
        target: AbilityTarget,
        events: &mut Vec<BattleEvent>,
    ) -> Result<(), Rejection> {
        let view = self.state.view(self.config, self.tick);
        let caster = view
            .living_unit(actor)
            .ok_or(Rejection::InvalidAbilityTarget)?;
        if !caster.has_full_mana() {
            return Err(Rejection::NotEnoughMana);
        }

        let ability = *caster.ability();
        let effects = ability
            .resolve(caster, target, &view)
            .map_err(|_| Rejection::InvalidAbilityTarget)?;

        if let Some(unit) = self.state.unit_mut(actor) {
            unit.spend_mana();
        }
        debug!(
            tick = self.tick,
            unit = actor,
            ability = ability.name(),
            effects = effects.len(),
            "Ability cast"
        );
        events.push(BattleEvent::AbilityCast {
            caster: actor,
            ability: ability.name().to_string(),
            target,
        });

        for effect in effects {
            self.commit_effect(actor, effect, events);
        }
        Ok(())
    }

    /// Commit a single effect. Effects on units that died earlier in the
    /// same cast are skipped.
    fn commit_effect(&mut self, source: UnitId, effect: Effect, events: &mut Vec<BattleEvent>) {
        match effect {
            Effect::Damage {
                target,
                amount,
                kind,
            } => {
                let Some(defender) = self.state.unit(target).filter(|u| u.is_alive()) else {
                    return;
                };
                let mitigated = mitigate_against(amount, kind, defender);
                let (dealt, died) = self.damage_unit(target, mitigated);
                events.push(BattleEvent::Damaged {
                    source,
                    target,
                    amount: dealt,
                    kind,
                });
                if died {
                    self.handle_death(target, Some(source), events);
                }
            }
            Effect::Heal { target, amount } => {
                let Some(unit) = self.state.unit_mut(target) else {
                    return;
                };
                if !unit.is_alive() {
                    return;
                }
                let healed = unit.heal(amount);
                events.push(BattleEvent::Healed {
                    source,
                    target,
                    amount: healed,
                });
            }
            Effect::Relocate { unit, to } => {
                if let Err(reason) = self.relocate(unit, to, events) {
                    events.push(BattleEvent::ActionRejected { unit, reason });
                }
            }
            Effect::Status {
                target,
                effect,
                duration,
            } => {
                let Some(unit) = self.state.unit_mut(target) else {
                    return;
                };
                if !unit.is_alive() {
                    return;
                }
                if target == source {
                    unit.apply_own_status(effect, duration);
                } else {
                    unit.apply_status(effect, duration);
                }
                events.push(BattleEvent::StatusApplied {
                    unit: target,
                    effect,
                    duration,
                });
            }
        }
    }

    /// Apply mitigated damage and the matching mana gain.
    fn damage_unit(&mut self, target: UnitId, amount: Fixed) -> (Fixed, bool) {
        let Some(unit) = self.state.unit_mut(target) else {
            return (Fixed::ZERO, false);
        };
        let taken = unit.apply_damage(amount);
        unit.gain_damage_mana(taken.dealt);
        (taken.dealt, taken.died)
    }

    /// Vacate the dead unit's cell and drop every lock pointing at it.
    fn handle_death(&mut self, unit: UnitId, killer: Option<UnitId>, events: &mut Vec<BattleEvent>) {
        let Some(position) = self.state.unit(unit).map(|u| u.position()) else {
            return;
        };
        self.state.battlefield_mut().vacate(position);
        for other in self.state.units_mut() {
            other.release_target(unit);
        }

        debug!(tick = self.tick, unit, ?killer, %position, "Unit died");
        events.push(BattleEvent::Died { unit, killer });
    }

    fn lock(&mut self, actor: UnitId, target: UnitId) {
        let expires_at = self.tick.saturating_add(self.config.sticky_target_ticks);
        if let Some(unit) = self.state.unit_mut(actor) {
            unit.lock_target(target, expires_at);
        }
    }
}
