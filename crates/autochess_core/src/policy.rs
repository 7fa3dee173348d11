//! Targeting and movement decisions.
//!
//! A policy is a plain function from a [`DecisionContext`] to an [`Action`].
//! The [`PolicyTable`] maps each archetype to its policy; adding a new
//! behavior means adding a function and a table entry.
//!
//! Policies never mutate anything. The resolver validates and applies
//! whatever they return.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ability::AbilityTarget;
use crate::archetype::Archetype;
use crate::math::{range_tolerance, Fixed, GridPos};
use crate::state::BattleView;
use crate::unit::{Unit, UnitId};

/// What a unit wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Step to a cell, optionally chasing a target.
    Move {
        /// Destination cell.
        to: GridPos,
        /// Enemy being approached, if any.
        toward: Option<UnitId>,
    },
    /// Basic attack.
    Attack {
        /// Enemy to hit.
        target: UnitId,
    },
    /// Cast the unit's ability.
    Ability {
        /// Ability target.
        target: AbilityTarget,
    },
    /// Do nothing.
    Wait,
}

/// Input to a policy: the acting unit and a read-only view of the battle.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// Unit deciding.
    pub actor: &'a Unit,
    /// Battle state.
    pub view: BattleView<'a>,
}

/// Decision function for one archetype.
pub type PolicyFn = fn(&DecisionContext<'_>) -> Action;

/// Archetype to policy dispatch table.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: BTreeMap<Archetype, PolicyFn>,
}

impl PolicyTable {
    /// Built-in policies: archers kite, supports mend, everyone else engages.
    #[must_use]
    pub fn standard() -> Self {
        let policies = Archetype::ALL
            .iter()
            .map(|&archetype| {
                let policy: PolicyFn = match archetype {
                    Archetype::Archer => kite,
                    Archetype::Support => mend,
                    _ => engage,
                };
                (archetype, policy)
            })
            .collect();
        Self { policies }
    }

    /// Replace the policy for one archetype.
    #[must_use]
    pub fn with_policy(mut self, archetype: Archetype, policy: PolicyFn) -> Self {
        self.policies.insert(archetype, policy);
        self
    }

    /// Policy used for an archetype. Unlisted archetypes engage.
    #[must_use]
    pub fn policy_for(&self, archetype: Archetype) -> PolicyFn {
        self.policies.get(&archetype).copied().unwrap_or(engage)
    }

    /// Run the actor's policy.
    #[must_use]
    pub fn decide(&self, ctx: &DecisionContext<'_>) -> Action {
        (self.policy_for(ctx.actor.archetype()))(ctx)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Choose the enemy to focus.
///
/// A live sticky lock wins while the target stays within range plus one
/// cell. Otherwise: nearest, then lowest health, then lowest id.
#[must_use]
pub fn select_target<'a>(ctx: &DecisionContext<'a>) -> Option<&'a Unit> {
    let actor = ctx.actor;
    let view = &ctx.view;

    if let Some(lock) = actor.target_lock() {
        if view.tick < lock.expires_at {
            let leash = actor.stats().range + Fixed::ONE;
            let locked = view
                .living_unit(lock.target)
                .filter(|t| t.team() != actor.team())
                .filter(|t| view.within_reach(actor.position(), t.position(), leash));
            if locked.is_some() {
                return locked;
            }
        }
    }

    view.enemies_of(actor).min_by_key(|enemy| {
        (
            view.distance(actor.position(), enemy.position()),
            enemy.health(),
            enemy.id(),
        )
    })
}

/// Default behavior: cast when possible, attack in range, otherwise close in.
#[must_use]
pub fn engage(ctx: &DecisionContext<'_>) -> Action {
    let actor = ctx.actor;
    let Some(target) = select_target(ctx) else {
        return Action::Wait;
    };

    if let Some(cast) = ready_ability(ctx, Some(target.id())) {
        return cast;
    }

    if ctx.view.can_attack(actor, target) {
        return if actor.attack_ready() {
            Action::Attack {
                target: target.id(),
            }
        } else {
            Action::Wait
        };
    }

    approach(ctx, target)
}

/// Ranged behavior: back off from adjacent enemies while the attack recharges.
#[must_use]
pub fn kite(ctx: &DecisionContext<'_>) -> Action {
    let actor = ctx.actor;
    let view = &ctx.view;

    if actor.attack_ready() || actor.has_full_mana() {
        return engage(ctx);
    }
    let Some(target) = select_target(ctx) else {
        return Action::Wait;
    };

    let threat = |pos: GridPos| {
        view.enemies_of(actor)
            .map(|e| view.distance(pos, e.position()))
            .min()
            .unwrap_or(Fixed::MAX)
    };

    let current_threat = threat(actor.position());
    if current_threat > Fixed::ONE + range_tolerance() {
        return engage(ctx);
    }

    let retreat = view
        .battlefield
        .neighbors(actor.position(), actor.stats().speed)
        .into_iter()
        .filter(|&cell| view.can_attack_from(actor, cell, target))
        .map(|cell| (threat(cell), cell))
        .filter(|&(distance, _)| distance > current_threat)
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.row_major_key().cmp(&a.1.row_major_key())));

    match retreat {
        Some((_, to)) => Action::Move {
            to,
            toward: Some(target.id()),
        },
        None => engage(ctx),
    }
}

/// Healer behavior: heal the weakest ally whenever mana allows, otherwise engage.
#[must_use]
pub fn mend(ctx: &DecisionContext<'_>) -> Action {
    ready_ability(ctx, None).unwrap_or_else(|| engage(ctx))
}

fn ready_ability(ctx: &DecisionContext<'_>, preferred: Option<UnitId>) -> Option<Action> {
    let actor = ctx.actor;
    if !actor.has_full_mana() {
        return None;
    }
    actor
        .ability()
        .select_target(actor, &ctx.view, preferred)
        .map(|target| Action::Ability { target })
}

/// Move toward a cell from which `target` can be attacked.
///
/// Follows the cheapest path as far as movement speed allows this tick.
/// When every attack cell is unreachable, takes the single step that
/// brings the unit closest to the target instead.
fn approach(ctx: &DecisionContext<'_>, target: &Unit) -> Action {
    let actor = ctx.actor;
    let view = &ctx.view;
    let field = view.battlefield;
    let speed = actor.stats().speed;
    let from = actor.position();

    let mut goals = Vec::new();
    for y in 0..field.height() as i32 {
        for x in 0..field.width() as i32 {
            let cell = GridPos::new(x, y);
            if (cell == from || field.is_free(cell)) && view.can_attack_from(actor, cell, target) {
                goals.push(cell);
            }
        }
    }

    let destination = field
        .find_path(from, &goals, speed)
        .and_then(|path| field.advance_along(&path, speed))
        .filter(|&to| to != from)
        .or_else(|| {
            let current = view.distance(from, target.position());
            field
                .neighbors(from, speed)
                .into_iter()
                .map(|cell| (view.distance(cell, target.position()), cell))
                .filter(|&(distance, _)| distance < current)
                .min_by_key(|&(distance, cell)| (distance, cell.row_major_key()))
                .map(|(_, cell)| cell)
        });

    match destination {
        Some(to) => Action::Move {
            to,
            toward: Some(target.id()),
        },
        None => Action::Wait,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battlefield::Battlefield;
    use crate::config::BattleConfig;
    use crate::math::DistanceMetric;
    use crate::state::BattleState;
    use crate::unit::Team;

    fn state_with(metric: DistanceMetric, units: &[(Team, Archetype, GridPos)]) -> BattleState {
        let mut battlefield = Battlefield::new(7, 8, metric).unwrap();
        let units = units
            .iter()
            .enumerate()
            .map(|(i, &(team, archetype, pos))| {
                let id = i as UnitId + 1;
                battlefield.place(id, pos).unwrap();
                Unit::new(
                    id,
                    team,
                    archetype,
                    1,
                    archetype.base_stats(),
                    archetype.default_ability(),
                    pos,
                )
            })
            .collect();
        BattleState::new(units, battlefield)
    }

    fn decide(state: &BattleState, config: &BattleConfig, actor: UnitId, tick: u64) -> Action {
        let view = state.view(config, tick);
        let ctx = DecisionContext {
            actor: view.unit(actor).unwrap(),
            view,
        };
        PolicyTable::standard().decide(&ctx)
    }

    #[test]
    fn test_nearest_then_weakest_then_lowest_id() {
        let mut state = state_with(
            DistanceMetric::Manhattan,
            &[
                (Team::A, Archetype::Warrior, GridPos::new(3, 3)),
                (Team::B, Archetype::Warrior, GridPos::new(3, 5)),
                (Team::B, Archetype::Warrior, GridPos::new(5, 3)),
                (Team::B, Archetype::Warrior, GridPos::new(0, 0)),
            ],
        );
        let config = BattleConfig::default().with_metric(DistanceMetric::Manhattan);

        {
            let view = state.view(&config, 1);
            let ctx = DecisionContext {
                actor: view.unit(1).unwrap(),
                view,
            };
            // Units 2 and 3 are tied on distance and health; lowest id wins
            assert_eq!(select_target(&ctx).map(Unit::id), Some(2));
        }

        state.unit_mut(3).unwrap().apply_damage(Fixed::from_num(10));
        let view = state.view(&config, 1);
        let ctx = DecisionContext {
            actor: view.unit(1).unwrap(),
            view,
        };
        assert_eq!(select_target(&ctx).map(Unit::id), Some(3));
    }

    #[test]
    fn test_sticky_lock_honoured_until_expiry() {
        let mut state = state_with(
            DistanceMetric::Chebyshev,
            &[
                (Team::A, Archetype::Warrior, GridPos::new(3, 3)),
                (Team::B, Archetype::Warrior, GridPos::new(3, 4)),
                (Team::B, Archetype::Warrior, GridPos::new(4, 5)),
            ],
        );
        state.unit_mut(1).unwrap().lock_target(3, 5);
        let config = BattleConfig::default().with_metric(DistanceMetric::Chebyshev);

        for (tick, expected) in [(4, 3), (5, 2)] {
            let view = state.view(&config, tick);
            let ctx = DecisionContext {
                actor: view.unit(1).unwrap(),
                view,
            };
            assert_eq!(select_target(&ctx).map(Unit::id), Some(expected));
        }
    }

    #[test]
    fn test_attack_when_in_range() {
        let state = state_with(
            DistanceMetric::Euclidean,
            &[
                (Team::A, Archetype::Warrior, GridPos::new(2, 2)),
                (Team::B, Archetype::Tank, GridPos::new(3, 3)),
            ],
        );
        let config = BattleConfig::default();
        assert_eq!(decide(&state, &config, 1, 1), Action::Attack { target: 2 });
    }

    #[test]
    fn test_move_toward_when_out_of_range() {
        let state = state_with(
            DistanceMetric::Manhattan,
            &[
                (Team::A, Archetype::Warrior, GridPos::new(0, 0)),
                (Team::B, Archetype::Tank, GridPos::new(4, 0)),
            ],
        );
        let config = BattleConfig::default().with_metric(DistanceMetric::Manhattan);
        assert_eq!(
            decide(&state, &config, 1, 1),
            Action::Move {
                to: GridPos::new(1, 0),
                toward: Some(2)
            }
        );
    }

    #[test]
    fn test_wait_while_cooling_down() {
        let mut state = state_with(
            DistanceMetric::Euclidean,
            &[
                (Team::A, Archetype::Tank, GridPos::new(2, 2)),
                (Team::B, Archetype::Tank, GridPos::new(2, 3)),
            ],
        );
        state.unit_mut(1).unwrap().start_attack_cooldown();
        let config = BattleConfig::default();
        assert_eq!(decide(&state, &config, 1, 1), Action::Wait);
    }

    #[test]
    fn test_ability_when_mana_full() {
        let mut state = state_with(
            DistanceMetric::Euclidean,
            &[
                (Team::A, Archetype::Warrior, GridPos::new(2, 2)),
                (Team::B, Archetype::Tank, GridPos::new(2, 3)),
            ],
        );
        for _ in 0..10 {
            state.unit_mut(1).unwrap().gain_attack_mana();
        }
        let config = BattleConfig::default();
        assert_eq!(
            decide(&state, &config, 1, 1),
            Action::Ability {
                target: AbilityTarget::SelfCast
            }
        );
    }

    #[test]
    fn test_archer_kites_adjacent_melee() {
        let mut state = state_with(
            DistanceMetric::Manhattan,
            &[
                (Team::A, Archetype::Archer, GridPos::new(3, 3)),
                (Team::B, Archetype::Warrior, GridPos::new(3, 4)),
            ],
        );
        state.unit_mut(1).unwrap().start_attack_cooldown();
        let config = BattleConfig::default().with_metric(DistanceMetric::Manhattan);

        match decide(&state, &config, 1, 1) {
            Action::Move { to, toward } => {
                assert_eq!(to, GridPos::new(3, 2));
                assert_eq!(toward, Some(2));
            }
            other => panic!("expected retreat, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_policy_entry() {
        fn hold(_: &DecisionContext<'_>) -> Action {
            Action::Wait
        }

        let state = state_with(
            DistanceMetric::Euclidean,
            &[
                (Team::A, Archetype::Warrior, GridPos::new(2, 2)),
                (Team::B, Archetype::Tank, GridPos::new(2, 3)),
            ],
        );
        let config = BattleConfig::default();
        let view = state.view(&config, 1);
        let ctx = DecisionContext {
            actor: view.unit(1).unwrap(),
            view,
        };
        let table = PolicyTable::standard().with_policy(Archetype::Warrior, hold);
        assert_eq!(table.decide(&ctx), Action::Wait);
    }

    #[test]
    fn test_blocked_unit_waits() {
        // Corner unit fenced in by allies cannot move
        let state = state_with(
            DistanceMetric::Manhattan,
            &[
                (Team::A, Archetype::Warrior, GridPos::new(0, 0)),
                (Team::A, Archetype::Tank, GridPos::new(1, 0)),
                (Team::A, Archetype::Tank, GridPos::new(0, 1)),
                (Team::B, Archetype::Tank, GridPos::new(6, 7)),
            ],
        );
        let config = BattleConfig::default().with_metric(DistanceMetric::Manhattan);
        assert_eq!(decide(&state, &config, 1, 1), Action::Wait);
    }
}
