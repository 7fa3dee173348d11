//! Battle scheduler.
//!
//! A [`Battle`] owns its units, battlefield and RNG and advances one tick at
//! a time. Within a tick every living unit acts once, in the order given by
//! the configured [`TieBreakRule`]. After all units have acted the battle
//! checks for a winner and emits exactly one [`Snapshot`].
//!
//! # Determinism
//!
//! The RNG is seeded from the config and only consumed by the resolver.
//! Iteration uses id order everywhere, so the same roster, config and
//! policy table always produce the same snapshot sequence.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{BattleConfig, TieBreakRule, TimeoutRule};
use crate::error::Result;
use crate::event::BattleEvent;
use crate::math::{fixed_serde, Fixed};
use crate::policy::{DecisionContext, PolicyTable};
use crate::resolver::CombatResolver;
use crate::roster::Roster;
use crate::snapshot::Snapshot;
use crate::state::BattleState;
use crate::unit::{Team, Unit, UnitId};

/// Final outcome of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Team A won.
    WinA,
    /// Team B won.
    WinB,
    /// Nobody won.
    Draw,
    /// Stopped from outside before a result.
    Aborted,
}

impl BattleOutcome {
    /// Outcome for a victory by `team`.
    #[must_use]
    pub const fn win_for(team: Team) -> Self {
        match team {
            Team::A => Self::WinA,
            Team::B => Self::WinB,
        }
    }

    /// Winning team, if any.
    #[must_use]
    pub const fn winner(self) -> Option<Team> {
        match self {
            Self::WinA => Some(Team::A),
            Self::WinB => Some(Team::B),
            Self::Draw | Self::Aborted => None,
        }
    }
}

/// Why the battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// One team has no living units.
    Elimination,
    /// Both teams lost their last units in the same tick.
    MutualElimination,
    /// The tick limit was reached.
    Timeout,
    /// Abort was requested.
    Aborted,
}

/// Lifecycle of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Built, no tick resolved yet.
    Setup,
    /// At least one tick resolved, no result yet.
    Running,
    /// Ended with the given outcome.
    Finished(BattleOutcome),
}

/// Report produced when a battle ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    /// Who won.
    pub outcome: BattleOutcome,
    /// Why the battle ended.
    pub end_reason: EndReason,
    /// Ticks resolved.
    pub ticks: u64,
    /// Remaining health of team A.
    #[serde(with = "fixed_serde")]
    pub health_a: Fixed,
    /// Remaining health of team B.
    #[serde(with = "fixed_serde")]
    pub health_b: Fixed,
    /// State at the end.
    pub final_snapshot: Snapshot,
}

impl BattleResult {
    /// Remaining health of a team.
    #[must_use]
    pub const fn surviving_health(&self, team: Team) -> Fixed {
        match team {
            Team::A => self.health_a,
            Team::B => self.health_b,
        }
    }
}

/// Thread-safe flag for stopping a battle from outside.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Request the battle stop before its next tick.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether abort was requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A single battle from setup to result.
#[derive(Debug)]
pub struct Battle {
    tick: u64,
    phase: BattlePhase,
    state: BattleState,
    config: BattleConfig,
    policies: PolicyTable,
    rng: ChaCha8Rng,
    abort: AbortHandle,
    result: Option<BattleResult>,
}

impl Battle {
    /// Validate inputs and place units.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BattleError::InvalidRoster`] or
    /// [`crate::error::BattleError::InvalidConfig`].
    pub fn new(roster: &Roster, config: BattleConfig) -> Result<Self> {
        config.validate()?;
        let state = roster.build(config.distance_metric)?;

        info!(
            units = state.units().len(),
            width = roster.board.0,
            height = roster.board.1,
            metric = config.distance_metric.name(),
            seed = config.random_seed,
            "Battle created"
        );

        Ok(Self {
            tick: 0,
            phase: BattlePhase::Setup,
            state,
            rng: ChaCha8Rng::seed_from_u64(config.random_seed),
            config,
            policies: PolicyTable::standard(),
            abort: AbortHandle::default(),
            result: None,
        })
    }

    /// Replace the policy table.
    #[must_use]
    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Last resolved tick (0 before the first).
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Whether the battle has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.phase, BattlePhase::Finished(_))
    }

    /// Battle rules.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Current units and grid.
    #[must_use]
    pub const fn state(&self) -> &BattleState {
        &self.state
    }

    /// Result once finished.
    #[must_use]
    pub const fn result(&self) -> Option<&BattleResult> {
        self.result.as_ref()
    }

    /// Shared handle for aborting from another thread.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Request abort. Takes effect at the next [`Battle::step`].
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Current state without events. At tick 0 this is the initial layout.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.tick, &self.state, Vec::new())
    }

    /// Resolve one tick and return its snapshot.
    ///
    /// Returns `None` once the battle has finished, including when an abort
    /// was requested before this tick started.
    pub fn step(&mut self) -> Option<Snapshot> {
        match self.phase {
            BattlePhase::Finished(_) => return None,
            BattlePhase::Setup => self.phase = BattlePhase::Running,
            BattlePhase::Running => {}
        }

        if self.abort.is_aborted() {
            info!(tick = self.tick, "Battle aborted");
            let snapshot = self.snapshot();
            self.finish(BattleOutcome::Aborted, EndReason::Aborted, snapshot);
            return None;
        }

        self.tick += 1;
        let mut events = Vec::new();

        for id in self.acting_order() {
            self.act(id, &mut events);
        }

        #[cfg(feature = "debug-validation")]
        if let Err(err) = self.state.validate() {
            tracing::error!(tick = self.tick, %err, "Battle state invariant violated");
        }

        let snapshot = Snapshot::capture(self.tick, &self.state, events);

        #[cfg(debug_assertions)]
        {
            let hash = snapshot.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        if let Some((outcome, reason)) = self.check_end() {
            self.finish(outcome, reason, snapshot.clone());
        }

        Some(snapshot)
    }

    /// Step until the battle finishes and return the result.
    pub fn run_to_end(&mut self) -> &BattleResult {
        while self.step().is_some() {}
        // step() only returns None after finish() stored a result
        self.result.get_or_insert_with(|| BattleResult {
            outcome: BattleOutcome::Aborted,
            end_reason: EndReason::Aborted,
            ticks: self.tick,
            health_a: self.state.team_health(Team::A),
            health_b: self.state.team_health(Team::B),
            final_snapshot: Snapshot::capture(self.tick, &self.state, Vec::new()),
        })
    }

    /// Hash of the current state, for divergence checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.state.hash(&mut hasher);
        hasher.finish()
    }

    /// Living unit ids in acting order for this tick.
    fn acting_order(&self) -> Vec<UnitId> {
        let mut living: Vec<&Unit> = self.state.units().iter().filter(|u| u.is_alive()).collect();
        match self.config.tie_break {
            TieBreakRule::SpeedThenId => {
                living.sort_by(|a, b| {
                    b.stats()
                        .speed
                        .cmp(&a.stats().speed)
                        .then_with(|| a.id().cmp(&b.id()))
                });
            }
            TieBreakRule::IdOnly => living.sort_by_key(|u| u.id()),
            TieBreakRule::RowMajor => {
                living.sort_by_key(|u| (u.position().row_major_key(), u.id()));
            }
        }
        living.into_iter().map(Unit::id).collect()
    }

    /// One unit's turn: decide, resolve, then advance its timers.
    fn act(&mut self, id: UnitId, events: &mut Vec<BattleEvent>) {
        let Some(unit) = self.state.unit(id).filter(|u| u.is_alive()) else {
            return;
        };

        if unit.is_stunned() {
            events.push(BattleEvent::Stunned { unit: id });
        } else {
            let view = self.state.view(&self.config, self.tick);
            let ctx = DecisionContext { actor: unit, view };
            let action = self.policies.decide(&ctx);
            CombatResolver::new(&mut self.state, &self.config, self.tick).apply(
                id,
                action,
                &mut self.rng,
                events,
            );
        }

        if let Some(unit) = self.state.unit_mut(id).filter(|u| u.is_alive()) {
            for effect in unit.tick_statuses() {
                events.push(BattleEvent::StatusExpired { unit: id, effect });
            }
            unit.tick_cooldown();
        }
    }

    fn check_end(&self) -> Option<(BattleOutcome, EndReason)> {
        let a_alive = self.state.living_count(Team::A) > 0;
        let b_alive = self.state.living_count(Team::B) > 0;

        match (a_alive, b_alive) {
            (false, false) => Some((BattleOutcome::Draw, EndReason::MutualElimination)),
            (true, false) => Some((BattleOutcome::WinA, EndReason::Elimination)),
            (false, true) => Some((BattleOutcome::WinB, EndReason::Elimination)),
            (true, true) if self.tick >= self.config.max_ticks => {
                Some((self.timeout_outcome(), EndReason::Timeout))
            }
            (true, true) => None,
        }
    }

    fn timeout_outcome(&self) -> BattleOutcome {
        match self.config.timeout_rule {
            TimeoutRule::Draw => BattleOutcome::Draw,
            TimeoutRule::HealthTotal => {
                let a = self.state.team_health(Team::A);
                let b = self.state.team_health(Team::B);
                match a.cmp(&b) {
                    std::cmp::Ordering::Greater => BattleOutcome::WinA,
                    std::cmp::Ordering::Less => BattleOutcome::WinB,
                    std::cmp::Ordering::Equal => BattleOutcome::Draw,
                }
            }
        }
    }

    fn finish(&mut self, outcome: BattleOutcome, end_reason: EndReason, final_snapshot: Snapshot) {
        let health_a = self.state.team_health(Team::A);
        let health_b = self.state.team_health(Team::B);
        info!(
            tick = self.tick,
            ?outcome,
            ?end_reason,
            %health_a,
            %health_b,
            "Battle finished"
        );
        self.phase = BattlePhase::Finished(outcome);
        self.result = Some(BattleResult {
            outcome,
            end_reason,
            ticks: self.tick,
            health_a,
            health_b,
            final_snapshot,
        });
    }
}
