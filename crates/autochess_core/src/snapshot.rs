//! Per-tick snapshots and the lazy snapshot stream.
//!
//! A [`Snapshot`] is a self-contained copy of the battle after one tick:
//! every unit (dead ones flagged), the board size and the events of that
//! tick. Consumers never need to look at earlier snapshots to render one.
//!
//! [`BattleStream`] drives a [`Battle`] one tick per `next()` call and
//! keeps no history.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::battle::{AbortHandle, Battle, BattleResult};
use crate::config::BattleConfig;
use crate::error::{BattleError, Result};
use crate::event::BattleEvent;
use crate::math::{Fixed, GridPos};
use crate::policy::PolicyTable;
use crate::roster::Roster;
use crate::state::BattleState;
use crate::unit::{Team, Unit, UnitId};

/// Immutable state of the battle after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    tick: u64,
    width: u32,
    height: u32,
    units: Vec<Unit>,
    events: Vec<BattleEvent>,
}

impl Snapshot {
    pub(crate) fn capture(tick: u64, state: &BattleState, events: Vec<BattleEvent>) -> Self {
        let field = state.battlefield();
        Self {
            tick,
            width: field.width(),
            height: field.height(),
            units: state.units().to_vec(),
            events,
        }
    }

    /// Tick this snapshot was taken after. Zero for the initial state.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Board width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Board height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Every unit in id order, dead ones included.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Events of this tick in resolution order.
    #[must_use]
    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id() == id)
    }

    /// Living unit standing on a cell.
    #[must_use]
    pub fn occupant(&self, pos: GridPos) -> Option<&Unit> {
        self.units
            .iter()
            .find(|u| u.is_alive() && u.position() == pos)
    }

    /// Living units of a team.
    pub fn living(&self, team: Team) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .iter()
            .filter(move |u| u.is_alive() && u.team() == team)
    }

    /// Number of living units of a team.
    #[must_use]
    pub fn living_count(&self, team: Team) -> usize {
        self.living(team).count()
    }

    /// Total remaining health of a team.
    #[must_use]
    pub fn team_health(&self, team: Team) -> Fixed {
        self.living(team).map(Unit::health).sum()
    }

    /// Deterministic hash of the whole snapshot.
    ///
    /// Two runs of the same battle produce equal hashes at every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Encode to compact bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::InvalidState(format!("Failed to serialize snapshot: {e}")))
    }

    /// Decode from bytes produced by [`Snapshot::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| BattleError::InvalidState(format!("Failed to deserialize snapshot: {e}")))
    }
}

/// Lazy, finite, restartable iterator of snapshots.
///
/// Yields exactly one snapshot per tick starting at tick 1 and stops after
/// the terminal tick (or immediately once aborted).
///
/// ```
/// use autochess_core::prelude::*;
///
/// let roster = Roster::new(7, 8)
///     .with_unit(Team::A, UnitSpec::new(Archetype::Warrior, 3, 2))
///     .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 3, 5));
/// let mut stream = BattleStream::new(roster, BattleConfig::default()).unwrap();
///
/// let ticks: Vec<u64> = stream.by_ref().map(|s| s.tick()).collect();
/// assert_eq!(ticks.first(), Some(&1));
/// assert!(stream.result().is_some());
/// ```
#[derive(Debug)]
pub struct BattleStream {
    roster: Roster,
    config: BattleConfig,
    policies: PolicyTable,
    battle: Battle,
    initial: Snapshot,
}

impl BattleStream {
    /// Validate the roster and prepare a battle.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidRoster`] or [`BattleError::InvalidConfig`].
    pub fn new(roster: Roster, config: BattleConfig) -> Result<Self> {
        let battle = Battle::new(&roster, config.clone())?;
        let initial = battle.snapshot();
        Ok(Self {
            roster,
            config,
            policies: PolicyTable::standard(),
            battle,
            initial,
        })
    }

    /// Use a custom policy table. Resets the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored roster no longer builds.
    pub fn with_policies(mut self, policies: PolicyTable) -> Result<Self> {
        self.policies = policies;
        self.restart()?;
        Ok(self)
    }

    /// Rebuild the battle from the stored roster and config.
    ///
    /// Replays produce the same snapshots as the first run. The abort
    /// handle is replaced, so handles taken earlier no longer apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored roster no longer builds.
    pub fn restart(&mut self) -> Result<()> {
        self.battle =
            Battle::new(&self.roster, self.config.clone())?.with_policies(self.policies.clone());
        self.initial = self.battle.snapshot();
        Ok(())
    }

    /// Initial (tick 0) state, before any tick resolves.
    #[must_use]
    pub const fn initial(&self) -> &Snapshot {
        &self.initial
    }

    /// Handle for aborting the current run from another thread.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.battle.abort_handle()
    }

    /// Outcome once the stream is exhausted.
    #[must_use]
    pub fn result(&self) -> Option<&BattleResult> {
        self.battle.result()
    }

    /// The underlying battle.
    #[must_use]
    pub const fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Roster the stream replays.
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Config the stream replays.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }
}

impl Iterator for BattleStream {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Snapshot> {
        self.battle.step()
    }
}

impl FusedIterator for BattleStream {}
