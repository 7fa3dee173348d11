//! # Auto-Chess Core
//!
//! Deterministic combat engine for a micro auto-battler.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond loading RON rosters and configs
//! - No system randomness (a seeded `ChaCha8Rng` lives inside each battle)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Replays that match bit for bit
//! - Headless batch runs
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`unit`] / [`archetype`] - Unit identity, stats and mutable combat state
//! - [`battlefield`] - Grid occupancy, range, path and line-of-sight queries
//! - [`policy`] - Per-archetype decision functions
//! - [`resolver`] / [`combat`] / [`ability`] - Action resolution
//! - [`battle`] - Tick scheduler and win conditions
//! - [`snapshot`] - Per-tick snapshots and the lazy snapshot stream
//! - [`math`] - Fixed-point math and grid geometry

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ability;
pub mod archetype;
pub mod battle;
pub mod battlefield;
pub mod combat;
pub mod config;
pub mod error;
pub mod event;
pub mod math;
pub mod policy;
pub mod resolver;
pub mod roster;
pub mod snapshot;
pub mod state;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ability::{Ability, AbilityTarget, Effect};
    pub use crate::archetype::{Archetype, UnitStats};
    pub use crate::battle::{
        AbortHandle, Battle, BattleOutcome, BattlePhase, BattleResult, EndReason,
    };
    pub use crate::battlefield::Battlefield;
    pub use crate::combat::DamageKind;
    pub use crate::config::{BattleConfig, TieBreakRule, TimeoutRule};
    pub use crate::error::{BattleError, MoveRejection, Result};
    pub use crate::event::{BattleEvent, Rejection};
    pub use crate::math::{DistanceMetric, Fixed, GridPos};
    pub use crate::policy::{Action, DecisionContext, PolicyFn, PolicyTable};
    pub use crate::roster::{Roster, StatOverrides, UnitSpec};
    pub use crate::snapshot::{BattleStream, Snapshot};
    pub use crate::state::{BattleState, BattleView};
    pub use crate::unit::{StatusEffect, Team, Unit, UnitId};
}
