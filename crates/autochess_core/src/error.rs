//! Error types for the combat engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::GridPos;
use crate::unit::UnitId;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Why a movement request was refused by the battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveRejection {
    /// Destination lies outside the board.
    OutOfBounds,
    /// Destination holds another living unit.
    Occupied(UnitId),
    /// Destination is further than the unit's movement speed allows.
    TooFar,
    /// The unit is not on the board (dead or never placed).
    NotOnBoard,
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "destination out of bounds"),
            Self::Occupied(other) => write!(f, "destination occupied by unit {other}"),
            Self::TooFar => write!(f, "destination beyond movement speed"),
            Self::NotOnBoard => write!(f, "unit is not on the board"),
        }
    }
}

/// Top-level error type for all combat engine errors.
#[derive(Debug, Error)]
pub enum BattleError {
    /// Roster failed validation before the battle started.
    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    /// Battle configuration is unusable.
    #[error("Invalid battle config: {0}")]
    InvalidConfig(String),

    /// A unit tried to move somewhere it may not go.
    #[error("Invalid move for unit {unit} to {to}: {reason}")]
    InvalidMove {
        /// Unit that attempted the move.
        unit: UnitId,
        /// Requested destination.
        to: GridPos,
        /// Why the move was refused.
        reason: MoveRejection,
    },

    /// An ability was cast without a legal target.
    #[error("Ability '{ability}' of unit {unit} has no legal target")]
    InvalidAbilityTarget {
        /// Casting unit.
        unit: UnitId,
        /// Ability name.
        ability: &'static str,
    },

    /// Invalid unit reference.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid battle state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}

impl BattleError {
    /// Build a [`BattleError::DataParseError`] from any displayable error.
    pub(crate) fn parse(path: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::DataParseError {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
