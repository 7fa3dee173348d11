//! Fixed-point math and grid geometry for deterministic combat.
//!
//! All combat math uses fixed-point arithmetic so that a battle replayed
//! from the same roster and seed produces bit-identical results on every
//! platform. Floating-point operations can differ between CPUs.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Extra reach granted on top of every range stat.
///
/// With the Euclidean metric this lets range 1 reach orthogonal and
/// diagonal neighbours (distance 1.41) but nothing two cells away.
#[must_use]
pub fn range_tolerance() -> Fixed {
    Fixed::from_num(66) / Fixed::from_num(100)
}

/// Convert a whole percentage into a fixed-point fraction (`25` -> `0.25`).
#[must_use]
pub fn percent(value: u32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Exact square root of a non-negative fixed-point number.
///
/// Works on the raw bits: `sqrt(v) * 2^32 == isqrt(bits * 2^32)`, so perfect
/// squares come out exact and equal inputs always give equal outputs.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let scaled = (value.to_bits() as u128) << 32;
    let root = isqrt_u128(scaled);
    Fixed::from_bits(root as i64)
}

/// Floor integer square root (Newton iteration).
fn isqrt_u128(n: u128) -> u128 {
    if n < 2 {
        return n;
    }

    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// A cell on the battlefield grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// Column, growing to the right.
    pub x: i32,
    /// Row, growing downward.
    pub y: i32,
}

impl GridPos {
    /// Create a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position shifted by the given offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Absolute per-axis deltas to another position.
    #[must_use]
    pub const fn abs_delta(self, other: Self) -> (u32, u32) {
        (self.x.abs_diff(other.x), self.y.abs_diff(other.y))
    }

    /// Row-major ordering key (row first, then column).
    #[must_use]
    pub const fn row_major_key(self) -> (i32, i32) {
        (self.y, self.x)
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Distance rule used for range checks and movement cost.
///
/// Chosen once per battle; every spatial query uses the same metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Straight-line distance. Diagonal steps cost `sqrt(2)`.
    #[default]
    Euclidean,
    /// King-move distance. Diagonal steps cost 1.
    Chebyshev,
    /// Taxicab distance. Diagonal steps cost 2.
    Manhattan,
}

impl DistanceMetric {
    /// Distance between two grid cells under this metric.
    #[must_use]
    pub fn distance(self, a: GridPos, b: GridPos) -> Fixed {
        let (dx, dy) = a.abs_delta(b);
        self.length(dx, dy)
    }

    /// Length of an offset vector under this metric.
    ///
    /// Saturates at `Fixed::MAX` for offsets far larger than any valid board.
    #[must_use]
    pub fn length(self, dx: u32, dy: u32) -> Fixed {
        match self {
            Self::Euclidean => {
                let sq = u128::from(dx) * u128::from(dx) + u128::from(dy) * u128::from(dy);
                match i32::try_from(sq) {
                    Ok(sq) => fixed_sqrt(Fixed::from_num(sq)),
                    // Whole-cell precision is plenty this far out
                    Err(_) => Fixed::saturating_from_num(isqrt_u128(sq)),
                }
            }
            Self::Chebyshev => Fixed::saturating_from_num(dx.max(dy)),
            Self::Manhattan => Fixed::saturating_from_num(u64::from(dx) + u64::from(dy)),
        }
    }

    /// Whether two distinct cells touch under this metric (distance <= 1).
    ///
    /// Euclidean and Manhattan give the 4-neighbourhood, Chebyshev the 8-neighbourhood.
    #[must_use]
    pub fn is_adjacent(self, a: GridPos, b: GridPos) -> bool {
        a != b && self.distance(a, b) <= Fixed::ONE
    }

    /// Short lowercase name, used in logs and CLI output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Chebyshev => "chebyshev",
            Self::Manhattan => "manhattan",
        }
    }
}
