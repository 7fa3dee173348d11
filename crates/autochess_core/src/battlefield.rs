//! Grid occupancy index and spatial queries.
//!
//! The battlefield only knows which unit id sits in which cell. Unit state
//! lives in [`crate::unit::Unit`]; the two are kept in sync by the resolver.
//!
//! Path search is A* over free cells. Step costs come from the battle's
//! [`DistanceMetric`], and ties in the open set are broken by cell
//! coordinates so the same board always yields the same path.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, MoveRejection, Result};
use crate::math::{DistanceMetric, Fixed, GridPos};
use crate::unit::UnitId;

/// Default board width (columns).
pub const DEFAULT_WIDTH: u32 = 7;
/// Default board height (rows).
pub const DEFAULT_HEIGHT: u32 = 8;
/// Largest width or height a board may have.
///
/// Keeps every distance, path cost and squared distance well inside `Fixed`.
pub const MAX_DIMENSION: u32 = 64;

/// The eight surrounding offsets, in a fixed exploration order.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // East
    (1, 1),   // Southeast
    (0, 1),   // South
    (-1, 1),  // Southwest
    (-1, 0),  // West
    (-1, -1), // Northwest
    (0, -1),  // North
    (1, -1),  // Northeast
];

/// Rectangular grid with at most one unit per cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Battlefield {
    width: u32,
    height: u32,
    metric: DistanceMetric,
    /// Occupant of each cell in row-major order.
    cells: Vec<Option<UnitId>>,
}

impl Battlefield {
    /// Create an empty battlefield.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidRoster`] if either dimension is zero
    /// or larger than [`MAX_DIMENSION`].
    pub fn new(width: u32, height: u32, metric: DistanceMetric) -> Result<Self> {
        check_dimensions(width, height)?;

        let cell_count = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            metric,
            cells: vec![None; cell_count],
        })
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Distance metric used for every query on this board.
    #[must_use]
    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Distance between two cells under the board metric.
    #[must_use]
    pub fn distance(&self, a: GridPos, b: GridPos) -> Fixed {
        self.metric.distance(a, b)
    }

    #[inline]
    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y as usize) * (self.width as usize) + (pos.x as usize))
        } else {
            None
        }
    }

    #[inline]
    fn position_at(&self, index: usize) -> GridPos {
        let width = self.width as usize;
        GridPos::new((index % width) as i32, (index / width) as i32)
    }

    /// Check if a position is within the board.
    #[must_use]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Unit occupying a cell, if any.
    #[must_use]
    pub fn query(&self, pos: GridPos) -> Option<UnitId> {
        self.index(pos).and_then(|i| self.cells[i])
    }

    /// Whether a cell holds a unit. Out-of-bounds cells count as unoccupied.
    #[must_use]
    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.query(pos).is_some()
    }

    /// Whether a cell is in bounds and empty.
    #[must_use]
    pub fn is_free(&self, pos: GridPos) -> bool {
        self.index(pos).is_some_and(|i| self.cells[i].is_none())
    }

    /// Cell currently holding `unit`.
    #[must_use]
    pub fn position_of(&self, unit: UnitId) -> Option<GridPos> {
        self.cells
            .iter()
            .position(|cell| *cell == Some(unit))
            .map(|i| self.position_at(i))
    }

    /// Ids of units within `radius` of `origin` (inclusive), sorted by id.
    #[must_use]
    pub fn units_in_range(&self, origin: GridPos, radius: Fixed) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self
            .occupied()
            .filter(|(pos, _)| self.distance(origin, *pos) <= radius)
            .map(|(_, id)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// All occupied cells in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (GridPos, UnitId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.map(|id| (self.position_at(i), id)))
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Put a unit on an empty cell.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidMove`] if the cell is out of bounds or occupied.
    pub fn place(&mut self, unit: UnitId, pos: GridPos) -> Result<()> {
        let index = self.checked_destination(unit, pos)?;
        self.cells[index] = Some(unit);
        Ok(())
    }

    /// Clear a cell, returning its previous occupant.
    pub fn vacate(&mut self, pos: GridPos) -> Option<UnitId> {
        let index = self.index(pos)?;
        self.cells[index].take()
    }

    /// Move a unit to a new cell.
    ///
    /// Moving onto the unit's own cell is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidMove`] if the unit is not on the board,
    /// or the destination is out of bounds or occupied by another unit.
    pub fn move_unit(&mut self, unit: UnitId, to: GridPos) -> Result<()> {
        let from = self.position_of(unit).ok_or(BattleError::InvalidMove {
            unit,
            to,
            reason: MoveRejection::NotOnBoard,
        })?;
        if from == to {
            return Ok(());
        }

        let to_index = self.checked_destination(unit, to)?;
        if let Some(from_index) = self.index(from) {
            self.cells[from_index] = None;
        }
        self.cells[to_index] = Some(unit);
        Ok(())
    }

    fn checked_destination(&self, unit: UnitId, to: GridPos) -> Result<usize> {
        let index = self.index(to).ok_or(BattleError::InvalidMove {
            unit,
            to,
            reason: MoveRejection::OutOfBounds,
        })?;
        match self.cells[index] {
            Some(other) if other != unit => Err(BattleError::InvalidMove {
                unit,
                to,
                reason: MoveRejection::Occupied(other),
            }),
            _ => Ok(index),
        }
    }

    /// Free cells reachable in one step whose metric cost fits `step_budget`.
    ///
    /// Returned in a fixed direction order.
    #[must_use]
    pub fn neighbors(&self, pos: GridPos, step_budget: Fixed) -> Vec<GridPos> {
        DIRECTIONS
            .iter()
            .filter(|&&(dx, dy)| self.step_cost(dx, dy) <= step_budget)
            .map(|&(dx, dy)| pos.offset(dx, dy))
            .filter(|&next| self.is_free(next))
            .collect()
    }

    #[inline]
    fn step_cost(&self, dx: i32, dy: i32) -> Fixed {
        self.metric.length(dx.unsigned_abs(), dy.unsigned_abs())
    }

    /// Cheapest path from `start` to any of `goals` through free cells.
    ///
    /// Only single steps costing at most `step_budget` are considered, so a
    /// unit can actually follow the result one tick at a time. The path
    /// includes `start`. Occupied goals are ignored unless equal to `start`.
    /// Returns `None` when no goal is reachable.
    #[must_use]
    pub fn find_path(
        &self,
        start: GridPos,
        goals: &[GridPos],
        step_budget: Fixed,
    ) -> Option<Vec<GridPos>> {
        if goals.contains(&start) {
            return Some(vec![start]);
        }

        let start_index = self.index(start)?;
        let goals: Vec<GridPos> = goals.iter().copied().filter(|g| self.is_free(*g)).collect();
        if goals.is_empty() {
            return None;
        }

        let heuristic = |pos: GridPos| {
            goals
                .iter()
                .map(|g| self.distance(pos, *g))
                .min()
                .unwrap_or(Fixed::ZERO)
        };

        let mut open_set = BinaryHeap::new();
        let mut came_from: Vec<Option<usize>> = vec![None; self.cells.len()];
        let mut g_score: Vec<Fixed> = vec![Fixed::MAX; self.cells.len()];

        g_score[start_index] = Fixed::ZERO;
        open_set.push(AStarNode {
            pos: start,
            f_score: heuristic(start),
            g_score: Fixed::ZERO,
            tie_breaker: tie_breaker(start),
        });

        while let Some(current) = open_set.pop() {
            let Some(current_index) = self.index(current.pos) else {
                continue;
            };
            // Stale entry superseded by a cheaper route
            if current.g_score > g_score[current_index] {
                continue;
            }

            if goals.contains(&current.pos) {
                return Some(self.reconstruct_path(&came_from, current_index));
            }

            for next in self.neighbors(current.pos, step_budget) {
                let Some(next_index) = self.index(next) else {
                    continue;
                };
                let (dx, dy) = current.pos.abs_delta(next);
                let tentative_g = current.g_score + self.metric.length(dx, dy);

                if tentative_g < g_score[next_index] {
                    came_from[next_index] = Some(current_index);
                    g_score[next_index] = tentative_g;
                    open_set.push(AStarNode {
                        pos: next,
                        f_score: tentative_g + heuristic(next),
                        g_score: tentative_g,
                        tie_breaker: tie_breaker(next),
                    });
                }
            }
        }

        None
    }

    fn reconstruct_path(&self, came_from: &[Option<usize>], goal_index: usize) -> Vec<GridPos> {
        let mut path = vec![self.position_at(goal_index)];
        let mut current = goal_index;
        while let Some(prev) = came_from[current] {
            path.push(self.position_at(prev));
            current = prev;
        }
        path.reverse();
        path
    }

    /// Furthest cell along `path` whose accumulated step cost fits `speed`.
    ///
    /// `path[0]` is the current cell and is returned when no step fits.
    #[must_use]
    pub fn advance_along(&self, path: &[GridPos], speed: Fixed) -> Option<GridPos> {
        let mut reached = *path.first()?;
        let mut spent = Fixed::ZERO;
        for pair in path.windows(2) {
            let (dx, dy) = pair[0].abs_delta(pair[1]);
            spent += self.metric.length(dx, dy);
            if spent > speed {
                break;
            }
            reached = pair[1];
        }
        Some(reached)
    }

    /// Check that no unit stands strictly between two cells.
    ///
    /// Uses Bresenham stepping; the endpoints themselves are not checked.
    #[must_use]
    pub fn has_line_of_sight(&self, from: GridPos, to: GridPos) -> bool {
        if !self.in_bounds(from) || !self.in_bounds(to) {
            return false;
        }

        let dx = (to.x - from.x).abs();
        let dy = (to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx - dy;

        let mut x = from.x;
        let mut y = from.y;

        loop {
            if x == to.x && y == to.y {
                return true;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }

            let cell = GridPos::new(x, y);
            if cell != to && self.is_occupied(cell) {
                return false;
            }
        }
    }
}

/// Reject boards with a zero or oversized side.
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(BattleError::InvalidRoster(format!(
            "board must have positive dimensions, got {width}x{height}"
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(BattleError::InvalidRoster(format!(
            "board {width}x{height} exceeds the {MAX_DIMENSION}x{MAX_DIMENSION} limit"
        )));
    }
    Ok(())
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    pos: GridPos,
    /// g_score + heuristic
    f_score: Fixed,
    g_score: Fixed,
    /// Tie-breaker for determinism: lower coordinates first.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; lower f_score must come out first.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Row-major key for deterministic ordering of in-bounds cells.
#[inline]
fn tie_breaker(pos: GridPos) -> u64 {
    ((pos.y as u64) << 32) | (pos.x as u32 as u64)
}
