//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! snapshots given an identical roster, config and seed.
//!
//! # Testing Strategy
//!
//! Replays and batch balance runs depend on battles being reproducible.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: All stats and distances are fixed-point
//!   via [`autochess_core::math::Fixed`].
//!
//! - **Map iteration order**: Units are stored in id order and every
//!   query returns ids sorted.
//!
//! - **System randomness**: Each battle owns a `ChaCha8Rng` seeded from
//!   [`BattleConfig::random_seed`].
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual rules (mitigation, pathing, targeting)
//! 2. **Property tests**: Random rosters must still replay identically
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use autochess_core::prelude::*;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Stream hash from each battle.
    pub hashes: Vec<u64>,
    /// Outcome of each battle.
    pub outcomes: Vec<BattleOutcome>,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
            && self.outcomes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes or outcomes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Unique hashes: {}\n\
                 Outcomes: {:?}\n\
                 All hashes: {:?}",
                self.num_battles,
                unique.len(),
                self.outcomes,
                self.hashes
            );
        }
    }
}

/// Run something multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute a state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Hash every snapshot a stream yields, in order.
///
/// Two streams with equal hashes yielded identical snapshot sequences.
#[must_use]
pub fn stream_hash(stream: &mut BattleStream) -> u64 {
    let mut hasher = DefaultHasher::new();
    stream.initial().state_hash().hash(&mut hasher);
    for snapshot in stream.by_ref() {
        snapshot.state_hash().hash(&mut hasher);
    }
    if let Some(result) = stream.result() {
        result.outcome.hash(&mut hasher);
    }
    hasher.finish()
}

/// Run a roster `runs` times to completion and compare snapshot streams.
///
/// # Panics
///
/// Panics if the roster or config is invalid.
#[must_use]
pub fn verify_battle_determinism(
    roster: &Roster,
    config: &BattleConfig,
    runs: usize,
) -> DeterminismResult {
    let mut ticks = 0;
    let hashes: Vec<u64> = (0..runs)
        .map(|_| {
            let mut stream =
                BattleStream::new(roster.clone(), config.clone()).expect("roster must be valid");
            let hash = stream_hash(&mut stream);
            ticks = stream.battle().tick();
            hash
        })
        .collect();

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks,
    }
}

/// Run N battles on scoped threads and collect their stream hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// or memory layout differences.
///
/// # Panics
///
/// Panics if the roster is invalid or a worker thread panics.
#[must_use]
pub fn run_parallel_battles_scoped(
    roster: &Roster,
    config: &BattleConfig,
    num_battles: usize,
) -> ParallelBattleResult {
    let runs: Vec<(u64, BattleOutcome)> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut stream = BattleStream::new(roster.clone(), config.clone())
                        .expect("roster must be valid");
                    let hash = stream_hash(&mut stream);
                    let outcome = stream
                        .result()
                        .map_or(BattleOutcome::Aborted, |r| r.outcome);
                    (hash, outcome)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    let (hashes, outcomes) = runs.into_iter().unzip();
    ParallelBattleResult {
        hashes,
        outcomes,
        num_battles,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if both runs match to the end, `Some(tick)` if they diverge
/// at that tick.
///
/// # Panics
///
/// Panics if `setup_fn` produces an invalid battle.
pub fn find_first_divergence<F>(setup_fn: F) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    loop {
        match (first.step(), second.step()) {
            (None, None) => return None,
            (Some(a), Some(b)) => {
                if a.state_hash() != b.state_hash() || first.state_hash() != second.state_hash() {
                    return Some(a.tick());
                }
            }
            (Some(s), None) | (None, Some(s)) => return Some(s.tick()),
        }
    }
}

/// Verify that a bincode round trip preserves every snapshot exactly.
///
/// # Panics
///
/// Panics if the roster or config is invalid.
#[must_use]
pub fn verify_serialization_determinism(roster: &Roster, config: &BattleConfig) -> bool {
    let mut stream =
        BattleStream::new(roster.clone(), config.clone()).expect("roster must be valid");
    stream.all(|snapshot| {
        let Ok(bytes) = snapshot.to_bytes() else {
            return false;
        };
        Snapshot::from_bytes(&bytes).is_ok_and(|restored| {
            restored == snapshot && restored.state_hash() == snapshot.state_hash()
        })
    })
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible rosters and configs.
pub mod strategies {
    use std::collections::BTreeSet;

    use autochess_core::prelude::*;
    use proptest::prelude::*;

    /// Board width used by generated rosters.
    pub const BOARD_WIDTH: u32 = 7;
    /// Board height used by generated rosters.
    pub const BOARD_HEIGHT: u32 = 8;

    /// Generate any archetype.
    pub fn arb_archetype() -> impl Strategy<Value = Archetype> {
        prop::sample::select(Archetype::ALL.to_vec())
    }

    /// Generate any distance metric.
    pub fn arb_metric() -> impl Strategy<Value = DistanceMetric> {
        prop_oneof![
            Just(DistanceMetric::Euclidean),
            Just(DistanceMetric::Chebyshev),
            Just(DistanceMetric::Manhattan),
        ]
    }

    /// Generate any acting-order tie-break rule.
    pub fn arb_tie_break() -> impl Strategy<Value = TieBreakRule> {
        prop_oneof![
            Just(TieBreakRule::SpeedThenId),
            Just(TieBreakRule::IdOnly),
            Just(TieBreakRule::RowMajor),
        ]
    }

    /// Generate a unit spec of any archetype and level at a fixed cell.
    pub fn arb_unit_spec(x: i32, y: i32) -> impl Strategy<Value = UnitSpec> {
        (arb_archetype(), 1u8..=3)
            .prop_map(move |(archetype, level)| UnitSpec::new(archetype, x, y).with_level(level))
    }

    /// Generate a valid roster with 1 to `max_per_team` units per team.
    ///
    /// Team A deploys in the top half and team B in the bottom half, so
    /// cells never overlap.
    pub fn arb_roster(max_per_team: usize) -> impl Strategy<Value = Roster> {
        let half = (BOARD_WIDTH * BOARD_HEIGHT / 2) as usize;
        let cells = || prop::collection::btree_set(0..half, 1..=max_per_team);
        (
            cells(),
            cells(),
            prop::collection::vec((arb_archetype(), 1u8..=3), max_per_team * 2),
        )
            .prop_map(|(cells_a, cells_b, kinds)| build_roster(&cells_a, &cells_b, &kinds))
    }

    fn build_roster(
        cells_a: &BTreeSet<usize>,
        cells_b: &BTreeSet<usize>,
        kinds: &[(Archetype, u8)],
    ) -> Roster {
        let width = BOARD_WIDTH as usize;
        let half_rows = (BOARD_HEIGHT / 2) as i32;
        let mut kinds = kinds.iter().copied().cycle();
        let mut roster = Roster::new(BOARD_WIDTH, BOARD_HEIGHT);

        for (team, cells, row_offset) in [(Team::A, cells_a, 0), (Team::B, cells_b, half_rows)] {
            for &cell in cells {
                let (archetype, level) = kinds.next().unwrap_or((Archetype::Warrior, 1));
                let x = (cell % width) as i32;
                let y = (cell / width) as i32 + row_offset;
                roster = roster.with_unit(team, UnitSpec::new(archetype, x, y).with_level(level));
            }
        }
        roster
    }

    /// Generate a valid config with a bounded tick budget.
    pub fn arb_config() -> impl Strategy<Value = BattleConfig> {
        (
            arb_metric(),
            arb_tie_break(),
            any::<u64>(),
            50u64..=300,
            any::<bool>(),
        )
            .prop_map(|(metric, tie_break, seed, max_ticks, los)| {
                BattleConfig::default()
                    .with_metric(metric)
                    .with_tie_break(tie_break)
                    .with_seed(seed)
                    .with_max_ticks(max_ticks)
                    .with_line_of_sight(los)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel, seeded, skirmish};

    #[test]
    fn test_identical_battles_replay_identically() {
        verify_battle_determinism(&skirmish(), &seeded(7), 3).assert_deterministic();
    }

    #[test]
    fn test_battle_state_hash_matches_after_fixed_ticks() {
        let roster = skirmish();
        let result = verify_determinism(
            4,
            40,
            || Battle::new(&roster, seeded(9)).expect("valid roster"),
            |battle| {
                let _ = battle.step();
            },
            Battle::state_hash,
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_parallel_battles_match() {
        run_parallel_battles_scoped(&skirmish(), &seeded(11), 4).assert_deterministic();
    }

    #[test]
    fn test_no_divergence_between_runs() {
        let roster = duel(Archetype::Archer, Archetype::Assassin);
        let divergence = find_first_divergence(|| {
            Battle::new(&roster, seeded(3)).expect("valid roster")
        });
        assert_eq!(divergence, None);
    }

    #[test]
    fn test_different_seeds_can_diverge() {
        let roster = skirmish();
        let hashes: Vec<u64> = (0..8)
            .map(|seed| {
                let mut stream =
                    BattleStream::new(roster.clone(), seeded(seed)).expect("valid roster");
                stream_hash(&mut stream)
            })
            .collect();
        let mut unique = hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        assert!(unique.len() > 1, "seeds never changed the battle: {hashes:?}");
    }

    #[test]
    fn test_serialization_round_trip() {
        assert!(verify_serialization_determinism(&skirmish(), &seeded(5)));
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1u32, "a")), compute_hash(&(1u32, "a")));
    }
}
