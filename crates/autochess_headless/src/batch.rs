//! Batch battle runner for balance testing.
//!
//! Runs one scenario under many seeds in parallel using rayon and collects
//! win rates and durations.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use autochess_core::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{HeadlessError, Result};
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of battles to run.
    pub battle_count: u32,
    /// Worker threads (0 = rayon default).
    pub parallel: u32,
    /// Seed of the first battle; battle `i` uses `seed_start + i`.
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            battle_count: 100,
            parallel: 0,
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Run `battle_count` battles with default settings.
    #[must_use]
    pub fn new(battle_count: u32) -> Self {
        Self {
            battle_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_parallel(mut self, parallel: u32) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Outcome of one battle in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleRecord {
    /// Seed the battle ran with.
    pub seed: u64,
    /// How it ended.
    pub outcome: BattleOutcome,
    /// Why it ended.
    pub end_reason: EndReason,
    /// Ticks resolved.
    pub ticks: u64,
    /// Surviving health of team A.
    pub health_a: f64,
    /// Surviving health of team B.
    pub health_b: f64,
}

impl BattleRecord {
    fn from_result(seed: u64, result: &BattleResult) -> Self {
        Self {
            seed,
            outcome: result.outcome,
            end_reason: result.end_reason,
            ticks: result.ticks,
            health_a: result.health_a.to_num(),
            health_b: result.health_b.to_num(),
        }
    }
}

/// Aggregate statistics for a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Battles completed.
    pub total: u32,
    /// Wins for team A.
    pub wins_a: u32,
    /// Wins for team B.
    pub wins_b: u32,
    /// Draws (timeouts or mutual elimination).
    pub draws: u32,
    /// Battles that ended by timeout.
    pub timeouts: u32,
    /// Average ticks to resolution.
    pub avg_ticks: f64,
    /// Shortest battle.
    pub min_ticks: u64,
    /// Longest battle.
    pub max_ticks: u64,
}

impl BatchSummary {
    /// Calculate summary from a list of records.
    #[must_use]
    pub fn from_records(records: &[BattleRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total: records.len() as u32,
            min_ticks: u64::MAX,
            ..Self::default()
        };
        let mut tick_sum = 0u64;
        for record in records {
            match record.outcome {
                BattleOutcome::WinA => summary.wins_a += 1,
                BattleOutcome::WinB => summary.wins_b += 1,
                BattleOutcome::Draw | BattleOutcome::Aborted => summary.draws += 1,
            }
            if record.end_reason == EndReason::Timeout {
                summary.timeouts += 1;
            }
            tick_sum += record.ticks;
            summary.min_ticks = summary.min_ticks.min(record.ticks);
            summary.max_ticks = summary.max_ticks.max(record.ticks);
        }
        summary.avg_ticks = tick_sum as f64 / f64::from(summary.total);
        summary
    }

    /// Win rate for team A (0.0 to 1.0).
    #[must_use]
    pub fn win_rate_a(&self) -> f64 {
        if self.total == 0 {
            return 0.5;
        }
        f64::from(self.wins_a) / f64::from(self.total)
    }

    /// Win rate for team B (0.0 to 1.0).
    #[must_use]
    pub fn win_rate_b(&self) -> f64 {
        if self.total == 0 {
            return 0.5;
        }
        f64::from(self.wins_b) / f64::from(self.total)
    }

    /// Check if the matchup is balanced (team A win rate within range).
    #[must_use]
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_a();
        rate >= min_rate && rate <= max_rate
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name.
    pub scenario: String,
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual battles, in seed order.
    pub battles: Vec<BattleRecord>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| HeadlessError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| HeadlessError::io(path, e))
    }

    /// Load results from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| HeadlessError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Progress tracking for batch runs.
#[derive(Debug)]
pub struct BatchProgress {
    total: u32,
    completed: AtomicU32,
    wins_a: AtomicU32,
    wins_b: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            wins_a: AtomicU32::new(0),
            wins_b: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed battle and return the new completion count.
    pub fn record_completion(&self, outcome: BattleOutcome) -> u32 {
        match outcome {
            BattleOutcome::WinA => {
                self.wins_a.fetch_add(1, Ordering::Relaxed);
            }
            BattleOutcome::WinB => {
                self.wins_b.fetch_add(1, Ordering::Relaxed);
            }
            BattleOutcome::Draw | BattleOutcome::Aborted => {}
        }
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current completion count.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completion percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Estimated time remaining.
    #[must_use]
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.start_time.elapsed();
        let per_battle = elapsed.as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_battle * f64::from(remaining))
    }

    /// Win rates of team A and team B so far.
    #[must_use]
    pub fn current_win_rates(&self) -> (f64, f64) {
        let completed = f64::from(self.current().max(1));
        (
            f64::from(self.wins_a.load(Ordering::Relaxed)) / completed,
            f64::from(self.wins_b.load(Ordering::Relaxed)) / completed,
        )
    }

    /// Log progress.
    pub fn report(&self) {
        let (rate_a, rate_b) = self.current_win_rates();
        let eta = self.eta();
        info!(
            completed = self.current(),
            total = self.total,
            percent = format!("{:.1}", self.percentage()),
            eta = format!("{}m {}s", eta.as_secs() / 60, eta.as_secs() % 60),
            win_rate_a = format!("{:.1}%", rate_a * 100.0),
            win_rate_b = format!("{:.1}%", rate_b * 100.0),
            "Batch progress"
        );
    }
}

fn run_single(scenario: &Scenario, seed: u64) -> Result<BattleRecord> {
    let config = scenario.config.clone().with_seed(seed);
    let mut battle = Battle::new(&scenario.roster, config)?;
    let result = battle.run_to_end();
    Ok(BattleRecord::from_result(seed, result))
}

/// Run a batch of battles.
///
/// # Errors
///
/// Returns the first roster or config error; every seed shares them, so a
/// failure on one means all would fail.
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> Result<BatchResults> {
    // Fail fast before spawning workers
    scenario.roster.validate()?;
    scenario.config.validate()?;

    let start = Instant::now();
    let progress = BatchProgress::new(config.battle_count);

    info!(
        scenario = %scenario.name,
        battles = config.battle_count,
        seed_start = config.seed_start,
        parallel = config.parallel,
        "Starting batch run"
    );

    let run_all = || -> Result<Vec<BattleRecord>> {
        (0..config.battle_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                let record = run_single(scenario, seed).map_err(|e| {
                    warn!(seed, error = %e, "Battle failed");
                    e
                })?;

                let completed = progress.record_completion(record.outcome);
                if completed % 10 == 0 {
                    debug!("Progress: {}/{}", completed, config.battle_count);
                }
                if completed % 100 == 0 {
                    progress.report();
                }
                Ok(record)
            })
            .collect()
    };

    let battles = if config.parallel > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()?;
        pool.install(run_all)?
    } else {
        run_all()?
    };

    let summary = BatchSummary::from_records(&battles);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({:.1} battles/sec)",
        battles.len(),
        duration_seconds,
        battles.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    Ok(BatchResults {
        scenario: scenario.name.clone(),
        config,
        battles,
        summary,
        duration_seconds,
    })
}

/// Hash of every snapshot a fresh stream yields, plus the outcome.
///
/// # Errors
///
/// Returns the engine's roster or config error.
pub fn stream_hash(scenario: &Scenario) -> Result<u64> {
    let mut stream = scenario.stream()?;
    let mut hasher = DefaultHasher::new();
    stream.initial().state_hash().hash(&mut hasher);
    for snapshot in stream.by_ref() {
        snapshot.state_hash().hash(&mut hasher);
    }
    if let Some(result) = stream.result() {
        result.outcome.hash(&mut hasher);
    }
    Ok(hasher.finish())
}

/// Verify determinism by running the same seed several times.
///
/// # Errors
///
/// Returns [`HeadlessError::NonDeterministic`] when the runs disagree, or
/// the engine's roster or config error.
pub fn verify_determinism(scenario: &Scenario, runs: u32) -> Result<u64> {
    let hashes = (0..runs.max(1))
        .map(|_| stream_hash(scenario))
        .collect::<Result<Vec<u64>>>()?;

    let mut unique = hashes.clone();
    unique.sort_unstable();
    unique.dedup();

    if unique.len() == 1 {
        info!(scenario = %scenario.name, runs, hash = hashes[0], "Determinism verified");
        Ok(hashes[0])
    } else {
        Err(HeadlessError::NonDeterministic {
            scenario: scenario.name.clone(),
            runs,
            unique: unique.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::preset;

    #[test]
    fn test_summary_counts() {
        let record = |outcome, end_reason, ticks| BattleRecord {
            seed: 0,
            outcome,
            end_reason,
            ticks,
            health_a: 0.0,
            health_b: 0.0,
        };
        let summary = BatchSummary::from_records(&[
            record(BattleOutcome::WinA, EndReason::Elimination, 100),
            record(BattleOutcome::WinA, EndReason::Elimination, 200),
            record(BattleOutcome::WinB, EndReason::Elimination, 300),
            record(BattleOutcome::Draw, EndReason::Timeout, 400),
        ]);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.wins_a, 2);
        assert_eq!(summary.wins_b, 1);
        assert_eq!(summary.draws, 1);
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.min_ticks, 100);
        assert_eq!(summary.max_ticks, 400);
        assert!((summary.avg_ticks - 250.0).abs() < f64::EPSILON);
        assert!((summary.win_rate_a() - 0.5).abs() < f64::EPSILON);
        assert!(summary.is_balanced(0.4, 0.6));
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_records(&[]);
        assert_eq!(summary.total, 0);
        assert!((summary.win_rate_a() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_batch_is_seed_ordered_and_reproducible() {
        let scenario = preset("duel").unwrap();
        let config = BatchConfig::new(6).with_seed(10).with_parallel(2);

        let first = run_batch(&scenario, config.clone()).unwrap();
        let second = run_batch(&scenario, config).unwrap();

        let seeds: Vec<u64> = first.battles.iter().map(|b| b.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13, 14, 15]);
        assert_eq!(first.battles, second.battles);
        assert_eq!(first.summary.total, 6);
    }

    #[test]
    fn test_invalid_scenario_fails_fast() {
        let mut scenario = preset("duel").unwrap();
        scenario.roster.teams.remove(&Team::B);
        assert!(matches!(
            run_batch(&scenario, BatchConfig::new(3)),
            Err(HeadlessError::Battle(BattleError::InvalidRoster(_)))
        ));
    }

    #[test]
    fn test_verify_presets() {
        for name in ["duel", "level1", "level5"] {
            let scenario = preset(name).unwrap();
            assert!(verify_determinism(&scenario, 3).is_ok(), "{name}");
        }
    }
}
