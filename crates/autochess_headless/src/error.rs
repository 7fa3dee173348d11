//! Error type for the headless shell.

use std::path::PathBuf;

use autochess_core::error::BattleError;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// Engine rejected the roster or config.
    #[error(transparent)]
    Battle(#[from] BattleError),

    /// Scenario file does not exist and no preset has that name.
    #[error("Unknown scenario '{0}': not a preset name or an existing file")]
    UnknownScenario(String),

    /// Failed to read or write a file.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write to the output stream.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// Failed to parse a RON scenario.
    #[error("Failed to parse scenario {path}: {source}")]
    Parse {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Failed to encode a JSON report or frame.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to start batch worker threads.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Determinism check found diverging runs.
    #[error("Scenario '{scenario}' diverged: {unique} distinct stream hashes over {runs} runs")]
    NonDeterministic {
        /// Scenario name.
        scenario: String,
        /// Number of runs compared.
        runs: u32,
        /// Distinct hashes observed.
        unique: usize,
    },
}

impl HeadlessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for the headless shell.
pub type Result<T> = std::result::Result<T, HeadlessError>;
