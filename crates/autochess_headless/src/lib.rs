//! Headless battle runner for terminal playback, balance runs and CI.
//!
//! This crate is a consumer of the `autochess_core` snapshot stream:
//!
//! - **Playback**: render each tick as ASCII art, paced in real time
//! - **Scripting**: emit one JSON frame per tick on stdout
//! - **Balance testing**: run one scenario under many seeds in parallel
//! - **CI verification**: check that a seed replays identically
//!
//! Logs go to stderr; stdout carries frames and reports.
//!
//! # Example
//!
//! ```bash
//! # Watch a preset at 20 ticks per second
//! cargo run -p autochess_headless -- run level3 --realtime --tps 20
//!
//! # JSON frames for a custom roster
//! cargo run -p autochess_headless -- run rosters/skirmish.ron --format json
//!
//! # Win rates over 500 seeds
//! cargo run -p autochess_headless -- batch level5 --count 500 --output results.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ascii;
pub mod batch;
pub mod error;
pub mod frame;
pub mod meter;
pub mod playback;
pub mod runner;
pub mod scenario;

pub use ascii::{render_ascii, AsciiConfig};
pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary};
pub use error::{HeadlessError, Result};
pub use frame::Frame;
pub use meter::DamageMeter;
pub use playback::{Pacing, PlaybackCommand};
pub use runner::{run_scenario, OutputFormat, RunOptions};
pub use scenario::Scenario;
