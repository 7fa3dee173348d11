//! Headless auto-chess battle runner.
//!
//! # Usage
//!
//! ```bash
//! # Print every tick of a preset as ASCII
//! autochess run duel
//!
//! # Real-time playback; type +, -, p, r or q and Enter to control it
//! autochess run level4 --realtime
//!
//! # Balance run over 1000 seeds
//! autochess batch level5 --count 1000 --output results/level5.json
//!
//! # Verify a seed replays identically
//! autochess verify rosters/skirmish.ron --seed 7 --runs 10
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use autochess_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    playback::{spawn_stdin_controls, Pacing, DEFAULT_TICKS_PER_SECOND},
    runner::{run_scenario, OutputFormat, RunOptions},
    scenario::{presets, Scenario},
    AsciiConfig, Result,
};

#[derive(Parser)]
#[command(name = "autochess")]
#[command(about = "Headless auto-chess battle runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr (repeat for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single battle and print its snapshots
    Run {
        /// Preset name or scenario RON file
        #[arg(default_value = "duel")]
        scenario: String,

        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the tick budget
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Ascii)]
        format: OutputFormat,

        /// Pace playback in real time
        #[arg(long)]
        realtime: bool,

        /// Initial playback speed in ticks per second (1-40)
        #[arg(long, default_value_t = DEFAULT_TICKS_PER_SECOND)]
        tps: u32,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Run one scenario under many seeds for balance testing
    Batch {
        /// Preset name or scenario RON file
        scenario: String,

        /// Number of battles to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Write the full JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Preset name or scenario RON file
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// List built-in scenarios
    Presets,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr (stdout is for frames); RUST_LOG overrides -v
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(filter)
        .init();

    let outcome = match cli.command {
        Commands::Run {
            scenario,
            seed,
            max_ticks,
            format,
            realtime,
            tps,
            no_color,
        } => cmd_run(&scenario, seed, max_ticks, format, realtime, tps, no_color),
        Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            output,
        } => cmd_batch(&scenario, count, parallel, seed, output),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
        Commands::Presets => {
            cmd_presets();
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Run a single battle
#[allow(clippy::fn_params_excessive_bools)]
fn cmd_run(
    name: &str,
    seed: Option<u64>,
    max_ticks: Option<u64>,
    format: OutputFormat,
    realtime: bool,
    tps: u32,
    no_color: bool,
) -> Result<()> {
    let mut scenario = Scenario::resolve(name)?;
    if let Some(seed) = seed {
        scenario = scenario.with_seed(seed);
    }
    if let Some(max_ticks) = max_ticks {
        scenario = scenario.with_max_ticks(max_ticks);
    }

    let use_color = !no_color && std::io::stdout().is_terminal();
    let options = RunOptions {
        format,
        realtime,
        pacing: Pacing::new(tps),
        ascii: AsciiConfig {
            use_color,
            ..AsciiConfig::default()
        },
    };

    let controls = realtime.then(spawn_stdin_controls);
    if realtime {
        tracing::info!("Playback controls: + faster, - slower, p pause, r restart, q quit");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_scenario(&scenario, &options, &mut out, controls.as_ref())?;
    Ok(())
}

/// Run a batch of battles for balance testing
fn cmd_batch(
    name: &str,
    count: u32,
    parallel: u32,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    let scenario = Scenario::resolve(name)?;
    let config = BatchConfig::new(count)
        .with_seed(seed)
        .with_parallel(parallel);

    let results = run_batch(&scenario, config)?;

    if let Some(path) = &output {
        results.save(path)?;
        tracing::info!(path = %path.display(), "Saved batch results");
    }

    let summary = &results.summary;
    println!("{}", "=".repeat(50));
    println!("BATCH COMPLETE: {}", results.scenario);
    println!("{}", "=".repeat(50));
    println!("Battles played: {}", summary.total);
    println!(
        "Team A wins:    {} ({:.1}%)",
        summary.wins_a,
        summary.win_rate_a() * 100.0
    );
    println!(
        "Team B wins:    {} ({:.1}%)",
        summary.wins_b,
        summary.win_rate_b() * 100.0
    );
    println!("Draws:          {} ({} timeouts)", summary.draws, summary.timeouts);
    println!(
        "Ticks:          avg {:.1}, min {}, max {}",
        summary.avg_ticks, summary.min_ticks, summary.max_ticks
    );
    println!("Duration:       {:.2}s", results.duration_seconds);
    Ok(())
}

/// Verify determinism of one seed
fn cmd_verify(name: &str, seed: u64, runs: u32) -> Result<()> {
    let scenario = Scenario::resolve(name)?.with_seed(seed);
    let hash = verify_determinism(&scenario, runs)?;
    println!(
        "{}: {} runs with seed {} matched (stream hash {hash:016x})",
        scenario.name, runs, seed
    );
    Ok(())
}

/// List built-in scenarios
fn cmd_presets() {
    for scenario in presets() {
        println!(
            "{:<8} {:>2}v{:<2} {}",
            scenario.name,
            scenario.roster.team(autochess_core::unit::Team::A).len(),
            scenario.roster.team(autochess_core::unit::Team::B).len(),
            scenario.description
        );
    }
}
