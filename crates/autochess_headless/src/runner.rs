//! Single-battle runner.
//!
//! Drives a [`BattleStream`] and writes each snapshot as ASCII art or as a
//! JSON line. In real-time mode frames are paced and the viewer can change
//! speed, pause, restart or quit through [`PlaybackCommand`]s.

use std::io::Write;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use autochess_core::prelude::*;
use tracing::{debug, info};

use crate::ascii::{render_result, render_with_meter, AsciiConfig};
use crate::error::Result;
use crate::frame::Frame;
use crate::meter::DamageMeter;
use crate::playback::{Pacing, PlaybackCommand};
use crate::scenario::Scenario;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// How snapshots are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Framed grid per tick.
    #[default]
    Ascii,
    /// One JSON frame per line.
    Json,
    /// Only the final result.
    Summary,
}

/// Options for [`run_scenario`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Output format.
    pub format: OutputFormat,
    /// Pace frames in wall-clock time.
    pub realtime: bool,
    /// Initial playback speed.
    pub pacing: Pacing,
    /// ASCII rendering options.
    pub ascii: AsciiConfig,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Ascii,
            realtime: false,
            pacing: Pacing::default(),
            ascii: AsciiConfig::default(),
        }
    }
}

/// Outcome of handling viewer input between frames.
enum Control {
    Continue,
    Restart,
}

/// Run a scenario to completion, writing frames to `out`.
///
/// # Errors
///
/// Returns an error if the scenario is invalid or writing fails.
pub fn run_scenario<W: Write>(
    scenario: &Scenario,
    options: &RunOptions,
    out: &mut W,
    controls: Option<&Receiver<PlaybackCommand>>,
) -> Result<BattleResult> {
    let mut stream = scenario.stream()?;
    let mut meter = DamageMeter::new();
    let mut pacing = options.pacing;

    info!(
        scenario = %scenario.name,
        units = scenario.roster.unit_count(),
        seed = scenario.config.random_seed,
        "Running scenario"
    );

    write_frame(out, options, stream.initial(), &meter)?;

    loop {
        let Some(snapshot) = stream.next() else {
            break;
        };
        meter.record(&snapshot);
        write_frame(out, options, &snapshot, &meter)?;

        if options.realtime {
            out.flush()?;
            thread::sleep(pacing.frame_interval());
            if let Some(rx) = controls {
                if let Control::Restart = handle_controls(rx, &mut pacing, &stream) {
                    debug!("Restarting playback");
                    stream.restart()?;
                    meter.reset();
                    write_frame(out, options, stream.initial(), &meter)?;
                }
            }
        }
    }

    let result = stream.result().cloned().ok_or_else(|| {
        BattleError::InvalidState("stream ended without a result".to_string())
    })?;

    match options.format {
        OutputFormat::Json => {}
        OutputFormat::Ascii | OutputFormat::Summary => {
            writeln!(out, "{}", render_result(&result))?;
            for (id, entry) in meter.ranking().into_iter().take(5) {
                writeln!(
                    out,
                    "  #{id:<2} damage {:>7.1}  healing {:>6.1}  kills {}",
                    entry.damage.to_num::<f64>(),
                    entry.healing.to_num::<f64>(),
                    entry.kills
                )?;
            }
        }
    }
    out.flush()?;
    Ok(result)
}

fn write_frame<W: Write>(
    out: &mut W,
    options: &RunOptions,
    snapshot: &Snapshot,
    meter: &DamageMeter,
) -> Result<()> {
    match options.format {
        OutputFormat::Ascii => {
            if options.realtime && options.ascii.use_color {
                out.write_all(CLEAR_SCREEN.as_bytes())?;
            }
            let text = render_with_meter(snapshot, Some(meter), &options.ascii);
            writeln!(out, "{text}")?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &Frame::from(snapshot))?;
            writeln!(out)?;
        }
        OutputFormat::Summary => {}
    }
    Ok(())
}

/// Drain pending commands; blocks while paused.
fn handle_controls(
    rx: &Receiver<PlaybackCommand>,
    pacing: &mut Pacing,
    stream: &BattleStream,
) -> Control {
    loop {
        let command = if pacing.is_paused() {
            match rx.recv_timeout(PAUSE_POLL) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    pacing.toggle_pause();
                    return Control::Continue;
                }
            }
        } else {
            match rx.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                    return Control::Continue
                }
            }
        };

        match command {
            PlaybackCommand::Restart => return Control::Restart,
            PlaybackCommand::Quit => {
                stream.abort_handle().abort();
                return Control::Continue;
            }
            other => pacing.apply(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::preset;
    use std::sync::mpsc;

    #[test]
    fn test_json_lines_one_per_tick() {
        let scenario = preset("duel").unwrap();
        let options = RunOptions {
            format: OutputFormat::Json,
            ..RunOptions::default()
        };
        let mut out = Vec::new();
        let result = run_scenario(&scenario, &options, &mut out, None).unwrap();

        let text = String::from_utf8(out).unwrap();
        let frames: Vec<Frame> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        // Initial frame plus one per tick
        assert_eq!(frames.len() as u64, result.ticks + 1);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.tick, i as u64);
        }
    }

    #[test]
    fn test_summary_only_prints_result() {
        let scenario = preset("duel").unwrap();
        let options = RunOptions {
            format: OutputFormat::Summary,
            ..RunOptions::default()
        };
        let mut out = Vec::new();
        run_scenario(&scenario, &options, &mut out, None).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("Tick"));
        assert!(text.lines().next().is_some_and(|line| line.contains(" after ")));
    }

    #[test]
    fn test_quit_aborts_realtime_playback() {
        let scenario = preset("level3").unwrap();
        let options = RunOptions {
            format: OutputFormat::Summary,
            realtime: true,
            pacing: Pacing::new(40),
            ascii: AsciiConfig::plain(),
        };
        let (tx, rx) = mpsc::channel();
        tx.send(PlaybackCommand::Quit).unwrap();

        let mut out = Vec::new();
        let result = run_scenario(&scenario, &options, &mut out, Some(&rx)).unwrap();
        assert_eq!(result.outcome, BattleOutcome::Aborted);
        assert_eq!(result.ticks, 1);
    }
}
