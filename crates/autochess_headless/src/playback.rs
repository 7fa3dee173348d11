//! Real-time playback pacing.
//!
//! The engine has no notion of wall-clock time; playback decides how many
//! snapshots to show per second. Speed doubles or halves between 1 and 40
//! ticks per second, and playback can be paused.

use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Slowest playback speed.
pub const MIN_TICKS_PER_SECOND: u32 = 1;
/// Fastest playback speed.
pub const MAX_TICKS_PER_SECOND: u32 = 40;
/// Speed playback starts at.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 10;

/// A control typed by the viewer while a battle plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Double the speed.
    Faster,
    /// Halve the speed.
    Slower,
    /// Toggle pause.
    TogglePause,
    /// Restart from tick 1.
    Restart,
    /// Stop the battle.
    Quit,
}

impl PlaybackCommand {
    /// Parse one input line: `+`, `-`, `p`, `r` or `q`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "+" | "f" => Some(Self::Faster),
            "-" | "s" => Some(Self::Slower),
            "p" | "" => Some(Self::TogglePause),
            "r" => Some(Self::Restart),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Playback speed and pause state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    ticks_per_second: u32,
    paused: bool,
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_SECOND)
    }
}

impl Pacing {
    /// Start at the given speed, clamped to the allowed range.
    #[must_use]
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            ticks_per_second: ticks_per_second.clamp(MIN_TICKS_PER_SECOND, MAX_TICKS_PER_SECOND),
            paused: false,
        }
    }

    /// Current speed.
    #[must_use]
    pub const fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Whether playback is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Double the speed, up to the maximum.
    pub fn faster(&mut self) {
        self.ticks_per_second = (self.ticks_per_second * 2).min(MAX_TICKS_PER_SECOND);
    }

    /// Halve the speed, down to the minimum.
    pub fn slower(&mut self) {
        self.ticks_per_second = (self.ticks_per_second / 2).max(MIN_TICKS_PER_SECOND);
    }

    /// Pause or resume.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Wall-clock time between two frames.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.ticks_per_second
    }

    /// Apply a speed or pause command. Restart and quit are left to the
    /// caller and do not change the pacing.
    pub fn apply(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Faster => self.faster(),
            PlaybackCommand::Slower => self.slower(),
            PlaybackCommand::TogglePause => self.toggle_pause(),
            PlaybackCommand::Restart | PlaybackCommand::Quit => return,
        }
        debug!(
            tps = self.ticks_per_second,
            paused = self.paused,
            "Playback changed"
        );
    }
}

/// Read playback commands from stdin on a background thread.
///
/// The thread ends when stdin closes. Unknown lines are ignored.
#[must_use]
pub fn spawn_stdin_controls() -> Receiver<PlaybackCommand> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if let Some(command) = PlaybackCommand::parse(&line) {
                if tx.send(command).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_doubles_and_halves_within_bounds() {
        let mut pacing = Pacing::default();
        assert_eq!(pacing.ticks_per_second(), 10);

        pacing.faster();
        assert_eq!(pacing.ticks_per_second(), 20);
        pacing.faster();
        pacing.faster();
        assert_eq!(pacing.ticks_per_second(), MAX_TICKS_PER_SECOND);

        for _ in 0..10 {
            pacing.slower();
        }
        assert_eq!(pacing.ticks_per_second(), MIN_TICKS_PER_SECOND);
    }

    #[test]
    fn test_new_clamps() {
        assert_eq!(Pacing::new(0).ticks_per_second(), 1);
        assert_eq!(Pacing::new(500).ticks_per_second(), 40);
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(Pacing::new(10).frame_interval(), Duration::from_millis(100));
        assert_eq!(Pacing::new(40).frame_interval(), Duration::from_millis(25));
    }

    #[test]
    fn test_commands() {
        let mut pacing = Pacing::default();
        pacing.apply(PlaybackCommand::TogglePause);
        assert!(pacing.is_paused());
        pacing.apply(PlaybackCommand::Faster);
        assert_eq!(pacing.ticks_per_second(), 20);

        let before = pacing;
        pacing.apply(PlaybackCommand::Quit);
        pacing.apply(PlaybackCommand::Restart);
        assert_eq!(pacing, before);
        assert_eq!(PlaybackCommand::parse(" + "), Some(PlaybackCommand::Faster));
        assert_eq!(PlaybackCommand::parse("x"), None);
    }
}
