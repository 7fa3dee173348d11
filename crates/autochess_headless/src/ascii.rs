//! ASCII battle renderer.
//!
//! Draws a snapshot as a framed grid for terminal playback. Team A units
//! use the archetype symbol in upper case, team B in lower case.

use std::fmt::Write as _;

use autochess_core::prelude::*;

use crate::frame::describe_event;
use crate::meter::DamageMeter;

/// ASCII rendering configuration.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct AsciiConfig {
    /// Show a health bar per living unit.
    pub show_health: bool,
    /// Show the symbol legend.
    pub show_legend: bool,
    /// List the events of the tick under the grid.
    pub show_events: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
    /// Width of health bars in characters.
    pub bar_width: usize,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_health: true,
            show_legend: true,
            show_events: true,
            use_color: true,
            bar_width: 10,
        }
    }
}

impl AsciiConfig {
    /// Plain text, no color, grid only.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            show_health: false,
            show_legend: false,
            show_events: false,
            use_color: false,
            bar_width: 10,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Grid character for a unit.
#[must_use]
pub fn unit_char(archetype: Archetype, team: Team) -> char {
    let base = archetype.symbol();
    match team {
        Team::A => base.to_ascii_uppercase(),
        Team::B => base.to_ascii_lowercase(),
    }
}

const fn team_color(team: Team) -> &'static str {
    match team {
        Team::A => colors::BLUE,
        Team::B => colors::YELLOW,
    }
}

fn health_color(fraction: f64) -> &'static str {
    if fraction > 0.66 {
        colors::GREEN
    } else if fraction > 0.33 {
        colors::YELLOW
    } else {
        colors::RED
    }
}

fn paint(out: &mut String, config: &AsciiConfig, color: &str, text: &str) {
    if config.use_color {
        out.push_str(color);
        out.push_str(text);
        out.push_str(colors::RESET);
    } else {
        out.push_str(text);
    }
}

/// Render a snapshot as ASCII art.
#[must_use]
pub fn render_ascii(snapshot: &Snapshot, config: &AsciiConfig) -> String {
    render_with_meter(snapshot, None, config)
}

/// Render a snapshot, appending damage meter totals when given.
#[must_use]
pub fn render_with_meter(
    snapshot: &Snapshot,
    meter: Option<&DamageMeter>,
    config: &AsciiConfig,
) -> String {
    let mut out = String::new();
    let width = snapshot.width() as usize;

    let header = format!(
        "Tick {:>4} | A: {} alive | B: {} alive",
        snapshot.tick(),
        snapshot.living_count(Team::A),
        snapshot.living_count(Team::B)
    );
    paint(&mut out, config, colors::BOLD, &header);
    out.push('\n');

    let border = format!("+{}+\n", "-".repeat(width * 2 + 1));
    out.push_str(&border);
    for y in 0..snapshot.height() as i32 {
        out.push_str("| ");
        for x in 0..snapshot.width() as i32 {
            match snapshot.occupant(GridPos::new(x, y)) {
                Some(unit) => {
                    let ch = unit_char(unit.archetype(), unit.team()).to_string();
                    paint(&mut out, config, team_color(unit.team()), &ch);
                }
                None => paint(&mut out, config, colors::GRAY, "."),
            }
            out.push(' ');
        }
        out.push_str("|\n");
    }
    out.push_str(&border);

    if config.show_health {
        for unit in snapshot.units().iter().filter(|u| u.is_alive()) {
            write_health_line(&mut out, unit, meter, config);
        }
    }

    if config.show_legend {
        out.push_str("Legend: ");
        for archetype in Archetype::ALL {
            let _ = write!(out, "{}={} ", archetype.symbol(), archetype.name());
        }
        out.push_str("(UPPER=A lower=B)\n");
    }

    if config.show_events {
        for event in snapshot.events() {
            let _ = writeln!(out, "  {}", describe_event(event));
        }
    }

    out
}

fn write_health_line(out: &mut String, unit: &Unit, meter: Option<&DamageMeter>, config: &AsciiConfig) {
    let fraction: f64 = unit.health_fraction().to_num();
    let filled = ((fraction * config.bar_width as f64).ceil() as usize).min(config.bar_width);

    let _ = write!(
        out,
        "{} #{:<2} {:<8} ",
        unit_char(unit.archetype(), unit.team()),
        unit.id(),
        unit.archetype().name()
    );
    out.push('[');
    paint(out, config, health_color(fraction), &"#".repeat(filled));
    out.push_str(&" ".repeat(config.bar_width - filled));
    let _ = write!(
        out,
        "] {:>5.1}/{:<5.1}",
        unit.health().to_num::<f64>(),
        unit.max_health().to_num::<f64>()
    );
    if let Some(meter) = meter {
        let entry = meter.get(unit.id());
        let _ = write!(out, " dmg {:>6.1}", entry.damage.to_num::<f64>());
    }
    if !unit.statuses().is_empty() {
        let names: Vec<&str> = unit.statuses().iter().map(|s| s.effect.name()).collect();
        let _ = write!(out, " [{}]", names.join(", "));
    }
    out.push('\n');
}

/// One-line summary of a finished battle.
#[must_use]
pub fn render_result(result: &BattleResult) -> String {
    let winner = match result.outcome {
        BattleOutcome::WinA => "Team A wins",
        BattleOutcome::WinB => "Team B wins",
        BattleOutcome::Draw => "Draw",
        BattleOutcome::Aborted => "Aborted",
    };
    format!(
        "{winner} after {} ticks ({:?}); surviving health A {:.1}, B {:.1}",
        result.ticks,
        result.end_reason,
        result.health_a.to_num::<f64>(),
        result.health_b.to_num::<f64>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initial() -> Snapshot {
        let roster = Roster::new(3, 2)
            .with_unit(Team::A, UnitSpec::new(Archetype::Tank, 0, 0))
            .with_unit(Team::B, UnitSpec::new(Archetype::Archer, 2, 1));
        BattleStream::new(roster, BattleConfig::default())
            .unwrap()
            .initial()
            .clone()
    }

    #[test]
    fn test_plain_grid() {
        let text = render_ascii(&initial(), &AsciiConfig::plain());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Tick    0 | A: 1 alive | B: 1 alive");
        assert_eq!(lines[1], "+-------+");
        assert_eq!(lines[2], "| T . . |");
        assert_eq!(lines[3], "| . . r |");
        assert_eq!(lines[4], "+-------+");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_health_bars_full_at_start() {
        let config = AsciiConfig {
            use_color: false,
            show_legend: false,
            ..AsciiConfig::default()
        };
        let text = render_ascii(&initial(), &config);
        assert!(text.contains("T #1  Tank     [##########] 150.0/150.0"));
    }

    #[test]
    fn test_unit_chars() {
        assert_eq!(unit_char(Archetype::Assassin, Team::A), 'X');
        assert_eq!(unit_char(Archetype::Assassin, Team::B), 'x');
    }
}
