//! JSON-lines frame output.
//!
//! Core snapshots serialize fixed-point values as raw bits so replays stay
//! exact. Frames are the display form: floats for humans and scripts, one
//! JSON object per tick.

use autochess_core::prelude::*;
use serde::{Deserialize, Serialize};

/// One unit as shown to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFrame {
    /// Unit id.
    pub id: UnitId,
    /// Team label.
    pub team: String,
    /// Archetype name.
    pub archetype: String,
    /// Star level.
    pub level: u8,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Current health.
    pub health: f64,
    /// Maximum health.
    pub max_health: f64,
    /// Current mana.
    pub mana: f64,
    /// Whether the unit is alive.
    pub alive: bool,
    /// Active status names.
    pub statuses: Vec<String>,
}

impl From<&Unit> for UnitFrame {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id(),
            team: unit.team().label().to_string(),
            archetype: unit.archetype().name().to_string(),
            level: unit.level(),
            x: unit.position().x,
            y: unit.position().y,
            health: unit.health().to_num(),
            max_health: unit.max_health().to_num(),
            mana: unit.mana().to_num(),
            alive: unit.is_alive(),
            statuses: unit
                .statuses()
                .iter()
                .map(|s| s.effect.name().to_string())
                .collect(),
        }
    }
}

/// One tick as shown to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Tick number.
    pub tick: u64,
    /// Board width.
    pub width: u32,
    /// Board height.
    pub height: u32,
    /// Every unit, dead ones included.
    pub units: Vec<UnitFrame>,
    /// Events of this tick, described in words.
    pub events: Vec<String>,
}

impl From<&Snapshot> for Frame {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            tick: snapshot.tick(),
            width: snapshot.width(),
            height: snapshot.height(),
            units: snapshot.units().iter().map(UnitFrame::from).collect(),
            events: snapshot.events().iter().map(describe_event).collect(),
        }
    }
}

/// Short human-readable line for an event.
#[must_use]
pub fn describe_event(event: &BattleEvent) -> String {
    match event {
        BattleEvent::Moved { unit, from, to } => format!("#{unit} moved {from} -> {to}"),
        BattleEvent::Attacked {
            attacker,
            target,
            damage,
            crit,
        } => {
            let crit = if *crit { " (crit)" } else { "" };
            format!("#{attacker} hit #{target} for {:.1}{crit}", damage.to_num::<f64>())
        }
        BattleEvent::AbilityCast {
            caster,
            ability,
            target,
        } => match target {
            AbilityTarget::SelfCast => format!("#{caster} cast {ability}"),
            AbilityTarget::Unit(id) => format!("#{caster} cast {ability} on #{id}"),
        },
        BattleEvent::Damaged {
            source,
            target,
            amount,
            kind,
        } => format!(
            "#{source} dealt {:.1} {kind:?} damage to #{target}",
            amount.to_num::<f64>()
        ),
        BattleEvent::Healed {
            source,
            target,
            amount,
        } => format!("#{source} healed #{target} for {:.1}", amount.to_num::<f64>()),
        BattleEvent::StatusApplied {
            unit,
            effect,
            duration,
        } => format!("#{unit} is {} for {duration} ticks", effect.name()),
        BattleEvent::StatusExpired { unit, effect } => {
            format!("#{unit} is no longer {}", effect.name())
        }
        BattleEvent::Stunned { unit } => format!("#{unit} is stunned"),
        BattleEvent::Died { unit, killer } => match killer {
            Some(killer) => format!("#{unit} was killed by #{killer}"),
            None => format!("#{unit} died"),
        },
        BattleEvent::ActionRejected { unit, reason } => {
            format!("#{unit} action rejected: {reason:?}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_converts_fixed_values() {
        let roster = Roster::new(7, 8)
            .with_unit(Team::A, UnitSpec::new(Archetype::Tank, 0, 0))
            .with_unit(Team::B, UnitSpec::new(Archetype::Mage, 6, 7));
        let stream = BattleStream::new(roster, BattleConfig::default()).unwrap();
        let frame = Frame::from(stream.initial());

        assert_eq!(frame.tick, 0);
        assert_eq!(frame.units.len(), 2);
        assert_eq!(frame.units[0].archetype, "Tank");
        assert!((frame.units[0].health - 150.0).abs() < f64::EPSILON);
        assert!(frame.units.iter().all(|u| u.alive));

        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"max_health\":150.0"));
    }

    #[test]
    fn test_describe_death() {
        let line = describe_event(&BattleEvent::Died {
            unit: 3,
            killer: Some(1),
        });
        assert_eq!(line, "#3 was killed by #1");
    }
}
