//! End-to-end battle tests.
//!
//! Runs whole battles through the public API and checks the per-tick
//! guarantees every consumer relies on.

use std::collections::BTreeSet;

use autochess_core::prelude::*;
use autochess_test_utils::fixtures::{adjacent_warriors, duel, fixed, mirror_lineup, seeded, skirmish};

fn collect(roster: &Roster, config: &BattleConfig) -> (Vec<Snapshot>, BattleResult) {
    let mut stream = BattleStream::new(roster.clone(), config.clone()).unwrap();
    let snapshots: Vec<Snapshot> = stream.by_ref().collect();
    let result = stream.result().cloned().unwrap();
    (snapshots, result)
}

fn speed(value: u32) -> StatOverrides {
    StatOverrides {
        speed: Some(value),
        ..StatOverrides::default()
    }
}

#[test]
fn warrior_duel_ends_by_elimination() {
    let (snapshots, result) = collect(&adjacent_warriors(), &seeded(42));

    assert_eq!(result.end_reason, EndReason::Elimination);
    assert!(result.outcome.winner().is_some());
    assert_eq!(snapshots.last().map(Snapshot::tick), Some(result.ticks));
    assert!(result.ticks <= BattleConfig::default().max_ticks);

    let deaths: Vec<&BattleEvent> = snapshots
        .iter()
        .flat_map(Snapshot::events)
        .filter(|e| e.is_death())
        .collect();
    assert_eq!(deaths.len(), 1);
}

#[test]
fn snapshot_ticks_start_at_one_and_increase() {
    let (snapshots, _) = collect(&skirmish(), &seeded(1));

    assert!(!snapshots.is_empty());
    for (i, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.tick(), i as u64 + 1);
    }
}

#[test]
fn empty_team_is_rejected() {
    let roster = Roster::new(7, 8).with_unit(Team::A, UnitSpec::new(Archetype::Warrior, 0, 0));

    assert!(matches!(
        Battle::new(&roster, BattleConfig::default()),
        Err(BattleError::InvalidRoster(_))
    ));
    assert!(matches!(
        BattleStream::new(roster, BattleConfig::default()),
        Err(BattleError::InvalidRoster(_))
    ));
}

#[test]
fn zero_tick_budget_is_rejected() {
    let config = BattleConfig::default().with_max_ticks(0);
    assert!(matches!(
        Battle::new(&adjacent_warriors(), config),
        Err(BattleError::InvalidConfig(_))
    ));
}

#[test]
fn movement_arrives_then_attacks() {
    // Speed 2 on a Manhattan corridor: 0 -> 2 -> 4 -> 6 -> 8, attack on tick 5
    let roster = Roster::new(10, 1)
        .with_unit(
            Team::A,
            UnitSpec::new(Archetype::Warrior, 0, 0).with_stats(speed(2)),
        )
        .with_unit(
            Team::B,
            UnitSpec::new(Archetype::Warrior, 9, 0).with_stats(speed(0)),
        );
    let config = BattleConfig::default().with_metric(DistanceMetric::Manhattan);
    let (snapshots, _) = collect(&roster, &config);

    for (tick, x) in [(1, 2), (2, 4), (3, 6), (4, 8)] {
        let snapshot = &snapshots[tick - 1];
        assert!(
            snapshot.events().iter().any(|e| matches!(
                e,
                BattleEvent::Moved { unit: 1, to, .. } if *to == GridPos::new(x, 0)
            )),
            "tick {tick}: {:?}",
            snapshot.events()
        );
        assert_eq!(snapshot.unit(1).unwrap().position(), GridPos::new(x, 0));
    }

    assert!(snapshots[4].events().iter().any(|e| matches!(
        e,
        BattleEvent::Attacked {
            attacker: 1,
            target: 2,
            ..
        }
    )));
    assert!(snapshots
        .iter()
        .flat_map(Snapshot::events)
        .all(|e| !matches!(e, BattleEvent::Moved { unit: 2, .. })));
}

#[test]
fn abort_stops_the_stream() {
    let mut stream = BattleStream::new(skirmish(), seeded(3)).unwrap();
    let handle = stream.abort_handle();

    assert_eq!(stream.next().map(|s| s.tick()), Some(1));
    assert_eq!(stream.next().map(|s| s.tick()), Some(2));
    handle.abort();

    assert!(stream.next().is_none());
    assert!(stream.next().is_none());
    let result = stream.result().unwrap();
    assert_eq!(result.outcome, BattleOutcome::Aborted);
    assert_eq!(result.end_reason, EndReason::Aborted);
    assert_eq!(result.ticks, 2);
}

#[test]
fn restart_replays_identical_snapshots() {
    let mut stream = BattleStream::new(mirror_lineup(), seeded(99)).unwrap();
    let first: Vec<Snapshot> = stream.by_ref().collect();
    let first_result = stream.result().cloned();

    stream.restart().unwrap();
    let second: Vec<Snapshot> = stream.by_ref().collect();

    assert_eq!(first, second);
    assert_eq!(first_result, stream.result().cloned());
}

#[test]
fn restart_after_abort_runs_again() {
    let mut stream = BattleStream::new(skirmish(), seeded(3)).unwrap();
    stream.abort_handle().abort();
    assert!(stream.next().is_none());

    stream.restart().unwrap();
    assert_eq!(stream.next().map(|s| s.tick()), Some(1));
}

#[test]
fn health_stays_within_bounds() {
    let (snapshots, _) = collect(&mirror_lineup(), &seeded(5));

    for snapshot in &snapshots {
        for unit in snapshot.units() {
            assert!(unit.health() >= Fixed::ZERO, "{unit:?}");
            assert!(unit.health() <= unit.max_health(), "{unit:?}");
            assert_eq!(unit.is_alive(), unit.health() > Fixed::ZERO, "{unit:?}");
        }
    }
}

#[test]
fn unit_count_is_conserved_and_cells_are_exclusive() {
    let roster = skirmish();
    let (snapshots, _) = collect(&roster, &seeded(8));

    for snapshot in &snapshots {
        assert_eq!(snapshot.units().len(), roster.unit_count());
        let mut cells = BTreeSet::new();
        for unit in snapshot.units().iter().filter(|u| u.is_alive()) {
            assert!(cells.insert(unit.position()), "two units on {}", unit.position());
        }
    }
}

#[test]
fn dead_units_never_act_or_get_targeted() {
    let (snapshots, _) = collect(&mirror_lineup(), &seeded(13));
    let mut dead = BTreeSet::new();

    for snapshot in &snapshots {
        for event in snapshot.events() {
            match *event {
                BattleEvent::Moved { unit, .. } => assert!(!dead.contains(&unit)),
                BattleEvent::Attacked {
                    attacker, target, ..
                } => {
                    assert!(!dead.contains(&attacker));
                    assert!(!dead.contains(&target));
                }
                BattleEvent::AbilityCast { caster, .. } => assert!(!dead.contains(&caster)),
                BattleEvent::Damaged { target, .. } | BattleEvent::Healed { target, .. } => {
                    assert!(!dead.contains(&target));
                }
                BattleEvent::Died { unit, .. } => assert!(dead.insert(unit), "unit {unit} died twice"),
                _ => {}
            }
        }
    }
}

#[test]
fn same_seed_same_battle() {
    let (first, first_result) = collect(&skirmish(), &seeded(21));
    let (second, second_result) = collect(&skirmish(), &seeded(21));

    assert_eq!(first, second);
    assert_eq!(first_result, second_result);
}

#[test]
fn timeout_is_a_draw_by_default() {
    let roster = Roster::new(7, 8)
        .with_unit(Team::A, UnitSpec::new(Archetype::Tank, 0, 0).with_stats(speed(0)))
        .with_unit(Team::B, UnitSpec::new(Archetype::Tank, 6, 7).with_stats(speed(0)));
    let config = BattleConfig::default().with_max_ticks(25);
    let (snapshots, result) = collect(&roster, &config);

    assert_eq!(snapshots.len(), 25);
    assert_eq!(result.outcome, BattleOutcome::Draw);
    assert_eq!(result.end_reason, EndReason::Timeout);
    assert_eq!(result.ticks, 25);
}

#[test]
fn timeout_by_health_total_picks_healthier_team() {
    let tough = StatOverrides {
        max_health: Some(400),
        speed: Some(0),
        ..StatOverrides::default()
    };
    let roster = Roster::new(7, 8)
        .with_unit(Team::A, UnitSpec::new(Archetype::Tank, 0, 0).with_stats(speed(0)))
        .with_unit(Team::B, UnitSpec::new(Archetype::Tank, 6, 7).with_stats(tough));
    let config = BattleConfig::default()
        .with_max_ticks(10)
        .with_timeout_rule(TimeoutRule::HealthTotal);
    let (_, result) = collect(&roster, &config);

    assert_eq!(result.outcome, BattleOutcome::WinB);
    assert_eq!(result.end_reason, EndReason::Timeout);
    assert_eq!(result.health_b, fixed(400));
}

#[test]
fn final_snapshot_matches_last_streamed_state() {
    let (snapshots, result) = collect(&duel(Archetype::Mage, Archetype::Tank), &seeded(4));
    let last = snapshots.last().unwrap();

    assert_eq!(result.final_snapshot.tick(), last.tick());
    assert_eq!(result.final_snapshot.units(), last.units());
    assert_eq!(result.health_a, last.team_health(Team::A));
    assert_eq!(result.health_b, last.team_health(Team::B));
}

#[test]
fn snapshot_bytes_round_trip() {
    let (snapshots, _) = collect(&skirmish(), &seeded(2));

    for snapshot in snapshots.iter().take(20) {
        let bytes = snapshot.to_bytes().unwrap();
        let decoded = Snapshot::from_bytes(&bytes).unwrap();
        assert_eq!(&decoded, snapshot);
        assert_eq!(decoded.state_hash(), snapshot.state_hash());
    }
}

#[test]
fn initial_snapshot_is_tick_zero_layout() {
    let roster = skirmish();
    let stream = BattleStream::new(roster.clone(), seeded(0)).unwrap();
    let initial = stream.initial();

    assert_eq!(initial.tick(), 0);
    assert!(initial.events().is_empty());
    assert_eq!(initial.living_count(Team::A), roster.team(Team::A).len());
    assert_eq!(initial.living_count(Team::B), roster.team(Team::B).len());
    for (i, (_, spec)) in roster.specs().enumerate() {
        let unit = initial.unit(i as UnitId + 1).unwrap();
        assert_eq!(unit.position(), spec.position);
        assert_eq!(unit.archetype(), spec.archetype);
    }
}

#[test]
fn every_metric_finishes_within_budget() {
    for metric in [
        DistanceMetric::Euclidean,
        DistanceMetric::Chebyshev,
        DistanceMetric::Manhattan,
    ] {
        let config = seeded(17).with_metric(metric);
        let (_, result) = collect(&mirror_lineup(), &config);
        assert!(result.ticks <= config.max_ticks, "{metric:?}");
        assert_ne!(result.outcome, BattleOutcome::Aborted);
    }
}

fn no_crit_no_cast() -> StatOverrides {
    StatOverrides {
        crit_chance: Some(0),
        max_mana: Some(10_000),
        ..StatOverrides::default()
    }
}

fn plain_warrior(x: i32, y: i32) -> UnitSpec {
    UnitSpec::new(Archetype::Warrior, x, y).with_stats(no_crit_no_cast())
}

#[test]
fn equal_adjacent_units_first_actor_wins() {
    let roster = Roster::new(7, 8)
        .with_unit(Team::A, plain_warrior(3, 3))
        .with_unit(Team::B, plain_warrior(3, 4));

    for rule in [TieBreakRule::SpeedThenId, TieBreakRule::IdOnly, TieBreakRule::RowMajor] {
        for seed in 0..5 {
            let config = seeded(seed).with_tie_break(rule);
            let result = autochess_test_utils::fixtures::run(&roster, config);
            assert_eq!(result.outcome, BattleOutcome::WinA, "{rule:?} seed {seed}");
            assert_eq!(result.end_reason, EndReason::Elimination);
        }
    }
}

#[test]
fn equal_adjacent_units_second_team_wins_when_acting_first() {
    // Team B sits on the upper row, so it acts first in row-major order
    let row_major = Roster::new(7, 8)
        .with_unit(Team::A, plain_warrior(3, 4))
        .with_unit(Team::B, plain_warrior(3, 3));
    let config = seeded(3).with_tie_break(TieBreakRule::RowMajor);
    assert_eq!(
        autochess_test_utils::fixtures::run(&row_major, config).outcome,
        BattleOutcome::WinB
    );

    // A faster team B unit acts first under speed ordering
    let faster = StatOverrides {
        speed: Some(2),
        ..no_crit_no_cast()
    };
    let by_speed = Roster::new(7, 8)
        .with_unit(Team::A, plain_warrior(3, 3))
        .with_unit(
            Team::B,
            UnitSpec::new(Archetype::Warrior, 3, 4).with_stats(faster),
        );
    assert_eq!(
        autochess_test_utils::fixtures::run(&by_speed, seeded(3)).outcome,
        BattleOutcome::WinB
    );
}

#[test]
fn blocked_line_of_sight_turns_attack_into_move() {
    // Archer at the corner, an allied tank between it and the enemy
    let roster = Roster::new(7, 8)
        .with_unit(Team::A, UnitSpec::new(Archetype::Archer, 0, 0))
        .with_unit(Team::A, UnitSpec::new(Archetype::Tank, 1, 0))
        .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 3, 0));
    let config = seeded(5).with_metric(DistanceMetric::Manhattan);

    let mut open = Battle::new(&roster, config.clone()).unwrap();
    let first = open.step().unwrap();
    assert!(first
        .events()
        .iter()
        .any(|e| matches!(e, BattleEvent::Attacked { attacker: 1, target: 3, .. })));

    let mut blocked = Battle::new(&roster, config.with_line_of_sight(true)).unwrap();
    let first = blocked.step().unwrap();
    assert!(!first
        .events()
        .iter()
        .any(|e| matches!(e, BattleEvent::Attacked { attacker: 1, .. })));
    assert!(first.events().contains(&BattleEvent::Moved {
        unit: 1,
        from: GridPos::new(0, 0),
        to: GridPos::new(0, 1),
    }));
}

#[test]
fn oversized_setup_is_rejected_before_the_battle() {
    let huge_board = Roster::new(u32::MAX, u32::MAX)
        .with_unit(Team::A, UnitSpec::new(Archetype::Warrior, 0, 0))
        .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 1, 0));
    assert!(matches!(
        Battle::new(&huge_board, BattleConfig::default()),
        Err(BattleError::InvalidRoster(_))
    ));

    let long_board = Roster::new(50_000, 1)
        .with_unit(Team::A, UnitSpec::new(Archetype::Warrior, 0, 0))
        .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 49_999, 0));
    assert!(matches!(
        Battle::new(&long_board, BattleConfig::default()),
        Err(BattleError::InvalidRoster(_))
    ));

    let giant = StatOverrides {
        max_health: Some(3_000_000_000),
        ..StatOverrides::default()
    };
    let roster = Roster::new(7, 8)
        .with_unit(Team::A, UnitSpec::new(Archetype::Warrior, 0, 0).with_stats(giant))
        .with_unit(Team::B, UnitSpec::new(Archetype::Warrior, 1, 0));
    assert!(matches!(
        Battle::new(&roster, BattleConfig::default()),
        Err(BattleError::InvalidRoster(_))
    ));
}

#[test]
fn largest_board_with_capped_stats_runs() {
    let side = autochess_core::battlefield::MAX_DIMENSION;
    let far = side as i32 - 1;
    let capped = StatOverrides {
        max_health: Some(10_000),
        attack: Some(10_000),
        range: Some(10_000),
        ..StatOverrides::default()
    };

    for metric in [
        DistanceMetric::Euclidean,
        DistanceMetric::Chebyshev,
        DistanceMetric::Manhattan,
    ] {
        let roster = Roster::new(side, side)
            .with_unit(Team::A, UnitSpec::new(Archetype::Mage, 0, 0).with_level(3).with_stats(capped))
            .with_unit(Team::B, UnitSpec::new(Archetype::Tank, far, far).with_level(3).with_stats(capped));
        let config = seeded(9).with_metric(metric).with_sticky_target_ticks(u64::MAX);
        let result = autochess_test_utils::fixtures::run(&roster, config);
        assert!(result.ticks >= 1);
    }
}
