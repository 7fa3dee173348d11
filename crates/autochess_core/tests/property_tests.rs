//! Property tests over randomly generated rosters and rules.

use std::collections::BTreeSet;

use autochess_core::prelude::*;
use autochess_test_utils::determinism::strategies::{arb_config, arb_roster};
use autochess_test_utils::determinism::stream_hash;
use autochess_test_utils::proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn battles_terminate_within_budget(roster in arb_roster(4), config in arb_config()) {
        let mut stream = BattleStream::new(roster, config.clone()).unwrap();
        let count = stream.by_ref().count() as u64;
        let result = stream.result().unwrap();

        prop_assert!(count <= config.max_ticks);
        prop_assert_eq!(result.ticks, count);
        prop_assert_ne!(result.outcome, BattleOutcome::Aborted);
        if result.end_reason == EndReason::Timeout {
            prop_assert_eq!(result.ticks, config.max_ticks);
        }
    }

    #[test]
    fn snapshots_keep_invariants(roster in arb_roster(4), config in arb_config()) {
        let total = roster.unit_count();
        let mut previous = 0;
        let mut dead = BTreeSet::new();

        for snapshot in BattleStream::new(roster, config).unwrap() {
            prop_assert_eq!(snapshot.tick(), previous + 1);
            previous = snapshot.tick();
            prop_assert_eq!(snapshot.units().len(), total);

            let mut cells = BTreeSet::new();
            for unit in snapshot.units() {
                prop_assert!(unit.health() >= Fixed::ZERO);
                prop_assert!(unit.health() <= unit.max_health());
                prop_assert_eq!(unit.is_alive(), unit.health() > Fixed::ZERO);
                if unit.is_alive() {
                    prop_assert!(cells.insert(unit.position()));
                    prop_assert!(!dead.contains(&unit.id()));
                } else {
                    dead.insert(unit.id());
                }
            }
        }
    }

    #[test]
    fn same_inputs_same_stream(roster in arb_roster(3), config in arb_config()) {
        let mut first = BattleStream::new(roster.clone(), config.clone()).unwrap();
        let mut second = BattleStream::new(roster, config).unwrap();
        prop_assert_eq!(stream_hash(&mut first), stream_hash(&mut second));
    }

    #[test]
    fn roster_ron_round_trip(roster in arb_roster(4)) {
        let text = roster.to_ron_string().unwrap();
        prop_assert_eq!(Roster::from_ron_str(&text).unwrap(), roster);
    }
}
