//! Property-based tests for the invariants the pipeline leans on.
//!
//! 1. Angular distance: symmetric, bounded to [0, 180], invariant under
//!    full turns around the circle.
//! 2. Circular mean: lands in [0, 360) and bisects the shorter arc.
//! 3. Merge dedup: one item per name, first occurrence wins, every
//!    divergent duplicate is recorded, and output is deterministic.

use std::collections::BTreeMap;

use proptest::prelude::*;

use planlift_core::angles::{angular_distance, circular_mean, normalize};
use planlift_core::types::building::{ConflictResolution, Zone};
use planlift_core::types::fragments::{
    Domain, ExtractionStatus, Fragment, ProjectFragment, ZonesFragment,
};
use planlift_extract::orchestrator::{DomainOutcome, ExtractionRun};
use planlift_extract::MergeEngine;

// =============================================================================
// Strategy helpers
// =============================================================================

/// Zone entries as (name index, floor area): a small name pool forces
/// duplicate names to actually occur.
fn zone_entries() -> impl Strategy<Value = Vec<(usize, f64)>> {
    prop::collection::vec((0usize..4, 1.0f64..1000.0), 0..12)
}

fn zones_from(entries: &[(usize, f64)]) -> Vec<Zone> {
    entries
        .iter()
        .map(|&(index, area)| Zone {
            name: format!("Zone {index}"),
            zone_type: None,
            floor_area: Some(area),
            volume: None,
        })
        .collect()
}

fn run_with_zones(zones: Vec<Zone>) -> ExtractionRun {
    let mut outcomes = BTreeMap::new();
    outcomes.insert(
        Domain::Project,
        DomainOutcome {
            fragment: Some(Fragment::Project(ProjectFragment::default())),
            status: ExtractionStatus::success(1),
        },
    );
    outcomes.insert(
        Domain::Zones,
        DomainOutcome {
            fragment: Some(Fragment::Zones(ZonesFragment {
                zones,
                walls: Vec::new(),
            })),
            status: ExtractionStatus::success(1),
        },
    );
    for domain in [Domain::Windows, Domain::Hvac, Domain::Dhw] {
        outcomes.insert(
            domain,
            DomainOutcome {
                fragment: None,
                status: ExtractionStatus::failed(2, "worker unavailable"),
            },
        );
    }
    ExtractionRun {
        outcomes,
        orientation: None,
        orientation_status: ExtractionStatus::failed(2, "worker unavailable"),
        routing_notes: Vec::new(),
    }
}

// =============================================================================
// Angular geometry
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_distance_symmetric_and_bounded(a in 0.0f64..360.0, b in 0.0f64..360.0) {
        let d = angular_distance(a, b);
        prop_assert!((0.0..=180.0).contains(&d), "distance {d} out of range");
        prop_assert!((d - angular_distance(b, a)).abs() < 1e-9);
    }

    #[test]
    fn prop_distance_invariant_under_full_turns(
        a in 0.0f64..360.0,
        b in 0.0f64..360.0,
        turns in -3i32..=3,
    ) {
        let shifted = a + 360.0 * f64::from(turns);
        prop_assert!((angular_distance(shifted, b) - angular_distance(a, b)).abs() < 1e-6);
    }

    #[test]
    fn prop_normalize_lands_in_range_and_is_idempotent(a in -10_000.0f64..10_000.0) {
        let n = normalize(a);
        prop_assert!((0.0..360.0).contains(&n), "normalize({a}) = {n}");
        prop_assert_eq!(normalize(n), n);
    }

    #[test]
    fn prop_circular_mean_bisects_the_shorter_arc(a in 0.0f64..360.0, b in 0.0f64..360.0) {
        let d = angular_distance(a, b);
        // Antipodal inputs are degenerate and handled by a fallback.
        prop_assume!(d < 179.0);
        let mean = circular_mean(a, b);
        prop_assert!((0.0..360.0).contains(&mean), "mean {mean} out of range");
        let to_a = angular_distance(mean, a);
        let to_b = angular_distance(mean, b);
        prop_assert!((to_a - to_b).abs() < 1e-6, "mean {mean} not equidistant: {to_a} vs {to_b}");
        prop_assert!((to_a - d / 2.0).abs() < 1e-6, "mean {mean} off the shorter arc");
    }
}

// =============================================================================
// Merge dedup
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_merge_keeps_one_item_per_name_first_wins(entries in zone_entries()) {
        let spec = MergeEngine::merge(&run_with_zones(zones_from(&entries)));

        let mut expected_order = Vec::new();
        let mut first_area: BTreeMap<String, f64> = BTreeMap::new();
        for &(index, area) in &entries {
            let name = format!("Zone {index}");
            if !first_area.contains_key(&name) {
                expected_order.push(name.clone());
                first_area.insert(name, area);
            }
        }

        let names: Vec<String> = spec.zones.iter().map(|z| z.name.clone()).collect();
        prop_assert_eq!(names, expected_order);
        for zone in &spec.zones {
            prop_assert_eq!(zone.floor_area, first_area.get(&zone.name).copied());
        }
    }

    #[test]
    fn prop_merge_records_every_divergent_duplicate(entries in zone_entries()) {
        let spec = MergeEngine::merge(&run_with_zones(zones_from(&entries)));

        let mut first_area: BTreeMap<String, f64> = BTreeMap::new();
        let mut expected_conflicts = 0usize;
        for &(index, area) in &entries {
            let name = format!("Zone {index}");
            match first_area.get(&name) {
                None => {
                    first_area.insert(name, area);
                }
                Some(&kept) if kept != area => expected_conflicts += 1,
                Some(_) => {}
            }
        }

        let kept_first = spec
            .conflicts
            .iter()
            .filter(|c| c.resolution == ConflictResolution::KeptFirst)
            .count();
        prop_assert_eq!(kept_first, expected_conflicts);
    }

    #[test]
    fn prop_merge_is_deterministic(entries in zone_entries()) {
        let run = run_with_zones(zones_from(&entries));
        let a = serde_json::to_string_pretty(&MergeEngine::merge(&run)).unwrap();
        let b = serde_json::to_string_pretty(&MergeEngine::merge(&run)).unwrap();
        prop_assert_eq!(a, b);
    }
}
