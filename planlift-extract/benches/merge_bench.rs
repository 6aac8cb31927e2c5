//! Merge engine throughput on dense duplicate-heavy runs.

use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use planlift_core::types::building::{Wall, Window, Zone};
use planlift_core::types::fragments::{
    Domain, ExtractionStatus, Fragment, ProjectFragment, WindowsFragment, ZonesFragment,
};
use planlift_extract::orchestrator::{DomainOutcome, ExtractionRun};
use planlift_extract::MergeEngine;

fn synthetic_run(items: usize) -> ExtractionRun {
    let zones: Vec<Zone> = (0..items)
        .map(|i| Zone {
            name: format!("Zone {}", i % (items / 2 + 1)),
            zone_type: None,
            floor_area: Some(100.0 + i as f64),
            volume: None,
        })
        .collect();
    let walls: Vec<Wall> = (0..items)
        .map(|i| Wall {
            name: format!("Wall {i}"),
            zone: Some(format!("Zone {}", i % (items / 2 + 1))),
            azimuth: Some((i as f64 * 37.0) % 360.0),
            gross_area: Some(150.0),
            net_area: Some(130.0),
            construction: None,
            tilt_degrees: Some(90.0),
        })
        .collect();
    let windows: Vec<Window> = (0..items)
        .map(|i| Window {
            name: format!("W{i}"),
            wall: Some(format!("Wall {i}")),
            height: Some(4.0),
            width: Some(3.0),
            multiplier: Some(1),
            area: Some(12.0),
            u_factor: Some(0.3),
            shgc: Some(0.23),
            overhang_depth: None,
        })
        .collect();

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
            fragment: Some(Fragment::Zones(ZonesFragment { zones, walls })),
            status: ExtractionStatus::success(1),
        },
    );
    outcomes.insert(
        Domain::Windows,
        DomainOutcome {
            fragment: Some(Fragment::Windows(WindowsFragment { windows })),
            status: ExtractionStatus::success(1),
        },
    );
    for domain in [Domain::Hvac, Domain::Dhw] {
        outcomes.insert(
            domain,
            DomainOutcome {
                fragment: None,
                status: ExtractionStatus::failed(2, "absent"),
            },
        );
    }
    ExtractionRun {
        outcomes,
        orientation: None,
        orientation_status: ExtractionStatus::failed(2, "absent"),
        routing_notes: Vec::new(),
    }
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    for &items in &[10usize, 100, 500] {
        let run = synthetic_run(items);
        group.bench_with_input(BenchmarkId::from_parameter(items), &run, |b, run| {
            b.iter(|| MergeEngine::merge(run));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
