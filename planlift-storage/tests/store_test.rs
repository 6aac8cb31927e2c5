//! Iteration store integration tests over a temporary evaluation root.

use std::collections::BTreeMap;
use std::path::Path;

use planlift_core::types::building::BuildingSpec;
use planlift_core::types::document::{DocumentMap, PageInfo, PageType};
use planlift_core::types::building::Confidence;
use planlift_core::types::evaluation::{EvalMetrics, EvalResult};
use planlift_storage::{AggregateHistory, IterationMetrics, IterationStore};

fn store() -> (tempfile::TempDir, IterationStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = IterationStore::new(dir.path());
    (dir, store)
}

fn doc_map() -> DocumentMap {
    DocumentMap {
        total_pages: 2,
        pages: vec![
            PageInfo {
                page: 1,
                page_type: PageType::Schedule,
                confidence: Confidence::High,
                description: None,
            },
            PageInfo {
                page: 2,
                page_type: PageType::Drawing,
                confidence: Confidence::Medium,
                description: None,
            },
        ],
    }
}

#[test]
fn iterations_number_monotonically_from_one() {
    let (_dir, store) = store();
    assert_eq!(store.latest_iteration("case-a").unwrap(), None);
    assert_eq!(store.create_iteration("case-a").unwrap(), 1);
    assert_eq!(store.create_iteration("case-a").unwrap(), 2);
    assert_eq!(store.create_iteration("case-a").unwrap(), 3);
    assert_eq!(store.latest_iteration("case-a").unwrap(), Some(3));
    // Independent evaluations do not share numbering.
    assert_eq!(store.create_iteration("case-b").unwrap(), 1);
}

#[test]
fn iteration_directories_are_zero_padded() {
    let (dir, store) = store();
    store.create_iteration("case-a").unwrap();
    assert!(dir
        .path()
        .join("case-a/iterations/iteration-001")
        .is_dir());
}

#[test]
fn extracted_round_trips_through_disk() {
    let (_dir, store) = store();
    let iteration = store.create_iteration("case-a").unwrap();
    let spec = BuildingSpec::default();
    store.write_extracted("case-a", iteration, &spec).unwrap();
    let back = store.read_extracted("case-a", iteration).unwrap();
    assert_eq!(spec, back);
}

#[test]
fn extracted_json_is_pretty_with_trailing_newline() {
    let (dir, store) = store();
    let iteration = store.create_iteration("case-a").unwrap();
    store
        .write_extracted("case-a", iteration, &BuildingSpec::default())
        .unwrap();
    let text = std::fs::read_to_string(
        dir.path().join("case-a/iterations/iteration-001/extracted.json"),
    )
    .unwrap();
    assert!(text.ends_with('\n'));
    assert!(text.starts_with("{\n"));
}

#[test]
fn latest_extracted_skips_iterations_without_artefact() {
    let (_dir, store) = store();
    let first = store.create_iteration("case-a").unwrap();
    store
        .write_extracted("case-a", first, &BuildingSpec::default())
        .unwrap();
    // Second iteration directory exists but extraction never finished.
    store.create_iteration("case-a").unwrap();
    let (iteration, _) = store.read_latest_extracted("case-a").unwrap();
    assert_eq!(iteration, first);
}

#[test]
fn document_map_cache_round_trips() {
    let (_dir, store) = store();
    let iteration = store.create_iteration("case-a").unwrap();
    assert_eq!(store.read_document_map("case-a", iteration).unwrap(), None);
    store
        .write_document_map("case-a", iteration, &doc_map())
        .unwrap();
    assert_eq!(
        store.read_document_map("case-a", iteration).unwrap(),
        Some(doc_map())
    );
}

#[test]
fn eval_results_round_trip() {
    let (_dir, store) = store();
    let iteration = store.create_iteration("case-a").unwrap();
    let result = EvalResult {
        metrics: EvalMetrics {
            true_positives: 10,
            precision: 1.0,
            recall: 0.9,
            f1: 0.947,
            ..Default::default()
        },
        ..Default::default()
    };
    store
        .write_eval_results("case-a", iteration, &result)
        .unwrap();
    let (latest, back) = store.read_latest_eval_results("case-a").unwrap();
    assert_eq!(latest, iteration);
    assert_eq!(result, back);
}

#[test]
fn snapshots_round_trip_with_path_decoding() {
    let (_dir, store) = store();
    let iteration = store.create_iteration("case-a").unwrap();
    store
        .write_snapshot(
            "case-a",
            iteration,
            Path::new("project-extractor/instructions.md"),
            "v1.0.0",
            "# Project Extractor v1.0.0\n\nbody\n",
        )
        .unwrap();
    let snapshots = store.read_snapshots("case-a", iteration).unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(
        snapshots[0].relative_path,
        Path::new("project-extractor/instructions.md")
    );
    assert_eq!(snapshots[0].version, "v1.0.0");
    assert!(snapshots[0].content.contains("v1.0.0"));
}

#[test]
fn missing_snapshot_dir_reads_as_empty() {
    let (_dir, store) = store();
    let iteration = store.create_iteration("case-a").unwrap();
    assert!(store.read_snapshots("case-a", iteration).unwrap().is_empty());
}

#[test]
fn aggregate_history_accumulates_across_iterations() {
    let (_dir, store) = store();
    let metrics = |f1: f64| IterationMetrics {
        f1,
        precision: f1,
        recall: f1,
        errors_by_type: BTreeMap::new(),
        recorded_at: 1_700_000_000,
    };
    store.record_aggregate("case-a", 1, metrics(0.6)).unwrap();
    let history = store.record_aggregate("case-a", 2, metrics(0.7)).unwrap();
    assert_eq!(history.iterations.len(), 2);
    let reread: AggregateHistory = store.read_aggregate("case-a").unwrap();
    assert!((reread.f1_delta(1, 2).unwrap() - 0.1).abs() < 1e-12);
}
