//! Deterministic assembly of the final `BuildingSpec`.
//!
//! Fragments are folded in canonical domain order. List items keep
//! first-observed order per unique name; a later duplicate whose other
//! fields differ becomes a recorded conflict, never an exception. Schema
//! violations found on the assembled record are recorded the same way.

use planlift_core::types::building::{
    BuildingSpec, ConflictResolution, FieldConflict,
};
use planlift_core::types::fragments::{Domain, Fragment};
use planlift_core::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::extractors::worker_name;
use crate::orchestrator::ExtractionRun;

/// Assembles merged records. Stateless; all context rides in the run.
pub struct MergeEngine;

impl MergeEngine {
    /// Merge one extraction run into an immutable `BuildingSpec`.
    pub fn merge(run: &ExtractionRun) -> BuildingSpec {
        let mut spec = BuildingSpec::default();
        let mut conflicts = Vec::new();

        for (domain, outcome) in &run.outcomes {
            let Some(fragment) = &outcome.fragment else {
                continue;
            };
            let source = worker_name(*domain);
            match fragment {
                Fragment::Project(project) => {
                    spec.project = project.project.clone();
                    spec.envelope = project.envelope.clone();
                }
                Fragment::Zones(zones) => {
                    spec.zones = dedup_named(
                        "zones",
                        source,
                        &zones.zones,
                        |z| &z.name,
                        &mut conflicts,
                    );
                    spec.walls = dedup_named(
                        "walls",
                        source,
                        &zones.walls,
                        |w| &w.name,
                        &mut conflicts,
                    );
                }
                Fragment::Windows(windows) => {
                    spec.windows = dedup_named(
                        "windows",
                        source,
                        &windows.windows,
                        |w| &w.name,
                        &mut conflicts,
                    );
                }
                Fragment::Hvac(hvac) => {
                    spec.hvac_systems = dedup_named(
                        "hvac_systems",
                        source,
                        &hvac.hvac_systems,
                        |h| &h.name,
                        &mut conflicts,
                    );
                }
                Fragment::Dhw(dhw) => {
                    spec.water_heating_systems = dedup_named(
                        "water_heating_systems",
                        source,
                        &dhw.water_heating_systems,
                        |w| &w.name,
                        &mut conflicts,
                    );
                }
            }
        }

        if let Some(estimate) = &run.orientation {
            spec.project.front_orientation = Some(estimate.front_orientation);
            spec.project.orientation_confidence = Some(estimate.confidence);
        }

        for (domain, outcome) in &run.outcomes {
            spec.extraction_status.insert(*domain, outcome.status.clone());
        }
        spec.extraction_status
            .insert(Domain::Orientation, run.orientation_status.clone());

        // Schema rules are checked on the assembled whole; violations
        // join the conflict list rather than failing the merge.
        for violation in spec.validate() {
            conflicts.push(FieldConflict {
                field: violation.field,
                source_extractor: "merge".to_string(),
                reported_value: serde_json::Value::String(violation.message),
                conflicting_extractor: "merge".to_string(),
                conflicting_value: serde_json::Value::Null,
                resolution: ConflictResolution::SchemaViolation,
            });
        }

        debug!(
            zones = spec.zones.len(),
            walls = spec.walls.len(),
            windows = spec.windows.len(),
            conflicts = conflicts.len(),
            "merge complete"
        );
        spec.conflicts = conflicts;
        spec
    }
}

/// First occurrence per name wins; differing later occurrences are
/// recorded field-by-field. Output order is first-observed order.
fn dedup_named<T, F>(
    list_name: &str,
    source: &str,
    items: &[T],
    name_of: F,
    conflicts: &mut Vec<FieldConflict>,
) -> Vec<T>
where
    T: Clone + Serialize,
    F: Fn(&T) -> &String,
{
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    let mut index_by_name: FxHashMap<String, usize> = FxHashMap::default();

    for item in items {
        let name = name_of(item);
        match index_by_name.get(name) {
            None => {
                index_by_name.insert(name.clone(), kept.len());
                kept.push(item.clone());
            }
            Some(&first_index) => {
                record_field_conflicts(
                    list_name,
                    name,
                    source,
                    &kept[first_index],
                    item,
                    conflicts,
                );
            }
        }
    }
    kept
}

/// One conflict entry per field where the duplicate disagrees.
fn record_field_conflicts<T: Serialize>(
    list_name: &str,
    name: &str,
    source: &str,
    kept: &T,
    duplicate: &T,
    conflicts: &mut Vec<FieldConflict>,
) {
    let kept_value = serde_json::to_value(kept).unwrap_or_default();
    let duplicate_value = serde_json::to_value(duplicate).unwrap_or_default();
    let (Some(kept_map), Some(duplicate_map)) =
        (kept_value.as_object(), duplicate_value.as_object())
    else {
        return;
    };

    for (key, kept_field) in kept_map {
        let duplicate_field = duplicate_map
            .get(key)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        if *kept_field != duplicate_field {
            conflicts.push(FieldConflict {
                field: format!("{list_name}[{name}].{key}"),
                source_extractor: source.to_string(),
                reported_value: kept_field.clone(),
                conflicting_extractor: source.to_string(),
                conflicting_value: duplicate_field,
                resolution: ConflictResolution::KeptFirst,
            });
        }
    }
}
