//! Field-level verification of an extraction against ground truth.
//!
//! Ground truth rows drive the walk, in file order, so reports are
//! deterministic. List items match by normalised name; an unmatched
//! ground-truth item reads as omissions, an unmatched extracted item as
//! hallucinations. Every discrepancy lands in exactly one of the four
//! error classes.

use planlift_core::config::ToleranceConfig;
use planlift_core::types::building::BuildingSpec;
use planlift_core::types::evaluation::{
    ErrorType, EvalMetrics, EvalResult, FieldDiscrepancy,
};
use planlift_core::{FxHashMap, FxHashSet};
use tracing::info;

use crate::compare::{compare_values, normalize_name, Comparison};
use crate::ground_truth::{normalize_path, GroundTruth};

/// Ground-truth lists with at least this many items flag sparseness
/// when extraction returned none.
const SPARSE_LIST_THRESHOLD: usize = 3;

/// Compares extractions to ground truth.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    tolerances: ToleranceConfig,
}

impl Verifier {
    pub fn new(tolerances: ToleranceConfig) -> Self {
        Self { tolerances }
    }

    /// Produce the evaluation result for one extraction.
    pub fn verify(&self, extracted: &BuildingSpec, truth: &GroundTruth) -> EvalResult {
        let flat = flatten_spec(extracted);
        let mut discrepancies = Vec::new();
        let mut true_positives = 0usize;

        // Pass 1: every ground-truth row, in file order.
        for row in truth.rows() {
            let normalized = normalize_path(&row.field_path);
            let actual = flat.get(&normalized);
            let classified = classify(
                &row.field_path,
                &row.value,
                actual.map(|(_, v)| v),
                &self.tolerances,
            );
            match classified {
                Classified::Equal => true_positives += 1,
                Classified::Skip => {}
                Classified::Error(error_type) => discrepancies.push(FieldDiscrepancy {
                    field_path: row.field_path.clone(),
                    expected: row.value.clone(),
                    actual: actual
                        .map(|(_, v)| v.clone())
                        .unwrap_or(serde_json::Value::Null),
                    error_type,
                }),
            }
        }

        // Pass 2: extracted items absent from ground truth entirely.
        let truth_items = item_prefixes(truth.rows().iter().map(|r| r.field_path.as_str()));
        let mut extra_paths: Vec<&String> = flat
            .iter()
            .filter_map(|(normalized, (original, value))| {
                if value.is_null() || truth.contains(normalized) {
                    return None;
                }
                let prefix = item_prefix_str(normalized)?;
                if truth_items.contains(&prefix) {
                    return None;
                }
                Some(original)
            })
            .collect();
        extra_paths.sort();
        for original in extra_paths {
            let normalized = normalize_path(original);
            let (_, value) = &flat[&normalized];
            discrepancies.push(FieldDiscrepancy {
                field_path: original.clone(),
                expected: serde_json::Value::Null,
                actual: value.clone(),
                error_type: ErrorType::Hallucination,
            });
        }

        let sparse_lists = sparse_lists(extracted, truth);
        let metrics = compute_metrics(true_positives, &discrepancies);
        info!(
            tp = true_positives,
            discrepancies = discrepancies.len(),
            f1 = metrics.f1,
            "verification complete"
        );
        EvalResult {
            discrepancies,
            metrics,
            sparse_lists,
        }
    }
}

enum Classified {
    Equal,
    Skip,
    Error(ErrorType),
}

fn classify(
    field_path: &str,
    expected: &serde_json::Value,
    actual: Option<&serde_json::Value>,
    tolerances: &ToleranceConfig,
) -> Classified {
    let expected_null = expected.is_null();
    match actual {
        None | Some(serde_json::Value::Null) => {
            if expected_null {
                // Both sides agree the value is unknown.
                Classified::Equal
            } else {
                Classified::Error(ErrorType::Omission)
            }
        }
        Some(actual) => {
            if expected_null {
                return Classified::Error(ErrorType::Hallucination);
            }
            match compare_values(field_path, expected, actual, tolerances) {
                Comparison::Equal => Classified::Equal,
                Comparison::Different => Classified::Error(ErrorType::WrongValue),
                Comparison::TypeMismatch => Classified::Error(ErrorType::FormatError),
            }
        }
    }
}

fn compute_metrics(true_positives: usize, discrepancies: &[FieldDiscrepancy]) -> EvalMetrics {
    let count = |e: ErrorType| discrepancies.iter().filter(|d| d.error_type == e).count();
    let omissions = count(ErrorType::Omission);
    let hallucinations = count(ErrorType::Hallucination);
    let wrong_values = count(ErrorType::WrongValue);
    let format_errors = count(ErrorType::FormatError);

    let tp = true_positives as f64;
    let fp = (hallucinations + wrong_values + format_errors) as f64;
    let fn_ = (omissions + wrong_values + format_errors) as f64;

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvalMetrics {
        true_positives,
        omissions,
        hallucinations,
        wrong_values,
        format_errors,
        precision,
        recall,
        f1,
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Flatten a `BuildingSpec` into normalised-path -> (original path,
/// value) leaves. Named list items key by name; unnamed nested lists key
/// by index. Status and conflict bookkeeping stay out of scoring.
pub fn flatten_spec(
    spec: &BuildingSpec,
) -> FxHashMap<String, (String, serde_json::Value)> {
    let value = serde_json::to_value(spec).unwrap_or_default();
    let mut flat = FxHashMap::default();
    if let serde_json::Value::Object(map) = value {
        for (key, child) in map {
            if key == "extraction_status" || key == "conflicts" {
                continue;
            }
            flatten_into(&key, &child, &mut flat);
        }
    }
    flat
}

fn flatten_into(
    path: &str,
    value: &serde_json::Value,
    out: &mut FxHashMap<String, (String, serde_json::Value)>,
) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&format!("{path}.{key}"), child, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let key = item
                    .get("name")
                    .and_then(|n| n.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| index.to_string());
                let item_path = format!("{path}[{key}]");
                match item {
                    serde_json::Value::Object(fields) => {
                        for (field, child) in fields {
                            if field == "name" {
                                continue;
                            }
                            flatten_into(&format!("{item_path}.{field}"), child, out);
                        }
                    }
                    other => flatten_into(&item_path, other, out),
                }
            }
        }
        leaf => {
            out.insert(normalize_path(path), (path.to_string(), leaf.clone()));
        }
    }
}

/// First-level `list[key]` prefixes appearing in a set of paths.
fn item_prefixes<'a>(paths: impl Iterator<Item = &'a str>) -> FxHashSet<String> {
    paths.filter_map(item_prefix_str).collect()
}

fn item_prefix_str(path: &str) -> Option<String> {
    let open = path.find('[')?;
    let close = path[open..].find(']')? + open;
    Some(normalize_path(&path[..=close]))
}

/// Ground-truth lists with several items where extraction has none.
fn sparse_lists(extracted: &BuildingSpec, truth: &GroundTruth) -> Vec<String> {
    let mut counts: FxHashMap<&str, FxHashSet<String>> = FxHashMap::default();
    for row in truth.rows() {
        if let Some(open) = row.field_path.find('[') {
            let list = &row.field_path[..open];
            if let Some(close) = row.field_path[open..].find(']') {
                let key = normalize_name(&row.field_path[open + 1..open + close]);
                counts.entry(list).or_default().insert(key);
            }
        }
    }

    let mut sparse = Vec::new();
    for (list, items) in counts {
        if items.len() < SPARSE_LIST_THRESHOLD {
            continue;
        }
        let extracted_len = match list {
            "zones" => extracted.zones.len(),
            "walls" => extracted.walls.len(),
            "windows" => extracted.windows.len(),
            "hvac_systems" => extracted.hvac_systems.len(),
            "water_heating_systems" => extracted.water_heating_systems.len(),
            _ => continue,
        };
        if extracted_len == 0 {
            sparse.push(list.to_string());
        }
    }
    sparse.sort();
    sparse
}
