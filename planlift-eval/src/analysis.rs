//! Failure aggregation across evaluations.
//!
//! Takes the latest `EvalResult` per evaluation and produces one
//! analysis: counts by error type and by top-level domain, the dominant
//! axes, aggregate F1, and a bounded sample of discrepancies spread
//! round-robin across error types so no single failure mode floods the
//! critic's context.

use std::collections::BTreeMap;

use planlift_core::constants::MAX_SAMPLE_DISCREPANCIES;
use planlift_core::types::evaluation::{macro_f1, ErrorType, EvalResult, FieldDiscrepancy};
use serde::{Deserialize, Serialize};

/// Aggregated failure picture across a batch of evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FailureAnalysis {
    pub eval_count: usize,
    pub total_discrepancies: usize,
    pub counts_by_type: BTreeMap<String, usize>,
    pub counts_by_domain: BTreeMap<String, usize>,
    pub dominant_error_type: Option<ErrorType>,
    pub dominant_domain: Option<String>,
    /// Macro-F1 across the batch.
    pub aggregate_f1: f64,
    /// At most 20 discrepancies, balanced across error types.
    pub sample: Vec<FieldDiscrepancy>,
}

/// Aggregate the latest results of a batch, in manifest order.
pub fn analyse(results: &[(String, EvalResult)]) -> FailureAnalysis {
    let mut counts_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut counts_by_domain: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_type: BTreeMap<ErrorType, Vec<&FieldDiscrepancy>> = BTreeMap::new();

    for (_, result) in results {
        for discrepancy in &result.discrepancies {
            *counts_by_type
                .entry(discrepancy.error_type.as_str().to_string())
                .or_default() += 1;
            *counts_by_domain
                .entry(top_level_domain(&discrepancy.field_path))
                .or_default() += 1;
            by_type.entry(discrepancy.error_type).or_default().push(discrepancy);
        }
    }

    let total_discrepancies = counts_by_type.values().sum();
    let dominant_error_type = dominant(&counts_by_type).and_then(parse_error_type);
    let dominant_domain = dominant(&counts_by_domain).map(str::to_string);

    let eval_results: Vec<EvalResult> = results.iter().map(|(_, r)| r.clone()).collect();
    let aggregate_f1 = macro_f1(&eval_results);

    FailureAnalysis {
        eval_count: results.len(),
        total_discrepancies,
        counts_by_type,
        counts_by_domain,
        dominant_error_type,
        dominant_domain,
        aggregate_f1,
        sample: sample_round_robin(&by_type),
    }
}

/// First path segment, stripped of any `[key]` indexing.
fn top_level_domain(field_path: &str) -> String {
    let first = field_path
        .split('.')
        .next()
        .unwrap_or(field_path);
    match first.find('[') {
        Some(open) => first[..open].to_string(),
        None => first.to_string(),
    }
}

/// Key with the highest count; ties break on key order for determinism.
fn dominant(counts: &BTreeMap<String, usize>) -> Option<&str> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(k, _)| k.as_str())
}

fn parse_error_type(name: &str) -> Option<ErrorType> {
    ErrorType::ALL.into_iter().find(|e| e.as_str() == name)
}

/// Take discrepancies one error type at a time until the cap is hit, so
/// the sample covers every failure mode present.
fn sample_round_robin(
    by_type: &BTreeMap<ErrorType, Vec<&FieldDiscrepancy>>,
) -> Vec<FieldDiscrepancy> {
    let mut sample = Vec::new();
    let mut depth = 0usize;
    loop {
        let mut took_any = false;
        for discrepancies in by_type.values() {
            if let Some(&discrepancy) = discrepancies.get(depth) {
                if sample.len() >= MAX_SAMPLE_DISCREPANCIES {
                    return sample;
                }
                sample.push(discrepancy.clone());
                took_any = true;
            }
        }
        if !took_any {
            return sample;
        }
        depth += 1;
    }
}
