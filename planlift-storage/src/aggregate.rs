//! Per-evaluation metric history across improvement iterations.

use std::collections::BTreeMap;

use planlift_core::types::evaluation::{ErrorType, EvalMetrics};
use serde::{Deserialize, Serialize};

/// One iteration's scores in `aggregate.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationMetrics {
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    /// Error-type name to count.
    pub errors_by_type: BTreeMap<String, usize>,
    /// Seconds since the Unix epoch when the iteration was verified.
    pub recorded_at: u64,
}

impl IterationMetrics {
    /// Build from verifier metrics with the caller-supplied timestamp.
    pub fn from_eval(metrics: &EvalMetrics, recorded_at: u64) -> Self {
        let errors_by_type = ErrorType::ALL
            .iter()
            .map(|&e| (e.as_str().to_string(), metrics.count_of(e)))
            .collect();
        Self {
            f1: metrics.f1,
            precision: metrics.precision,
            recall: metrics.recall,
            errors_by_type,
            recorded_at,
        }
    }
}

/// Metric history keyed by zero-padded iteration number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AggregateHistory {
    pub iterations: BTreeMap<String, IterationMetrics>,
}

impl AggregateHistory {
    pub fn record(&mut self, iteration: u32, metrics: IterationMetrics) {
        self.iterations
            .insert(crate::layout::iteration_dirname(iteration), metrics);
    }

    pub fn get(&self, iteration: u32) -> Option<&IterationMetrics> {
        self.iterations
            .get(&crate::layout::iteration_dirname(iteration))
    }

    /// F1 delta between two recorded iterations, when both exist.
    pub fn f1_delta(&self, from: u32, to: u32) -> Option<f64> {
        Some(self.get(to)?.f1 - self.get(from)?.f1)
    }
}
