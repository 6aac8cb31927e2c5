//! Verification output: discrepancies and metrics.

use serde::{Deserialize, Serialize};

/// The four-way error partition. Exactly one applies per discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Expected a value, extraction said null or lacked the item.
    Omission,
    /// Extraction produced a value ground truth does not have.
    Hallucination,
    /// Both present, values differ under the applicable rule.
    WrongValue,
    /// Both present, types disagree.
    FormatError,
}

impl ErrorType {
    pub const ALL: [ErrorType; 4] = [
        ErrorType::Omission,
        ErrorType::Hallucination,
        ErrorType::WrongValue,
        ErrorType::FormatError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Omission => "omission",
            Self::Hallucination => "hallucination",
            Self::WrongValue => "wrong_value",
            Self::FormatError => "format_error",
        }
    }
}

/// One field-level disagreement between extraction and ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiscrepancy {
    /// Dotted path, list items keyed by name: `windows[W1].u_factor`.
    pub field_path: String,
    pub expected: serde_json::Value,
    pub actual: serde_json::Value,
    pub error_type: ErrorType,
}

/// Per-evaluation counts and scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EvalMetrics {
    pub true_positives: usize,
    pub omissions: usize,
    pub hallucinations: usize,
    pub wrong_values: usize,
    pub format_errors: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl EvalMetrics {
    pub fn count_of(&self, error_type: ErrorType) -> usize {
        match error_type {
            ErrorType::Omission => self.omissions,
            ErrorType::Hallucination => self.hallucinations,
            ErrorType::WrongValue => self.wrong_values,
            ErrorType::FormatError => self.format_errors,
        }
    }
}

/// Result of verifying one extraction against ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EvalResult {
    pub discrepancies: Vec<FieldDiscrepancy>,
    pub metrics: EvalMetrics,
    /// Lists where ground truth has several items and extraction has none.
    pub sparse_lists: Vec<String>,
}

/// Arithmetic mean of per-evaluation F1 scores; 0 when empty.
pub fn macro_f1(results: &[EvalResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.metrics.f1).sum::<f64>() / results.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_f1_is_mean_of_f1s() {
        let mk = |f1: f64| EvalResult {
            metrics: EvalMetrics {
                f1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(macro_f1(&[]), 0.0);
        let scores = [mk(0.5), mk(1.0)];
        assert!((macro_f1(&scores) - 0.75).abs() < 1e-12);
    }
}
