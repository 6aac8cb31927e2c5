//! Field comparison rules.
//!
//! Numbers carry an absolute floor and a relative tolerance; ratio
//! fields drop the floor; angle fields compare on the circle. Strings
//! compare case-insensitively after whitespace collapse, and addresses
//! additionally shed `,` and `.` punctuation.

use planlift_core::angles::angular_distance;
use planlift_core::config::ToleranceConfig;

/// Outcome of comparing two present values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    Different,
    TypeMismatch,
}

/// Compare two non-null values under the rule for `field_path`.
pub fn compare_values(
    field_path: &str,
    expected: &serde_json::Value,
    actual: &serde_json::Value,
    tolerances: &ToleranceConfig,
) -> Comparison {
    use serde_json::Value;

    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => {
            let (Some(e), Some(a)) = (e.as_f64(), a.as_f64()) else {
                return Comparison::Different;
            };
            if numbers_equal(field_path, e, a, tolerances) {
                Comparison::Equal
            } else {
                Comparison::Different
            }
        }
        (Value::String(e), Value::String(a)) => {
            let equal = if is_address_field(field_path) {
                normalize_address(e) == normalize_address(a)
            } else {
                normalize_name(e) == normalize_name(a)
            };
            if equal {
                Comparison::Equal
            } else {
                Comparison::Different
            }
        }
        (Value::Bool(e), Value::Bool(a)) => {
            if e == a {
                Comparison::Equal
            } else {
                Comparison::Different
            }
        }
        _ => Comparison::TypeMismatch,
    }
}

fn numbers_equal(field_path: &str, expected: f64, actual: f64, tolerances: &ToleranceConfig) -> bool {
    if is_angle_field(field_path) {
        return angular_distance(expected, actual) <= tolerances.effective_angle_degrees();
    }
    let percent_band = tolerances.effective_percent() * expected.abs();
    let band = if is_ratio_field(field_path) {
        // Ratios get no absolute floor; 0.5% of the value only.
        percent_band
    } else {
        percent_band.max(tolerances.effective_absolute())
    };
    (expected - actual).abs() <= band
}

/// Field-family detection by the final path segment.
fn final_segment(field_path: &str) -> &str {
    field_path
        .rsplit('.')
        .next()
        .unwrap_or(field_path)
}

pub fn is_ratio_field(field_path: &str) -> bool {
    final_segment(field_path).ends_with("_ratio")
}

pub fn is_angle_field(field_path: &str) -> bool {
    let segment = final_segment(field_path);
    segment.ends_with("orientation") || segment.ends_with("azimuth")
}

pub fn is_address_field(field_path: &str) -> bool {
    final_segment(field_path).contains("address")
}

/// Case-fold, trim, collapse internal whitespace.
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Name normalisation plus dropping `,` and `.`.
pub fn normalize_address(s: &str) -> String {
    let stripped: String = s.chars().filter(|&c| c != ',' && c != '.').collect();
    normalize_name(&stripped)
}
