//! Ground-truth adapter.
//!
//! Ground truth is a tabular flat file: one row per field path, with
//! list items keyed by entity name (`zones[Zone 1].floor_area,800`).
//! The adapter keeps the rows in file order so discrepancy reports are
//! stable, and exposes an index keyed by normalised path.

use std::path::Path;

use planlift_core::FxHashMap;

use crate::compare::normalize_name;

/// Errors reading or parsing the ground-truth file.
#[derive(Debug, thiserror::Error)]
pub enum GroundTruthError {
    #[error("Cannot read ground truth at {path}: {message}")]
    Io { path: String, message: String },

    #[error("Ground truth row {row} is malformed: {message}")]
    Malformed { row: usize, message: String },
}

/// One row of the ground-truth table.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthRow {
    /// Path as written in the file.
    pub field_path: String,
    pub value: serde_json::Value,
}

/// The parsed ground-truth record for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    rows: Vec<GroundTruthRow>,
    /// Normalised path to row index.
    index: FxHashMap<String, usize>,
}

impl GroundTruth {
    /// Read `field_path,value` CSV. A header row is expected.
    pub fn from_csv_path(path: &Path) -> Result<Self, GroundTruthError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(path)
            .map_err(|e| GroundTruthError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut truth = GroundTruth::default();
        for (row_number, record) in reader.records().enumerate() {
            let record = record.map_err(|e| GroundTruthError::Malformed {
                row: row_number + 2,
                message: e.to_string(),
            })?;
            let field_path = record
                .get(0)
                .ok_or_else(|| GroundTruthError::Malformed {
                    row: row_number + 2,
                    message: "missing field_path column".to_string(),
                })?
                .trim()
                .to_string();
            if field_path.is_empty() {
                continue;
            }
            let raw_value = record.get(1).unwrap_or("").trim();
            truth.push(field_path, parse_value(raw_value));
        }
        Ok(truth)
    }

    /// Build in memory, mostly for tests.
    pub fn from_rows(rows: impl IntoIterator<Item = (String, serde_json::Value)>) -> Self {
        let mut truth = GroundTruth::default();
        for (path, value) in rows {
            truth.push(path, value);
        }
        truth
    }

    fn push(&mut self, field_path: String, value: serde_json::Value) {
        let normalized = normalize_path(&field_path);
        // Last row wins on duplicate paths; files are hand-curated.
        if let Some(&existing) = self.index.get(&normalized) {
            self.rows[existing].value = value;
            return;
        }
        self.index.insert(normalized, self.rows.len());
        self.rows.push(GroundTruthRow { field_path, value });
    }

    /// Rows in file order.
    pub fn rows(&self) -> &[GroundTruthRow] {
        &self.rows
    }

    pub fn get(&self, normalized_path: &str) -> Option<&serde_json::Value> {
        self.index
            .get(normalized_path)
            .map(|&i| &self.rows[i].value)
    }

    pub fn contains(&self, normalized_path: &str) -> bool {
        self.index.contains_key(normalized_path)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Normalise a field path: entity keys inside brackets are compared
/// case-insensitively with collapsed whitespace, the rest verbatim.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(open) = rest.find('[') {
        let Some(close_rel) = rest[open..].find(']') else {
            break;
        };
        let close = open + close_rel;
        out.push_str(&rest[..open]);
        out.push('[');
        out.push_str(&normalize_name(&rest[open + 1..close]));
        out.push(']');
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

/// CSV cells are typed by content: JSON literals parse as themselves,
/// everything else is a string. Empty means null.
fn parse_value(raw: &str) -> serde_json::Value {
    if raw.is_empty() || raw == "null" {
        return serde_json::Value::Null;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        match value {
            serde_json::Value::Number(_) | serde_json::Value::Bool(_) => return value,
            _ => {}
        }
    }
    serde_json::Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_typed_by_content() {
        assert_eq!(parse_value("800"), serde_json::json!(800));
        assert_eq!(parse_value("0.30"), serde_json::json!(0.30));
        assert_eq!(parse_value("true"), serde_json::json!(true));
        assert_eq!(parse_value(""), serde_json::Value::Null);
        assert_eq!(parse_value("null"), serde_json::Value::Null);
        assert_eq!(parse_value("1 Oak St"), serde_json::json!("1 Oak St"));
    }

    #[test]
    fn path_normalisation_touches_only_bracket_keys() {
        assert_eq!(
            normalize_path("zones[ZONE  1].floor_area"),
            "zones[zone 1].floor_area"
        );
        assert_eq!(normalize_path("project.address"), "project.address");
        assert_eq!(
            normalize_path("water_heating_systems[DHW-1].heaters[0].fuel"),
            "water_heating_systems[dhw-1].heaters[0].fuel"
        );
    }

    #[test]
    fn csv_round_trips_through_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ground_truth.csv");
        std::fs::write(
            &path,
            "field_path,value\n\
             project.address,1 Oak St\n\
             project.climate_zone,12\n\
             zones[Zone 1].floor_area,800\n\
             windows[W1].u_factor,0.30\n",
        )
        .unwrap();
        let truth = GroundTruth::from_csv_path(&path).unwrap();
        assert_eq!(truth.rows().len(), 4);
        assert_eq!(
            truth.get("zones[zone 1].floor_area"),
            Some(&serde_json::json!(800))
        );
        assert_eq!(
            truth.get("project.address"),
            Some(&serde_json::json!("1 Oak St"))
        );
    }

    #[test]
    fn duplicate_path_keeps_last_value() {
        let truth = GroundTruth::from_rows([
            ("project.stories".to_string(), serde_json::json!(1)),
            ("project.stories".to_string(), serde_json::json!(2)),
        ]);
        assert_eq!(truth.rows().len(), 1);
        assert_eq!(truth.get("project.stories"), Some(&serde_json::json!(2)));
    }
}
