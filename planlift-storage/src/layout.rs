//! Directory and file naming for the evaluation store.
//!
//! ```text
//! <eval_root>/<eval_id>/
//!   ground_truth.csv
//!   aggregate.json
//!   iterations/
//!     iteration-001/
//!       document_map.json
//!       extracted.json
//!       eval_results.json
//!       proposal.json
//!       snapshots/
//!         project-extractor__instructions.md.v1.0.0.md
//! ```

use std::path::{Path, PathBuf};

pub const GROUND_TRUTH_FILE: &str = "ground_truth.csv";
pub const PAGES_DIR: &str = "pages";
pub const AGGREGATE_FILE: &str = "aggregate.json";
pub const ITERATIONS_DIR: &str = "iterations";
pub const DOCUMENT_MAP_FILE: &str = "document_map.json";
pub const EXTRACTED_FILE: &str = "extracted.json";
pub const EVAL_RESULTS_FILE: &str = "eval_results.json";
pub const PROPOSAL_FILE: &str = "proposal.json";
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// `iteration-001`, `iteration-002`, ...
pub fn iteration_dirname(number: u32) -> String {
    format!("iteration-{number:03}")
}

/// Inverse of [`iteration_dirname`]. Rejects anything else.
pub fn parse_iteration_dirname(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("iteration-")?;
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn eval_dir(eval_root: &Path, eval_id: &str) -> PathBuf {
    eval_root.join(eval_id)
}

pub fn iterations_dir(eval_root: &Path, eval_id: &str) -> PathBuf {
    eval_dir(eval_root, eval_id).join(ITERATIONS_DIR)
}

pub fn iteration_dir(eval_root: &Path, eval_id: &str, number: u32) -> PathBuf {
    iterations_dir(eval_root, eval_id).join(iteration_dirname(number))
}

/// Encode an instruction-root-relative path plus its version into a
/// snapshot filename: `project-extractor/instructions.md` at `v1.0.0`
/// becomes `project-extractor__instructions.md.v1.0.0.md`.
pub fn snapshot_filename(relative_path: &Path, version: &str) -> String {
    let flat = relative_path
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "__")
        .replace('/', "__");
    format!("{flat}.{version}.md")
}

/// Inverse of [`snapshot_filename`]: recover the relative path and version.
pub fn parse_snapshot_filename(name: &str) -> Option<(PathBuf, String)> {
    let stem = name.strip_suffix(".md")?;
    let (flat, version_digits) = stem.rsplit_once(".v")?;
    let version = format!("v{version_digits}");
    if !version_digits
        .split('.')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    Some((PathBuf::from(flat.replace("__", "/")), version))
}
