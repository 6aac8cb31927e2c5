//! The iteration store facade.
//!
//! Per-`(eval_id, iteration)` directories are written by a single task;
//! there is no cross-task write contention. Every write goes through the
//! atomic writer so a crashed run never leaves a torn artefact.

use std::path::{Path, PathBuf};

use planlift_core::errors::StoreError;
use planlift_core::types::building::BuildingSpec;
use planlift_core::types::document::DocumentMap;
use planlift_core::types::evaluation::EvalResult;
use planlift_core::types::proposal::InstructionProposal;
use tracing::debug;

use crate::aggregate::{AggregateHistory, IterationMetrics};
use crate::atomic::{read_json, write_atomic, write_json_atomic};
use crate::layout;

/// One restored or recorded instruction snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    /// Path relative to the instruction root.
    pub relative_path: PathBuf,
    /// `v`-prefixed version the content carries.
    pub version: String,
    pub content: String,
}

/// File-backed store rooted at `eval_root`.
#[derive(Debug, Clone)]
pub struct IterationStore {
    eval_root: PathBuf,
}

impl IterationStore {
    pub fn new(eval_root: impl Into<PathBuf>) -> Self {
        Self {
            eval_root: eval_root.into(),
        }
    }

    pub fn eval_root(&self) -> &Path {
        &self.eval_root
    }

    pub fn eval_dir(&self, eval_id: &str) -> PathBuf {
        layout::eval_dir(&self.eval_root, eval_id)
    }

    pub fn iteration_dir(&self, eval_id: &str, iteration: u32) -> PathBuf {
        layout::iteration_dir(&self.eval_root, eval_id, iteration)
    }

    pub fn ground_truth_path(&self, eval_id: &str) -> PathBuf {
        self.eval_dir(eval_id).join(layout::GROUND_TRUTH_FILE)
    }

    /// Highest existing iteration number, if any iteration exists.
    pub fn latest_iteration(&self, eval_id: &str) -> Result<Option<u32>, StoreError> {
        let dir = layout::iterations_dir(&self.eval_root, eval_id);
        if !dir.exists() {
            return Ok(None);
        }
        let mut latest = None;
        let entries = std::fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, &e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, &e))?;
            if let Some(n) = entry
                .file_name()
                .to_str()
                .and_then(layout::parse_iteration_dirname)
            {
                latest = latest.max(Some(n));
            }
        }
        Ok(latest)
    }

    /// Create the next iteration directory and return its number.
    /// Numbers are monotonically increasing from 001.
    pub fn create_iteration(&self, eval_id: &str) -> Result<u32, StoreError> {
        let next = self.latest_iteration(eval_id)?.unwrap_or(0) + 1;
        let dir = self.iteration_dir(eval_id, next);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, &e))?;
        debug!(eval_id, iteration = next, "created iteration directory");
        Ok(next)
    }

    // ---- per-iteration artefacts ----

    pub fn write_document_map(
        &self,
        eval_id: &str,
        iteration: u32,
        map: &DocumentMap,
    ) -> Result<(), StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::DOCUMENT_MAP_FILE);
        write_json_atomic(&path, map)
    }

    pub fn read_document_map(
        &self,
        eval_id: &str,
        iteration: u32,
    ) -> Result<Option<DocumentMap>, StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::DOCUMENT_MAP_FILE);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn write_extracted(
        &self,
        eval_id: &str,
        iteration: u32,
        spec: &BuildingSpec,
    ) -> Result<(), StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::EXTRACTED_FILE);
        write_json_atomic(&path, spec)
    }

    pub fn read_extracted(
        &self,
        eval_id: &str,
        iteration: u32,
    ) -> Result<BuildingSpec, StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::EXTRACTED_FILE);
        if !path.exists() {
            return Err(StoreError::MissingArtefact {
                eval_id: eval_id.to_string(),
                artefact: layout::EXTRACTED_FILE.to_string(),
            });
        }
        read_json(&path)
    }

    /// The most recent `extracted.json` and the iteration holding it.
    pub fn read_latest_extracted(
        &self,
        eval_id: &str,
    ) -> Result<(u32, BuildingSpec), StoreError> {
        let mut iteration = self.latest_iteration(eval_id)?.ok_or_else(|| {
            StoreError::MissingArtefact {
                eval_id: eval_id.to_string(),
                artefact: layout::EXTRACTED_FILE.to_string(),
            }
        })?;
        // Walk backwards past iterations that died before extraction.
        loop {
            match self.read_extracted(eval_id, iteration) {
                Ok(spec) => return Ok((iteration, spec)),
                Err(StoreError::MissingArtefact { .. }) if iteration > 1 => iteration -= 1,
                Err(e) => return Err(e),
            }
        }
    }

    pub fn write_eval_results(
        &self,
        eval_id: &str,
        iteration: u32,
        result: &EvalResult,
    ) -> Result<(), StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::EVAL_RESULTS_FILE);
        write_json_atomic(&path, result)
    }

    pub fn read_eval_results(
        &self,
        eval_id: &str,
        iteration: u32,
    ) -> Result<EvalResult, StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::EVAL_RESULTS_FILE);
        if !path.exists() {
            return Err(StoreError::MissingArtefact {
                eval_id: eval_id.to_string(),
                artefact: layout::EVAL_RESULTS_FILE.to_string(),
            });
        }
        read_json(&path)
    }

    /// The most recent `eval_results.json` and the iteration holding it.
    pub fn read_latest_eval_results(
        &self,
        eval_id: &str,
    ) -> Result<(u32, EvalResult), StoreError> {
        let mut iteration = self.latest_iteration(eval_id)?.ok_or_else(|| {
            StoreError::MissingArtefact {
                eval_id: eval_id.to_string(),
                artefact: layout::EVAL_RESULTS_FILE.to_string(),
            }
        })?;
        loop {
            match self.read_eval_results(eval_id, iteration) {
                Ok(result) => return Ok((iteration, result)),
                Err(StoreError::MissingArtefact { .. }) if iteration > 1 => iteration -= 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// Written only when an accepted proposal originated this iteration.
    pub fn write_proposal(
        &self,
        eval_id: &str,
        iteration: u32,
        proposal: &InstructionProposal,
    ) -> Result<(), StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::PROPOSAL_FILE);
        write_json_atomic(&path, proposal)
    }

    pub fn read_proposal(
        &self,
        eval_id: &str,
        iteration: u32,
    ) -> Result<Option<InstructionProposal>, StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::PROPOSAL_FILE);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    // ---- snapshots ----

    /// Record an instruction document's pre-apply content under this
    /// iteration's `snapshots/` directory.
    pub fn write_snapshot(
        &self,
        eval_id: &str,
        iteration: u32,
        relative_path: &Path,
        version: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let path = self
            .iteration_dir(eval_id, iteration)
            .join(layout::SNAPSHOTS_DIR)
            .join(layout::snapshot_filename(relative_path, version));
        write_atomic(&path, content.as_bytes())
    }

    /// All snapshots recorded for one iteration, decoded.
    pub fn read_snapshots(
        &self,
        eval_id: &str,
        iteration: u32,
    ) -> Result<Vec<SnapshotEntry>, StoreError> {
        let dir = self
            .iteration_dir(eval_id, iteration)
            .join(layout::SNAPSHOTS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        let read_dir = std::fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, &e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| StoreError::io(&dir, &e))?;
            let name = entry.file_name();
            let Some((relative_path, version)) = name
                .to_str()
                .and_then(layout::parse_snapshot_filename)
            else {
                continue;
            };
            let content = std::fs::read_to_string(entry.path())
                .map_err(|e| StoreError::io(entry.path(), &e))?;
            entries.push(SnapshotEntry {
                relative_path,
                version,
                content,
            });
        }
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(entries)
    }

    // ---- aggregate history ----

    pub fn read_aggregate(&self, eval_id: &str) -> Result<AggregateHistory, StoreError> {
        let path = self.eval_dir(eval_id).join(layout::AGGREGATE_FILE);
        if !path.exists() {
            return Ok(AggregateHistory::default());
        }
        read_json(&path)
    }

    /// Read-modify-write one iteration's metrics into the history.
    pub fn record_aggregate(
        &self,
        eval_id: &str,
        iteration: u32,
        metrics: IterationMetrics,
    ) -> Result<AggregateHistory, StoreError> {
        let mut history = self.read_aggregate(eval_id)?;
        history.record(iteration, metrics);
        let path = self.eval_dir(eval_id).join(layout::AGGREGATE_FILE);
        write_json_atomic(&path, &history)?;
        Ok(history)
    }
}
