//! Document mapping: classify every page once per evaluation.

use std::path::PathBuf;
use std::time::Duration;

use planlift_core::errors::WorkerError;
use planlift_core::types::document::DocumentMap;
use planlift_storage::IterationStore;
use tracing::{debug, info};

use crate::prompts;
use crate::worker::{parse_structured, WorkerRuntime};

/// Worker identifier for the discovery worker.
pub const DISCOVERY_WORKER: &str = "discovery";

/// Build (or re-read) the document map for one evaluation iteration.
///
/// The map is cached in the iteration store; within a run every caller
/// after the first gets the cached classification.
pub async fn build_map(
    runtime: &dyn WorkerRuntime,
    store: &IterationStore,
    eval_id: &str,
    iteration: u32,
    page_paths: &[PathBuf],
    timeout: Duration,
) -> Result<DocumentMap, DocMapError> {
    if let Some(cached) = store.read_document_map(eval_id, iteration)? {
        debug!(eval_id, iteration, "document map served from cache");
        return Ok(cached);
    }

    let prompt = prompts::discovery_prompt(page_paths);
    let response = runtime
        .invoke(DISCOVERY_WORKER, &prompt, timeout)
        .await?;
    let value = parse_structured(DISCOVERY_WORKER, &response)?;
    let map: DocumentMap =
        serde_json::from_value(value).map_err(|e| WorkerError::FragmentInvalid {
            worker: DISCOVERY_WORKER.to_string(),
            message: e.to_string(),
        })?;

    if !map.is_consistent_with(page_paths.len()) {
        return Err(WorkerError::FragmentInvalid {
            worker: DISCOVERY_WORKER.to_string(),
            message: format!(
                "map covers {} of {} pages",
                map.pages.len(),
                page_paths.len()
            ),
        }
        .into());
    }

    store.write_document_map(eval_id, iteration, &map)?;
    info!(
        eval_id,
        iteration,
        schedules = map.schedule_pages().len(),
        compliance = map.compliance_pages().len(),
        drawings = map.drawing_pages().len(),
        "document map built"
    );
    Ok(map)
}

/// Discovery failures: either the worker or the store.
#[derive(Debug, thiserror::Error)]
pub enum DocMapError {
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Store(#[from] planlift_core::errors::StoreError),
}
