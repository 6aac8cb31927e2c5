//! Concurrency-limited parallel extraction with per-worker retry.
//!
//! Seven tasks are submitted per evaluation: the five domain extractors
//! and the two orientation passes. A counting semaphore bounds how many
//! worker processes run at once; tasks complete independently and a
//! single failure never cancels its siblings. The merge input is
//! collected in canonical domain order, never completion order.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use planlift_core::config::PipelineConfig;
use planlift_core::errors::WorkerError;
use planlift_core::types::document::DocumentMap;
use planlift_core::types::fragments::{Domain, ExtractionOutcome, ExtractionStatus, Fragment};
use planlift_core::FxHashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::extractors;
use crate::orientation::{self, OrientationEstimate, PassKind, PassResult};
use crate::prompts;
use crate::router;
use crate::worker::{parse_structured, WorkerRuntime};

/// Attempts per task: the first try plus one retry.
const MAX_ATTEMPTS: u32 = 2;

/// Everything the orchestrator needs for one evaluation.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub eval_id: String,
    pub iteration: u32,
    /// Page images in page order (`page-001.png`, ...).
    pub page_paths: Vec<PathBuf>,
    pub document_map: DocumentMap,
}

/// One domain's fragment (when extraction succeeded) and its status.
#[derive(Debug, Clone)]
pub struct DomainOutcome {
    pub fragment: Option<Fragment>,
    pub status: ExtractionStatus,
}

/// Output of one parallel extraction run, ready for the merge engine.
#[derive(Debug, Clone)]
pub struct ExtractionRun {
    /// Keyed in canonical domain order.
    pub outcomes: BTreeMap<Domain, DomainOutcome>,
    pub orientation: Option<OrientationEstimate>,
    pub orientation_status: ExtractionStatus,
    /// Routing truncation notes, if any page list hit the cap.
    pub routing_notes: Vec<String>,
}

enum TaskOutput {
    Extractor(Domain, u32, Result<Fragment, WorkerError>),
    Pass(PassKind, u32, Result<PassResult, WorkerError>),
}

/// Runs the extractors and orientation passes for one evaluation.
pub struct Orchestrator {
    runtime: Arc<dyn WorkerRuntime>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(runtime: Arc<dyn WorkerRuntime>, config: PipelineConfig) -> Self {
        Self { runtime, config }
    }

    /// Run all tasks to completion and assemble the per-domain outcomes.
    ///
    /// Never fails: each domain ends in `Success` or `Failed`, and the
    /// caller merges whatever survived.
    pub async fn run(&self, ctx: &EvalContext) -> ExtractionRun {
        let semaphore = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
        let mut routing_notes = Vec::new();

        for domain in Domain::EXTRACTORS {
            let routed = router::route(domain, &ctx.document_map);
            if let Some(note) = &routed.truncation_note {
                routing_notes.push(note.clone());
            }
            let prompt = prompts::extractor_prompt(
                domain,
                &extractors::instruction_doc(domain),
                &ctx.document_map,
                &routed,
                &ctx.page_paths,
            );
            let runtime = Arc::clone(&self.runtime);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.config.effective_timeout(domain);
            let retry_pause = self.config.effective_retry_pause();
            tasks.spawn(async move {
                let worker = extractors::worker_name(domain);
                let (attempts, result) = attempt_twice(&semaphore, retry_pause, || {
                    let runtime = Arc::clone(&runtime);
                    let prompt = prompt.clone();
                    async move {
                        let response = runtime.invoke(worker, &prompt, timeout).await?;
                        let value = parse_structured(worker, &response)?;
                        extractors::parse_fragment(domain, value)
                    }
                })
                .await;
                TaskOutput::Extractor(domain, attempts, result)
            });
        }

        let orientation_pages = orientation_page_paths(ctx);
        for kind in [PassKind::NorthArrowAndEntry, PassKind::ElevationAndWallEdge] {
            let prompt = match kind {
                PassKind::NorthArrowAndEntry => {
                    prompts::orientation_pass1_prompt(&orientation_pages)
                }
                PassKind::ElevationAndWallEdge => {
                    prompts::orientation_pass2_prompt(&orientation_pages)
                }
            };
            let runtime = Arc::clone(&self.runtime);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.config.effective_auxiliary_timeout();
            let retry_pause = self.config.effective_retry_pause();
            tasks.spawn(async move {
                let worker = extractors::worker_name(Domain::Orientation);
                let (attempts, result) = attempt_twice(&semaphore, retry_pause, || {
                    let runtime = Arc::clone(&runtime);
                    let prompt = prompt.clone();
                    async move {
                        let response = runtime.invoke(worker, &prompt, timeout).await?;
                        orientation::parse_pass(worker, &response)
                    }
                })
                .await;
                TaskOutput::Pass(kind, attempts, result)
            });
        }

        // Wait for every submission; completion order is irrelevant.
        let mut fragments: FxHashMap<Domain, (u32, Result<Fragment, WorkerError>)> =
            FxHashMap::default();
        let mut passes: FxHashMap<PassKind, (u32, Result<PassResult, WorkerError>)> =
            FxHashMap::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutput::Extractor(domain, attempts, result)) => {
                    fragments.insert(domain, (attempts, result));
                }
                Ok(TaskOutput::Pass(kind, attempts, result)) => {
                    passes.insert(kind, (attempts, result));
                }
                Err(join_error) => {
                    // A panicked task surfaces nowhere else; log and let
                    // the affected domain read as missing below.
                    warn!(error = %join_error, "extraction task panicked");
                }
            }
        }

        // Canonical-order collection keeps conflict tie-breaking stable.
        let mut outcomes = BTreeMap::new();
        for domain in Domain::EXTRACTORS {
            let outcome = match fragments.remove(&domain) {
                Some((attempts, Ok(fragment))) => {
                    info!(%domain, attempts, eval_id = %ctx.eval_id, "domain extracted");
                    DomainOutcome {
                        fragment: Some(fragment),
                        status: ExtractionStatus::success(attempts),
                    }
                }
                Some((attempts, Err(error))) => {
                    warn!(%domain, attempts, %error, eval_id = %ctx.eval_id, "domain failed");
                    DomainOutcome {
                        fragment: None,
                        status: ExtractionStatus::failed(attempts, error.to_string()),
                    }
                }
                None => DomainOutcome {
                    fragment: None,
                    status: ExtractionStatus::failed(0, "task never completed"),
                },
            };
            outcomes.insert(domain, outcome);
        }

        let (orientation, orientation_status) = reconcile_passes(passes);

        ExtractionRun {
            outcomes,
            orientation,
            orientation_status,
            routing_notes,
        }
    }
}

/// Run up to two attempts, each holding one semaphore permit for the
/// duration of its worker process. The permit is released across the
/// retry pause so a waiting sibling can use the slot.
async fn attempt_twice<T, F, Fut>(
    semaphore: &Semaphore,
    retry_pause: std::time::Duration,
    mut attempt: F,
) -> (u32, Result<T, WorkerError>)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, WorkerError>>,
{
    let mut last_error = None;
    for attempt_number in 1..=MAX_ATTEMPTS {
        let permit = semaphore.acquire().await;
        if permit.is_err() {
            // Semaphore closed: the run is being cancelled.
            break;
        }
        let result = attempt().await;
        drop(permit);
        match result {
            Ok(value) => return (attempt_number, Ok(value)),
            Err(error) => {
                last_error = Some(error);
                if attempt_number < MAX_ATTEMPTS {
                    tokio::time::sleep(retry_pause).await;
                }
            }
        }
    }
    (
        MAX_ATTEMPTS,
        Err(last_error.unwrap_or(WorkerError::NotAvailable {
            hint: "run cancelled".to_string(),
        })),
    )
}

/// Orientation reads the drawings (site plans and elevations).
fn orientation_page_paths(ctx: &EvalContext) -> Vec<PathBuf> {
    let routed = router::route(Domain::Orientation, &ctx.document_map);
    routed
        .pages
        .iter()
        .filter_map(|&page| ctx.page_paths.get(page - 1).cloned())
        .collect()
}

fn reconcile_passes(
    mut passes: FxHashMap<PassKind, (u32, Result<PassResult, WorkerError>)>,
) -> (Option<OrientationEstimate>, ExtractionStatus) {
    let (attempts1, pass1) = passes
        .remove(&PassKind::NorthArrowAndEntry)
        .unwrap_or((0, Err(missing_pass())));
    let (attempts2, pass2) = passes
        .remove(&PassKind::ElevationAndWallEdge)
        .unwrap_or((0, Err(missing_pass())));
    let attempts = attempts1.max(attempts2);

    match (pass1, pass2) {
        (Ok(p1), Ok(p2)) => {
            let estimate = orientation::reconcile(&p1, &p2);
            (Some(estimate), ExtractionStatus::success(attempts))
        }
        (Ok(p), Err(error)) | (Err(error), Ok(p)) => {
            let estimate = orientation::reconcile::single_pass(&p);
            let status = ExtractionStatus {
                outcome: ExtractionOutcome::Partial,
                attempts,
                error: Some(error.to_string()),
            };
            (Some(estimate), status)
        }
        (Err(error1), Err(error2)) => (
            None,
            ExtractionStatus::failed(attempts, format!("pass 1: {error1}; pass 2: {error2}")),
        ),
    }
}

fn missing_pass() -> WorkerError {
    WorkerError::NotAvailable {
        hint: "orientation pass never completed".to_string(),
    }
}
