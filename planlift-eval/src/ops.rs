//! The operation surface of the engine.
//!
//! One `Pipeline` per run, built from an immutable config. Operations
//! return typed summaries; only configuration errors and unrecoverable
//! store failures escape as errors. Within an improvement iteration the
//! sequence is strictly extract, verify, propose, apply, extract again.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use planlift_core::config::PipelineConfig;
use planlift_core::errors::{ApplyError, ConfigError, StoreError, WorkerError};
use planlift_core::types::building::Confidence;
use planlift_core::types::evaluation::EvalMetrics;
use planlift_core::types::fragments::{Domain, ExtractionOutcome};
use planlift_core::types::proposal::InstructionProposal;
use planlift_extract::docmap::{self, DocMapError};
use planlift_extract::orchestrator::EvalContext;
use planlift_extract::{MergeEngine, Orchestrator, ProcessRuntime, WorkerRuntime};
use planlift_storage::layout;
use planlift_storage::{IterationMetrics, IterationStore};
use tracing::info;

use crate::analysis::{analyse, FailureAnalysis};
use crate::applier::ProposalApplier;
use crate::critic::{self, CriticError};
use crate::ground_truth::{GroundTruth, GroundTruthError};
use crate::verifier::Verifier;

/// Errors escaping the operation surface.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    DocMap(#[from] DocMapError),
    #[error(transparent)]
    GroundTruth(#[from] GroundTruthError),
    #[error(transparent)]
    Critic(#[from] CriticError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Summary of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractSummary {
    pub eval_id: String,
    pub iteration: u32,
    pub succeeded: Vec<Domain>,
    pub failed: Vec<Domain>,
    pub conflicts: usize,
    pub orientation_confidence: Option<Confidence>,
    /// Routing truncation notes recorded during this run.
    pub routing_notes: Vec<String>,
}

/// Summary of one verification run.
#[derive(Debug, Clone)]
pub struct VerifySummary {
    pub eval_id: String,
    pub iteration: u32,
    pub metrics: EvalMetrics,
    pub discrepancy_count: usize,
}

/// Wires config, worker runtime, store, verifier, and applier together.
pub struct Pipeline {
    config: PipelineConfig,
    runtime: Arc<dyn WorkerRuntime>,
    store: IterationStore,
    verifier: Verifier,
}

impl Pipeline {
    /// Build a pipeline with the production subprocess runtime.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        planlift_core::tracing::init();
        let runtime = ProcessRuntime::discover(
            config.runtime_path.as_deref(),
            config.effective_repo_root(),
        )
        .map_err(|e| match e {
            WorkerError::NotAvailable { hint } => ConfigError::MissingRuntime { hint },
            other => ConfigError::Invalid {
                message: other.to_string(),
            },
        })?;
        Self::with_runtime(config, Arc::new(runtime))
    }

    /// Build a pipeline over any worker runtime (tests use scripted ones).
    pub fn with_runtime(
        config: PipelineConfig,
        runtime: Arc<dyn WorkerRuntime>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = IterationStore::new(&config.eval_root);
        let verifier = Verifier::new(config.tolerances.clone());
        Ok(Self {
            config,
            runtime,
            store,
            verifier,
        })
    }

    pub fn store(&self) -> &IterationStore {
        &self.store
    }

    /// The applier bound to this run's instruction root and store.
    pub fn applier(&self) -> ProposalApplier {
        ProposalApplier::new(
            &self.config.instruction_root,
            self.config.effective_repo_root(),
            self.store.clone(),
        )
    }

    /// Run the extraction pipeline for one evaluation and persist
    /// `extracted.json` under a fresh iteration.
    pub async fn extract(&self, eval_id: &str) -> Result<ExtractSummary, PipelineError> {
        let page_paths = self.page_images(eval_id)?;
        let iteration = self.store.create_iteration(eval_id)?;
        info!(eval_id, iteration, pages = page_paths.len(), "extraction started");

        let document_map = docmap::build_map(
            self.runtime.as_ref(),
            &self.store,
            eval_id,
            iteration,
            &page_paths,
            self.config.effective_auxiliary_timeout(),
        )
        .await?;

        let ctx = EvalContext {
            eval_id: eval_id.to_string(),
            iteration,
            page_paths,
            document_map,
        };
        let orchestrator = Orchestrator::new(Arc::clone(&self.runtime), self.config.clone());
        let run = orchestrator.run(&ctx).await;
        let spec = MergeEngine::merge(&run);
        self.store.write_extracted(eval_id, iteration, &spec)?;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (domain, status) in &spec.extraction_status {
            match status.outcome {
                ExtractionOutcome::Failed => failed.push(*domain),
                _ => succeeded.push(*domain),
            }
        }
        Ok(ExtractSummary {
            eval_id: eval_id.to_string(),
            iteration,
            succeeded,
            failed,
            conflicts: spec.conflicts.len(),
            orientation_confidence: spec.project.orientation_confidence,
            routing_notes: run.routing_notes,
        })
    }

    /// Verify the latest extraction against ground truth and persist
    /// `eval_results.json` plus the aggregate history entry.
    pub fn verify(&self, eval_id: &str) -> Result<VerifySummary, PipelineError> {
        let (iteration, extracted) = self.store.read_latest_extracted(eval_id)?;
        let truth = GroundTruth::from_csv_path(&self.store.ground_truth_path(eval_id))?;
        let result = self.verifier.verify(&extracted, &truth);

        self.store.write_eval_results(eval_id, iteration, &result)?;
        self.store.record_aggregate(
            eval_id,
            iteration,
            IterationMetrics::from_eval(&result.metrics, unix_now()),
        )?;

        Ok(VerifySummary {
            eval_id: eval_id.to_string(),
            iteration,
            discrepancy_count: result.discrepancies.len(),
            metrics: result.metrics,
        })
    }

    /// Aggregate the latest eval results across a batch, in the order
    /// given (the manifest order).
    pub fn analyse(&self, eval_ids: &[String]) -> Result<FailureAnalysis, PipelineError> {
        let mut results = Vec::with_capacity(eval_ids.len());
        for eval_id in eval_ids {
            let (_, result) = self.store.read_latest_eval_results(eval_id)?;
            results.push((eval_id.clone(), result));
        }
        Ok(analyse(&results))
    }

    /// Ask the critic for a proposal. `Ok(None)` when it declines.
    pub async fn propose(
        &self,
        analysis: &FailureAnalysis,
    ) -> Result<Option<InstructionProposal>, PipelineError> {
        critic::propose(
            self.runtime.as_ref(),
            &self.config.instruction_root,
            analysis,
            self.config.effective_auxiliary_timeout(),
        )
        .await
        .map_err(PipelineError::from)
    }

    /// Apply an accepted proposal, snapshotting into every active
    /// evaluation's given iteration.
    pub fn apply(
        &self,
        proposal: &InstructionProposal,
        active_evals: &[(String, u32)],
    ) -> Result<PathBuf, PipelineError> {
        self.applier()
            .apply(proposal, active_evals)
            .map_err(PipelineError::from)
    }

    /// Restore the snapshots recorded by one iteration.
    pub fn rollback(&self, eval_id: &str, iteration: u32) -> Result<usize, PipelineError> {
        self.applier()
            .rollback(eval_id, iteration)
            .map_err(PipelineError::from)
    }

    /// Page images for one evaluation: `pages/page-NNN.png`, page order.
    fn page_images(&self, eval_id: &str) -> Result<Vec<PathBuf>, PipelineError> {
        let dir = self.store.eval_dir(eval_id).join(layout::PAGES_DIR);
        let entries = std::fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, &e))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "png")
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("page-"))
            })
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(StoreError::MissingArtefact {
                eval_id: eval_id.to_string(),
                artefact: layout::PAGES_DIR.to_string(),
            }
            .into());
        }
        Ok(paths)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
