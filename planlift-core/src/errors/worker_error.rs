//! Worker invocation errors.

use super::error_code::{self, PlanliftErrorCode};

/// Errors raised while invoking an extraction worker.
///
/// Everything here is transient from the orchestrator's point of view:
/// one retry, then the owning domain is marked failed.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker runtime not available: {hint}")]
    NotAvailable { hint: String },

    #[error("Worker '{worker}' timed out after {seconds}s")]
    Timeout { worker: String, seconds: u64 },

    #[error("Worker '{worker}' exited with code {code}: {stderr}")]
    Failed {
        worker: String,
        code: i32,
        stderr: String,
    },

    #[error("Worker '{worker}' produced no parseable JSON: {snippet}")]
    Malformed { worker: String, snippet: String },

    #[error("Worker '{worker}' fragment failed validation: {message}")]
    FragmentInvalid { worker: String, message: String },

    #[error("Failed to spawn worker '{worker}': {message}")]
    Spawn { worker: String, message: String },
}

impl PlanliftErrorCode for WorkerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAvailable { .. } => error_code::WORKER_NOT_AVAILABLE,
            Self::Timeout { .. } => error_code::WORKER_TIMEOUT,
            Self::Failed { .. } | Self::Spawn { .. } => error_code::WORKER_FAILED,
            Self::Malformed { .. } => error_code::WORKER_MALFORMED,
            Self::FragmentInvalid { .. } => error_code::FRAGMENT_INVALID,
        }
    }
}
