//! Iteration-store errors.

use std::path::PathBuf;

use super::error_code::{self, PlanliftErrorCode};

/// Errors that can occur in the iteration store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Corrupt artefact at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Missing artefact: no {artefact} for evaluation '{eval_id}'")]
    MissingArtefact { eval_id: String, artefact: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl PlanliftErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => error_code::STORE_IO,
            Self::Corrupt { .. } => error_code::STORE_CORRUPT,
            Self::MissingArtefact { .. } => error_code::STORE_MISSING_ARTEFACT,
        }
    }
}
