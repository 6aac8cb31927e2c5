//! Proposal validation and application errors.

use std::path::PathBuf;

use super::error_code::{self, PlanliftErrorCode};

/// Reasons a critic proposal is rejected before application.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("Target {path} is outside the instruction root {root}")]
    TargetOutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Version mismatch for {path}: proposal says {proposed}, document header says {actual}")]
    VersionMismatch {
        path: PathBuf,
        proposed: String,
        actual: String,
    },

    #[error("Proposed version {proposed} is not a valid {expected} bump of {current}")]
    InvalidBump {
        current: String,
        proposed: String,
        expected: &'static str,
    },

    #[error("Proposed change text is empty")]
    EmptyChange,

    #[error("No version header found in {path}")]
    UnversionedTarget { path: PathBuf },

    #[error("Malformed proposal: {message}")]
    Malformed { message: String },
}

impl PlanliftErrorCode for ProposalError {
    fn error_code(&self) -> &'static str {
        let _ = self;
        error_code::PROPOSAL_REJECTED
    }
}

/// Errors while applying an accepted proposal. The snapshot taken before
/// the failure is preserved so rollback remains possible.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("Document {path} changed since proposal was made (header now {actual})")]
    ConcurrentlyModified { path: PathBuf, actual: String },

    #[error("Section heading not found in {path}: {heading}")]
    HeadingNotFound { path: PathBuf, heading: String },

    #[error("Proposed change for a section edit must begin with a '##' heading")]
    MissingHeading,

    #[error("Atomic write failed for {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    #[error("Version-control commit failed: {message}")]
    CommitFailed { message: String },

    #[error(transparent)]
    Rejected(#[from] ProposalError),

    #[error(transparent)]
    Store(#[from] super::StoreError),
}

impl PlanliftErrorCode for ApplyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            _ => error_code::APPLY_FAILED,
        }
    }
}
