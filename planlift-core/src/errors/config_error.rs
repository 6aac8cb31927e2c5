//! Configuration errors. Fatal at pipeline entry.

use std::path::PathBuf;

use super::error_code::{self, PlanliftErrorCode};

/// Errors detected while loading or validating the pipeline configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Instruction root does not exist: {path}")]
    MissingInstructionRoot { path: PathBuf },

    #[error("Worker runtime binary not found: {hint}")]
    MissingRuntime { hint: String },

    #[error("Evaluation store root is not writable: {path}: {message}")]
    UnwritableStore { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl PlanliftErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingInstructionRoot { .. } => error_code::CONFIG_MISSING_INSTRUCTION_ROOT,
            Self::MissingRuntime { .. } => error_code::CONFIG_MISSING_RUNTIME,
            Self::UnwritableStore { .. } | Self::Invalid { .. } => error_code::CONFIG_INVALID,
        }
    }
}
