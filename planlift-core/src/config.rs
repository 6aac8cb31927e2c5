//! Pipeline configuration.
//!
//! One immutable value per run. Loaded from TOML or built in code; every
//! knob has an `effective_*` accessor supplying the engine default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::ConfigError;
use crate::types::fragments::Domain;

/// Configuration for one extraction / improvement run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Repository root: workers run here, and the applier commits here.
    pub repo_root: PathBuf,
    /// Root directory of the evaluation store.
    pub eval_root: PathBuf,
    /// Root directory of the instruction documents.
    pub instruction_root: PathBuf,
    /// Explicit path to the worker runtime binary. If unset, discovery
    /// falls back to the per-user tool directory and then PATH.
    pub runtime_path: Option<PathBuf>,
    /// Maximum concurrently-running worker processes. Default: 3.
    pub concurrency: Option<usize>,
    /// Per-worker timeout in seconds for most domains. Default: 300.
    pub worker_timeout_secs: Option<u64>,
    /// Timeout in seconds for the page-heavy domains. Default: 600.
    pub rich_worker_timeout_secs: Option<u64>,
    /// Timeout in seconds for the critic worker. Default: 300.
    pub critic_timeout_secs: Option<u64>,
    /// Pause in seconds between worker attempts. Default: 2.
    pub retry_pause_secs: Option<u64>,
    /// Numeric comparison tolerances for the verifier.
    #[serde(default)]
    pub tolerances: ToleranceConfig,
}

/// Verifier tolerance knobs, parametrised per field family.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Absolute floor for numeric equality. Default: 0.01.
    pub absolute: Option<f64>,
    /// Relative tolerance for numeric equality. Default: 0.005.
    pub percent: Option<f64>,
    /// Angular tolerance in degrees. Default: 15.
    pub angle_degrees: Option<f64>,
}

impl ToleranceConfig {
    pub fn effective_absolute(&self) -> f64 {
        self.absolute.unwrap_or(constants::ABSOLUTE_TOLERANCE)
    }

    pub fn effective_percent(&self) -> f64 {
        self.percent.unwrap_or(constants::PERCENT_TOLERANCE)
    }

    pub fn effective_angle_degrees(&self) -> f64 {
        self.angle_degrees.unwrap_or(constants::ANGLE_TOLERANCE_DEG)
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Invalid {
            message: format!("cannot parse {}: {e}", path.display()),
        })
    }

    /// Returns the repository root, defaulting to the current directory.
    pub fn effective_repo_root(&self) -> PathBuf {
        if self.repo_root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.repo_root.clone()
        }
    }

    /// Returns the effective concurrency cap, defaulting to 3.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or(constants::DEFAULT_CONCURRENCY).max(1)
    }

    /// Returns the effective timeout for a domain's worker.
    pub fn effective_timeout(&self, domain: Domain) -> Duration {
        match domain {
            Domain::Zones | Domain::Windows => self
                .rich_worker_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(constants::RICH_WORKER_TIMEOUT),
            _ => self
                .worker_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(constants::DEFAULT_WORKER_TIMEOUT),
        }
    }

    /// Returns the effective timeout for the discovery, orientation, and
    /// critic workers.
    pub fn effective_auxiliary_timeout(&self) -> Duration {
        self.critic_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(constants::DEFAULT_WORKER_TIMEOUT)
    }

    /// Returns the effective inter-attempt pause.
    pub fn effective_retry_pause(&self) -> Duration {
        self.retry_pause_secs
            .map(Duration::from_secs)
            .unwrap_or(constants::RETRY_PAUSE)
    }

    /// Entry-time validation: the instruction root must exist and the
    /// evaluation store root must be writable (created on demand).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.instruction_root.is_dir() {
            return Err(ConfigError::MissingInstructionRoot {
                path: self.instruction_root.clone(),
            });
        }
        std::fs::create_dir_all(&self.eval_root).map_err(|e| ConfigError::UnwritableStore {
            path: self.eval_root.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}
