//! The worker runtime seam and its subprocess implementation.
//!
//! Workers are opaque black boxes: all input goes through the prompt on
//! stdin, all output comes back on stdout. Nothing is shared in process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use planlift_core::constants::STDERR_EXCERPT_BYTES;
use planlift_core::errors::WorkerError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Conventional name of the worker runtime binary.
pub const RUNTIME_BINARY: &str = "planlift-worker";

/// Invokes a named worker with a prompt and returns its stdout.
///
/// Synchronous in spirit: each call owns exactly one child process.
/// Concurrency is the caller's business.
#[async_trait]
pub trait WorkerRuntime: Send + Sync {
    async fn invoke(
        &self,
        worker: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, WorkerError>;
}

/// Production runtime: spawns the `planlift-worker` binary.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
    binary: PathBuf,
    /// Working directory for workers, so they can read the instruction
    /// documents they are allowed to access.
    repo_root: PathBuf,
}

impl ProcessRuntime {
    /// Resolve the runtime binary and build the runtime.
    ///
    /// Search order: explicit override, `~/.planlift/bin/`, then PATH.
    pub fn discover(
        override_path: Option<&Path>,
        repo_root: impl Into<PathBuf>,
    ) -> Result<Self, WorkerError> {
        let binary = Self::find_binary(override_path)?;
        Ok(Self {
            binary,
            repo_root: repo_root.into(),
        })
    }

    fn find_binary(override_path: Option<&Path>) -> Result<PathBuf, WorkerError> {
        if let Some(path) = override_path {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(WorkerError::NotAvailable {
                hint: format!("configured runtime {} does not exist", path.display()),
            });
        }

        if let Some(home) = dirs::home_dir() {
            let tool_path = home.join(".planlift").join("bin").join(RUNTIME_BINARY);
            if tool_path.exists() {
                return Ok(tool_path);
            }
        }

        which::which(RUNTIME_BINARY).map_err(|_| WorkerError::NotAvailable {
            hint: format!("'{RUNTIME_BINARY}' not found in ~/.planlift/bin or PATH"),
        })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl WorkerRuntime for ProcessRuntime {
    async fn invoke(
        &self,
        worker: &str,
        prompt: &str,
        deadline: Duration,
    ) -> Result<String, WorkerError> {
        debug!(worker, prompt_bytes = prompt.len(), "spawning worker");

        let mut child = Command::new(&self.binary)
            .arg(worker)
            .current_dir(&self.repo_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerError::Spawn {
                worker: worker.to_string(),
                message: e.to_string(),
            })?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| WorkerError::Spawn {
                worker: worker.to_string(),
                message: format!("failed to write prompt: {e}"),
            })?;
        // Close stdin so the worker sees end of input.
        drop(stdin);

        // On expiry the child is dropped mid-wait and reaped by
        // kill_on_drop; no orphan survives the timeout.
        let output = match timeout(deadline, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| WorkerError::Spawn {
                worker: worker.to_string(),
                message: e.to_string(),
            })?,
            Err(_) => {
                warn!(worker, seconds = deadline.as_secs(), "worker timed out");
                return Err(WorkerError::Timeout {
                    worker: worker.to_string(),
                    seconds: deadline.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = excerpt(&output.stderr, STDERR_EXCERPT_BYTES);
            return Err(WorkerError::Failed {
                worker: worker.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        String::from_utf8(output.stdout).map_err(|e| WorkerError::Malformed {
            worker: worker.to_string(),
            snippet: format!("stdout was not UTF-8: {e}"),
        })
    }
}

fn excerpt(bytes: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut end = text.len().min(limit);
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_respects_char_boundaries() {
        let text = "héllo wörld".repeat(400);
        let cut = excerpt(text.as_bytes(), 2048);
        assert!(cut.len() <= 2048);
        assert!(text.starts_with(&cut));
    }

    #[test]
    fn explicit_missing_override_is_not_available() {
        let err = ProcessRuntime::discover(Some(Path::new("/nonexistent/worker")), ".");
        assert!(matches!(err, Err(WorkerError::NotAvailable { .. })));
    }
}
