//! Proposal application: snapshot, rewrite, record, commit, roll back.
//!
//! The applier is the sole writer of instruction documents. Snapshots
//! into the iteration store are the undo log; each apply is a single
//! atomic file rewrite, so no transaction machinery is needed.

use std::path::{Path, PathBuf};

use planlift_core::errors::{ApplyError, ProposalError, StoreError};
use planlift_core::types::proposal::{ChangeType, InstructionProposal};
use planlift_storage::atomic::write_atomic;
use planlift_storage::IterationStore;
use tracing::{info, warn};

use crate::instructions;

/// Applies accepted proposals to instruction documents.
pub struct ProposalApplier {
    instruction_root: PathBuf,
    repo_root: PathBuf,
    store: IterationStore,
}

impl ProposalApplier {
    pub fn new(
        instruction_root: impl Into<PathBuf>,
        repo_root: impl Into<PathBuf>,
        store: IterationStore,
    ) -> Self {
        Self {
            instruction_root: instruction_root.into(),
            repo_root: repo_root.into(),
            store,
        }
    }

    /// Apply `proposal`, snapshotting the prior content into every
    /// active evaluation's iteration directory first.
    ///
    /// Fails without touching the target if the document's header no
    /// longer matches the proposal (someone else wrote in between), or
    /// if any validation rule is violated. On failure after snapshots
    /// were taken, the snapshots are left in place for rollback.
    pub fn apply(
        &self,
        proposal: &InstructionProposal,
        active_evals: &[(String, u32)],
    ) -> Result<PathBuf, ApplyError> {
        let target_path = instructions::resolve_target(proposal, &self.instruction_root)?;
        let relative_path = target_path
            .strip_prefix(&self.instruction_root)
            .expect("resolve_target yields a path under the root")
            .to_path_buf();

        let current_content = std::fs::read_to_string(&target_path)
            .map_err(|e| StoreError::io(&target_path, &e))?;

        // Concurrent-modification guard before the full validation pass.
        let header = instructions::parse_header_version(&current_content).ok_or_else(|| {
            ApplyError::Rejected(ProposalError::UnversionedTarget {
                path: target_path.clone(),
            })
        })?;
        let current = proposal.current_version_parsed().ok_or_else(|| {
            ApplyError::Rejected(ProposalError::Malformed {
                message: format!(
                    "current_version '{}' is not vX.Y.Z",
                    proposal.current_version
                ),
            })
        })?;
        if header != current {
            return Err(ApplyError::ConcurrentlyModified {
                path: target_path,
                actual: format!("v{header}"),
            });
        }
        instructions::validate_proposal(proposal, &target_path, &current_content)
            .map_err(ApplyError::Rejected)?;

        for (eval_id, iteration) in active_evals {
            self.store.write_snapshot(
                eval_id,
                *iteration,
                &relative_path,
                &proposal.current_version,
                &current_content,
            )?;
        }

        let changed = apply_change(
            &target_path,
            &current_content,
            proposal.change_type,
            &proposal.proposed_change,
        )?;
        let proposed = proposal
            .proposed_version_parsed()
            .expect("validated above");
        let rewritten = instructions::rewrite_header_version(&changed, &proposed);

        write_atomic(&target_path, rewritten.as_bytes()).map_err(|e| {
            warn!(target = %target_path.display(), error = %e, "atomic write failed");
            ApplyError::WriteFailed {
                path: target_path.clone(),
                message: e.to_string(),
            }
        })?;

        for (eval_id, iteration) in active_evals {
            self.store.write_proposal(eval_id, *iteration, proposal)?;
        }

        info!(
            target = %relative_path.display(),
            from = %proposal.current_version,
            to = %proposal.proposed_version,
            "proposal applied"
        );
        Ok(target_path)
    }

    /// Commit the applied document with a message carrying the metric
    /// deltas measured after re-verification.
    pub fn commit(
        &self,
        proposal: &InstructionProposal,
        message: &str,
    ) -> Result<(), ApplyError> {
        let repo = git2::Repository::discover(&self.repo_root).map_err(|e| {
            ApplyError::CommitFailed {
                message: format!("no repository at {}: {e}", self.repo_root.display()),
            }
        })?;
        let workdir = repo.workdir().ok_or_else(|| ApplyError::CommitFailed {
            message: "bare repository".to_string(),
        })?;
        let target_path =
            instructions::resolve_target(proposal, &self.instruction_root)?;
        let repo_relative = target_path
            .strip_prefix(workdir)
            .map_err(|_| ApplyError::CommitFailed {
                message: format!(
                    "{} is outside the repository working tree",
                    target_path.display()
                ),
            })?
            .to_path_buf();

        let commit_inner = || -> Result<(), git2::Error> {
            let mut index = repo.index()?;
            index.add_path(&repo_relative)?;
            index.write()?;
            let tree = repo.find_tree(index.write_tree()?)?;
            let signature = git2::Signature::now("planlift", "planlift@localhost")?;
            let parent = repo
                .head()
                .ok()
                .and_then(|head| head.peel_to_commit().ok());
            let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
            repo.commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &parents,
            )?;
            Ok(())
        };
        commit_inner().map_err(|e| ApplyError::CommitFailed {
            message: e.to_string(),
        })
    }

    /// Restore every instruction document snapshotted by the given
    /// iteration. Returns how many files were restored. Idempotent:
    /// restoring twice leaves identical content.
    pub fn rollback(&self, eval_id: &str, iteration: u32) -> Result<usize, ApplyError> {
        let snapshots = self.store.read_snapshots(eval_id, iteration)?;
        for snapshot in &snapshots {
            let target = self.instruction_root.join(&snapshot.relative_path);
            write_atomic(&target, snapshot.content.as_bytes()).map_err(|e| {
                ApplyError::WriteFailed {
                    path: target.clone(),
                    message: e.to_string(),
                }
            })?;
            info!(
                target = %snapshot.relative_path.display(),
                version = %snapshot.version,
                "instruction document restored"
            );
        }
        Ok(snapshots.len())
    }
}

/// Compute the post-change content, before the header version rewrite.
fn apply_change(
    target_path: &Path,
    current: &str,
    change_type: ChangeType,
    proposed_change: &str,
) -> Result<String, ApplyError> {
    match change_type {
        ChangeType::AddSection => Ok(format!(
            "{}\n\n{}\n",
            current.trim_end(),
            proposed_change.trim_end()
        )),
        ChangeType::ModifySection | ChangeType::ClarifyRule => {
            replace_section(target_path, current, proposed_change)
        }
    }
}

/// Replace one `##` section: from its heading up to the next heading of
/// the same or higher level.
fn replace_section(
    target_path: &Path,
    current: &str,
    proposed_change: &str,
) -> Result<String, ApplyError> {
    let heading = proposed_change
        .trim_start()
        .lines()
        .next()
        .unwrap_or_default()
        .trim_end();
    if !heading.starts_with("## ") {
        return Err(ApplyError::MissingHeading);
    }

    let lines: Vec<&str> = current.lines().collect();
    let start = lines
        .iter()
        .position(|line| line.trim_end() == heading)
        .ok_or_else(|| ApplyError::HeadingNotFound {
            path: target_path.to_path_buf(),
            heading: heading.to_string(),
        })?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| line.starts_with("## ") || line.starts_with("# "))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    let mut out = String::with_capacity(current.len() + proposed_change.len());
    for line in &lines[..start] {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(proposed_change.trim_end());
    out.push('\n');
    if end < lines.len() {
        out.push('\n');
        for line in &lines[end..] {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Zones Extractor Instructions v1.0.0\n\n\
                       ## Scope\n\nRead zone tables.\n\n\
                       ## Walls\n\nRead wall schedules.\n";

    #[test]
    fn add_section_appends_after_blank_line() {
        let out = apply_change(
            Path::new("x.md"),
            DOC,
            ChangeType::AddSection,
            "## Volumes\n\nCompute volumes from ceiling heights.",
        )
        .unwrap();
        assert!(out.ends_with("## Volumes\n\nCompute volumes from ceiling heights.\n"));
        assert!(out.contains("Read wall schedules."));
    }

    #[test]
    fn modify_section_replaces_between_headings() {
        let out = apply_change(
            Path::new("x.md"),
            DOC,
            ChangeType::ModifySection,
            "## Scope\n\nRead zone tables and the room legend.",
        )
        .unwrap();
        assert!(out.contains("Read zone tables and the room legend."));
        assert!(!out.contains("Read zone tables.\n\n## Walls"));
        assert!(out.contains("## Walls\n\nRead wall schedules."));
    }

    #[test]
    fn modify_last_section_runs_to_end() {
        let out = apply_change(
            Path::new("x.md"),
            DOC,
            ChangeType::ClarifyRule,
            "## Walls\n\nRead wall schedules; net area excludes openings.",
        )
        .unwrap();
        assert!(out.ends_with("net area excludes openings.\n"));
        assert!(out.contains("Read zone tables."));
    }

    #[test]
    fn change_without_heading_is_rejected() {
        let err = apply_change(
            Path::new("x.md"),
            DOC,
            ChangeType::ModifySection,
            "no heading here",
        )
        .unwrap_err();
        assert!(matches!(err, ApplyError::MissingHeading));
    }

    #[test]
    fn unknown_heading_is_rejected() {
        let err = apply_change(
            Path::new("x.md"),
            DOC,
            ChangeType::ModifySection,
            "## Windows\n\nnot in this document",
        )
        .unwrap_err();
        assert!(matches!(err, ApplyError::HeadingNotFound { .. }));
    }
}
