//! The critic: turns a failure analysis into an instruction edit.

use std::fmt::Write;
use std::path::Path;
use std::time::Duration;

use planlift_core::errors::{ProposalError, WorkerError};
use planlift_core::types::proposal::InstructionProposal;
use planlift_extract::worker::{parse_structured, WorkerRuntime};
use tracing::{info, warn};

use crate::analysis::FailureAnalysis;
use crate::instructions;

/// Worker identifier for the critic.
pub const CRITIC_WORKER: &str = "critic";

/// Critic failures that are actual errors; a refusal is not one.
#[derive(Debug, thiserror::Error)]
pub enum CriticError {
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Proposal(#[from] ProposalError),
}

/// Invoke the critic over a failure analysis.
///
/// Returns `Ok(None)` when the critic declines to propose (its response
/// carries no JSON object). A parsed proposal is validated against the
/// target document before being returned; any violation rejects it.
pub async fn propose(
    runtime: &dyn WorkerRuntime,
    instruction_root: &Path,
    analysis: &FailureAnalysis,
    timeout: Duration,
) -> Result<Option<InstructionProposal>, CriticError> {
    if analysis.total_discrepancies == 0 {
        info!("no discrepancies; skipping critic");
        return Ok(None);
    }

    let prompt = critic_prompt(analysis);
    let response = runtime.invoke(CRITIC_WORKER, &prompt, timeout).await?;

    let value = match parse_structured(CRITIC_WORKER, &response) {
        Ok(value) => value,
        Err(WorkerError::Malformed { .. }) => {
            // Prose without JSON is the critic declining, not failing.
            info!("critic declined to propose");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let proposal: InstructionProposal =
        serde_json::from_value(value).map_err(|e| ProposalError::Malformed {
            message: e.to_string(),
        })?;

    let target_path = instructions::resolve_target(&proposal, instruction_root)?;
    let current_content = std::fs::read_to_string(&target_path).map_err(|e| {
        warn!(target = %target_path.display(), error = %e, "proposal target unreadable");
        ProposalError::Malformed {
            message: format!("target {} unreadable: {e}", target_path.display()),
        }
    })?;
    instructions::validate_proposal(&proposal, &target_path, &current_content)?;

    info!(
        target = %proposal.target_file.display(),
        change_type = ?proposal.change_type,
        proposed_version = %proposal.proposed_version,
        "critic proposal accepted"
    );
    Ok(Some(proposal))
}

/// Render the failure analysis into the critic's prompt.
pub fn critic_prompt(analysis: &FailureAnalysis) -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push_str(
        "You are the critic for a Title 24 extraction pipeline. Extraction workers follow \
         versioned instruction documents under `instructions/`; your job is to propose ONE \
         edit to ONE document that addresses the dominant failure pattern below.\n\n",
    );
    writeln!(prompt, "## Failure analysis\n").unwrap();
    writeln!(
        prompt,
        "{}",
        serde_json::to_string_pretty(analysis).unwrap_or_default()
    )
    .unwrap();
    prompt.push_str(
        "\n## Rules\n\n\
         - `target_file` must be a path under the instruction root, e.g. \
           `project-extractor/instructions.md`.\n\
         - `current_version` must copy the version from the target's header exactly.\n\
         - `add_section` and `modify_section` bump the minor version; `clarify_rule` bumps \
           the patch version.\n\
         - For `modify_section` and `clarify_rule`, `proposed_change` must begin with the \
           `##` heading of the section being replaced.\n\
         - If no instruction change would plausibly help, reply in prose without any JSON.\n\
         \n## Output schema\n\n\
         {\n  \"target_file\": <string>,\n  \"current_version\": \"vX.Y.Z\",\n  \
         \"proposed_version\": \"vX.Y.Z\",\n  \"change_type\": \"add_section\" | \
         \"modify_section\" | \"clarify_rule\",\n  \"failure_pattern\": <string>,\n  \
         \"hypothesis\": <string>,\n  \"proposed_change\": <markdown string>,\n  \
         \"expected_impact\": <string>,\n  \"affected_error_types\": [<error type>],\n  \
         \"affected_domains\": [<domain>],\n  \"estimated_f1_delta\": <number|null>\n}\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_the_analysis() {
        let analysis = FailureAnalysis {
            eval_count: 2,
            total_discrepancies: 5,
            aggregate_f1: 0.71,
            ..Default::default()
        };
        let prompt = critic_prompt(&analysis);
        assert!(prompt.contains("\"eval_count\": 2"));
        assert!(prompt.contains("add_section"));
    }
}
