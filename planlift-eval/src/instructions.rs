//! Instruction-document header parsing and proposal validation.
//!
//! Every instruction document begins with a header of the form
//! `# <title> v<major>.<minor>.<patch>`. The version in that header is
//! the single source of truth for what the critic may propose against.

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use planlift_core::errors::ProposalError;
use planlift_core::types::proposal::InstructionProposal;
use regex::Regex;
use semver::Version;

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| Regex::new(r"#\s+[^\n]*v(\d+\.\d+\.\d+)").expect("static regex"))
}

/// Parse the version from a document's header. Only the first lines are
/// considered; a stray version string deep in the body does not count.
pub fn parse_header_version(content: &str) -> Option<Version> {
    let head: String = content.lines().take(5).collect::<Vec<_>>().join("\n");
    let captures = header_regex().captures(&head)?;
    Version::parse(captures.get(1)?.as_str()).ok()
}

/// Rewrite the header's version string, leaving the rest untouched.
pub fn rewrite_header_version(content: &str, new_version: &Version) -> String {
    let head_len: usize = content
        .lines()
        .take(5)
        .map(|l| l.len() + 1)
        .sum::<usize>()
        .min(content.len());
    let (head, tail) = content.split_at(head_len);
    let rewritten = header_regex().replace(head, |captures: &regex::Captures<'_>| {
        let whole = captures.get(0).expect("match").as_str();
        let old = captures.get(1).expect("version group").as_str();
        whole.replacen(old, &new_version.to_string(), 1)
    });
    format!("{rewritten}{tail}")
}

/// Resolve the proposal's target under the instruction root, rejecting
/// absolute targets and any `..` traversal.
pub fn resolve_target(
    proposal: &InstructionProposal,
    instruction_root: &Path,
) -> Result<PathBuf, ProposalError> {
    let target = &proposal.target_file;
    let relative = if target.is_absolute() {
        target
            .strip_prefix(instruction_root)
            .map_err(|_| ProposalError::TargetOutsideRoot {
                path: target.clone(),
                root: instruction_root.to_path_buf(),
            })?
    } else {
        target.as_path()
    };
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(ProposalError::TargetOutsideRoot {
            path: target.clone(),
            root: instruction_root.to_path_buf(),
        });
    }
    Ok(instruction_root.join(relative))
}

/// Validate a proposal against the target's current content.
///
/// Checks, in order: versions parse, the document's header version
/// matches `current_version`, the bump rule for the change type holds,
/// and the change text is non-empty.
pub fn validate_proposal(
    proposal: &InstructionProposal,
    target_path: &Path,
    current_content: &str,
) -> Result<(), ProposalError> {
    let current = proposal.current_version_parsed().ok_or_else(|| {
        ProposalError::Malformed {
            message: format!("current_version '{}' is not vX.Y.Z", proposal.current_version),
        }
    })?;
    let proposed = proposal.proposed_version_parsed().ok_or_else(|| {
        ProposalError::Malformed {
            message: format!(
                "proposed_version '{}' is not vX.Y.Z",
                proposal.proposed_version
            ),
        }
    })?;

    let header = parse_header_version(current_content).ok_or_else(|| {
        ProposalError::UnversionedTarget {
            path: target_path.to_path_buf(),
        }
    })?;
    if header != current {
        return Err(ProposalError::VersionMismatch {
            path: target_path.to_path_buf(),
            proposed: proposal.current_version.clone(),
            actual: format!("v{header}"),
        });
    }

    if proposed <= current {
        return Err(ProposalError::InvalidBump {
            current: proposal.current_version.clone(),
            proposed: proposal.proposed_version.clone(),
            expected: proposal.change_type.required_bump().as_str(),
        });
    }
    let bump = proposal.change_type.required_bump();
    if !bump.applies(&current, &proposed) {
        return Err(ProposalError::InvalidBump {
            current: proposal.current_version.clone(),
            proposed: proposal.proposed_version.clone(),
            expected: bump.as_str(),
        });
    }

    if proposal.proposed_change.trim().is_empty() {
        return Err(ProposalError::EmptyChange);
    }
    Ok(())
}

/// Convenience used by tests and the applier: the version string a
/// document currently carries, `v`-prefixed.
pub fn header_version_string(content: &str) -> Option<String> {
    parse_header_version(content).map(|v| format!("v{v}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use planlift_core::types::proposal::ChangeType;

    const DOC: &str = "# Project Extractor Instructions v1.1.0\n\n## Scope\n\nRead the title block.\n";

    fn proposal(current: &str, proposed: &str, change_type: ChangeType) -> InstructionProposal {
        InstructionProposal {
            target_file: PathBuf::from("project-extractor/instructions.md"),
            current_version: current.to_string(),
            proposed_version: proposed.to_string(),
            change_type,
            failure_pattern: "omissions in project scalars".to_string(),
            hypothesis: "the scope section is ambiguous".to_string(),
            proposed_change: "## Scope\n\nRead the title block and the CF1R header.\n".to_string(),
            expected_impact: "fewer project omissions".to_string(),
            affected_error_types: vec![],
            affected_domains: vec![],
            estimated_f1_delta: None,
        }
    }

    #[test]
    fn header_version_parses_from_first_line() {
        assert_eq!(parse_header_version(DOC), Some(Version::new(1, 1, 0)));
    }

    #[test]
    fn version_deep_in_body_does_not_count() {
        let content = "# Untitled\n\ntext\nmore\nlines\nhere\n# Appendix v9.9.9\n";
        assert_eq!(parse_header_version(content), None);
    }

    #[test]
    fn rewrite_changes_only_the_header() {
        let rewritten = rewrite_header_version(DOC, &Version::new(1, 2, 0));
        assert!(rewritten.starts_with("# Project Extractor Instructions v1.2.0\n"));
        assert!(rewritten.contains("Read the title block."));
        assert_eq!(parse_header_version(&rewritten), Some(Version::new(1, 2, 0)));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let p = proposal("v1.0.0", "v1.1.0", ChangeType::AddSection);
        let err = validate_proposal(&p, Path::new("x.md"), DOC).unwrap_err();
        assert!(matches!(err, ProposalError::VersionMismatch { .. }));
    }

    #[test]
    fn add_section_requires_minor_bump() {
        let ok = proposal("v1.1.0", "v1.2.0", ChangeType::AddSection);
        assert!(validate_proposal(&ok, Path::new("x.md"), DOC).is_ok());
        let bad = proposal("v1.1.0", "v1.1.1", ChangeType::AddSection);
        assert!(matches!(
            validate_proposal(&bad, Path::new("x.md"), DOC),
            Err(ProposalError::InvalidBump { .. })
        ));
    }

    #[test]
    fn clarify_rule_requires_patch_bump() {
        let ok = proposal("v1.1.0", "v1.1.1", ChangeType::ClarifyRule);
        assert!(validate_proposal(&ok, Path::new("x.md"), DOC).is_ok());
        let bad = proposal("v1.1.0", "v1.2.0", ChangeType::ClarifyRule);
        assert!(matches!(
            validate_proposal(&bad, Path::new("x.md"), DOC),
            Err(ProposalError::InvalidBump { .. })
        ));
    }

    #[test]
    fn regressing_version_is_rejected() {
        let bad = proposal("v1.1.0", "v1.0.0", ChangeType::AddSection);
        assert!(matches!(
            validate_proposal(&bad, Path::new("x.md"), DOC),
            Err(ProposalError::InvalidBump { .. })
        ));
    }

    #[test]
    fn empty_change_is_rejected() {
        let mut p = proposal("v1.1.0", "v1.2.0", ChangeType::AddSection);
        p.proposed_change = "   \n".to_string();
        assert!(matches!(
            validate_proposal(&p, Path::new("x.md"), DOC),
            Err(ProposalError::EmptyChange)
        ));
    }

    #[test]
    fn traversal_targets_are_rejected() {
        let root = Path::new("/repo/instructions");
        let mut p = proposal("v1.1.0", "v1.2.0", ChangeType::AddSection);
        p.target_file = PathBuf::from("../secrets.md");
        assert!(matches!(
            resolve_target(&p, root),
            Err(ProposalError::TargetOutsideRoot { .. })
        ));
        p.target_file = PathBuf::from("/etc/passwd");
        assert!(matches!(
            resolve_target(&p, root),
            Err(ProposalError::TargetOutsideRoot { .. })
        ));
        p.target_file = PathBuf::from("project-extractor/instructions.md");
        assert_eq!(
            resolve_target(&p, root).unwrap(),
            root.join("project-extractor/instructions.md")
        );
    }
}
