//! Critic output: a structured edit proposal for one instruction document.

use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::types::fragments::Domain;
use crate::types::evaluation::ErrorType;

/// How the proposal modifies the target document. The change type fixes
/// the required version bump: section changes bump minor, clarifications
/// bump patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    AddSection,
    ModifySection,
    ClarifyRule,
}

impl ChangeType {
    /// The bump rule this change type demands.
    pub fn required_bump(self) -> Bump {
        match self {
            Self::AddSection | Self::ModifySection => Bump::Minor,
            Self::ClarifyRule => Bump::Patch,
        }
    }
}

/// A semver component bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Minor,
    Patch,
}

impl Bump {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }

    /// Whether `proposed` is exactly `current` plus this bump.
    pub fn applies(self, current: &Version, proposed: &Version) -> bool {
        match self {
            Self::Minor => {
                proposed.major == current.major
                    && proposed.minor == current.minor + 1
                    && proposed.patch == 0
            }
            Self::Patch => {
                proposed.major == current.major
                    && proposed.minor == current.minor
                    && proposed.patch == current.patch + 1
            }
        }
    }
}

/// A versioned edit proposal produced by the critic worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionProposal {
    /// Target instruction document, relative to the instruction root.
    pub target_file: PathBuf,
    /// `v`-prefixed semver currently in the target's header.
    pub current_version: String,
    /// `v`-prefixed semver after applying.
    pub proposed_version: String,
    pub change_type: ChangeType,
    /// The recurring failure the proposal addresses.
    pub failure_pattern: String,
    /// Why the critic believes the instruction change will help.
    pub hypothesis: String,
    /// Literal markdown to insert or substitute.
    pub proposed_change: String,
    pub expected_impact: String,
    pub affected_error_types: Vec<ErrorType>,
    pub affected_domains: Vec<Domain>,
    pub estimated_f1_delta: Option<f64>,
}

impl InstructionProposal {
    pub fn current_version_parsed(&self) -> Option<Version> {
        parse_v_version(&self.current_version)
    }

    pub fn proposed_version_parsed(&self) -> Option<Version> {
        parse_v_version(&self.proposed_version)
    }
}

/// Parse a `v`-prefixed semver string (`v1.2.3`).
pub fn parse_v_version(s: &str) -> Option<Version> {
    Version::parse(s.strip_prefix('v')?).ok()
}
