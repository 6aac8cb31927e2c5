//! Partial records produced by the domain extractors, plus the
//! per-domain status bookkeeping the orchestrator maintains.

use serde::{Deserialize, Serialize};

use crate::types::building::{
    Envelope, HvacSystem, ProjectInfo, Wall, WaterHeatingSystem, Window, Zone,
};

/// An extraction domain. Declaration order is the canonical merge order;
/// worker completion order never matters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Project,
    Zones,
    Windows,
    Hvac,
    Dhw,
    Orientation,
}

impl Domain {
    /// The five fragment-producing extractors, in canonical order.
    pub const EXTRACTORS: [Domain; 5] = [
        Domain::Project,
        Domain::Zones,
        Domain::Windows,
        Domain::Hvac,
        Domain::Dhw,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Zones => "zones",
            Self::Windows => "windows",
            Self::Hvac => "hvac",
            Self::Dhw => "dhw",
            Self::Orientation => "orientation",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one domain's extraction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Success,
    Partial,
    Failed,
}

/// Per-domain result bookkeeping carried on the merged record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStatus {
    pub outcome: ExtractionOutcome,
    /// Worker attempts consumed (1 on first success, 2 after a retry).
    pub attempts: u32,
    /// Error message from the final failed attempt, if any.
    pub error: Option<String>,
}

impl ExtractionStatus {
    pub fn success(attempts: u32) -> Self {
        Self {
            outcome: ExtractionOutcome::Success,
            attempts,
            error: None,
        }
    }

    pub fn failed(attempts: u32, error: impl Into<String>) -> Self {
        Self {
            outcome: ExtractionOutcome::Failed,
            attempts,
            error: Some(error.into()),
        }
    }
}

/// Project-domain fragment: scalar metadata plus envelope aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectFragment {
    pub project: ProjectInfo,
    pub envelope: Envelope,
}

/// Zones-domain fragment: thermal zones and their wall segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ZonesFragment {
    pub zones: Vec<Zone>,
    pub walls: Vec<Wall>,
}

/// Windows-domain fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WindowsFragment {
    pub windows: Vec<Window>,
}

/// HVAC-domain fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HvacFragment {
    pub hvac_systems: Vec<HvacSystem>,
}

/// Domestic-hot-water fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DhwFragment {
    pub water_heating_systems: Vec<WaterHeatingSystem>,
}

/// A validated partial record from one extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum Fragment {
    Project(ProjectFragment),
    Zones(ZonesFragment),
    Windows(WindowsFragment),
    Hvac(HvacFragment),
    Dhw(DhwFragment),
}

impl Fragment {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Project(_) => Domain::Project,
            Self::Zones(_) => Domain::Zones,
            Self::Windows(_) => Domain::Windows,
            Self::Hvac(_) => Domain::Hvac,
            Self::Dhw(_) => Domain::Dhw,
        }
    }
}
