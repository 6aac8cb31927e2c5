//! Front-azimuth estimation.
//!
//! A single wrong azimuth cascades into every orientation-dependent
//! field downstream, so the estimate is cross-verified: two independent
//! passes with different visual strategies, reconciled on the circle.

pub mod reconcile;

use planlift_core::errors::WorkerError;
use planlift_core::types::building::Confidence;
use serde::{Deserialize, Serialize};

use crate::worker::parse_structured;

pub use reconcile::{reconcile, Agreement, OrientationEstimate};

/// Which visual strategy a pass used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// North arrow plus the drawn front direction.
    NorthArrowAndEntry,
    /// Entry elevation plus the entry wall's outward normal.
    ElevationAndWallEdge,
}

impl PassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NorthArrowAndEntry => "north-arrow-and-entry",
            Self::ElevationAndWallEdge => "elevation-and-wall-edge",
        }
    }
}

/// Working figures a pass reports alongside its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PassIntermediate {
    pub north_arrow_angle: Option<f64>,
    pub front_drawing_angle: Option<f64>,
    pub formula: Option<String>,
}

/// One pass's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassResult {
    /// Degrees clockwise from true north, [0, 360).
    pub front_orientation: f64,
    pub confidence: Confidence,
    #[serde(default)]
    pub intermediate: PassIntermediate,
}

/// Parse one orientation pass's worker response.
pub fn parse_pass(worker: &str, response: &str) -> Result<PassResult, WorkerError> {
    let value = parse_structured(worker, response)?;
    let pass: PassResult =
        serde_json::from_value(value).map_err(|e| WorkerError::FragmentInvalid {
            worker: worker.to_string(),
            message: e.to_string(),
        })?;
    if !(0.0..360.0).contains(&pass.front_orientation) {
        return Err(WorkerError::FragmentInvalid {
            worker: worker.to_string(),
            message: format!(
                "front_orientation {} outside [0, 360)",
                pass.front_orientation
            ),
        });
    }
    Ok(pass)
}
