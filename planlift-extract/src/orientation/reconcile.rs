//! Angular reconciliation of the two orientation passes.

use planlift_core::angles::{angular_distance, circular_mean};
use planlift_core::types::building::Confidence;
use serde::{Deserialize, Serialize};

use super::PassResult;

/// How the two passes related to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    /// Within 20 degrees; the passes corroborate each other.
    Agreed,
    /// 70-110 degrees apart; one pass likely read a side elevation.
    SideFrontConfusion,
    /// 160-200 degrees apart; one pass likely read the back.
    FrontBackConfusion,
    /// Anything else; the passes genuinely disagree.
    Disagreed,
    /// Only one pass survived its worker invocation.
    SinglePass,
}

/// The reconciled front azimuth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationEstimate {
    pub front_orientation: f64,
    pub confidence: Confidence,
    pub agreement: Agreement,
}

/// Combine the two passes.
///
/// Tie-break on equal confidence goes to pass 1, which needs fewer
/// inference hops than the elevation-matching strategy.
pub fn reconcile(pass1: &PassResult, pass2: &PassResult) -> OrientationEstimate {
    let d = angular_distance(pass1.front_orientation, pass2.front_orientation);

    if d <= 20.0 {
        return OrientationEstimate {
            front_orientation: circular_mean(pass1.front_orientation, pass2.front_orientation),
            confidence: Confidence::High,
            agreement: Agreement::Agreed,
        };
    }

    let (winner, agreement) = if (70.0..=110.0).contains(&d) {
        (more_confident(pass1, pass2), Agreement::SideFrontConfusion)
    } else if (160.0..=200.0).contains(&d) {
        (more_confident(pass1, pass2), Agreement::FrontBackConfusion)
    } else {
        let winner = more_confident(pass1, pass2);
        return OrientationEstimate {
            front_orientation: winner.front_orientation,
            confidence: Confidence::Low,
            agreement: Agreement::Disagreed,
        };
    };

    OrientationEstimate {
        front_orientation: winner.front_orientation,
        confidence: winner.confidence.downgraded(),
        agreement,
    }
}

/// Reconciliation when only one pass produced a result: keep it, but a
/// lone uncorroborated pass never reports full confidence.
pub fn single_pass(pass: &PassResult) -> OrientationEstimate {
    OrientationEstimate {
        front_orientation: pass.front_orientation,
        confidence: pass.confidence.downgraded(),
        agreement: Agreement::SinglePass,
    }
}

fn more_confident<'a>(pass1: &'a PassResult, pass2: &'a PassResult) -> &'a PassResult {
    if pass2.confidence > pass1.confidence {
        pass2
    } else {
        pass1
    }
}
