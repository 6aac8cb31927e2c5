//! # planlift-eval
//!
//! The improvement half of the engine: verify extractions against ground
//! truth, aggregate failure patterns, ask the critic for instruction
//! edits, and apply those edits with snapshot/rollback. The loop is
//! strictly `extract -> verify -> propose -> apply -> extract`.

pub mod analysis;
pub mod applier;
pub mod compare;
pub mod critic;
pub mod ground_truth;
pub mod instructions;
pub mod ops;
pub mod verifier;

pub use analysis::{analyse, FailureAnalysis};
pub use applier::ProposalApplier;
pub use ground_truth::GroundTruth;
pub use ops::Pipeline;
pub use verifier::Verifier;
