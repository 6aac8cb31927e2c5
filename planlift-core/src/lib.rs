//! # planlift-core
//!
//! Foundation crate for the Planlift extraction engine.
//! Defines the domain model, errors, config, angular geometry, and tracing.
//! Every other crate in the workspace depends on this.

pub mod angles;
pub mod config;
pub mod constants;
pub mod errors;
pub mod tracing;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::PipelineConfig;
pub use errors::error_code::PlanliftErrorCode;
pub use types::building::{BuildingSpec, FieldConflict};
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::document::{DocumentMap, PageInfo, PageType};
pub use types::evaluation::{ErrorType, EvalMetrics, EvalResult, FieldDiscrepancy};
pub use types::fragments::{Domain, ExtractionOutcome, ExtractionStatus};
pub use types::proposal::{ChangeType, InstructionProposal};
