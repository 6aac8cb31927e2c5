//! Error taxonomy for the extraction engine.
//!
//! Recoverable conditions (a failed extractor domain, a merge conflict, a
//! verification mismatch) are statuses on the data model, not errors. The
//! enums here cover what genuinely propagates: worker invocation failures,
//! store failures, configuration failures, and proposal handling failures.

pub mod config_error;
pub mod error_code;
pub mod proposal_error;
pub mod store_error;
pub mod worker_error;

pub use config_error::ConfigError;
pub use error_code::PlanliftErrorCode;
pub use proposal_error::{ApplyError, ProposalError};
pub use store_error::StoreError;
pub use worker_error::WorkerError;
