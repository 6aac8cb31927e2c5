//! # planlift-storage
//!
//! File-backed iteration store for the extraction engine. One directory
//! per evaluation, one numbered directory per improvement iteration,
//! every artefact written atomically via temp-file + rename.

pub mod aggregate;
pub mod atomic;
pub mod layout;
pub mod store;

pub use aggregate::{AggregateHistory, IterationMetrics};
pub use store::{IterationStore, SnapshotEntry};
