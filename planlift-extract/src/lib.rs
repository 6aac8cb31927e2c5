//! # planlift-extract
//!
//! The extraction pipeline: classify pages, route them to domain
//! extractors, run the extractors and the orientation passes in parallel
//! under a bounded worker pool, and merge the partial records into one
//! validated `BuildingSpec`.

pub mod docmap;
pub mod extractors;
pub mod merge;
pub mod orchestrator;
pub mod orientation;
pub mod prompts;
pub mod router;
pub mod worker;

pub use merge::MergeEngine;
pub use orchestrator::{DomainOutcome, ExtractionRun, Orchestrator};
pub use worker::runtime::{ProcessRuntime, WorkerRuntime};
