//! Worker invocation: one sandboxed child process per call.

pub mod parse;
pub mod runtime;

pub use parse::parse_structured;
pub use runtime::{ProcessRuntime, WorkerRuntime};
