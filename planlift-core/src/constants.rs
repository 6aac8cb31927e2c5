//! Engine-wide defaults. Runtime overrides go through [`crate::config::PipelineConfig`].

use std::time::Duration;

/// Maximum concurrently-running worker processes.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Maximum page paths handed to a single extractor.
pub const MAX_PAGES_PER_WORKER: usize = 20;

/// Wall-clock deadline for most extractor workers.
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// Wall-clock deadline for the page-heavy domains (zones, windows).
pub const RICH_WORKER_TIMEOUT: Duration = Duration::from_secs(600);

/// Pause between the first and second attempt of a failed worker task.
pub const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Absolute tolerance for numeric field comparison.
pub const ABSOLUTE_TOLERANCE: f64 = 0.01;

/// Relative tolerance for numeric field comparison (0.5%).
pub const PERCENT_TOLERANCE: f64 = 0.005;

/// Angular tolerance (degrees) for azimuth comparison.
pub const ANGLE_TOLERANCE_DEG: f64 = 15.0;

/// Relative tolerance for wall/window area sums vs envelope aggregates (1%).
pub const AREA_SUM_TOLERANCE: f64 = 0.01;

/// Stderr excerpt length carried in worker failure messages.
pub const STDERR_EXCERPT_BYTES: usize = 2048;

/// Response snippet length carried in malformed-output errors.
pub const MALFORMED_SNIPPET_BYTES: usize = 512;

/// Upper bound on sampled discrepancies in a failure analysis.
pub const MAX_SAMPLE_DISCREPANCIES: usize = 20;
