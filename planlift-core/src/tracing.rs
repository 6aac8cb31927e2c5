//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise the global tracing subscriber once.
///
/// Filter comes from `PLANLIFT_LOG` (falling back to `info`). Safe to call
/// from multiple entry points; later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("PLANLIFT_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}
