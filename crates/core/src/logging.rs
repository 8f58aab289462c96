//! Logging initialization and configuration.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,shapes=debug,shapes_renderer=debug,shapes_rhi=info";

/// Initialize the logging system with tracing.
///
/// This sets up tracing-subscriber with:
/// - Environment-based filtering (`RUST_LOG`), falling back to [`DEFAULT_LOG_FILTER`]
/// - A formatting layer that prints targets and thread ids, which matters once
///   the software queue runs on its own worker thread
///
/// Calling this twice is harmless; the second registration is ignored.
///
/// # Example
/// ```
/// shapes_core::init_logging();
/// tracing::info!("Shapes starting");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
