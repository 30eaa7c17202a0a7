//! Diagnostics via `tracing`.
//!
//! Logs go to stderr and are filtered with `RUST_LOG`. Values, per-trial
//! lines and summaries are product output and are printed to stdout by the
//! CLI regardless of the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn,sampler=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn,sampler=info` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=sampler=debug sampler run --samples 4 --jobs 2
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
