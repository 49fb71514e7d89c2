//! Diagnostic tracing for the orchestrator.
//!
//! All error reporting inside the pipeline goes through `tracing`: degraded
//! plans and interpretations at `warn`, failed iterations at `error`, prompts
//! and raw replies at `debug`. Chat output is printed by the CLI on stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=commander=debug commander run "open the camera"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
