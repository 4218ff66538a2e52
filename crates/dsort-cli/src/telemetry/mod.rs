//! Tracing subscriber initialization.

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogFormat;

/// Initializes the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `info`.
///
/// ```bash
/// RUST_LOG=debug dsort
/// RUST_LOG=dsort_core=trace,tower_http=debug,info dsort
/// ```
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = create_env_filter()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_ansi(true))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init(),
    }
    .context("failed to initialize tracing")
}

fn create_env_filter() -> anyhow::Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to create env filter")
}
