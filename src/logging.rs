//! Logging setup for the `usl` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is the binary's job.
//! The filter comes from `USL_LOG` (same syntax as `RUST_LOG`), defaulting to `warn`,
//! and `--verbose` raises it to `debug`.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "USL_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

pub fn init_logging(verbose: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = if verbose {
            EnvFilter::new("usl=debug")
        } else {
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
        };

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        // Another subscriber may already be installed (e.g. by an embedding test harness).
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}
