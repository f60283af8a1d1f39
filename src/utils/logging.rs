// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber.
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output for
/// this crate and info for everything else.
pub fn setup_logging(verbose: bool) {
    let default_directive = if verbose {
        "info,fundamentals_screener=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("Logging setup complete.");
}
