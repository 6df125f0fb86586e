//! Logging initialisation for binaries and test harnesses
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to whoever owns the process.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Map a `-v` count to a default level
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install a stderr fmt subscriber
///
/// `RUST_LOG` overrides the verbosity-derived default. Fails if a global
/// subscriber is already set.
pub fn init(verbosity: u8) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("schemascribe={}", level_for(verbosity))));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .try_init()
}
