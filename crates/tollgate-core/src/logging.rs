//! Tracing subscriber setup for services embedding Tollgate.
//!
//! The core itself only emits `tracing` events: login outcomes and session
//! lifecycle at `info`, lockouts and refresh-token replay at `warn`, and
//! per-call detail at `debug`. Embedders that do not install their own
//! subscriber can use one of the helpers below.
//!
//! ```rust,no_run
//! use tollgate_core::logging::init_logging;
//!
//! init_logging().expect("logging already initialised");
//! ```
//!
//! The level is controlled by `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=tollgate_core=debug,sqlx=warn
//! ```

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging at `info` unless `RUST_LOG` says otherwise.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<(), TryInitError> {
    init_logging_with_level("info")
}

/// Initialize logging with a fallback level used when `RUST_LOG` is unset.
///
/// # Common Levels
///
/// - `"debug"` - per-call detail including ledger writes
/// - `"info"` - logins, logouts, session changes
/// - `"warn"` - lockouts and replay detection only
pub fn init_logging_with_level(level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}

/// Initialize JSON-formatted logging for log aggregation.
pub fn init_logging_json() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
}
