//! Diagnostic output setup.
//!
//! Library code only emits `tracing` events. The binary installs a
//! subscriber that writes them to stderr, keeping stdout free for command
//! output.

use std::io;
use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `xrant=debug`.
pub const LOG_ENV: &str = "XRANT_LOG";

const DEFAULT_FILTER: &str = "info";

/// Installs the stderr subscriber.
///
/// The filter comes from `XRANT_LOG`, then `RUST_LOG`, then defaults to
/// `info`. Does nothing if a subscriber is already installed.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();
}

static INIT: Once = Once::new();

/// Routes debug-level events to the test harness output. Idempotent.
pub fn init_for_tests() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}
