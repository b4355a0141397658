//! Test log output.
//!
//! Tests that want to see the client's `tracing` output call
//! [`init_test_tracing`] first. Output goes through the test writer so it is
//! captured per test; filtering follows `RUST_LOG` (default `cas=debug`).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a test subscriber. Safe to call from every test: only the first
/// call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cas=debug")))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
