//! Shared fixtures for `coincflow` integration tests.

pub mod builders;
pub mod fake_stage;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Install a per-test capturing subscriber, once per test binary.
///
/// `RUST_LOG` selects levels (`RUST_LOG=coincflow::graph=debug`); the
/// default only shows warnings. Output appears for failing tests.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
