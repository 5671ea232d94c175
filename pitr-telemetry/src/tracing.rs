use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initializes tracing for a service binary.
///
/// The filter is taken from `RUST_LOG` when set, otherwise `info`. Panics if
/// a global subscriber is already installed, since that indicates the binary
/// initialized telemetry twice.
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(service = service_name, "tracing initialized");
}

static TEST_TRACING: Once = Once::new();

/// Initializes tracing for tests.
///
/// Safe to call from every test: only the first call installs a subscriber.
/// Output goes through the test writer so it is captured per test.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
