//! Shared test setup.

/// Route `tracing` output through the test harness so release warnings show
/// up in failing test output.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
