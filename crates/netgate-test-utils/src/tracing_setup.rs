//! Tracing initialisation helpers for tests.
//!
//! Call [`init_test_tracing`] at the top of any test whose access decisions or
//! interface lookups should show up in the test output.
//!
//! The subscriber is initialised at most once per process, so it is safe to
//! call from every test function.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: everything netgate emits at debug.
const DEFAULT_FILTER: &str = "warn,netgate_core=debug,netgate_config=debug";

/// Initialise a tracing subscriber that writes to the test-harness writer
/// and respects the `RUST_LOG` environment variable.
///
/// # Example
///
/// ```ignore
/// #[test]
/// fn denies_unknown_clients() {
///     netgate_test_utils::tracing_setup::init_test_tracing();
///     // ... evaluate a query; the "access decision" event is captured.
/// }
/// ```
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_test_writer()
        .try_init();
}
