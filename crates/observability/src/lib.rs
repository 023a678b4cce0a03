//! Process-wide logging setup shared by binaries and tests.

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber construction (filters, formatting).
pub mod tracing;
