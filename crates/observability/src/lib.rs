//! `verdant-observability` — shared tracing setup.

/// Tracing configuration (filter, format).
pub mod tracing;

/// Initialize process-wide observability.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
