//! Process-wide logging setup shared by the paydesk binaries.

/// Initialize tracing from the process environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogConfig::from_env());
}

/// Subscriber configuration (filter, format).
pub mod tracing;
