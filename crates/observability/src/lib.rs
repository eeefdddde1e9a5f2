//! Tracing/logging setup shared by every process embedding the ledger.

/// Initialize process-wide tracing with the default filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(None);
}

/// Initialize tracing with an explicit filter directive (e.g. `agora=debug`),
/// typically `LedgerConfig::log_filter`. `RUST_LOG` still wins when set.
pub fn init_with_filter(directive: &str) {
    tracing::init(Some(directive));
}

/// Tracing configuration (filters, layers).
pub mod tracing;
