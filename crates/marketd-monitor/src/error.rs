//! Error types for marketd-monitor.

use thiserror::Error;

/// Worker error types.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Store(#[from] marketd_store::StoreError),

    #[error(transparent)]
    Adapter(#[from] marketd_exchange::AdapterError),
}

/// Result type alias for worker operations.
pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
