//! Error types for the daemon binary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Daemon already active")]
    AlreadyActive,

    #[error(transparent)]
    Store(#[from] marketd_store::StoreError),

    #[error(transparent)]
    Monitor(#[from] marketd_monitor::MonitorError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
