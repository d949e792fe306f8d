//! Daemon control plane: configuration, persisted state, and the manager
//! that starts and stops the pipeline.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

pub use app::Manager;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use state::DaemonState;
