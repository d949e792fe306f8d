//! Persisted daemon state.
//!
//! A small JSON file holding the `active` flag, restored on boot and
//! cleared on every shutdown path.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DaemonState {
    pub active: bool,
}

impl DaemonState {
    /// Read the state file; missing or corrupt files mean inactive.
    pub fn load(path: &str) -> DaemonState {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => DaemonState::default(),
        }
    }

    /// Write the state file, creating parent directories as needed.
    pub fn save(&self, path: &str) {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!(path, error = %e, "cannot create state directory");
                    return;
                }
            }
        }
        match serde_json::to_vec(self) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(path, bytes) {
                    warn!(path, error = %e, "cannot write state file");
                }
            }
            Err(e) => warn!(error = %e, "cannot serialize state"),
        }
    }

    /// Persist a new `active` value.
    pub fn set_active(path: &str, active: bool) -> DaemonState {
        let state = DaemonState { active };
        state.save(path);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_inactive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.state");
        assert!(!DaemonState::load(path.to_str().unwrap()).active);
    }

    #[test]
    fn test_round_trip_with_parent_creation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/marketd.state");
        let path = path.to_str().unwrap();

        DaemonState::set_active(path, true);
        assert!(DaemonState::load(path).active);

        DaemonState::set_active(path, false);
        assert!(!DaemonState::load(path).active);
    }

    #[test]
    fn test_corrupt_file_is_inactive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marketd.state");
        std::fs::write(&path, b"not json").unwrap();
        assert!(!DaemonState::load(path.to_str().unwrap()).active);
    }
}
