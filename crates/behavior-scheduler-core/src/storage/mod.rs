mod config;
mod snapshot;

pub use config::Config;
pub use snapshot::SnapshotStore;

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the data directory, creating it if needed.
///
/// `BSCHED_DATA_DIR` wins when set. Otherwise `~/.config/behavior-scheduler/`,
/// or `~/.config/behavior-scheduler-dev/` when `BSCHED_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("BSCHED_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BSCHED_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("behavior-scheduler-dev")
            } else {
                base_dir.join("behavior-scheduler")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
