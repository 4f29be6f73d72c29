//! Application directory paths for dayplan.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! # Environment Overrides
//!
//! - `DAYPLAN_DATA_DIR` overrides [`data_dir`]
//! - `DAYPLAN_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root (task database).
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("DAYPLAN_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("dayplan"))
        .unwrap_or_else(|| PathBuf::from("/tmp/dayplan-data"))
}

/// Application config directory (`config.toml`).
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("DAYPLAN_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("dayplan"))
        .unwrap_or_else(|| PathBuf::from("/tmp/dayplan-config"))
}

/// Default task database path.
#[must_use]
pub fn task_db_path() -> PathBuf {
    data_dir().join("tasks.db")
}
