//! Configuration for the task core and host bridge.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Task database settings.
    pub store: StoreConfig,
    /// Mutation worker settings.
    pub coordinator: CoordinatorConfig,
    /// Upcoming-timeline settings.
    pub timeline: TimelineConfig,
}

/// Task database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. `None` uses `<data_dir>/tasks.db`.
    pub db_path: Option<PathBuf>,
    /// Insert one sample task when the database is first created.
    pub seed_sample_task: bool,
}

impl StoreConfig {
    /// Configured database path, or the platform default.
    #[must_use]
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(crate::paths::task_db_path)
    }
}

/// Mutation worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Queued mutation requests before senders wait.
    pub request_capacity: usize,
    /// Buffered coordinator events per subscriber.
    pub event_capacity: usize,
    /// Re-issue reminders for every stored future task when the worker starts.
    pub rearm_reminders_on_start: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_capacity: 64,
            event_capacity: 128,
            rearm_reminders_on_start: true,
        }
    }
}

/// Upcoming-timeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Drop completed tasks from the timeline.
    pub hide_completed: bool,
}

impl PlannerConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::PlannerError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PlannerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config_dir>/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::paths::config_dir().join("config.toml")
    }
}
