use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Run-parameter defaults the task-input surface and stage builders fall
/// back to when the caller doesn't override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub worker_pool: WorkerPoolConfig,
    pub list_log: ListLogConfig,
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Bounded pool size for the task DAG executor ("a bounded
    /// pool of workers drives independent tasks").
    pub task_concurrency: usize,
    /// Fan-out width for field-set reads and ID discovery
    /// ("available-parallelism-sized fan-out").
    pub fieldset_read_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLogConfig {
    /// Number of time-window partitions `ListLogEntries` splits a query
    /// into.
    pub time_window_partitions: usize,
    /// Filter character limit past which `ListLogEntries` records a
    /// warning.
    pub filter_character_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Progress-update tick interval in milliseconds ("1 Hz").
    pub tick_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_pool: WorkerPoolConfig::default(),
            list_log: ListLogConfig::default(),
            progress: ProgressConfig::default(),
        }
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            task_concurrency: 16,
            fieldset_read_concurrency: num_cpus::get().max(1),
        }
    }
}

impl Default for ListLogConfig {
    fn default() -> Self {
        Self {
            time_window_partitions: crate::stages::DEFAULT_LIST_LOG_PARTITIONS,
            filter_character_limit: crate::stages::FILTER_CHARACTER_LIMIT,
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 1000 }
    }
}

impl Config {
    /// Resolves the configuration file path under the platform's config
    /// directory, creating the directory if needed.
    pub fn config_file_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "khi", "khi-inspect")
            .context("unable to determine project directories")?;
        let config_dir = proj_dirs.config_dir();
        fs::create_dir_all(config_dir).context("failed to create config directory")?;
        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the platform config directory, falling
    /// back to defaults if the file is absent or fails to parse.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path).context("failed to read config file")?;
        match toml::from_str::<Config>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path()?;
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&config_path, content).context("failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.worker_pool.task_concurrency, config.worker_pool.task_concurrency);
        assert_eq!(deserialized.list_log.time_window_partitions, config.list_log.time_window_partitions);
    }
}
