//! Configuration for the backup driver.
//!
//! [`DriverConfig`] is what the library needs. [`Config`] is the TOML file
//! read by the binary, adding the log level and what to back up.

use crate::objects::ObjectFormat;
use crate::{BackupError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub driver: DriverConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub backup: BackupPlan,

    /// Objects to serialize on each run: key → value
    #[serde(default)]
    pub objects: toml::Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Root directory holding all snapshots
    #[serde(default)]
    pub target_dir: PathBuf,

    /// Snapshot name prefix
    #[serde(default = "default_title")]
    pub title: String,

    /// Create a snapshot directory as soon as the driver is built
    #[serde(default)]
    pub initiate_snapshot: bool,

    /// Snapshots to keep; zero or less keeps everything
    #[serde(default = "default_max_backup_count")]
    pub max_backup_count: i64,

    /// Encoding for object backups
    #[serde(default)]
    pub object_format: ObjectFormat,

    /// Decode object backups during restore
    #[serde(default)]
    pub restore_objects: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupPlan {
    #[serde(default)]
    pub dirs: Vec<PathBuf>,

    #[serde(default)]
    pub files: Vec<PathBuf>,
}

// Default values
fn default_title() -> String {
    "backup_training_output".to_string()
}

fn default_max_backup_count() -> i64 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DriverConfig {
    /// Defaults for everything but the target root
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            title: default_title(),
            initiate_snapshot: false,
            max_backup_count: default_max_backup_count(),
            object_format: ObjectFormat::default(),
            restore_objects: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BackupError::Config(e.to_string()))
    }

    /// Configuration with defaults for everything but the target root
    pub fn with_target(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            driver: DriverConfig::new(target_dir),
            log: LogConfig::default(),
            backup: BackupPlan::default(),
            objects: toml::Table::new(),
        }
    }

    /// Configured objects converted to the in-memory object model
    pub fn objects(&self) -> Result<IndexMap<String, Value>> {
        self.objects
            .iter()
            .map(|(key, value)| -> Result<(String, Value)> {
                Ok((key.clone(), serde_json::to_value(value)?))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.driver.target_dir.as_os_str().is_empty() {
            return Err(BackupError::Config("driver.target_dir is not set".to_string()));
        }
        if self.driver.title.is_empty() {
            return Err(BackupError::Config("driver.title must not be empty".to_string()));
        }
        Ok(())
    }
}
