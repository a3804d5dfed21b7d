//! Manifest types for snapshot bookkeeping.
//!
//! A manifest records what one backup run copied (original → backup path)
//! and what it could not copy. It is serialized as `backup_info.json` in the
//! snapshot directory and never modified afterwards.

use crate::Result;
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "backup_info.json";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Backup manifest, one per snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Human-readable local time of the run
    pub datetime: String,
    /// Seconds since the Unix epoch, with sub-second precision
    pub timestamp: f64,
    pub backup_mapping: BackupMapping,
    pub failed_backups: FailedBackups,
}

/// Successful copies per category: original path (or object key) → backup path.
/// Entries keep request order on disk and when read back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMapping {
    pub dirs: IndexMap<String, String>,
    pub files: IndexMap<String, String>,
    pub objects: IndexMap<String, String>,
}

/// Items that could not be backed up, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBackups {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
    pub objects: Vec<String>,
}

impl Manifest {
    pub fn new(now: DateTime<Local>, backup_mapping: BackupMapping, failed_backups: FailedBackups) -> Self {
        Self {
            datetime: now.format(DATETIME_FORMAT).to_string(),
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
            backup_mapping,
            failed_backups,
        }
    }

    /// Write the manifest into `snapshot_dir`
    pub fn save(&self, snapshot_dir: &Path) -> Result<PathBuf> {
        let path = snapshot_dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, serde_json::to_vec(self)?)?;
        Ok(path)
    }

    /// Read the manifest of `snapshot_dir`; `None` when the file is absent
    pub fn load(snapshot_dir: &Path) -> Result<Option<Self>> {
        let path = snapshot_dir.join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&content)?))
    }
}
