//! Error types for the backup driver.
//!
//! Only setup and selection problems surface here. Per-item copy failures are
//! collected into the manifest instead of being returned.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Backup target {} is not writable: {source}", path.display())]
    TargetNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized snapshot name: {0}")]
    InvalidSnapshotName(String),

    #[error("No active snapshot: create one before reusing it")]
    NoActiveSnapshot,

    #[error("No snapshots found under {}", .0.display())]
    NoSnapshots(PathBuf),

    #[error("Snapshot index {index} out of range ({available} available)")]
    SnapshotIndexOutOfRange { index: i64, available: usize },

    #[error("Object encode error: {0}")]
    Encode(String),

    #[error("Object decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BackupError>;
