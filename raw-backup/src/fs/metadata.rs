//! File metadata preservation for copies.
//!
//! Captures timestamps and permissions from a source file and re-applies them
//! to its copy, so backups and restores keep the original mtime.

use filetime::FileTime;
use std::fs;
use std::path::Path;

/// Metadata carried over from a source file to its copy
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Last modification time
    pub modified: FileTime,

    /// Last access time
    pub accessed: FileTime,

    /// Permission bits (read-only flag on non-Unix platforms)
    pub permissions: fs::Permissions,
}

impl FileMetadata {
    /// Extract metadata from a file path
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;

        Ok(Self {
            modified: FileTime::from_last_modification_time(&metadata),
            accessed: FileTime::from_last_access_time(&metadata),
            permissions: metadata.permissions(),
        })
    }

    /// Apply this metadata to a file.
    ///
    /// Times go first: a read-only permission set would otherwise block the
    /// timestamp update on some platforms.
    pub fn apply_to_path(&self, path: &Path) -> std::io::Result<()> {
        filetime::set_file_times(path, self.accessed, self.modified)?;
        fs::set_permissions(path, self.permissions.clone())?;
        Ok(())
    }
}
