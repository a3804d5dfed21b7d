//! Directory traversal for tree copies.
//!
//! Only regular files are reported. Directories are implied by the relative
//! paths of the files below them; symlinks and special files are skipped.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A regular file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Path relative to the walk root
    pub relative_path: PathBuf,

    /// File size in bytes
    pub size: u64,
}

impl FileInfo {
    fn from_entry(entry: &DirEntry, root: &Path) -> walkdir::Result<Self> {
        let metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        Ok(Self {
            path,
            relative_path,
            size: metadata.len(),
        })
    }
}

/// Walk a directory tree and collect every regular file below `root`.
///
/// Fails if `root` (or any directory below it) cannot be read. Traversal is
/// iterative, so nesting depth is bounded only by the filesystem.
///
/// # Example
/// ```no_run
/// use raw_backup::fs::walker::walk_directory;
/// use std::path::Path;
///
/// let files = walk_directory(Path::new("/data")).unwrap();
/// println!("Found {} files", files.len());
/// ```
pub fn walk_directory(root: &Path) -> walkdir::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;

        if !entry.file_type().is_file() {
            continue;
        }

        files.push(FileInfo::from_entry(&entry, root)?);
    }

    Ok(files)
}
