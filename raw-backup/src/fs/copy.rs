//! Metadata-preserving file and directory-tree copies.

use crate::fs::metadata::FileMetadata;
use crate::fs::walker::walk_directory;
use crate::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Totals for a tree copy; `bytes` is the walked size of the copied files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub bytes: u64,
}

/// Copy `src` into the directory `dst_dir`, keeping its file name.
///
/// `dst_dir` (and its parents) are created when missing. Returns the path of
/// the new copy.
pub fn copy_file(src: &Path, dst_dir: &Path) -> Result<PathBuf> {
    let file_name = src.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", src.display()),
        )
    })?;

    fs::create_dir_all(dst_dir)?;
    let dst = dst_dir.join(file_name);
    copy_with_metadata(src, &dst)?;

    Ok(dst)
}

/// Recursively copy every regular file under `src_dir` to the same relative
/// path under `dst_dir`, creating intermediate directories as needed.
pub fn copy_tree(src_dir: &Path, dst_dir: &Path) -> Result<CopyStats> {
    let files = walk_directory(src_dir)?;
    let mut stats = CopyStats::default();

    fs::create_dir_all(dst_dir)?;

    for file in files {
        let dst = dst_dir.join(&file.relative_path);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!(src = %file.path.display(), dst = %dst.display(), "copy");
        copy_with_metadata(&file.path, &dst)?;
        stats.files += 1;
        stats.bytes += file.size;
    }

    Ok(stats)
}

fn copy_with_metadata(src: &Path, dst: &Path) -> io::Result<()> {
    let metadata = FileMetadata::from_path(src)?;
    fs::copy(src, dst)?;
    metadata.apply_to_path(dst)
}
