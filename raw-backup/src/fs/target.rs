//! Backup target validation.

use crate::{BackupError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

const PROBE_FILE_NAME: &str = ".raw-backup-probe";

/// Make sure `root` exists and accepts writes.
///
/// Creates `root` when missing, then writes and removes a probe file. Any
/// failure is fatal: nothing can be backed up without a writable root.
pub fn ensure_writable(root: &Path) -> Result<()> {
    let not_writable = |source| BackupError::TargetNotWritable {
        path: root.to_path_buf(),
        source,
    };

    if !root.is_dir() {
        fs::create_dir_all(root).map_err(not_writable)?;
    }

    let probe = root.join(PROBE_FILE_NAME);
    fs::write(&probe, b".").map_err(not_writable)?;
    fs::remove_file(&probe).map_err(not_writable)?;

    debug!(root = %root.display(), "Backup target is writable");
    Ok(())
}
