//! Snapshot listing and retention.

use crate::snapshot::naming::SnapshotName;
use crate::Result;
use std::fs;
use std::path::Path;
use tracing::info;

/// List every entry directly under `root`, oldest first.
///
/// The root is expected to hold only snapshots made by this driver, so any
/// entry whose name does not parse fails the whole listing.
pub fn list_snapshots_sorted(root: &Path) -> Result<Vec<SnapshotName>> {
    let mut snapshots = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        snapshots.push(SnapshotName::parse(&entry.file_name().to_string_lossy())?);
    }

    snapshots.sort_by(|a, b| {
        a.timestamp()
            .cmp(&b.timestamp())
            .then_with(|| a.as_str().cmp(b.as_str()))
    });

    Ok(snapshots)
}

/// Delete all but the newest `max_count` snapshots under `root`.
///
/// A `max_count` of zero or less disables pruning. Returns the removed
/// snapshots, oldest first.
pub fn prune(root: &Path, max_count: i64) -> Result<Vec<SnapshotName>> {
    if max_count <= 0 {
        return Ok(Vec::new());
    }

    let mut snapshots = list_snapshots_sorted(root)?;
    let keep = usize::try_from(max_count).unwrap_or(usize::MAX);
    if snapshots.len() <= keep {
        return Ok(Vec::new());
    }

    let excess = snapshots.len() - keep;
    snapshots.truncate(excess);

    let names: Vec<&str> = snapshots.iter().map(SnapshotName::as_str).collect();
    info!(?names, "Old backups will be removed");

    for snapshot in &snapshots {
        let path = root.join(snapshot.as_str());
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    Ok(snapshots)
}
