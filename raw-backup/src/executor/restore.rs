//! Manifest-driven restore.
//!
//! Reads a snapshot's manifest and copies each backed-up directory and file
//! back to where it came from, or re-rooted under an explicit destination.

use super::manifest::{Manifest, MANIFEST_FILE_NAME};
use super::BackupDriver;
use crate::fs::{copy_file, copy_tree};
use crate::objects::load_object;
use crate::{BackupError, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Snapshot selected when no source is given: the newest one
pub const DEFAULT_LAST_N: i64 = -1;

/// What a restore put back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    /// Snapshot directory the restore read from
    pub snapshot: PathBuf,
    /// Backup tree → destination directory, in manifest order
    pub dirs: IndexMap<PathBuf, PathBuf>,
    /// Backup file → destination directory, in manifest order
    pub files: IndexMap<PathBuf, PathBuf>,
    /// Decoded objects, filled only when object restore is enabled
    pub objects: IndexMap<String, Value>,
    /// Backup paths (or object keys) that could not be restored
    pub failed: Vec<String>,
}

impl BackupDriver {
    /// Restore a snapshot.
    ///
    /// `src` names the snapshot directory; without it `last_n` indexes the
    /// sorted listing. Negative values count from the newest (`-1` = newest,
    /// `-2` = the one before), non-negative ones from the oldest (`0` =
    /// oldest). `dst` re-roots every destination under the given directory;
    /// without it entries go back to their original paths.
    ///
    /// Returns `Ok(None)` when the snapshot has no manifest; nothing is copied
    /// in that case.
    pub fn restore(
        &self,
        src: Option<&Path>,
        dst: Option<&Path>,
        last_n: i64,
    ) -> Result<Option<RestoreReport>> {
        let snapshot = match src {
            Some(path) => path.to_path_buf(),
            None => self.resolve_snapshot(last_n)?,
        };

        let Some(manifest) = Manifest::load(&snapshot)? else {
            warn!(
                snapshot = %snapshot.display(),
                "Backup is broken, {MANIFEST_FILE_NAME} not found"
            );
            return Ok(None);
        };

        let mut report = RestoreReport {
            snapshot: snapshot.clone(),
            ..Default::default()
        };

        for (original, backup) in &manifest.backup_mapping.dirs {
            let backup = PathBuf::from(backup);
            let target = dir_destination(Path::new(original), dst);

            match copy_tree(&backup, &target) {
                Ok(stats) => {
                    debug!(dst = %target.display(), files = stats.files, "Directory restored");
                    report.dirs.insert(backup, target);
                }
                Err(e) => {
                    warn!(backup = %backup.display(), error = %e, "Restore dir failed");
                    report.failed.push(backup.to_string_lossy().into_owned());
                }
            }
        }

        for (original, backup) in &manifest.backup_mapping.files {
            let backup = PathBuf::from(backup);
            let copied = file_destination(Path::new(original), dst, std::env::current_dir)
                .map_err(BackupError::from)
                .and_then(|target| copy_file(&backup, &target).map(|_| target));

            match copied {
                Ok(target) => {
                    report.files.insert(backup, target);
                }
                Err(e) => {
                    warn!(backup = %backup.display(), error = %e, "Restore file failed");
                    report.failed.push(backup.to_string_lossy().into_owned());
                }
            }
        }

        if self.config.restore_objects {
            for (key, path) in &manifest.backup_mapping.objects {
                match load_object(Path::new(path), self.codec.as_ref()) {
                    Ok(value) => {
                        report.objects.insert(key.clone(), value);
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "Restore object failed");
                        report.failed.push(key.clone());
                    }
                }
            }
        } else if !manifest.backup_mapping.objects.is_empty() {
            debug!(
                count = manifest.backup_mapping.objects.len(),
                "Object restore disabled, skipping objects"
            );
        }

        info!(
            snapshot = %snapshot.display(),
            dirs = report.dirs.len(),
            files = report.files.len(),
            objects = report.objects.len(),
            "Restore completed"
        );

        Ok(Some(report))
    }

    fn resolve_snapshot(&self, last_n: i64) -> Result<PathBuf> {
        let snapshots = self.list_snapshots()?;
        if snapshots.is_empty() {
            return Err(BackupError::NoSnapshots(self.config.target_dir.clone()));
        }

        let position =
            listing_position(snapshots.len(), last_n).ok_or(BackupError::SnapshotIndexOutOfRange {
                index: last_n,
                available: snapshots.len(),
            })?;

        Ok(self.config.target_dir.join(snapshots[position].as_str()))
    }
}

/// Position in a listing of `len` entries for a possibly negative index
fn listing_position(len: usize, index: i64) -> Option<usize> {
    let position = if index < 0 {
        let from_end = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(from_end)?
    } else {
        usize::try_from(index).ok()?
    };

    (position < len).then_some(position)
}

/// Strip root and prefix components so `path` can live under another root
fn reroot(root: &Path, path: &Path) -> PathBuf {
    let relative: PathBuf = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    root.join(relative)
}

fn dir_destination(original: &Path, dst: Option<&Path>) -> PathBuf {
    match dst {
        Some(root) => reroot(root, original),
        None => original.to_path_buf(),
    }
}

/// Directory a backed-up file is copied into: the original's parent, or the
/// working directory when the original had no directory part. `cwd` is only
/// consulted in that last case.
fn file_destination(
    original: &Path,
    dst: Option<&Path>,
    cwd: impl FnOnce() -> io::Result<PathBuf>,
) -> io::Result<PathBuf> {
    let parent = original
        .parent()
        .filter(|p| !p.as_os_str().is_empty());

    match (dst, parent) {
        (Some(root), Some(parent)) => Ok(reroot(root, parent)),
        (Some(root), None) => Ok(root.to_path_buf()),
        (None, Some(parent)) => Ok(parent.to_path_buf()),
        (None, None) => cwd(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::driver;
    use crate::executor::BackupRequest;
    use crate::snapshot::SUBDIRS;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        base: PathBuf,
        dir: PathBuf,
        file: PathBuf,
        root: PathBuf,
    }

    fn fixture() -> Result<Fixture> {
        let temp = TempDir::new()?;
        let base = temp.path().to_path_buf();

        let dir = base.join("work/checkpoints");
        fs::create_dir_all(dir.join("epoch_1"))?;
        fs::write(dir.join("epoch_1/model.bin"), [1u8, 2, 3])?;
        fs::write(dir.join("log.txt"), b"loss=0.4")?;

        let file = base.join("work/settings.json");
        fs::write(&file, br#"{"lr": 0.01}"#)?;

        Ok(Fixture {
            root: base.join("backups"),
            base,
            dir,
            file,
            _temp: temp,
        })
    }

    #[test]
    fn test_round_trip_to_original_locations() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        driver.backup(&BackupRequest {
            dirs: vec![fx.dir.clone()],
            files: vec![fx.file.clone()],
            ..Default::default()
        })?;

        fs::remove_dir_all(fx.base.join("work"))?;

        let report = driver.restore(None, None, DEFAULT_LAST_N)?.expect("manifest present");

        assert_eq!(fs::read(fx.dir.join("epoch_1/model.bin"))?, [1u8, 2, 3]);
        assert_eq!(fs::read(fx.dir.join("log.txt"))?, b"loss=0.4");
        assert_eq!(fs::read(&fx.file)?, br#"{"lr": 0.01}"#);
        assert_eq!(report.dirs.values().collect::<Vec<_>>(), vec![&fx.dir]);
        assert_eq!(
            report.files.values().collect::<Vec<_>>(),
            vec![&fx.base.join("work")]
        );
        assert!(report.failed.is_empty());
        Ok(())
    }

    #[test]
    fn test_restore_into_explicit_destination() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        driver.backup(&BackupRequest {
            dirs: vec![fx.dir.clone()],
            files: vec![fx.file.clone()],
            ..Default::default()
        })?;

        let dst = fx.base.join("restored");
        driver.restore(None, Some(&dst), DEFAULT_LAST_N)?.expect("manifest present");

        let rerooted_dir = reroot(&dst, &fx.dir);
        assert_eq!(fs::read(rerooted_dir.join("log.txt"))?, b"loss=0.4");
        let rerooted_file = reroot(&dst, &fx.file);
        assert_eq!(fs::read(rerooted_file)?, br#"{"lr": 0.01}"#);
        Ok(())
    }

    #[test]
    fn test_last_n_selects_older_snapshot() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 0)?;
        let request = BackupRequest {
            files: vec![fx.file.clone()],
            ..Default::default()
        };

        driver.backup(&request)?;
        fs::write(&fx.file, b"second")?;
        driver.backup(&request)?;
        fs::write(&fx.file, b"current")?;

        driver.restore(None, None, -2)?.expect("manifest present");
        assert_eq!(fs::read(&fx.file)?, br#"{"lr": 0.01}"#);

        driver.restore(None, None, DEFAULT_LAST_N)?.expect("manifest present");
        assert_eq!(fs::read(&fx.file)?, b"second");

        driver.restore(None, None, 0)?.expect("manifest present");
        assert_eq!(fs::read(&fx.file)?, br#"{"lr": 0.01}"#);

        driver.restore(None, None, 1)?.expect("manifest present");
        assert_eq!(fs::read(&fx.file)?, b"second");

        for index in [-3, 2] {
            assert!(matches!(
                driver.restore(None, None, index),
                Err(BackupError::SnapshotIndexOutOfRange { index: i, available: 2 }) if i == index
            ));
        }
        Ok(())
    }

    #[test]
    fn test_extreme_last_n_is_out_of_range() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        driver.backup(&BackupRequest {
            files: vec![fx.file.clone()],
            ..Default::default()
        })?;

        for index in [i64::MIN, i64::MAX] {
            assert!(matches!(
                driver.restore(None, None, index),
                Err(BackupError::SnapshotIndexOutOfRange { index: i, available: 1 }) if i == index
            ));
        }
        Ok(())
    }

    #[test]
    fn test_listing_position() {
        assert_eq!(listing_position(3, -1), Some(2));
        assert_eq!(listing_position(3, -3), Some(0));
        assert_eq!(listing_position(3, -4), None);
        assert_eq!(listing_position(3, 0), Some(0));
        assert_eq!(listing_position(3, 2), Some(2));
        assert_eq!(listing_position(3, 3), None);
        assert_eq!(listing_position(0, -1), None);
        assert_eq!(listing_position(1, i64::MIN), None);
        assert_eq!(listing_position(1, i64::MAX), None);
    }

    #[test]
    fn test_missing_manifest_returns_none() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        let snapshot = driver.initiate_snapshot()?;
        let before: Vec<_> = SUBDIRS.iter().map(|s| snapshot.join(s)).collect();

        fs::write(snapshot.join("files_backups/stray.txt"), b"x")?;
        let dst = fx.base.join("restored");

        assert_eq!(driver.restore(Some(&snapshot), Some(&dst), DEFAULT_LAST_N)?, None);
        assert!(!dst.exists());
        assert!(before.iter().all(|p| p.is_dir()));
        Ok(())
    }

    #[test]
    fn test_empty_root_has_no_snapshots() -> Result<()> {
        let fx = fixture()?;
        let driver = driver(&fx.root, 3)?;
        assert!(matches!(
            driver.restore(None, None, DEFAULT_LAST_N),
            Err(BackupError::NoSnapshots(_))
        ));
        Ok(())
    }

    #[test]
    fn test_objects_are_not_restored_by_default() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        driver.backup(&BackupRequest {
            objects: IndexMap::from([("state".to_string(), json!({"epoch": 9}))]),
            ..Default::default()
        })?;

        let report = driver.restore(None, None, DEFAULT_LAST_N)?.expect("manifest present");
        assert!(report.objects.is_empty());
        assert!(report.failed.is_empty());
        Ok(())
    }

    #[test]
    fn test_objects_restored_when_enabled() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        driver.config.restore_objects = true;
        driver.backup(&BackupRequest {
            objects: IndexMap::from([("state".to_string(), json!({"epoch": 9}))]),
            ..Default::default()
        })?;

        let report = driver.restore(None, None, DEFAULT_LAST_N)?.expect("manifest present");
        assert_eq!(report.objects["state"], json!({"epoch": 9}));
        Ok(())
    }

    #[test]
    fn test_same_prefix_objects_restore_their_own_values() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        driver.config.restore_objects = true;
        driver.backup(&BackupRequest {
            objects: IndexMap::from([
                ("a".to_string(), json!("training run configuration v1")),
                ("b".to_string(), json!("training run configuration v2")),
            ]),
            ..Default::default()
        })?;

        let report = driver.restore(None, None, DEFAULT_LAST_N)?.expect("manifest present");
        assert_eq!(report.objects["a"], json!("training run configuration v1"));
        assert_eq!(report.objects["b"], json!("training run configuration v2"));
        Ok(())
    }

    #[test]
    fn test_missing_backup_content_is_reported() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        let outcome = driver.backup(&BackupRequest {
            files: vec![fx.file.clone()],
            ..Default::default()
        })?;

        let backup = PathBuf::from(&outcome.manifest.backup_mapping.files[&fx.file.to_string_lossy().into_owned()]);
        fs::remove_file(&backup)?;

        let report = driver.restore(Some(&outcome.snapshot_dir), None, DEFAULT_LAST_N)?.expect("manifest present");
        assert!(report.files.is_empty());
        assert_eq!(report.failed, vec![backup.to_string_lossy().into_owned()]);
        Ok(())
    }

    #[test]
    fn test_file_destination_rules() -> io::Result<()> {
        let cwd = || -> io::Result<PathBuf> { Ok(PathBuf::from("/work/dir")) };

        assert_eq!(
            file_destination(Path::new("/etc/app/conf.toml"), None, cwd)?,
            PathBuf::from("/etc/app")
        );
        assert_eq!(
            file_destination(Path::new("conf.toml"), None, cwd)?,
            PathBuf::from("/work/dir")
        );
        assert_eq!(
            file_destination(Path::new("/etc/app/conf.toml"), Some(Path::new("/r")), cwd)?,
            PathBuf::from("/r/etc/app")
        );
        assert_eq!(
            file_destination(Path::new("conf.toml"), Some(Path::new("/r")), cwd)?,
            PathBuf::from("/r")
        );
        Ok(())
    }

    #[test]
    fn test_working_directory_only_needed_for_bare_names() {
        let gone = || -> io::Result<PathBuf> { Err(io::Error::new(io::ErrorKind::NotFound, "cwd removed")) };

        assert_eq!(
            file_destination(Path::new("/etc/app/conf.toml"), None, gone).ok(),
            Some(PathBuf::from("/etc/app"))
        );
        assert_eq!(
            file_destination(Path::new("conf.toml"), Some(Path::new("/r")), gone).ok(),
            Some(PathBuf::from("/r"))
        );
        assert!(file_destination(Path::new("conf.toml"), None, gone).is_err());
    }

    #[test]
    fn test_restore_keeps_manifest_order() -> Result<()> {
        let fx = fixture()?;
        let mut driver = driver(&fx.root, 3)?;
        let inner = fx.dir.join("epoch_1");
        driver.backup(&BackupRequest {
            dirs: vec![inner.clone(), fx.dir.clone()],
            ..Default::default()
        })?;

        let dst = fx.base.join("restored");
        let report = driver.restore(None, Some(&dst), DEFAULT_LAST_N)?.expect("manifest present");

        assert_eq!(
            report.dirs.values().cloned().collect::<Vec<_>>(),
            vec![reroot(&dst, &inner), reroot(&dst, &fx.dir)]
        );
        Ok(())
    }

    #[test]
    fn test_reroot_drops_root_and_parent_components() {
        assert_eq!(
            reroot(Path::new("/r"), Path::new("/a/../b/./c")),
            PathBuf::from("/r/a/b/c")
        );
    }
}
