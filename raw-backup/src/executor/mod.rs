//! Backup driver - orchestrates snapshot creation, pruning and copies.
//!
//! One `backup` call:
//! - optionally creates a new snapshot directory
//! - prunes old snapshots down to the retention limit
//! - copies every requested directory, file and object
//! - writes the manifest
//!
//! Per-item failures are collected into the manifest. Only an unusable target
//! root, an unreadable snapshot listing or a failed manifest write abort the run.

pub mod manifest;
pub mod restore;

use crate::config::DriverConfig;
use crate::fs::{copy_file, copy_tree, ensure_writable};
use crate::objects::{backup_object, ObjectCodec};
use crate::snapshot::naming::recover_index;
use crate::snapshot::{
    list_snapshots_sorted, prune, Clock, SnapshotName, SystemClock, DIRS_SUBDIR, FILES_SUBDIR,
    OBJECTS_SUBDIR, SUBDIRS,
};
use crate::{BackupError, Result};
use indexmap::IndexMap;
use manifest::{BackupMapping, FailedBackups, Manifest};
use serde_json::Value;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use restore::{RestoreReport, DEFAULT_LAST_N};

/// What to back up in one run
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
    pub objects: IndexMap<String, Value>,
    /// Start a new snapshot instead of writing into the current one
    pub create_new_snapshot: bool,
}

impl Default for BackupRequest {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            files: Vec::new(),
            objects: IndexMap::new(),
            create_new_snapshot: true,
        }
    }
}

/// Backup execution result
#[derive(Debug)]
pub struct BackupOutcome {
    pub snapshot_dir: PathBuf,
    pub manifest: Manifest,
    /// Snapshots removed by retention during this run, oldest first
    pub pruned: Vec<SnapshotName>,
}

/// Local snapshot backup driver
pub struct BackupDriver {
    config: DriverConfig,
    codec: Box<dyn ObjectCodec>,
    clock: Box<dyn Clock>,
    snapshot_dir: Option<PathBuf>,
    next_index: u64,
}

impl BackupDriver {
    /// Validate the target root and set up a driver.
    ///
    /// The snapshot index continues after the highest one already present for
    /// this title. With `initiate_snapshot` set, a snapshot directory is
    /// created right away using the system clock.
    pub fn new(config: DriverConfig) -> Result<Self> {
        ensure_writable(&config.target_dir)?;
        let next_index = recover_index(&config.target_dir, &config.title)?;

        let mut driver = Self {
            codec: config.object_format.codec(),
            clock: Box::new(SystemClock),
            snapshot_dir: None,
            next_index,
            config,
        };

        if driver.config.initiate_snapshot {
            driver.initiate_snapshot()?;
        }

        Ok(driver)
    }

    /// Replace the object codec
    pub fn with_codec(mut self, codec: Box<dyn ObjectCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Replace the time source used for snapshot names and manifests
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn target_dir(&self) -> &Path {
        &self.config.target_dir
    }

    /// Snapshot the next `backup` writes into when reusing
    pub fn snapshot_dir(&self) -> Option<&Path> {
        self.snapshot_dir.as_deref()
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Existing snapshots, oldest first
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotName>> {
        list_snapshots_sorted(&self.config.target_dir)
    }

    /// Create a new snapshot directory with its fixed subdirectories and make
    /// it current. Re-running on an existing path creates nothing and keeps
    /// the index.
    pub fn initiate_snapshot(&mut self) -> Result<PathBuf> {
        let name = SnapshotName::new(
            &self.config.title,
            self.next_index,
            self.clock.now().naive_local(),
        );
        let path = self.config.target_dir.join(name.as_str());

        if !path.is_dir() {
            fs::create_dir_all(&path)?;
            self.next_index += 1;
            info!(snapshot = %path.display(), "Created snapshot directory");
        }

        for subdir in SUBDIRS {
            fs::create_dir_all(path.join(subdir))?;
        }

        self.snapshot_dir = Some(path.clone());
        Ok(path)
    }

    /// Run one backup
    pub fn backup(&mut self, request: &BackupRequest) -> Result<BackupOutcome> {
        if request.create_new_snapshot {
            self.initiate_snapshot()?;
        }
        let snapshot_dir = self
            .snapshot_dir
            .clone()
            .ok_or(BackupError::NoActiveSnapshot)?;

        let pruned = prune(&self.config.target_dir, self.config.max_backup_count)?;

        let object_keys: Vec<&String> = request.objects.keys().collect();
        info!(
            dirs = ?request.dirs,
            files = ?request.files,
            objects = ?object_keys,
            "Backup started"
        );

        let mut mapping = BackupMapping::default();
        let mut failed = FailedBackups::default();

        for dir in &request.dirs {
            let outcome = backup_dir(dir, &snapshot_dir.join(DIRS_SUBDIR));
            record(
                "dir",
                path_key(dir),
                outcome,
                Path::is_dir,
                &mut mapping.dirs,
                &mut failed.dirs,
            );
        }

        for file in &request.files {
            let outcome = backup_file(file, &snapshot_dir.join(FILES_SUBDIR));
            record(
                "file",
                path_key(file),
                outcome,
                Path::is_file,
                &mut mapping.files,
                &mut failed.files,
            );
        }

        let objs_dir = snapshot_dir.join(OBJECTS_SUBDIR);
        let mut object_paths = HashSet::new();
        for (key, value) in &request.objects {
            let outcome = backup_object(key, value, &objs_dir, self.codec.as_ref(), &mut object_paths);
            record(
                "object",
                key.clone(),
                outcome,
                Path::is_file,
                &mut mapping.objects,
                &mut failed.objects,
            );
        }

        let manifest = Manifest::new(self.clock.now(), mapping, failed);
        manifest.save(&snapshot_dir)?;

        info!(snapshot = %snapshot_dir.display(), "Backup completed");

        Ok(BackupOutcome {
            snapshot_dir,
            manifest,
            pruned,
        })
    }
}

impl fmt::Display for BackupDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BackupDriver(target_dir=\"{}\", title=\"{}\")",
            self.config.target_dir.display(),
            self.config.title
        )
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn not_found(kind: &str, path: &Path) -> BackupError {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{kind} '{}' does not exist", path.display()),
    )
    .into()
}

/// Name a directory is stored under. Paths such as `.` or `x/..` have no
/// final component of their own, so their canonical form supplies it.
fn dir_name(src: &Path) -> Result<OsString> {
    if let Some(name) = src.file_name() {
        return Ok(name.to_os_string());
    }

    fs::canonicalize(src)?
        .file_name()
        .map(OsStr::to_os_string)
        .ok_or_else(|| {
            BackupError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("directory '{}' has no name to back up under", src.display()),
            ))
        })
}

fn backup_dir(src: &Path, dirs_root: &Path) -> Result<PathBuf> {
    if !src.is_dir() {
        return Err(not_found("directory", src));
    }

    let dst = dirs_root.join(dir_name(src)?);
    let stats = copy_tree(src, &dst)?;
    info!(src = %src.display(), files = stats.files, bytes = stats.bytes, "Directory backed up");

    Ok(dst)
}

fn backup_file(src: &Path, files_root: &Path) -> Result<PathBuf> {
    if !src.is_file() {
        return Err(not_found("file", src));
    }
    copy_file(src, files_root)
}

/// File a copy outcome under success or failure. A copy only counts when it
/// returned a path and that path exists afterwards; the same rule applies to
/// every category.
fn record(
    kind: &str,
    key: String,
    outcome: Result<PathBuf>,
    exists: fn(&Path) -> bool,
    mapping: &mut IndexMap<String, String>,
    failed: &mut Vec<String>,
) {
    match outcome {
        Ok(path) if exists(&path) => {
            mapping.insert(key, path_key(&path));
        }
        Ok(path) => {
            warn!(kind, item = %key, path = %path.display(), "Backup missing after copy");
            failed.push(key);
        }
        Err(e) => {
            warn!(kind, item = %key, error = %e, "Backup failed");
            failed.push(key);
        }
    }
}
