//! Snapshot naming and retention.

pub mod naming;
pub mod retention;

pub use naming::{Clock, SnapshotName, SystemClock};
pub use retention::{list_snapshots_sorted, prune};

/// Fixed subdirectory for backed-up directory trees
pub const DIRS_SUBDIR: &str = "directories_backups";

/// Fixed subdirectory for backed-up single files
pub const FILES_SUBDIR: &str = "files_backups";

/// Fixed subdirectory for serialized objects
pub const OBJECTS_SUBDIR: &str = "objs_backups";

/// Every snapshot gets these, created up front
pub const SUBDIRS: [&str; 3] = [DIRS_SUBDIR, FILES_SUBDIR, OBJECTS_SUBDIR];
