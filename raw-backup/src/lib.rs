//! Raw Backup Library
//!
//! Local snapshot backups of directories, files and serializable objects,
//! with a JSON manifest per snapshot, count-based retention and
//! manifest-driven restore.
//!
//! ```no_run
//! use raw_backup::{BackupDriver, BackupRequest, DriverConfig, DEFAULT_LAST_N};
//!
//! # fn main() -> raw_backup::Result<()> {
//! let mut driver = BackupDriver::new(DriverConfig::new("/var/backups/training"))?;
//! driver.backup(&BackupRequest {
//!     dirs: vec!["/data/checkpoints".into()],
//!     files: vec!["/data/config.yaml".into()],
//!     ..Default::default()
//! })?;
//!
//! let restored = driver.restore(None, None, DEFAULT_LAST_N)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod executor;
pub mod fs;
pub mod objects;
pub mod snapshot;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DriverConfig};
pub use executor::{BackupDriver, BackupOutcome, BackupRequest, RestoreReport, DEFAULT_LAST_N};
pub use objects::{JsonCodec, ObjectCodec, ObjectFormat, TomlCodec};
pub use snapshot::{Clock, SnapshotName, SystemClock};
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
