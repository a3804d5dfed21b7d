//! Snapshot directory names.
//!
//! A snapshot lives in `<title>_<index>|<timestamp>`. The timestamp is local
//! time with microsecond precision and is the only ordering key; the index is
//! a display label.

use crate::{BackupError, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use std::fmt;
use std::fs;
use std::path::Path;

/// Rendering format for the timestamp suffix
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H_%M_%S%.6f";

// `%.f` also accepts a suffix without fractional digits.
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d-%H_%M_%S%.f";

/// Separates the label from the timestamp
pub const SEPARATOR: char = '|';

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A parsed snapshot directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotName {
    name: String,
    label: String,
    timestamp: NaiveDateTime,
}

impl SnapshotName {
    /// Build the name for snapshot `index` of `title` taken at `timestamp`
    pub fn new(title: &str, index: u64, timestamp: NaiveDateTime) -> Self {
        let label = format!("{title}_{index}");
        let name = format!(
            "{label}{SEPARATOR}{}",
            timestamp.format(TIMESTAMP_FORMAT)
        );

        Self {
            name,
            label,
            timestamp,
        }
    }

    /// Parse a directory name; the timestamp is the text after the last `|`
    pub fn parse(name: &str) -> Result<Self> {
        let (label, suffix) = name
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| BackupError::InvalidSnapshotName(name.to_string()))?;

        let timestamp = NaiveDateTime::parse_from_str(suffix, TIMESTAMP_PARSE_FORMAT)
            .map_err(|_| BackupError::InvalidSnapshotName(name.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            label: label.to_string(),
            timestamp,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Title part of the label (everything before the last `_`)
    pub fn title(&self) -> &str {
        self.label
            .rsplit_once('_')
            .map_or(self.label.as_str(), |(title, _)| title)
    }

    /// Index part of the label, if it is numeric
    pub fn index(&self) -> Option<u64> {
        self.label
            .rsplit_once('_')
            .and_then(|(_, index)| index.parse().ok())
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Next free index for `title` under `root`: one past the highest index found
/// in existing snapshot names, or 0. Entries that do not parse are ignored.
pub fn recover_index(root: &Path, title: &str) -> Result<u64> {
    let mut next = 0;

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let Ok(name) = SnapshotName::parse(&entry.file_name().to_string_lossy()) else {
            continue;
        };

        if name.title() == title {
            if let Some(index) = name.index() {
                next = next.max(index + 1);
            }
        }
    }

    Ok(next)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use std::sync::Mutex;

    /// Deterministic clock: each call returns the previous reading plus `step`
    pub(crate) struct ManualClock {
        current: Mutex<DateTime<Local>>,
        step: TimeDelta,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                current: Mutex::new(Local.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()),
                step: TimeDelta::milliseconds(1500),
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Local> {
            let mut current = self.current.lock().unwrap();
            let now = *current;
            *current = now + self.step;
            now
        }
    }
}
