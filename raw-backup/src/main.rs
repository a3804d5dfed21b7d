//! Raw Backup - command-line entry point
//!
//! Thin wrapper around the library: back up, restore or list snapshots.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use raw_backup::{utils, BackupDriver, BackupRequest, Config, DriverConfig, DEFAULT_LAST_N};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backup root directory (overrides config)
    #[arg(short, long, value_name = "DIR")]
    target: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Snapshot directories, files and configured objects
    Backup {
        /// Directory to back up (repeatable, added to the config list)
        #[arg(long = "dir", value_name = "DIR")]
        dirs: Vec<PathBuf>,

        /// File to back up (repeatable, added to the config list)
        #[arg(long = "file", value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Write into the current snapshot instead of starting a new one
        #[arg(long)]
        reuse_snapshot: bool,
    },

    /// Restore a snapshot from its manifest
    Restore {
        /// Snapshot directory (default: pick by --last-n)
        #[arg(long, value_name = "DIR")]
        src: Option<PathBuf>,

        /// Restore under this directory instead of the original locations
        #[arg(long, value_name = "DIR")]
        dst: Option<PathBuf>,

        /// Snapshot index in the sorted listing; negative counts from the
        /// newest (-1 = newest), non-negative from the oldest
        #[arg(long, default_value_t = DEFAULT_LAST_N, allow_negative_numbers = true)]
        last_n: i64,
    },

    /// List snapshots, oldest first
    List,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::with_target(PathBuf::new()),
    };
    if let Some(target) = args.target {
        config.driver.target_dir = target;
    }
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting raw-backup v{} (target: {})",
        env!("CARGO_PKG_VERSION"),
        config.driver.target_dir.display()
    );

    let mut driver = BackupDriver::new(driver_config(&config, &args.command))?;

    match args.command {
        Command::Backup {
            dirs,
            files,
            reuse_snapshot,
        } => {
            let request = BackupRequest {
                dirs: config.backup.dirs.iter().cloned().chain(dirs).collect(),
                files: config.backup.files.iter().cloned().chain(files).collect(),
                objects: config.objects()?,
                create_new_snapshot: !reuse_snapshot,
            };
            let outcome = driver.backup(&request)?;
            let failed = &outcome.manifest.failed_backups;
            let failures = failed.dirs.len() + failed.files.len() + failed.objects.len();
            if failures > 0 {
                tracing::warn!("{} item(s) could not be backed up", failures);
            }
            println!("{}", outcome.snapshot_dir.display());
        }
        Command::Restore { src, dst, last_n } => {
            match driver.restore(src.as_deref(), dst.as_deref(), last_n)? {
                Some(report) => println!("{}", serde_json::to_string_pretty(&summary(&report))?),
                None => anyhow::bail!("snapshot has no manifest, nothing restored"),
            }
        }
        Command::List => {
            for snapshot in driver.list_snapshots()? {
                println!("{snapshot}");
            }
        }
    }

    Ok(())
}

/// Driver settings for one command. Only `backup` may start a snapshot on
/// construction; restore and list must see the root as it is.
fn driver_config(config: &Config, command: &Command) -> DriverConfig {
    let mut driver = config.driver.clone();
    if !matches!(command, Command::Backup { .. }) {
        driver.initiate_snapshot = false;
    }
    driver
}

fn summary(report: &raw_backup::RestoreReport) -> serde_json::Value {
    let paths = |map: &IndexMap<PathBuf, PathBuf>| {
        map.iter()
            .map(|(from, to)| {
                (
                    from.display().to_string(),
                    serde_json::Value::String(to.display().to_string()),
                )
            })
            .collect::<serde_json::Map<String, serde_json::Value>>()
    };

    serde_json::json!({
        "snapshot": report.snapshot.display().to_string(),
        "dirs": paths(&report.dirs),
        "files": paths(&report.files),
        "objects": report.objects,
        "failed": report.failed,
    })
}
