//! Subscriber setup for the trainer's `tracing` output

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

const DEFAULT_FILTER: &str = "netsec_trainer=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Log file name for the current local time, e.g. `10_18_2026_14_03_59.log`
pub fn log_file_name() -> String {
    format!("{}.log", Local::now().format("%m_%d_%Y_%H_%M_%S"))
}

/// Install a global subscriber writing to a timestamped file in `dir`.
///
/// Returns the log file path. If a global subscriber is already installed it
/// is kept and the file stays empty.
pub fn init_file_logging(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(log_file_name());
    let file = File::create(&path)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .is_ok();
    if !installed {
        tracing::debug!(path = %path.display(), "Global subscriber already set");
    }
    Ok(path)
}

/// Install a global subscriber writing to stdout. Repeated calls are no-ops.
pub fn init_stdout_logging() {
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter()).try_init();
}
