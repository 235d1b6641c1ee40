// openw-cli/src/logging.rs
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Builder, Target, WriteStyle};

use crate::wallet::constants::LOG_FILE_NAME;

/// Installs the process logger, appending to `<log_dir>/openwcli.log`.
/// `RUST_LOG` takes precedence over `level`.
pub fn init(log_dir: &Path, level: &str) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Builder::new()
        .parse_filters(level)
        .parse_env("RUST_LOG")
        .target(Target::Pipe(Box::new(file)))
        .write_style(WriteStyle::Never)
        .format_timestamp_millis()
        .try_init()
        .context("Failed to install logger")?;

    Ok(path)
}
