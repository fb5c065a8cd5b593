//! File logging setup.
//!
//! All runs append human-readable timestamped lines to
//! `~/.lockstep-rebase/lockstep-rebase.log` (override with
//! `LOCKSTEP_REBASE_LOG`). The file is rotated by size at startup, keeping
//! three numbered predecessors. Console logging is opt-in via `--verbose`.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

const MAX_LOG_BYTES: u64 = 1024 * 1024;
const KEEP_ROTATIONS: usize = 3;

/// Initialize logging and return the log file path.
///
/// # Errors
/// Fails when the log directory cannot be created or the file opened.
pub fn init(verbose: bool) -> Result<PathBuf> {
    let path = log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    rotate_if_oversized(&path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_filter(LevelFilter::DEBUG);

    let console_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .with_filter(LevelFilter::INFO)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .ok();

    Ok(path)
}

fn log_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("LOCKSTEP_REBASE_LOG") {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .context("cannot determine home directory for the log file")?;
    Ok(PathBuf::from(home)
        .join(".lockstep-rebase")
        .join("lockstep-rebase.log"))
}

/// Shift `log` -> `log.1` -> ... -> `log.N` once the file exceeds the size
/// cap; the oldest rotation falls off.
fn rotate_if_oversized(path: &PathBuf) -> Result<()> {
    let Ok(meta) = fs::metadata(path) else {
        return Ok(());
    };
    if meta.len() < MAX_LOG_BYTES {
        return Ok(());
    }
    for index in (1..KEEP_ROTATIONS).rev() {
        let from = rotation_path(path, index);
        if from.exists() {
            fs::rename(&from, rotation_path(path, index + 1))?;
        }
    }
    fs::rename(path, rotation_path(path, 1))?;
    File::create(path)?;
    Ok(())
}

fn rotation_path(path: &PathBuf, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rotation_shifts_files() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("app.log");
        fs::write(&log, vec![0u8; (MAX_LOG_BYTES + 1) as usize]).unwrap();
        fs::write(rotation_path(&log, 1), b"old-1").unwrap();

        rotate_if_oversized(&log).unwrap();

        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
        assert_eq!(
            fs::metadata(rotation_path(&log, 1)).unwrap().len(),
            MAX_LOG_BYTES + 1
        );
        assert_eq!(fs::read(rotation_path(&log, 2)).unwrap(), b"old-1");
    }

    #[test]
    fn test_small_file_is_left_alone() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("app.log");
        fs::write(&log, b"little").unwrap();

        rotate_if_oversized(&log).unwrap();

        assert_eq!(fs::read(&log).unwrap(), b"little");
        assert!(!rotation_path(&log, 1).exists());
    }
}
