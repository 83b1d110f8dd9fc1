//! File helpers for interchange output.
//!
//! - Atomic writes: write to a temp file, sync to disk, then rename
//! - Age-based sweeping of scratch directories

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::interchange::types::InterchangeResult;

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file next to the target (`<name>.tmp`)
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> InterchangeResult<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Get the size of a file in bytes.
///
/// Returns 0 if the file doesn't exist.
#[must_use]
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Delete regular files directly inside `dir` whose modification time is
/// older than `max_age`. Subdirectories are left alone.
///
/// A missing directory counts as nothing to do.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or a file cannot be removed.
pub fn sweep_older_than(dir: &Path, max_age: Duration) -> InterchangeResult<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        if meta.modified()? < cutoff {
            fs::remove_file(entry.path())?;
            debug!(path = %entry.path().display(), "removed stale scratch file");
            removed += 1;
        }
    }

    Ok(removed)
}
