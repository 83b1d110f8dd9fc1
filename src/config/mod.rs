//! Configuration management.
//!
//! Resolves where finrec keeps its data. Everything hangs off one home
//! directory:
//!
//! - **Database**: `<home>/data/finrec.db`
//! - **Photos** (public area): `<home>/storage/public`
//! - **Scratch**: `<home>/temp/exports` and `<home>/temp/imports`
//!
//! The home defaults to `~/.finrec` and can be moved with `--home` or
//! `FINREC_HOME`.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Largest accepted import upload, in bytes (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Largest accepted record photo, in bytes (2 MiB).
pub const MAX_PHOTO_BYTES: u64 = 2 * 1024 * 1024;

/// Default age after which scratch export files are swept, in minutes.
pub const DEFAULT_TEMP_MAX_AGE_MINUTES: u64 = 60;

/// Version string written into every export.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Resolve the finrec home directory.
///
/// Priority:
/// 1. `explicit` (from `--home`)
/// 2. `FINREC_HOME` environment variable
/// 3. `~/.finrec`
#[must_use]
pub fn resolve_home(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(home) = std::env::var("FINREC_HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    directories::BaseDirs::new().map(|b| b.home_dir().join(".finrec"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. `explicit` (from `--db`)
/// 2. `FINREC_DB` environment variable
/// 3. `<home>/data/finrec.db`
#[must_use]
pub fn resolve_db_path(explicit: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(db_path) = std::env::var("FINREC_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    resolve_home(home).map(|dir| dir.join("data").join("finrec.db"))
}

/// Root of the photo store.
#[must_use]
pub fn photo_root(home: &Path) -> PathBuf {
    home.join("storage").join("public")
}

/// Scratch directory that exports are written to.
#[must_use]
pub fn export_scratch_dir(home: &Path) -> PathBuf {
    home.join("temp").join("exports")
}

/// Scratch directory that archives are extracted under during import.
#[must_use]
pub fn import_scratch_dir(home: &Path) -> PathBuf {
    home.join("temp").join("imports")
}

/// Resolve the acting user ID.
///
/// Priority:
/// 1. `explicit` (from `--user`)
/// 2. `FINREC_USER` environment variable
/// 3. **Error**: records always belong to someone, never guess
///
/// # Errors
///
/// Returns `NoUser` if neither source is set, or `InvalidArgument` if the
/// value is not a positive integer.
pub fn resolve_user_id(explicit: Option<i64>) -> Result<i64> {
    let id = match explicit {
        Some(id) => id,
        None => {
            let raw = std::env::var("FINREC_USER")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or(Error::NoUser)?;
            raw.trim()
                .parse::<i64>()
                .map_err(|_| Error::InvalidArgument(format!("FINREC_USER is not a number: {raw}")))?
        }
    };

    if id <= 0 {
        return Err(Error::InvalidArgument(format!(
            "User ID must be positive, got {id}"
        )));
    }
    Ok(id)
}
