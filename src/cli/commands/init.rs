//! Initialize a finrec home.
//!
//! Creates `<home>/data/finrec.db` with its schema, the photo store root,
//! and the export/import scratch directories.

use crate::config::{
    export_scratch_dir, import_scratch_dir, photo_root, resolve_db_path, resolve_home,
};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    home: PathBuf,
    database: PathBuf,
    photos: PathBuf,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if a directory or the database cannot be created.
pub fn execute(db: Option<&Path>, home: Option<&Path>, force: bool, json: bool) -> Result<()> {
    let home = resolve_home(home)
        .ok_or_else(|| Error::Config("Could not determine finrec home directory".to_string()))?;
    let db_path = resolve_db_path(db, Some(home.as_path())).ok_or(Error::NotInitialized)?;

    if db_path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
        remove_database(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let photos = photo_root(&home);
    for dir in [&photos, &export_scratch_dir(&home), &import_scratch_dir(&home)] {
        fs::create_dir_all(dir)?;
    }

    // Opening applies the schema
    drop(SqliteStorage::open(&db_path)?);

    if json {
        let output = InitOutput {
            home,
            database: db_path,
            photos,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized finrec");
        println!("  Database: {}", db_path.display());
        println!("  Photos:   {}", photos.display());
        println!();
        println!("Next: set FINREC_USER (or pass --user) and run 'finrec record add'.");
    }

    Ok(())
}

/// Remove a database and its WAL side files.
fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut side = db_path.as_os_str().to_os_string();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            fs::remove_file(side)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout() {
        let temp = TempDir::new().unwrap();
        execute(None, Some(temp.path()), false, true).unwrap();

        assert!(temp.path().join("data/finrec.db").exists());
        assert!(temp.path().join("storage/public").is_dir());
        assert!(temp.path().join("temp/exports").is_dir());
        assert!(temp.path().join("temp/imports").is_dir());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("finrec.db");
        execute(Some(&db), Some(temp.path()), false, true).unwrap();

        let result = execute(Some(&db), Some(temp.path()), false, true);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));
    }

    #[test]
    fn test_init_force_recreates() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("finrec.db");
        execute(Some(&db), Some(temp.path()), false, true).unwrap();

        let mut storage = SqliteStorage::open(&db).unwrap();
        storage
            .create_record(
                1,
                &crate::model::NewRecord {
                    title: "x".to_string(),
                    description: None,
                    kind: crate::model::RecordKind::Income,
                    amount: rust_decimal::Decimal::ONE,
                    occurred_on: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    category: None,
                    photo: None,
                },
            )
            .unwrap();
        drop(storage);

        execute(Some(&db), Some(temp.path()), true, true).unwrap();
        let storage = SqliteStorage::open(&db).unwrap();
        assert_eq!(storage.count_records(1).unwrap(), 0);
    }
}
