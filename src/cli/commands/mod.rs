//! Command implementations.

pub mod completions;
pub mod init;
pub mod interchange;
pub mod record;
pub mod summary;
pub mod version;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::cli::FilterArgs;
use crate::config::{
    export_scratch_dir, import_scratch_dir, photo_root, resolve_db_path, resolve_home,
    resolve_user_id,
};
use crate::error::{Error, Result};
use crate::model::{RecordFilter, RecordKind};
use crate::storage::{LocalPhotoStore, SqliteStorage};

/// Resolved locations plus an open database, shared by every command that
/// touches records.
pub struct Workspace {
    pub home: PathBuf,
    pub storage: SqliteStorage,
    pub photos: LocalPhotoStore,
}

impl Workspace {
    /// Open an initialized workspace.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the database does not exist yet.
    pub fn open(db: Option<&Path>, home: Option<&Path>) -> Result<Self> {
        let home = resolve_home(home)
            .ok_or_else(|| Error::Config("Could not determine finrec home directory".to_string()))?;
        let db_path = resolve_db_path(db, Some(home.as_path())).ok_or(Error::NotInitialized)?;

        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }

        let storage = SqliteStorage::open(&db_path)?;
        let photos = LocalPhotoStore::new(photo_root(&home));
        Ok(Self {
            home,
            storage,
            photos,
        })
    }

    pub fn export_dir(&self) -> PathBuf {
        export_scratch_dir(&self.home)
    }

    pub fn import_dir(&self) -> PathBuf {
        import_scratch_dir(&self.home)
    }
}

/// Where a command sends its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Human,
    Json,
    Csv,
}

impl Output {
    #[must_use]
    pub fn is_machine(self) -> bool {
        self != Self::Human
    }
}

/// Resolve `--user` / `FINREC_USER`.
///
/// # Errors
///
/// Returns `NoUser` or `InvalidArgument`, see [`resolve_user_id`].
pub fn current_user(user: Option<i64>) -> Result<i64> {
    resolve_user_id(user)
}

/// Turn filter flags into a [`RecordFilter`], rejecting unknown values.
///
/// # Errors
///
/// Returns `InvalidArgument` for an unknown type or a malformed date.
pub fn parse_filter(args: &FilterArgs) -> Result<RecordFilter> {
    let kind = args
        .kind
        .as_deref()
        .map(|k| {
            RecordKind::parse(k).ok_or_else(|| {
                Error::InvalidArgument(format!("unknown type '{k}' (income, expense)"))
            })
        })
        .transpose()?;

    Ok(RecordFilter {
        kind,
        category: args.category.clone(),
        date_from: args.from.as_deref().map(parse_date_arg).transpose()?,
        date_to: args.to.as_deref().map(parse_date_arg).transpose()?,
    })
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::InvalidArgument(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let filter = parse_filter(&FilterArgs {
            kind: Some("expense".to_string()),
            category: None,
            from: Some("2025-01-01".to_string()),
            to: None,
        })
        .unwrap();
        assert_eq!(filter.kind, Some(RecordKind::Expense));
        assert_eq!(filter.date_from, NaiveDate::from_ymd_opt(2025, 1, 1));

        let bad = FilterArgs {
            kind: Some("transfer".to_string()),
            ..FilterArgs::default()
        };
        assert!(matches!(parse_filter(&bad), Err(Error::InvalidArgument(_))));

        let bad_date = FilterArgs {
            to: Some("31-01-2025".to_string()),
            ..FilterArgs::default()
        };
        assert!(matches!(parse_filter(&bad_date), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_workspace_requires_init() {
        let temp = tempfile::TempDir::new().unwrap();
        let db = temp.path().join("missing.db");
        let result = Workspace::open(Some(&db), Some(temp.path()));
        assert!(matches!(result, Err(Error::NotInitialized)));
    }
}
