//! Export of a user's records to JSON, SQL, or a ZIP archive with photos.
//!
//! Output lands in a scratch directory with a timestamped name; callers
//! hand the file to the user and let [`Exporter::cleanup_temp_files`] sweep
//! it later.
//!
//! # Format selection
//!
//! A bare `.json`/`.sql` file is written unless photos were requested and
//! at least one selected record has one. Then the records, their photos and
//! a `metadata.json` are packed into a `.zip` instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tracing::info;

use crate::interchange::archive::ArchivePackager;
use crate::interchange::file::{atomic_write, sweep_older_than};
use crate::interchange::sql::render_sql_dump;
use crate::interchange::types::{
    ExportDocument, ExportFormat, ExportInfo, ExportRow, InterchangeError, InterchangeResult,
};
use crate::config::EXPORT_FORMAT_VERSION;
use crate::model::{amount_text, millis_to_iso, FinancialRecord, RecordFilter};
use crate::storage::{basename, PhotoStore, SqliteStorage};

/// Exporter for a user's financial records.
pub struct Exporter<'a> {
    storage: &'a SqliteStorage,
    photos: &'a dyn PhotoStore,
    output_dir: PathBuf,
}

impl<'a> Exporter<'a> {
    /// Create an exporter writing into `output_dir` (created on demand).
    #[must_use]
    pub fn new(
        storage: &'a SqliteStorage,
        photos: &'a dyn PhotoStore,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            storage,
            photos,
            output_dir,
        }
    }

    /// Get the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export the user's records matching `filters`.
    ///
    /// Returns the path of the written file.
    ///
    /// # Errors
    ///
    /// Returns `NoData` (and writes nothing) if the selection is empty,
    /// `ArchiveCreation` if the archive cannot be created, or an I/O error.
    pub fn export(
        &self,
        user_id: i64,
        format: ExportFormat,
        include_photos: bool,
        filters: &RecordFilter,
    ) -> InterchangeResult<PathBuf> {
        let records = self.storage.list_records(user_id, filters)?;
        if records.is_empty() {
            return Err(InterchangeError::NoData);
        }

        std::fs::create_dir_all(&self.output_dir)?;

        let now = Utc::now();
        let generated_at = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let base_name = format!("financial_reports_{}", now.format("%Y-%m-%d_%H%M%S"));

        if include_photos && records.iter().any(|r| r.photo.is_some()) {
            let path = self.output_dir.join(format!("{base_name}.zip"));
            let stats = ArchivePackager::new(self.photos).package(
                &path,
                &records,
                format,
                &generated_at,
            )?;
            info!(
                user_id,
                records = records.len(),
                photos = stats.photos_packed,
                path = %path.display(),
                "exported archive"
            );
            return Ok(path);
        }

        let rows: Vec<ExportRow> = records.iter().map(|r| export_row(r, false)).collect();
        let content = render_data(&rows, format, &generated_at)?;
        let path = self.output_dir.join(format!("{base_name}.{}", format.as_str()));
        atomic_write(&path, content.as_bytes())?;

        info!(
            user_id,
            records = rows.len(),
            format = %format,
            path = %path.display(),
            "exported"
        );
        Ok(path)
    }

    /// Delete files in the output directory older than `max_age`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or a file cannot be removed.
    pub fn cleanup_temp_files(&self, max_age: Duration) -> InterchangeResult<usize> {
        let removed = sweep_older_than(&self.output_dir, max_age)?;
        if removed > 0 {
            info!(removed, dir = %self.output_dir.display(), "swept export scratch");
        }
        Ok(removed)
    }
}

/// Wire form of a record. With `remap_photos`, the photo path becomes
/// `photos/<basename>` to match the archive layout.
#[must_use]
pub fn export_row(record: &FinancialRecord, remap_photos: bool) -> ExportRow {
    let photo = record.photo.as_deref().map(|p| {
        if remap_photos {
            format!("photos/{}", basename(p))
        } else {
            p.to_string()
        }
    });

    ExportRow {
        title: record.title.clone(),
        description: record.description.clone(),
        kind: record.kind.as_str().to_string(),
        amount: amount_text(record.amount),
        report_date: record.occurred_on.format("%Y-%m-%d").to_string(),
        category: record.category.clone(),
        photo,
        created_at: millis_to_iso(record.created_at),
        updated_at: millis_to_iso(record.updated_at),
    }
}

/// Serialize rows in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_data(
    rows: &[ExportRow],
    format: ExportFormat,
    generated_at: &str,
) -> InterchangeResult<String> {
    match format {
        ExportFormat::Json => render_json(rows, generated_at),
        ExportFormat::Sql => Ok(render_sql_dump(rows, generated_at)),
    }
}

/// Pretty-printed `{export_info, data}` document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(rows: &[ExportRow], generated_at: &str) -> InterchangeResult<String> {
    let document = ExportDocument {
        export_info: ExportInfo {
            generated_at: generated_at.to_string(),
            total_records: rows.len(),
            version: EXPORT_FORMAT_VERSION.to_string(),
        },
        data: rows.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewRecord, RecordKind};
    use crate::storage::LocalPhotoStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn seed(storage: &mut SqliteStorage, title: &str, kind: RecordKind, photo: Option<&str>) {
        storage
            .create_record(
                1,
                &NewRecord {
                    title: title.to_string(),
                    description: Some("catatan".to_string()),
                    kind,
                    amount: dec!(250000),
                    occurred_on: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
                    category: Some("operational".to_string()),
                    photo: photo.map(str::to_string),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_empty_selection_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let storage = SqliteStorage::open_memory().unwrap();
        let photos = LocalPhotoStore::new(temp.path().join("public"));
        let out = temp.path().join("exports");
        let exporter = Exporter::new(&storage, &photos, out.clone());

        let result = exporter.export(1, ExportFormat::Json, true, &RecordFilter::default());
        assert!(matches!(result, Err(InterchangeError::NoData)));
        assert!(!out.exists() || std::fs::read_dir(&out).unwrap().next().is_none());
    }

    #[test]
    fn test_json_export_shape() {
        let temp = TempDir::new().unwrap();
        let mut storage = SqliteStorage::open_memory().unwrap();
        seed(&mut storage, "Listrik", RecordKind::Expense, None);
        let photos = LocalPhotoStore::new(temp.path().join("public"));
        let exporter = Exporter::new(&storage, &photos, temp.path().join("exports"));

        let path = exporter
            .export(1, ExportFormat::Json, true, &RecordFilter::default())
            .unwrap();
        assert_eq!(path.extension().unwrap(), "json");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("financial_reports_"));

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["export_info"]["total_records"], 1);
        assert_eq!(doc["export_info"]["version"], "1.0");
        assert_eq!(doc["data"][0]["type"], "expense");
        assert_eq!(doc["data"][0]["amount"], "250000.00");
        assert_eq!(doc["data"][0]["report_date"], "2025-03-04");
        assert!(doc["data"][0]["photo"].is_null());
        assert!(doc["data"][0]["created_at"]
            .as_str()
            .unwrap()
            .ends_with('Z'));
    }

    #[test]
    fn test_sql_export_without_photos_keeps_paths() {
        let temp = TempDir::new().unwrap();
        let mut storage = SqliteStorage::open_memory().unwrap();
        seed(
            &mut storage,
            "Nota",
            RecordKind::Expense,
            Some("financial-reports/n.jpg"),
        );
        let photos = LocalPhotoStore::new(temp.path().join("public"));
        let exporter = Exporter::new(&storage, &photos, temp.path().join("exports"));

        let path = exporter
            .export(1, ExportFormat::Sql, false, &RecordFilter::default())
            .unwrap();
        assert_eq!(path.extension().unwrap(), "sql");
        let sql = std::fs::read_to_string(&path).unwrap();
        assert!(sql.contains("'financial-reports/n.jpg'"));
        assert!(sql.contains("    250000.00,\n"));
    }

    #[test]
    fn test_filters_apply() {
        let temp = TempDir::new().unwrap();
        let mut storage = SqliteStorage::open_memory().unwrap();
        seed(&mut storage, "Masuk", RecordKind::Income, None);
        seed(&mut storage, "Keluar", RecordKind::Expense, None);
        let photos = LocalPhotoStore::new(temp.path().join("public"));
        let exporter = Exporter::new(&storage, &photos, temp.path().join("exports"));

        let filters = RecordFilter {
            kind: Some(RecordKind::Income),
            ..RecordFilter::default()
        };
        let path = exporter
            .export(1, ExportFormat::Json, false, &filters)
            .unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["data"].as_array().unwrap().len(), 1);
        assert_eq!(doc["data"][0]["title"], "Masuk");

        let none = RecordFilter {
            category: Some("salary".to_string()),
            ..RecordFilter::default()
        };
        assert!(matches!(
            exporter.export(1, ExportFormat::Json, false, &none),
            Err(InterchangeError::NoData)
        ));
    }

    #[test]
    fn test_export_row_remaps_photo() {
        let record = FinancialRecord {
            id: 1,
            user_id: 1,
            title: "t".to_string(),
            description: None,
            kind: RecordKind::Income,
            amount: dec!(1),
            occurred_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            category: None,
            photo: Some("financial-reports/abc.png".to_string()),
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(
            export_row(&record, true).photo.as_deref(),
            Some("photos/abc.png")
        );
        assert_eq!(
            export_row(&record, false).photo.as_deref(),
            Some("financial-reports/abc.png")
        );
        assert_eq!(export_row(&record, false).amount, "1.00");
    }
}
