//! ZIP archives: packing exports with their photos, and unpacking uploads.
//!
//! Archive layout:
//!
//! ```text
//! photos/              directory entry, always present
//! photos/<basename>    one per distinct photo that exists in the store
//! data.json | data.sql photo fields rewritten to photos/<basename>
//! metadata.json        format, counts, totals, date range
//! ```

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::config::EXPORT_FORMAT_VERSION;
use crate::interchange::export::{export_row, render_data};
use crate::interchange::types::{
    ArchiveMetadata, ArchiveStatistics, DateRange, ExportFormat, ExportRow, InterchangeError,
    InterchangeResult,
};
use crate::model::{FinancialRecord, RecordKind};
use crate::storage::{basename, PhotoStore};

/// What went into an archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackageStats {
    pub records: usize,
    pub photos_packed: usize,
    pub photos_missing: usize,
}

/// Builds export archives, reading photo bytes from a [`PhotoStore`].
pub struct ArchivePackager<'a> {
    photos: &'a dyn PhotoStore,
}

impl<'a> ArchivePackager<'a> {
    #[must_use]
    pub fn new(photos: &'a dyn PhotoStore) -> Self {
        Self { photos }
    }

    /// Write an archive of `records` to `path`.
    ///
    /// The archive is assembled in a temp file next to `path` and renamed
    /// into place only once complete.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveCreation` if the container cannot be created, or a
    /// zip/I-O error if writing an entry fails.
    pub fn package(
        &self,
        path: &Path,
        records: &[FinancialRecord],
        format: ExportFormat,
        generated_at: &str,
    ) -> InterchangeResult<PackageStats> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| InterchangeError::ArchiveCreation(e.to_string()))?;

        let mut stats = PackageStats {
            records: records.len(),
            ..PackageStats::default()
        };

        {
            let mut zip = ZipWriter::new(temp.as_file_mut());
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

            zip.add_directory("photos/", options)?;

            let mut packed = HashSet::new();
            for record in records {
                let Some(photo) = record.photo.as_deref() else {
                    continue;
                };
                if !self.photos.exists(photo) {
                    warn!(record = record.id, photo, "photo missing from store, not packed");
                    stats.photos_missing += 1;
                    continue;
                }
                let name = basename(photo);
                if !packed.insert(name.to_string()) {
                    continue;
                }
                let bytes = self.photos.get(photo)?;
                zip.start_file(format!("photos/{name}"), options)?;
                zip.write_all(&bytes)?;
                stats.photos_packed += 1;
            }

            let rows: Vec<ExportRow> = records.iter().map(|r| export_row(r, true)).collect();
            let data = render_data(&rows, format, generated_at)?;
            zip.start_file(format.data_file_name(), options)?;
            zip.write_all(data.as_bytes())?;

            let metadata = build_metadata(records, format, true, generated_at)?;
            zip.start_file("metadata.json", options)?;
            zip.write_all(serde_json::to_string_pretty(&metadata)?.as_bytes())?;

            zip.finish()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(path)
            .map_err(|e| InterchangeError::ArchiveCreation(e.error.to_string()))?;

        debug!(
            path = %path.display(),
            packed = stats.photos_packed,
            missing = stats.photos_missing,
            "archive written"
        );
        Ok(stats)
    }
}

/// Summary written to `metadata.json`.
///
/// # Errors
///
/// Returns `AmountOverflow` if a per-type total does not fit a `Decimal`.
pub fn build_metadata(
    records: &[FinancialRecord],
    format: ExportFormat,
    includes_photos: bool,
    generated_at: &str,
) -> InterchangeResult<ArchiveMetadata> {
    let sum = |kind: RecordKind| -> InterchangeResult<f64> {
        records
            .iter()
            .filter(|r| r.kind == kind)
            .try_fold(Decimal::ZERO, |total, r| total.checked_add(r.amount))
            .map(|total| total.to_f64().unwrap_or(0.0))
            .ok_or(InterchangeError::AmountOverflow)
    };
    let dates = records.iter().map(|r| r.occurred_on);

    Ok(ArchiveMetadata {
        export_version: EXPORT_FORMAT_VERSION.to_string(),
        generated_at: generated_at.to_string(),
        format,
        includes_photos,
        statistics: ArchiveStatistics {
            total_records: records.len(),
            total_income: sum(RecordKind::Income)?,
            total_expense: sum(RecordKind::Expense)?,
            photo_count: records.iter().filter(|r| r.photo.is_some()).count(),
            date_range: DateRange {
                from: dates.clone().min().map(|d| d.format("%Y-%m-%d").to_string()),
                to: dates.max().map(|d| d.format("%Y-%m-%d").to_string()),
            },
        },
    })
}

/// An uploaded archive unpacked into a private temp directory.
///
/// The directory is removed when this value is dropped, whether the import
/// succeeded or not.
#[derive(Debug)]
pub struct ExtractedArchive {
    dir: TempDir,
    data_file: PathBuf,
    format: ExportFormat,
}

impl ExtractedArchive {
    /// `data.json` if present, else `data.sql`.
    #[must_use]
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// The extracted `photos/` directory, if the archive had one.
    #[must_use]
    pub fn photos_dir(&self) -> Option<PathBuf> {
        let photos = self.dir.path().join("photos");
        photos.is_dir().then_some(photos)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Unpack `archive` into a fresh directory under `scratch`.
///
/// # Errors
///
/// Returns `ArchiveOpen` if the file is not a readable ZIP (or holds unsafe
/// entry names), and `MissingDataFile` if it has neither data file.
pub fn extract_archive(archive: &Path, scratch: &Path) -> InterchangeResult<ExtractedArchive> {
    fs::create_dir_all(scratch)?;
    let dir = tempfile::Builder::new()
        .prefix("import-")
        .tempdir_in(scratch)?;

    let file = File::open(archive).map_err(|e| InterchangeError::ArchiveOpen(e.to_string()))?;
    let mut zip =
        ZipArchive::new(file).map_err(|e| InterchangeError::ArchiveOpen(e.to_string()))?;
    zip.extract(dir.path())
        .map_err(|e| InterchangeError::ArchiveOpen(e.to_string()))?;

    let json = dir.path().join(ExportFormat::Json.data_file_name());
    let sql = dir.path().join(ExportFormat::Sql.data_file_name());
    let (data_file, format) = if json.is_file() {
        (json, ExportFormat::Json)
    } else if sql.is_file() {
        (sql, ExportFormat::Sql)
    } else {
        return Err(InterchangeError::MissingDataFile);
    };

    debug!(dir = %dir.path().display(), format = %format, "archive extracted");
    Ok(ExtractedArchive {
        dir,
        data_file,
        format,
    })
}
