//! Import of records from ZIP, JSON, or pseudo-SQL uploads.
//!
//! Every source is decoded into [`RawRow`]s, then all rows are applied in a
//! single transaction. Bad rows are recorded under `row_<index>` and skipped
//! while the batch continues; anything else aborts the batch, rolls the
//! transaction back, and removes photos already copied for it.
//!
//! Duplicates (same title, type, date, and amount at two decimals) are
//! skipped silently, so re-importing an export is a no-op.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::interchange::archive::extract_archive;
use crate::interchange::sql::parse_sql_dump;
use crate::interchange::types::{
    ExportFormat, ImportResult, ImportStats, InterchangeError, InterchangeResult, RawRow,
    RawValue, UploadedFile,
};
use crate::model::{iso_to_millis, NewRecord, RecordKind};
use crate::storage::{
    basename, has_duplicate, insert_record, store_new_photo, PhotoStore, SqliteStorage,
};
use crate::validate::MAX_AMOUNT;

const MISSING_FIELDS: &str = "Data tidak lengkap (title, type, amount, report_date diperlukan)";

/// Importer for uploaded interchange files.
pub struct Importer<'a> {
    storage: &'a mut SqliteStorage,
    photos: &'a dyn PhotoStore,
    scratch_dir: PathBuf,
}

/// Mutable state of one import run. Lives only for the duration of
/// [`Importer::import`].
#[derive(Debug)]
struct ImportSession {
    user_id: i64,
    stats: ImportStats,
    errors: BTreeMap<String, String>,
    /// Photos copied into the store during this run.
    stored_photos: Vec<String>,
}

impl ImportSession {
    fn new(user_id: i64) -> Self {
        Self {
            user_id,
            stats: ImportStats::default(),
            errors: BTreeMap::new(),
            stored_photos: Vec::new(),
        }
    }

    fn reject(&mut self, index: usize, message: impl Into<String>) {
        self.errors.insert(format!("row_{index}"), message.into());
        self.stats.skipped += 1;
    }

    fn finish(self) -> ImportResult {
        ImportResult::new(self.stats, self.errors)
    }

    /// Undo photo copies and report the batch as failed.
    fn fail(self, photos: &dyn PhotoStore, error: &InterchangeError) -> ImportResult {
        for path in &self.stored_photos {
            if let Err(e) = photos.delete(path) {
                warn!(path, error = %e, "could not remove photo from failed import");
            }
        }
        let mut errors = BTreeMap::new();
        errors.insert("general".to_string(), error.to_string());
        ImportResult::new(self.stats, errors)
    }
}

impl<'a> Importer<'a> {
    /// Create an importer. Archives are extracted under `scratch_dir`.
    #[must_use]
    pub fn new(
        storage: &'a mut SqliteStorage,
        photos: &'a dyn PhotoStore,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            storage,
            photos,
            scratch_dir,
        }
    }

    /// Import `upload` into `user_id`'s records.
    ///
    /// Never fails outright: batch-level failures come back as
    /// `succeeded: false` with a `general` error.
    pub fn import(&mut self, upload: &UploadedFile, user_id: i64) -> ImportResult {
        let mut session = ImportSession::new(user_id);
        let extension = upload.extension();
        info!(user_id, format = %extension, file = %upload.original_name, "import started");

        match self.run(upload, &extension, &mut session) {
            Ok(()) => {
                info!(
                    imported = session.stats.imported,
                    skipped = session.stats.skipped,
                    photos = session.stats.photos_imported,
                    row_errors = session.errors.len(),
                    "import finished"
                );
                session.finish()
            }
            Err(e) => {
                warn!(error = %e, "import aborted, batch rolled back");
                session.fail(self.photos, &e)
            }
        }
    }

    fn run(
        &mut self,
        upload: &UploadedFile,
        extension: &str,
        session: &mut ImportSession,
    ) -> InterchangeResult<()> {
        // Holds the extraction directory until the batch is done.
        let mut extracted = None;

        let rows = match extension {
            "zip" => {
                let archive = extract_archive(&upload.path, &self.scratch_dir)?;
                let bytes = std::fs::read(archive.data_file())?;
                let rows = match archive.format() {
                    ExportFormat::Json => parse_json_rows(&bytes)?,
                    ExportFormat::Sql => parse_sql_dump(&String::from_utf8_lossy(&bytes)),
                };
                extracted = Some(archive);
                rows
            }
            "json" => parse_json_rows(&std::fs::read(&upload.path)?)?,
            "sql" => parse_sql_dump(&String::from_utf8_lossy(&std::fs::read(&upload.path)?)),
            other => return Err(InterchangeError::UnsupportedFormat(other.to_string())),
        };

        let photos_dir = extracted.as_ref().and_then(|a| a.photos_dir());
        let photos = self.photos;
        debug!(rows = rows.len(), has_photos = photos_dir.is_some(), "rows decoded");

        self.storage.mutate("import_records", |tx| {
            for (index, row) in rows.iter().enumerate() {
                import_row(tx, photos, photos_dir.as_deref(), session, index, row)?;
            }
            Ok(())
        })
    }
}

/// Decode a JSON upload: either `{"data": [...]}` or a top-level array
/// whose first element is an object.
///
/// # Errors
///
/// Returns `MalformedJson` if the bytes are not valid UTF-8 JSON,
/// `InvalidStructure` if it has neither shape.
pub fn parse_json_rows(bytes: &[u8]) -> InterchangeResult<Vec<RawRow>> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| InterchangeError::MalformedJson(e.to_string()))?;

    let items = match value.get("data").and_then(serde_json::Value::as_array) {
        Some(data) => data,
        None => match value.as_array() {
            Some(items) if items.first().is_some_and(serde_json::Value::is_object) => items,
            _ => return Err(InterchangeError::InvalidStructure),
        },
    };

    Ok(items
        .iter()
        .map(|item| RawRow::from_json(item).unwrap_or_default())
        .collect())
}

fn import_row(
    conn: &Connection,
    photos: &dyn PhotoStore,
    photos_dir: Option<&Path>,
    session: &mut ImportSession,
    index: usize,
    row: &RawRow,
) -> InterchangeResult<()> {
    let (Some(title), Some(kind_raw), Some(amount_raw), Some(date_raw)) = (
        row.non_empty("title"),
        row.non_empty("type"),
        row.get("amount"),
        row.non_empty("report_date"),
    ) else {
        session.reject(index, MISSING_FIELDS);
        return Ok(());
    };

    let Some(kind) = RecordKind::parse(&kind_raw) else {
        session.reject(index, format!("Tipe tidak valid: {kind_raw}"));
        return Ok(());
    };
    let Some(amount) = parse_amount(amount_raw) else {
        session.reject(index, format!("Jumlah tidak valid: {}", amount_raw.as_text()));
        return Ok(());
    };
    let Some(occurred_on) = parse_date(&date_raw) else {
        session.reject(index, format!("Tanggal tidak valid: {date_raw}"));
        return Ok(());
    };

    if has_duplicate(conn, session.user_id, &title, kind, occurred_on, amount)? {
        debug!(index, title, "duplicate row skipped");
        session.stats.skipped += 1;
        return Ok(());
    }

    let photo = match (row.non_empty("photo"), photos_dir) {
        (Some(reference), Some(dir)) => attach_photo(photos, dir, &reference, session)?,
        _ => None,
    };

    let record = NewRecord {
        title,
        description: row.non_empty("description"),
        kind,
        amount,
        occurred_on,
        category: row.non_empty("category"),
        photo,
    };

    let now = Utc::now().timestamp_millis();
    let created_at = timestamp(row, "created_at").unwrap_or(now);
    let updated_at = timestamp(row, "updated_at").unwrap_or(now);
    insert_record(conn, session.user_id, &record, created_at, updated_at)?;

    session.stats.imported += 1;
    if record.photo.is_some() {
        session.stats.photos_imported += 1;
    }
    Ok(())
}

/// Amount rounded to two decimals, between zero and [`MAX_AMOUNT`].
fn parse_amount(raw: &RawValue) -> Option<Decimal> {
    let amount = match raw {
        RawValue::Number(n) => Decimal::from_f64(*n)?,
        RawValue::Text(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()?
        }
    };
    let amount = amount.round_dp(2);
    let in_range = (!amount.is_sign_negative() || amount.is_zero()) && amount <= *MAX_AMOUNT;
    in_range.then_some(amount)
}

/// Accepts `YYYY-MM-DD`, RFC 3339, or `YYYY-MM-DD HH:MM:SS`.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn timestamp(row: &RawRow, key: &str) -> Option<i64> {
    row.non_empty(key).and_then(|s| iso_to_millis(&s))
}

/// Copy `photos/<basename of reference>` into the store under a fresh name.
/// A reference with no matching file attaches nothing.
fn attach_photo(
    photos: &dyn PhotoStore,
    photos_dir: &Path,
    reference: &str,
    session: &mut ImportSession,
) -> InterchangeResult<Option<String>> {
    let name = basename(reference);
    if name.is_empty() || name == "." || name == ".." {
        return Ok(None);
    }

    let source = photos_dir.join(name);
    if !source.is_file() {
        debug!(reference, "photo not in archive, importing without it");
        return Ok(None);
    }

    let bytes = std::fs::read(&source)?;
    let extension = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stored = store_new_photo(photos, &bytes, &extension)?;
    session.stored_photos.push(stored.clone());
    Ok(Some(stored))
}
