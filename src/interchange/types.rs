//! Interchange types for export and import.
//!
//! Wire structs mirror the files finrec writes (`data.json`,
//! `metadata.json`); `RawRow` is the loose shape every import source is
//! decoded into before it becomes a record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File format of an export's data file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Sql,
}

impl ExportFormat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sql => "sql",
        }
    }

    /// Name of the data file inside an archive.
    #[must_use]
    pub const fn data_file_name(&self) -> &'static str {
        match self {
            Self::Json => "data.json",
            Self::Sql => "data.sql",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sql" => Ok(Self::Sql),
            _ => Err(format!("Unknown export format: {s} (expected json or sql)")),
        }
    }
}

/// An uploaded file: where its bytes are now, and the name it arrived with.
///
/// The format is decided by the declared name, not by the temp path.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub original_name: String,
}

impl UploadedFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
        }
    }

    /// Treat a local file as an upload under its own name.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(path, name)
    }

    /// Lowercased extension of the declared name, empty if there is none.
    #[must_use]
    pub fn extension(&self) -> String {
        Path::new(&self.original_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Size in bytes, or 0 if the file cannot be inspected.
    #[must_use]
    pub fn size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

// ── Export wire format ───────────────────────────────────────

/// One record as written to `data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    /// Two-decimal string, e.g. `"1500000.00"`.
    pub amount: String,
    /// `YYYY-MM-DD`
    pub report_date: String,
    pub category: Option<String>,
    pub photo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Header of a JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInfo {
    pub generated_at: String,
    pub total_records: usize,
    pub version: String,
}

/// Complete JSON export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub export_info: ExportInfo,
    pub data: Vec<ExportRow>,
}

/// `metadata.json` inside an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub export_version: String,
    pub generated_at: String,
    pub format: ExportFormat,
    pub includes_photos: bool,
    pub statistics: ArchiveStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveStatistics {
    pub total_records: usize,
    pub total_income: f64,
    pub total_expense: f64,
    pub photo_count: usize,
    pub date_range: DateRange,
}

/// Earliest and latest report dates, `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

// ── Import ───────────────────────────────────────────────────

/// A scalar decoded from an import source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
}

impl RawValue {
    /// Text form. Whole numbers print without a fractional part.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// One decoded import row. Absent and NULL fields are simply not present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: BTreeMap<String, RawValue>,
}

impl RawRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field; `None` removes it.
    pub fn set(&mut self, key: &str, value: Option<RawValue>) {
        match value {
            Some(v) => {
                self.fields.insert(key.to_string(), v);
            }
            None => {
                self.fields.remove(key);
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    /// Field as text, `None` when absent.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(RawValue::as_text)
    }

    /// Field as text, `None` when absent or blank.
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<String> {
        self.text(key).filter(|s| !s.trim().is_empty())
    }

    /// Build a row from a JSON object. Non-objects yield `None`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut row = Self::new();
        for (key, value) in object {
            let raw = match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(RawValue::Text(s.clone())),
                serde_json::Value::Number(n) => n.as_f64().map(RawValue::Number),
                serde_json::Value::Bool(b) => {
                    Some(RawValue::Text(if *b { "1" } else { "" }.into()))
                }
                other => Some(RawValue::Text(other.to_string())),
            };
            row.set(key, raw);
        }
        Some(row)
    }
}

/// Counters for one import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
    pub photos_imported: usize,
}

/// Outcome of an import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    /// True exactly when `errors` is empty.
    pub succeeded: bool,
    pub stats: ImportStats,
    /// `row_<index>` for row problems, `general` for a failed batch.
    pub errors: BTreeMap<String, String>,
}

impl ImportResult {
    #[must_use]
    pub fn new(stats: ImportStats, errors: BTreeMap<String, String>) -> Self {
        Self {
            succeeded: errors.is_empty(),
            stats,
            errors,
        }
    }
}

/// Interchange-specific errors.
///
/// Display strings are user-facing and match what the web application
/// showed for the same failures.
#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    /// Export selection matched nothing.
    #[error("Tidak ada data untuk diekspor.")]
    NoData,

    /// The archive container could not be created.
    #[error("Tidak dapat membuat file ZIP.")]
    ArchiveCreation(String),

    /// An uploaded archive could not be opened or extracted.
    #[error("Tidak dapat membuka file ZIP.")]
    ArchiveOpen(String),

    #[error("File data tidak ditemukan dalam ZIP.")]
    MissingDataFile,

    #[error("Format file tidak didukung: {0}")]
    UnsupportedFormat(String),

    #[error("Format JSON tidak valid: {0}")]
    MalformedJson(String),

    #[error("Struktur data JSON tidak valid.")]
    InvalidStructure,

    /// A sum of amounts left the representable range.
    #[error("Total jumlah melebihi batas.")]
    AmountOverflow,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    /// Photo store failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for InterchangeError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<crate::error::Error> for InterchangeError {
    fn from(err: crate::error::Error) -> Self {
        use crate::error::Error;
        match err {
            Error::Interchange(e) => e,
            Error::Io(e) => Self::Io(e),
            Error::Json(e) => Self::Json(e),
            Error::Database(e) => Self::Database(e.to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Result type for interchange operations.
pub type InterchangeResult<T> = std::result::Result<T, InterchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension_is_lowercased() {
        let upload = UploadedFile::new("/tmp/php123", "Laporan.ZIP");
        assert_eq!(upload.extension(), "zip");
        assert_eq!(UploadedFile::new("/tmp/x", "noext").extension(), "");
    }

    #[test]
    fn test_raw_row_from_json() {
        let value = serde_json::json!({
            "title": "Gaji",
            "amount": 100000,
            "description": null,
            "category": ""
        });
        let row = RawRow::from_json(&value).unwrap();
        assert_eq!(row.text("title").as_deref(), Some("Gaji"));
        assert_eq!(row.text("amount").as_deref(), Some("100000"));
        assert!(row.get("description").is_none());
        assert!(row.text("category").is_some());
        assert!(row.non_empty("category").is_none());

        assert!(RawRow::from_json(&serde_json::json!([1, 2])).is_none());
    }

    #[test]
    fn test_import_result_succeeded_iff_no_errors() {
        let stats = ImportStats {
            imported: 9,
            ..ImportStats::default()
        };
        let mut errors = BTreeMap::new();
        assert!(ImportResult::new(stats, errors.clone()).succeeded);

        errors.insert("row_0".to_string(), "Tipe tidak valid: x".to_string());
        assert!(!ImportResult::new(stats, errors).succeeded);
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("SQL".parse::<ExportFormat>().unwrap(), ExportFormat::Sql);
        assert!("csv".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Json.data_file_name(), "data.json");
    }
}
