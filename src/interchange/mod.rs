//! Record interchange: export to and import from portable files.
//!
//! # Formats
//!
//! - **JSON**: `{export_info, data: [...]}`, pretty-printed
//! - **SQL**: a header comment plus one `INSERT` per record with a
//!   `:user_id` placeholder in the owner column
//! - **ZIP**: `data.json` or `data.sql`, `metadata.json`, and a `photos/`
//!   directory holding each referenced photo once
//!
//! Imports are additive. Rows that already exist are skipped, so an
//! export can be imported into the same account without creating copies.

pub mod archive;
pub mod export;
pub mod file;
pub mod import;
pub mod sql;
pub mod types;

pub use archive::{build_metadata, extract_archive, ArchivePackager, ExtractedArchive, PackageStats};
pub use export::{export_row, render_data, render_json, Exporter};
pub use file::{atomic_write, file_size, sweep_older_than};
pub use import::{parse_json_rows, Importer};
pub use sql::{parse_insert_values, parse_sql_dump, render_sql_dump, sql_quote};
pub use types::{
    ArchiveMetadata, ArchiveStatistics, DateRange, ExportDocument, ExportFormat, ExportInfo,
    ExportRow, ImportResult, ImportStats, InterchangeError, InterchangeResult, RawRow, RawValue,
    UploadedFile,
};
