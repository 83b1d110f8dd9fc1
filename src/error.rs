//! Error types for finrec.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::interchange::InterchangeError;

/// Result type alias for finrec operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    RecordNotFound,
    PhotoNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidRecord,
    NoUser,

    // Interchange (exit 6)
    InterchangeError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::PhotoNotFound => "PHOTO_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidRecord => "INVALID_RECORD",
            Self::NoUser => "NO_USER",
            Self::InterchangeError => "INTERCHANGE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::RecordNotFound | Self::PhotoNotFound => 3,
            Self::InvalidArgument | Self::InvalidRecord | Self::NoUser => 4,
            Self::InterchangeError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry with corrected input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument
                | Self::InvalidRecord
                | Self::NoUser
                | Self::DatabaseError
                | Self::InterchangeError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in finrec operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `finrec init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Record not found: {id}")]
    RecordNotFound { id: i64 },

    #[error("Photo not found: {path}")]
    PhotoNotFound { path: String },

    #[error("No user selected")]
    NoUser,

    /// Field-keyed validation messages for a record entry.
    #[error("Invalid record: {}", format_field_errors(.0))]
    InvalidRecord(std::collections::BTreeMap<String, String>),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Interchange(#[from] InterchangeError),

    /// An import batch was rolled back.
    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

fn format_field_errors(errors: &std::collections::BTreeMap<String, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::RecordNotFound { .. } => ErrorCode::RecordNotFound,
            Self::PhotoNotFound { .. } => ErrorCode::PhotoNotFound,
            Self::NoUser => ErrorCode::NoUser,
            Self::InvalidRecord(_) => ErrorCode::InvalidRecord,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Interchange(_) | Self::ImportFailed(_) => ErrorCode::InterchangeError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `finrec init` to create the database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::RecordNotFound { id } => Some(format!(
                "No record with ID {id} for this user. Use `finrec record list` to see records."
            )),

            Self::NoUser => Some(
                "Pass `--user <id>` or set FINREC_USER to choose whose records to use.".to_string(),
            ),

            Self::InvalidRecord(errors) => {
                if errors.contains_key("type") {
                    Some("Valid types: income, expense".to_string())
                } else if errors.contains_key("category") {
                    Some(
                        "Valid categories: operational, salary, utilities, marketing, sales, \
                         investment, other"
                            .to_string(),
                    )
                } else {
                    None
                }
            }

            Self::Interchange(InterchangeError::NoData) => Some(
                "Loosen the export filters or add records with `finrec record add`.".to_string(),
            ),
            Self::Interchange(InterchangeError::UnsupportedFormat(_)) => {
                Some("Supported import files: .zip, .json, .sql".to_string())
            }

            Self::ImportFailed(_) => {
                Some("Nothing was imported. Fix the file and run the import again.".to_string())
            }

            Self::PhotoNotFound { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Interchange(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        if let Self::InvalidRecord(errors) = self {
            obj["error"]["fields"] = serde_json::json!(errors);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::NotInitialized.exit_code(), 2);
        assert_eq!(Error::RecordNotFound { id: 4 }.exit_code(), 3);
        assert_eq!(Error::NoUser.exit_code(), 4);
        assert_eq!(Error::Interchange(InterchangeError::NoData).exit_code(), 6);
    }

    #[test]
    fn test_structured_json_includes_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("type".to_string(), "Tipe transaksi tidak valid.".to_string());
        let err = Error::InvalidRecord(fields);

        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "INVALID_RECORD");
        assert_eq!(json["error"]["fields"]["type"], "Tipe transaksi tidak valid.");
        assert_eq!(json["error"]["hint"], "Valid types: income, expense");
    }

    #[test]
    fn test_interchange_message_is_transparent() {
        let err = Error::from(InterchangeError::NoData);
        assert_eq!(err.to_string(), "Tidak ada data untuk diekspor.");
    }
}
