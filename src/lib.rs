//! finrec - personal financial records with portable export and import.
//!
//! This crate provides the core functionality for the `finrec` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Record types and amount formatting
//! - [`storage`] - SQLite record store and the photo store
//! - [`interchange`] - JSON/SQL/ZIP export and import
//! - [`validate`] - Entry and upload validation
//! - [`report`] - Dashboard summary
//! - [`config`] - Path and user resolution
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod interchange;
pub mod model;
pub mod report;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};

/// Escape a value for CSV output (wrap in quotes if it contains commas, quotes, or newlines).
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("Listrik"), "Listrik");
        assert_eq!(csv_escape("Sewa, Juni"), "\"Sewa, Juni\"");
        assert_eq!(csv_escape("kata \"ini\""), "\"kata \"\"ini\"\"\"");
    }
}
