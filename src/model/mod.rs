//! Data models for finrec.
//!
//! This module contains the domain models:
//! - FinancialRecord (stored entry)
//! - NewRecord (validated candidate for insertion)
//! - RecordKind and the category table
//! - RecordFilter (export and listing selection)

pub mod record;

pub use record::{
    amount_text, category_label, format_rupiah, iso_to_millis, millis_to_iso, FinancialRecord,
    NewRecord, RecordFilter, RecordKind, CATEGORIES,
};
