//! Financial record model.
//!
//! A record is one income or expense entry owned by exactly one user.
//! Ownership is enforced by always passing `user_id` into storage calls.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a record brings money in or sends it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Income,
    Expense,
}

impl RecordKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 2] = [Self::Income, Self::Expense];

    /// Get the string representation for storage and interchange files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Human-facing label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Income => "Pemasukan",
            Self::Expense => "Pengeluaran",
        }
    }

    /// Parse the exact storage spelling. Anything else is rejected.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category keys with their display labels.
///
/// Entry creation only accepts these keys; imports accept any text.
pub const CATEGORIES: [(&str, &str); 7] = [
    ("operational", "Operasional"),
    ("salary", "Gaji"),
    ("utilities", "Utilitas"),
    ("marketing", "Marketing"),
    ("sales", "Penjualan"),
    ("investment", "Investasi"),
    ("other", "Lainnya"),
];

/// Look up the display label of a category key.
#[must_use]
pub fn category_label(key: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
}

/// A stored financial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub kind: RecordKind,
    /// Always carried at scale 2.
    pub amount: Decimal,
    pub occurred_on: NaiveDate,
    pub category: Option<String>,
    /// Photo store path, e.g. `financial-reports/<uuid>.jpg`.
    pub photo: Option<String>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl FinancialRecord {
    /// Whether this record is income.
    #[must_use]
    pub fn is_income(&self) -> bool {
        self.kind == RecordKind::Income
    }

    /// Amount formatted as Rupiah with dot thousands separators, no decimals.
    #[must_use]
    pub fn formatted_amount(&self) -> String {
        format_rupiah(self.amount)
    }
}

/// A record about to be written. Built from CLI input or an import row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub title: String,
    pub description: Option<String>,
    pub kind: RecordKind,
    pub amount: Decimal,
    pub occurred_on: NaiveDate,
    pub category: Option<String>,
    pub photo: Option<String>,
}

/// Filters for selecting records. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub kind: Option<RecordKind>,
    pub category: Option<String>,
    /// Inclusive lower bound.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub date_to: Option<NaiveDate>,
}

impl RecordFilter {
    /// True when no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.category.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

/// Canonical two-decimal text form, e.g. `1500000.00`.
#[must_use]
pub fn amount_text(amount: Decimal) -> String {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount.to_string()
}

/// Format an amount like `Rp 1.500.000`.
#[must_use]
pub fn format_rupiah(amount: Decimal) -> String {
    let whole = amount.round_dp(0).abs().trunc().to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// Render Unix milliseconds as ISO-8601 with microseconds and `Z`.
#[must_use]
pub fn millis_to_iso(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 / RFC 3339 timestamp into Unix milliseconds.
#[must_use]
pub fn iso_to_millis(s: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_parse_is_exact() {
        assert_eq!(RecordKind::parse("income"), Some(RecordKind::Income));
        assert_eq!(RecordKind::parse("expense"), Some(RecordKind::Expense));
        assert_eq!(RecordKind::parse("Income"), None);
        assert_eq!(RecordKind::parse("invalid_type"), None);
    }

    #[test]
    fn test_format_rupiah() {
        assert_eq!(format_rupiah(dec!(1500000.00)), "Rp 1.500.000");
        assert_eq!(format_rupiah(dec!(999)), "Rp 999");
        assert_eq!(format_rupiah(dec!(0)), "Rp 0");
        assert_eq!(format_rupiah(dec!(-2500)), "-Rp 2.500");
    }

    #[test]
    fn test_amount_text_scale() {
        assert_eq!(amount_text(dec!(1500000)), "1500000.00");
        assert_eq!(amount_text(dec!(10.5)), "10.50");
        assert_eq!(amount_text(dec!(0.125)), "0.12");
    }

    #[test]
    fn test_iso_round_trip() {
        let ms = iso_to_millis("2025-01-01T00:00:00.000000Z").unwrap();
        assert_eq!(millis_to_iso(ms), "2025-01-01T00:00:00.000000Z");
        assert!(iso_to_millis("yesterday").is_none());
    }

    #[test]
    fn test_category_label() {
        assert_eq!(category_label("sales"), Some("Penjualan"));
        assert_eq!(category_label("groceries"), None);
    }
}
