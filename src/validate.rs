//! Input validation for record entry and interchange uploads.
//!
//! Both validators collect every problem into a field-keyed map instead of
//! stopping at the first one, so a caller can show them all at once.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{MAX_PHOTO_BYTES, MAX_UPLOAD_BYTES};
use crate::interchange::UploadedFile;
use crate::model::{NewRecord, RecordKind, CATEGORIES};

/// Field-keyed validation messages.
pub type FieldErrors = BTreeMap<String, String>;

// ── Valid value sets ─────────────────────────────────────────

pub static VALID_CATEGORIES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| CATEGORIES.iter().map(|(key, _)| *key).collect());

pub static IMAGE_EXTENSIONS: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["jpg", "jpeg", "png", "gif", "webp", "bmp"]
        .into_iter()
        .collect()
});

pub static IMPORT_EXTENSIONS: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["zip", "json", "sql"].into_iter().collect());

/// Largest amount a record may carry.
pub static MAX_AMOUNT: LazyLock<Decimal> = LazyLock::new(|| Decimal::new(99_999_999_999_999, 2));

/// Raw, unvalidated record entry as typed by a user.
#[derive(Debug, Clone, Default)]
pub struct RecordInput {
    pub title: String,
    pub description: Option<String>,
    pub kind: String,
    pub amount: String,
    pub report_date: String,
    pub category: Option<String>,
    /// Local image file to attach.
    pub photo: Option<PathBuf>,
}

/// Validate a record entry against the entry rules.
///
/// `today` bounds the report date. On success the returned record has no
/// photo yet; the caller stores `input.photo` and fills it in.
///
/// # Errors
///
/// Returns every failing field with its message.
pub fn validate_new_record(
    input: &RecordInput,
    today: NaiveDate,
) -> Result<NewRecord, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = input.title.trim();
    if title.is_empty() {
        errors.insert("title".into(), "Judul laporan wajib diisi.".into());
    } else if title.chars().count() > 255 {
        errors.insert("title".into(), "Judul maksimal 255 karakter.".into());
    }

    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if description.is_some_and(|d| d.chars().count() > 1000) {
        errors.insert("description".into(), "Deskripsi maksimal 1000 karakter.".into());
    }

    let kind = if input.kind.trim().is_empty() {
        errors.insert("type".into(), "Tipe transaksi wajib dipilih.".into());
        None
    } else {
        let kind = RecordKind::parse(input.kind.trim());
        if kind.is_none() {
            errors.insert("type".into(), "Tipe transaksi tidak valid.".into());
        }
        kind
    };

    let amount = parse_entry_amount(&input.amount, &mut errors);
    let occurred_on = parse_entry_date(&input.report_date, today, &mut errors);

    let category = input
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if category.is_some_and(|c| !VALID_CATEGORIES.contains(c)) {
        errors.insert("category".into(), "Kategori tidak valid.".into());
    }

    if let Some(photo) = &input.photo {
        if let Some(message) = check_photo(photo) {
            errors.insert("photo".into(), message.into());
        }
    }

    match (kind, amount, occurred_on) {
        (Some(kind), Some(amount), Some(occurred_on)) if errors.is_empty() => Ok(NewRecord {
            title: title.to_string(),
            description: description.map(str::to_string),
            kind,
            amount: amount.round_dp(2),
            occurred_on,
            category: category.map(str::to_string),
            photo: None,
        }),
        _ => Err(errors),
    }
}

fn parse_entry_amount(raw: &str, errors: &mut FieldErrors) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.insert("amount".into(), "Jumlah wajib diisi.".into());
        return None;
    }
    let Ok(amount) = Decimal::from_str(raw) else {
        errors.insert("amount".into(), "Jumlah harus berupa angka.".into());
        return None;
    };
    if amount.is_sign_negative() && !amount.is_zero() {
        errors.insert("amount".into(), "Jumlah tidak boleh negatif.".into());
        return None;
    }
    if amount > *MAX_AMOUNT {
        errors.insert("amount".into(), "Jumlah maksimal 999.999.999.999,99.".into());
        return None;
    }
    Some(amount)
}

fn parse_entry_date(raw: &str, today: NaiveDate, errors: &mut FieldErrors) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.insert("report_date".into(), "Tanggal laporan wajib diisi.".into());
        return None;
    }
    let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
        errors.insert("report_date".into(), "Tanggal laporan tidak valid.".into());
        return None;
    };
    if date > today {
        errors.insert(
            "report_date".into(),
            "Tanggal laporan tidak boleh melebihi hari ini.".into(),
        );
        return None;
    }
    Some(date)
}

fn check_photo(path: &Path) -> Option<&'static str> {
    let is_image = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(e.to_ascii_lowercase().as_str()));
    if !is_image {
        return Some("File harus berupa gambar.");
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            (meta.len() > MAX_PHOTO_BYTES).then_some("Ukuran foto maksimal 2MB.")
        }
        _ => Some("File foto tidak ditemukan."),
    }
}

/// Advisory check of an upload before import.
///
/// Returns an empty map when the upload looks acceptable. When both the
/// extension and the size are wrong, the size message is the one reported.
#[must_use]
pub fn validate_file(upload: &UploadedFile) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if !IMPORT_EXTENSIONS.contains(upload.extension().as_str()) {
        errors.insert("file".into(), "Format file harus ZIP, JSON, atau SQL.".into());
    }
    if upload.size() > MAX_UPLOAD_BYTES {
        errors.insert("file".into(), "Ukuran file maksimal 50MB.".into());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs::File;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn input() -> RecordInput {
        RecordInput {
            title: "Penjualan Produk".to_string(),
            description: Some("Penjualan bulan Juni".to_string()),
            kind: "income".to_string(),
            amount: "1500000".to_string(),
            report_date: "2025-06-01".to_string(),
            category: Some("sales".to_string()),
            photo: None,
        }
    }

    #[test]
    fn test_valid_entry() {
        let record = validate_new_record(&input(), today()).unwrap();
        assert_eq!(record.kind, RecordKind::Income);
        assert_eq!(record.amount, dec!(1500000));
        assert_eq!(record.category.as_deref(), Some("sales"));
        assert!(record.photo.is_none());
    }

    #[test]
    fn test_collects_all_errors() {
        let bad = RecordInput {
            title: String::new(),
            kind: "transfer".to_string(),
            amount: "-5".to_string(),
            report_date: "2025-07-01".to_string(),
            category: Some("groceries".to_string()),
            ..input()
        };
        let errors = validate_new_record(&bad, today()).unwrap_err();
        assert_eq!(errors["title"], "Judul laporan wajib diisi.");
        assert_eq!(errors["type"], "Tipe transaksi tidak valid.");
        assert_eq!(errors["amount"], "Jumlah tidak boleh negatif.");
        assert_eq!(
            errors["report_date"],
            "Tanggal laporan tidak boleh melebihi hari ini."
        );
        assert_eq!(errors["category"], "Kategori tidak valid.");
    }

    #[test]
    fn test_amount_bounds() {
        let ok = RecordInput {
            amount: "999999999999.99".to_string(),
            ..input()
        };
        assert!(validate_new_record(&ok, today()).is_ok());

        let too_big = RecordInput {
            amount: "1000000000000".to_string(),
            ..input()
        };
        assert!(validate_new_record(&too_big, today())
            .unwrap_err()
            .contains_key("amount"));

        let not_number = RecordInput {
            amount: "satu juta".to_string(),
            ..input()
        };
        assert_eq!(
            validate_new_record(&not_number, today()).unwrap_err()["amount"],
            "Jumlah harus berupa angka."
        );
    }

    #[test]
    fn test_photo_must_be_image() {
        let temp = TempDir::new().unwrap();
        let doc = temp.path().join("note.txt");
        std::fs::write(&doc, b"hello").unwrap();

        let with_doc = RecordInput {
            photo: Some(doc),
            ..input()
        };
        assert_eq!(
            validate_new_record(&with_doc, today()).unwrap_err()["photo"],
            "File harus berupa gambar."
        );

        let big = temp.path().join("big.jpg");
        File::create(&big).unwrap().set_len(MAX_PHOTO_BYTES + 1).unwrap();
        let with_big = RecordInput {
            photo: Some(big),
            ..input()
        };
        assert_eq!(
            validate_new_record(&with_big, today()).unwrap_err()["photo"],
            "Ukuran foto maksimal 2MB."
        );
    }

    #[test]
    fn test_validate_file_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upload.tmp");
        std::fs::write(&path, b"MZ").unwrap();

        let exe = UploadedFile::new(&path, "setup.exe");
        assert_eq!(
            validate_file(&exe)["file"],
            "Format file harus ZIP, JSON, atau SQL."
        );

        let json = UploadedFile::new(&path, "Data.JSON");
        assert!(validate_file(&json).is_empty());
    }

    #[test]
    fn test_validate_file_size_message_wins() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upload.tmp");
        File::create(&path)
            .unwrap()
            .set_len(60 * 1024 * 1024)
            .unwrap();

        let big_zip = UploadedFile::new(&path, "backup.zip");
        assert_eq!(validate_file(&big_zip)["file"], "Ukuran file maksimal 50MB.");

        let big_exe = UploadedFile::new(&path, "backup.exe");
        let errors = validate_file(&big_exe);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["file"], "Ukuran file maksimal 50MB.");
    }
}
