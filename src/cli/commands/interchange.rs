//! Export, import, upload validation and scratch cleanup commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::cli::commands::{current_user, parse_filter, Output, Workspace};
use crate::cli::ExportArgs;
use crate::error::{Error, Result};
use crate::interchange::{file_size, Exporter, ImportResult, Importer, UploadedFile};
use crate::validate::validate_file;

#[derive(Serialize)]
struct ExportOutput {
    path: PathBuf,
    bytes: u64,
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    file: &'a Path,
    valid: bool,
}

#[derive(Serialize)]
struct CleanupOutput {
    removed: usize,
    dir: PathBuf,
}

/// Execute the export command.
///
/// # Errors
///
/// Returns `NoData` (wrapped) when nothing matches the filters, or an
/// error if the file cannot be written or copied.
pub fn export(
    args: &ExportArgs,
    db: Option<&Path>,
    home: Option<&Path>,
    user: Option<i64>,
    output: Output,
) -> Result<()> {
    let user_id = current_user(user)?;
    let filter = parse_filter(&args.filter)?;
    let ws = Workspace::open(db, home)?;

    let exporter = Exporter::new(&ws.storage, &ws.photos, ws.export_dir());
    let written = exporter.export(user_id, args.data_format, args.photos, &filter)?;

    let path = match &args.output {
        Some(dir) => deliver(&written, dir)?,
        None => written,
    };

    if output.is_machine() {
        let payload = ExportOutput {
            bytes: file_size(&path),
            path,
        };
        println!("{}", serde_json::to_string(&payload)?);
    } else {
        println!("Exported to {}", path.display());
    }
    Ok(())
}

/// Move a finished export out of the scratch directory.
fn deliver(written: &Path, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = written
        .file_name()
        .ok_or_else(|| Error::Other(format!("export has no file name: {}", written.display())))?;
    let target = dir.join(name);
    fs::copy(written, &target)?;
    fs::remove_file(written)?;
    Ok(target)
}

/// Execute the import command.
///
/// Row-level problems are reported but do not fail the command. A batch
/// that was rolled back does.
///
/// # Errors
///
/// Returns `InvalidArgument` if the upload is rejected before reading, or
/// an error carrying the batch failure message.
pub fn import(
    file: &Path,
    db: Option<&Path>,
    home: Option<&Path>,
    user: Option<i64>,
    output: Output,
) -> Result<()> {
    let user_id = current_user(user)?;
    let upload = UploadedFile::from_path(file);
    reject_invalid(&upload)?;

    let mut ws = Workspace::open(db, home)?;
    let scratch = ws.import_dir();
    let result = Importer::new(&mut ws.storage, &ws.photos, scratch).import(&upload, user_id);

    if output.is_machine() {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        print_import(&result);
    }

    match result.errors.get("general") {
        Some(message) => Err(Error::ImportFailed(message.clone())),
        None => Ok(()),
    }
}

fn print_import(result: &ImportResult) {
    let stats = &result.stats;
    println!(
        "Import finished: {} imported, {} skipped, {} photos",
        stats.imported, stats.skipped, stats.photos_imported
    );
    if !result.errors.is_empty() {
        println!();
        for (key, message) in &result.errors {
            println!("  {key}: {message}");
        }
    }
}

fn reject_invalid(upload: &UploadedFile) -> Result<()> {
    let errors = validate_file(upload);
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors.into_values().collect::<Vec<_>>().join(" ");
    Err(Error::InvalidArgument(message))
}

/// Execute the validate command.
///
/// # Errors
///
/// Returns `InvalidArgument` with the validation messages if the file
/// would be rejected.
pub fn validate(file: &Path, output: Output) -> Result<()> {
    let upload = UploadedFile::from_path(file);
    if !upload.path.is_file() {
        return Err(Error::InvalidArgument(format!(
            "file not found: {}",
            file.display()
        )));
    }
    reject_invalid(&upload)?;

    if output.is_machine() {
        let payload = ValidateOutput { file, valid: true };
        println!("{}", serde_json::to_string(&payload)?);
    } else {
        println!("{} can be imported", file.display());
    }
    Ok(())
}

/// Execute the cleanup command.
///
/// # Errors
///
/// Returns an error if the scratch directory cannot be swept.
pub fn cleanup(
    max_age_minutes: u64,
    db: Option<&Path>,
    home: Option<&Path>,
    output: Output,
) -> Result<()> {
    let ws = Workspace::open(db, home)?;
    let exporter = Exporter::new(&ws.storage, &ws.photos, ws.export_dir());
    let max_age = Duration::from_secs(max_age_minutes.saturating_mul(60));
    let removed = exporter.cleanup_temp_files(max_age)?;

    if output.is_machine() {
        let payload = CleanupOutput {
            removed,
            dir: exporter.output_dir().to_path_buf(),
        };
        println!("{}", serde_json::to_string(&payload)?);
    } else {
        println!("Removed {removed} export file(s)");
    }
    Ok(())
}
