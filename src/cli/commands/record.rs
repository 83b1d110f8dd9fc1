//! Record command implementations.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::warn;

use crate::cli::commands::{current_user, parse_filter, Output, Workspace};
use crate::cli::{RecordArgs, RecordCommands};
use crate::error::{Error, Result};
use crate::model::{amount_text, category_label, FinancialRecord, NewRecord};
use crate::storage::{store_new_photo, PhotoStore};
use crate::validate::{validate_new_record, RecordInput};

#[derive(Serialize)]
struct RecordListOutput<'a> {
    count: usize,
    records: &'a [FinancialRecord],
}

#[derive(Serialize)]
struct DeleteOutput {
    id: i64,
    deleted: bool,
}

/// Execute record commands.
///
/// # Errors
///
/// Returns an error if the workspace is missing, input fails validation,
/// or the record does not exist.
pub fn execute(
    command: &RecordCommands,
    db: Option<&Path>,
    home: Option<&Path>,
    user: Option<i64>,
    output: Output,
) -> Result<()> {
    let user_id = current_user(user)?;
    let mut ws = Workspace::open(db, home)?;

    match command {
        RecordCommands::Add(args) => add(&mut ws, user_id, args, output),
        RecordCommands::List(filter) => {
            let filter = parse_filter(filter)?;
            let records = ws.storage.list_records(user_id, &filter)?;
            print_list(&records, output)
        }
        RecordCommands::Show { id } => {
            let record = ws
                .storage
                .get_record(user_id, *id)?
                .ok_or(Error::RecordNotFound { id: *id })?;
            print_record(&record, output)
        }
        RecordCommands::Update {
            id,
            record,
            remove_photo,
        } => update(&mut ws, user_id, *id, record, *remove_photo, output),
        RecordCommands::Delete { id } => delete(&mut ws, user_id, *id, output),
    }
}

fn to_input(args: &RecordArgs) -> RecordInput {
    RecordInput {
        title: args.title.clone(),
        description: args.description.clone(),
        kind: args.kind.clone(),
        amount: args.amount.clone(),
        report_date: args.date.clone(),
        category: args.category.clone(),
        photo: args.photo.clone(),
    }
}

fn validated(args: &RecordArgs) -> Result<NewRecord> {
    let today = chrono::Local::now().date_naive();
    validate_new_record(&to_input(args), today).map_err(Error::InvalidRecord)
}

/// Copy a local image into the photo store.
fn store_photo(photos: &dyn PhotoStore, source: &Path) -> Result<String> {
    let bytes = std::fs::read(source)?;
    let extension = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    store_new_photo(photos, &bytes, &extension)
}

fn discard_photo(photos: &dyn PhotoStore, path: &str) {
    if let Err(e) = photos.delete(path) {
        warn!(path, error = %e, "could not remove photo");
    }
}

fn add(ws: &mut Workspace, user_id: i64, args: &RecordArgs, output: Output) -> Result<()> {
    let mut record = validated(args)?;
    if let Some(source) = &args.photo {
        record.photo = Some(store_photo(&ws.photos, source)?);
    }

    let created = match ws.storage.create_record(user_id, &record) {
        Ok(created) => created,
        Err(e) => {
            if let Some(photo) = &record.photo {
                discard_photo(&ws.photos, photo);
            }
            return Err(e);
        }
    };

    if output == Output::Human {
        println!("Created record #{}: {}", created.id, created.title);
        return Ok(());
    }
    print_record(&created, output)
}

fn update(
    ws: &mut Workspace,
    user_id: i64,
    id: i64,
    args: &RecordArgs,
    remove_photo: bool,
    output: Output,
) -> Result<()> {
    let current = ws
        .storage
        .get_record(user_id, id)?
        .ok_or(Error::RecordNotFound { id })?;
    let mut record = validated(args)?;

    let new_photo = match &args.photo {
        Some(source) => Some(store_photo(&ws.photos, source)?),
        None => None,
    };
    record.photo = match (&new_photo, remove_photo) {
        (Some(stored), _) => Some(stored.clone()),
        (None, true) => None,
        (None, false) => current.photo.clone(),
    };

    let previous = match ws.storage.update_record(user_id, id, &record) {
        Ok(previous) => previous,
        Err(e) => {
            if let Some(stored) = &new_photo {
                discard_photo(&ws.photos, stored);
            }
            return Err(e);
        }
    };

    if let Some(old) = previous.photo.as_deref() {
        if record.photo.as_deref() != Some(old) {
            discard_photo(&ws.photos, old);
        }
    }

    let updated = ws
        .storage
        .get_record(user_id, id)?
        .ok_or(Error::RecordNotFound { id })?;
    if output == Output::Human {
        println!("Updated record #{}: {}", updated.id, updated.title);
        return Ok(());
    }
    print_record(&updated, output)
}

fn delete(ws: &mut Workspace, user_id: i64, id: i64, output: Output) -> Result<()> {
    let deleted = ws.storage.delete_record(user_id, id)?;
    if let Some(photo) = &deleted.photo {
        discard_photo(&ws.photos, photo);
    }

    match output {
        Output::Human => println!("Deleted record #{id}: {}", deleted.title),
        _ => println!(
            "{}",
            serde_json::to_string(&DeleteOutput { id, deleted: true })?
        ),
    }
    Ok(())
}

fn print_list(records: &[FinancialRecord], output: Output) -> Result<()> {
    match output {
        Output::Csv => {
            println!("id,report_date,type,title,amount,category,description");
            for r in records {
                println!(
                    "{},{},{},{},{},{},{}",
                    r.id,
                    r.occurred_on,
                    r.kind,
                    crate::csv_escape(&r.title),
                    amount_text(r.amount),
                    r.category.as_deref().unwrap_or(""),
                    crate::csv_escape(r.description.as_deref().unwrap_or(""))
                );
            }
        }
        Output::Json => {
            let payload = RecordListOutput {
                count: records.len(),
                records,
            };
            println!("{}", serde_json::to_string(&payload)?);
        }
        Output::Human if records.is_empty() => println!("No records found."),
        Output::Human => {
            println!("Records ({} found):", records.len());
            println!();
            for r in records {
                println!(
                    "  #{:<5} {}  {:<40} {:>20}",
                    r.id,
                    r.occurred_on,
                    truncate(&r.title, 40),
                    signed_amount(r)
                );
            }
        }
    }
    Ok(())
}

fn print_record(record: &FinancialRecord, output: Output) -> Result<()> {
    if output.is_machine() {
        println!("{}", serde_json::to_string(record)?);
        return Ok(());
    }

    println!("{} {}", format!("#{}", record.id).dimmed(), record.title.bold());
    println!("  Type:     {}", record.kind.label());
    println!("  Amount:   {}", signed_amount(record));
    println!("  Date:     {}", record.occurred_on);
    if let Some(category) = &record.category {
        println!(
            "  Category: {}",
            category_label(category).unwrap_or(category.as_str())
        );
    }
    if let Some(description) = &record.description {
        println!("  Note:     {description}");
    }
    if let Some(photo) = &record.photo {
        println!("  Photo:    {photo}");
    }
    Ok(())
}

fn signed_amount(record: &FinancialRecord) -> colored::ColoredString {
    if record.is_income() {
        format!("+{}", record.formatted_amount()).green()
    } else {
        format!("-{}", record.formatted_amount()).red()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
