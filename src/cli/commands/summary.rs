//! Dashboard summary command.

use std::path::Path;

use colored::Colorize;
use rust_decimal::Decimal;

use crate::cli::commands::{current_user, Output, Workspace};
use crate::error::Result;
use crate::model::format_rupiah;
use crate::report::{MonthTotals, Summary};

/// Execute the summary command.
///
/// # Errors
///
/// Returns an error if the workspace is missing or a query fails.
pub fn execute(
    db: Option<&Path>,
    home: Option<&Path>,
    user: Option<i64>,
    output: Output,
) -> Result<()> {
    let user_id = current_user(user)?;
    let ws = Workspace::open(db, home)?;
    let today = chrono::Local::now().date_naive();
    let summary = Summary::build(&ws.storage, user_id, today)?;

    if output.is_machine() {
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("{}", "━━━ Financial Summary ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".cyan().bold());
    println!();

    print_month("This month", &summary.current_month);
    print_month("Last month", &summary.previous_month);
    println!();

    println!("{}", "All time".bold());
    println!("  Income:  {}", format_rupiah(summary.all_time.income).green());
    println!("  Expense: {}", format_rupiah(summary.all_time.expense).red());
    println!("  Balance: {}", balance(summary.balance));
    println!();

    println!("{}", "Last 6 months".bold());
    for month in &summary.monthly {
        println!(
            "  {}  {:>20}  {:>20}",
            month.month,
            format_rupiah(month.income).green(),
            format_rupiah(month.expense).red()
        );
    }

    if !summary.recent.is_empty() {
        println!();
        println!("{}", "Recent".bold());
        for r in &summary.recent {
            let sign = if r.is_income() { "+" } else { "-" };
            println!("  {}  {}  {sign}{}", r.occurred_on, r.title, r.formatted_amount());
        }
    }
}

fn print_month(label: &str, month: &MonthTotals) {
    println!(
        "{} ({}): income {}, expense {}",
        label.bold(),
        month.month,
        format_rupiah(month.income).green(),
        format_rupiah(month.expense).red()
    );
}

fn balance(amount: Decimal) -> colored::ColoredString {
    if amount.is_sign_negative() && !amount.is_zero() {
        format_rupiah(amount).red().bold()
    } else {
        format_rupiah(amount).green().bold()
    }
}
