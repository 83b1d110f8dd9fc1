//! Dashboard summary over a user's records.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::FinancialRecord;
use crate::storage::{SqliteStorage, Totals};

const RECENT_LIMIT: u32 = 5;
const SERIES_MONTHS: u32 = 6;

/// Income and expense for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthTotals {
    /// `YYYY-MM`.
    pub month: String,
    pub income: Decimal,
    pub expense: Decimal,
}

impl MonthTotals {
    fn new(start: NaiveDate, totals: Totals) -> Self {
        Self {
            month: start.format("%Y-%m").to_string(),
            income: totals.income,
            expense: totals.expense,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub current_month: MonthTotals,
    pub previous_month: MonthTotals,
    pub all_time: Totals,
    pub balance: Decimal,
    pub recent: Vec<FinancialRecord>,
    /// Oldest first, ending with the current month.
    pub monthly: Vec<MonthTotals>,
}

impl Summary {
    /// Build the summary as of `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn build(storage: &SqliteStorage, user_id: i64, today: NaiveDate) -> Result<Self> {
        let this_month = month_start(today)?;

        let mut monthly = Vec::with_capacity(SERIES_MONTHS as usize);
        for back in (0..SERIES_MONTHS).rev() {
            let start = shift_months(this_month, back)?;
            monthly.push(MonthTotals::new(start, month_totals(storage, user_id, start)?));
        }

        let previous = shift_months(this_month, 1)?;
        let all_time = storage.totals(user_id, None, None)?;

        Ok(Self {
            current_month: MonthTotals::new(
                this_month,
                month_totals(storage, user_id, this_month)?,
            ),
            previous_month: MonthTotals::new(previous, month_totals(storage, user_id, previous)?),
            balance: all_time.balance(),
            all_time,
            recent: storage.recent_records(user_id, RECENT_LIMIT)?,
            monthly,
        })
    }
}

fn month_start(day: NaiveDate) -> Result<NaiveDate> {
    day.with_day(1)
        .ok_or_else(|| Error::Other(format!("no first day for {day}")))
}

fn shift_months(start: NaiveDate, back: u32) -> Result<NaiveDate> {
    start
        .checked_sub_months(Months::new(back))
        .ok_or_else(|| Error::Other(format!("date out of range: {start} - {back} months")))
}

fn month_totals(storage: &SqliteStorage, user_id: i64, start: NaiveDate) -> Result<Totals> {
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| Error::Other(format!("date out of range: {start}")))?;
    storage.totals(user_id, Some(start), Some(end))
}
