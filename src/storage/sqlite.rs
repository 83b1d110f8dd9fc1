//! SQLite storage implementation.
//!
//! Every read and write takes the owning `user_id`; no query crosses users.
//! Writes go through [`SqliteStorage::mutate`], which wraps the closure in an
//! IMMEDIATE transaction and rolls back when the closure fails.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{amount_text, FinancialRecord, NewRecord, RecordFilter, RecordKind};
use crate::storage::schema::apply_schema;

const RECORD_COLUMNS: &str = "id, user_id, title, description, type, amount, report_date, \
                              category, photo, created_at, updated_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Income and expense sums over a selection of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
}

impl Totals {
    /// Income minus expense.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.income - self.expense
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(timeout_ms.unwrap_or(5000)))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside an IMMEDIATE transaction.
    ///
    /// Commits when `f` returns `Ok`; the transaction is dropped (rolled back)
    /// otherwise. The error type is the caller's, so interchange code can
    /// keep its own error enum inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a database error from begin/commit.
    pub fn mutate<F, R, E>(&mut self, op: &str, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&Transaction) -> std::result::Result<R, E>,
        E: From<rusqlite::Error>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let result = match f(&tx) {
            Ok(result) => result,
            Err(e) => {
                debug!(op, "mutation failed, rolling back");
                return Err(e);
            }
        };

        tx.commit()?;
        debug!(op, "mutation committed");
        Ok(result)
    }

    // ==================
    // Record Operations
    // ==================

    /// Create a record for a user and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_record(&mut self, user_id: i64, record: &NewRecord) -> Result<FinancialRecord> {
        let now = chrono::Utc::now().timestamp_millis();
        let id = self.mutate("create_record", |tx| {
            insert_record(tx, user_id, record, now, now)
        })?;
        self.get_record(user_id, id)?
            .ok_or(Error::RecordNotFound { id })
    }

    /// Get one of a user's records by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_record(&self, user_id: i64, id: i64) -> Result<Option<FinancialRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM financial_reports WHERE id = ?1 AND user_id = ?2"
        );
        let record = self
            .conn
            .query_row(&sql, rusqlite::params![id, user_id], map_record)
            .optional()?;
        Ok(record)
    }

    /// List a user's records matching `filter`, newest report date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_records(
        &self,
        user_id: i64,
        filter: &RecordFilter,
    ) -> Result<Vec<FinancialRecord>> {
        self.query_records(user_id, filter, None)
    }

    /// The `limit` most recent records of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_records(&self, user_id: i64, limit: u32) -> Result<Vec<FinancialRecord>> {
        self.query_records(user_id, &RecordFilter::default(), Some(limit))
    }

    fn query_records(
        &self,
        user_id: i64,
        filter: &RecordFilter,
        limit: Option<u32>,
    ) -> Result<Vec<FinancialRecord>> {
        let (where_clause, mut params) = filter_clause(user_id, filter);

        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM financial_reports{where_clause}
             ORDER BY report_date DESC, id DESC"
        );
        if let Some(limit) = limit {
            params.push(Value::Integer(i64::from(limit)));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), map_record)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Replace every editable field of a record. Returns the previous version
    /// so the caller can drop a photo that was replaced.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the user owns no such record.
    pub fn update_record(
        &mut self,
        user_id: i64,
        id: i64,
        record: &NewRecord,
    ) -> Result<FinancialRecord> {
        let previous = self
            .get_record(user_id, id)?
            .ok_or(Error::RecordNotFound { id })?;
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("update_record", |tx| {
            let rows = tx.execute(
                "UPDATE financial_reports
                 SET title = ?1, description = ?2, type = ?3, amount = ?4, report_date = ?5,
                     category = ?6, photo = ?7, updated_at = ?8
                 WHERE id = ?9 AND user_id = ?10",
                rusqlite::params![
                    record.title,
                    record.description,
                    record.kind.as_str(),
                    amount_text(record.amount),
                    record.occurred_on.format("%Y-%m-%d").to_string(),
                    record.category,
                    record.photo,
                    now,
                    id,
                    user_id,
                ],
            )?;
            if rows == 0 {
                return Err(Error::RecordNotFound { id });
            }
            Ok(())
        })?;

        Ok(previous)
    }

    /// Delete a record and return it, so its photo can be removed too.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the user owns no such record.
    pub fn delete_record(&mut self, user_id: i64, id: i64) -> Result<FinancialRecord> {
        let record = self
            .get_record(user_id, id)?
            .ok_or(Error::RecordNotFound { id })?;

        self.mutate("delete_record", |tx| {
            tx.execute(
                "DELETE FROM financial_reports WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id],
            )?;
            Ok::<_, Error>(())
        })?;

        Ok(record)
    }

    /// Number of records a user owns.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_records(&self, user_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM financial_reports WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Income and expense sums for a user, optionally bounded by report date
    /// (both bounds inclusive).
    ///
    /// Summed in `Decimal` rather than SQL so no precision is lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn totals(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Totals> {
        let filter = RecordFilter {
            date_from: from,
            date_to: to,
            ..RecordFilter::default()
        };
        let (where_clause, params) = filter_clause(user_id, &filter);
        let sql = format!("SELECT type, amount FROM financial_reports{where_clause}");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((parse_kind(row, 0)?, parse_amount(row, 1)?))
        })?;

        let mut totals = Totals::default();
        for row in rows {
            let (kind, amount) = row?;
            let sum = match kind {
                RecordKind::Income => &mut totals.income,
                RecordKind::Expense => &mut totals.expense,
            };
            *sum = sum.checked_add(amount).ok_or_else(|| {
                Error::Other(format!("{kind} total out of range for user {user_id}"))
            })?;
        }
        Ok(totals)
    }
}

/// Insert a record inside an open transaction. Returns the new row ID.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_record(
    conn: &Connection,
    user_id: i64,
    record: &NewRecord,
    created_at: i64,
    updated_at: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO financial_reports
            (user_id, title, description, type, amount, report_date, category, photo, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            user_id,
            record.title,
            record.description,
            record.kind.as_str(),
            amount_text(record.amount),
            record.occurred_on.format("%Y-%m-%d").to_string(),
            record.category,
            record.photo,
            created_at,
            updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Whether the user already has a record with this title, kind and date whose
/// amount equals `amount` after rounding both to two decimals.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn has_duplicate(
    conn: &Connection,
    user_id: i64,
    title: &str,
    kind: RecordKind,
    date: NaiveDate,
    amount: Decimal,
) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT amount FROM financial_reports
         WHERE user_id = ?1 AND title = ?2 AND type = ?3 AND report_date = ?4",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![
            user_id,
            title,
            kind.as_str(),
            date.format("%Y-%m-%d").to_string()
        ],
        |row| parse_amount(row, 0),
    )?;

    let wanted = amount.round_dp(2);
    for existing in rows {
        if existing?.round_dp(2) == wanted {
            return Ok(true);
        }
    }
    Ok(false)
}

fn filter_clause(user_id: i64, filter: &RecordFilter) -> (String, Vec<Value>) {
    let mut conditions = vec!["user_id = ?1".to_string()];
    let mut params = vec![Value::Integer(user_id)];

    if let Some(kind) = filter.kind {
        params.push(Value::Text(kind.as_str().to_string()));
        conditions.push(format!("type = ?{}", params.len()));
    }
    if let Some(category) = &filter.category {
        params.push(Value::Text(category.clone()));
        conditions.push(format!("category = ?{}", params.len()));
    }
    if let Some(from) = filter.date_from {
        params.push(Value::Text(from.format("%Y-%m-%d").to_string()));
        conditions.push(format!("report_date >= ?{}", params.len()));
    }
    if let Some(to) = filter.date_to {
        params.push(Value::Text(to.format("%Y-%m-%d").to_string()));
        conditions.push(format!("report_date <= ?{}", params.len()));
    }

    (format!(" WHERE {}", conditions.join(" AND ")), params)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_kind(row: &Row<'_>, idx: usize) -> rusqlite::Result<RecordKind> {
    let raw: String = row.get(idx)?;
    RecordKind::parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown type: {raw}")))
}

fn parse_amount(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, format!("bad amount {raw}: {e}")))
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<FinancialRecord> {
    let date: String = row.get(6)?;
    let occurred_on = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| conversion_error(6, format!("bad report_date {date}: {e}")))?;

    Ok(FinancialRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        kind: parse_kind(row, 4)?,
        amount: parse_amount(row, 5)?,
        occurred_on,
        category: row.get(7)?,
        photo: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_record(title: &str, kind: RecordKind, amount: Decimal, date: &str) -> NewRecord {
        NewRecord {
            title: title.to_string(),
            description: None,
            kind,
            amount,
            occurred_on: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category: Some("sales".to_string()),
            photo: None,
        }
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_record_crud() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let created = storage
            .create_record(
                1,
                &new_record("Penjualan", RecordKind::Income, dec!(1500000), "2025-01-10"),
            )
            .unwrap();
        assert_eq!(created.amount, dec!(1500000.00));
        assert_eq!(created.amount.to_string(), "1500000.00");

        let fetched = storage.get_record(1, created.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Penjualan");

        let mut changed = new_record("Penjualan Q1", RecordKind::Income, dec!(2000), "2025-01-11");
        changed.description = Some("revisi".to_string());
        let previous = storage.update_record(1, created.id, &changed).unwrap();
        assert_eq!(previous.title, "Penjualan");

        let fetched = storage.get_record(1, created.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Penjualan Q1");
        assert_eq!(fetched.description.as_deref(), Some("revisi"));

        let deleted = storage.delete_record(1, created.id).unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(storage.get_record(1, created.id).unwrap().is_none());
    }

    #[test]
    fn test_records_are_scoped_to_user() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mine = storage
            .create_record(1, &new_record("A", RecordKind::Income, dec!(10), "2025-01-01"))
            .unwrap();

        assert!(storage.get_record(2, mine.id).unwrap().is_none());
        assert!(matches!(
            storage.delete_record(2, mine.id),
            Err(Error::RecordNotFound { .. })
        ));
        assert_eq!(storage.count_records(2).unwrap(), 0);
        assert_eq!(storage.count_records(1).unwrap(), 1);
    }

    #[test]
    fn test_list_filters_and_order() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .create_record(1, &new_record("Old", RecordKind::Income, dec!(1), "2025-01-01"))
            .unwrap();
        storage
            .create_record(1, &new_record("New", RecordKind::Expense, dec!(2), "2025-03-01"))
            .unwrap();
        storage
            .create_record(1, &new_record("Mid", RecordKind::Income, dec!(3), "2025-02-01"))
            .unwrap();

        let all = storage.list_records(1, &RecordFilter::default()).unwrap();
        let titles: Vec<_> = all.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Mid", "Old"]);

        let incomes = storage
            .list_records(
                1,
                &RecordFilter {
                    kind: Some(RecordKind::Income),
                    date_from: NaiveDate::from_ymd_opt(2025, 1, 15),
                    ..RecordFilter::default()
                },
            )
            .unwrap();
        assert_eq!(incomes.len(), 1);
        assert_eq!(incomes[0].title, "Mid");

        let recent = storage.recent_records(1, 2).unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn test_totals() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .create_record(1, &new_record("In", RecordKind::Income, dec!(100.50), "2025-01-01"))
            .unwrap();
        storage
            .create_record(1, &new_record("Out", RecordKind::Expense, dec!(40.25), "2025-01-02"))
            .unwrap();
        storage
            .create_record(1, &new_record("Later", RecordKind::Income, dec!(5), "2025-02-01"))
            .unwrap();

        let all = storage.totals(1, None, None).unwrap();
        assert_eq!(all.income, dec!(105.50));
        assert_eq!(all.expense, dec!(40.25));
        assert_eq!(all.balance(), dec!(65.25));

        let january = storage
            .totals(1, NaiveDate::from_ymd_opt(2025, 1, 1), NaiveDate::from_ymd_opt(2025, 1, 31))
            .unwrap();
        assert_eq!(january.income, dec!(100.50));
    }

    #[test]
    fn test_totals_overflow_is_an_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        for date in ["2025-01-01", "2025-01-02"] {
            storage
                .create_record(1, &new_record("Besar", RecordKind::Income, dec!(1), date))
                .unwrap();
        }
        storage
            .conn()
            .execute(
                "UPDATE financial_reports SET amount = ?1",
                [Decimal::MAX.to_string()],
            )
            .unwrap();

        assert!(matches!(storage.totals(1, None, None), Err(Error::Other(_))));
    }

    #[test]
    fn test_has_duplicate_rounds_amount() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .create_record(1, &new_record("Sewa", RecordKind::Expense, dec!(100.00), "2025-01-05"))
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();

        let conn = storage.conn();
        assert!(has_duplicate(conn, 1, "Sewa", RecordKind::Expense, date, dec!(100.001)).unwrap());
        assert!(!has_duplicate(conn, 1, "Sewa", RecordKind::Expense, date, dec!(100.5)).unwrap());
        assert!(!has_duplicate(conn, 1, "Sewa", RecordKind::Income, date, dec!(100)).unwrap());
        assert!(!has_duplicate(conn, 2, "Sewa", RecordKind::Expense, date, dec!(100)).unwrap());
    }

    #[test]
    fn test_mutate_rolls_back_on_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let record = new_record("Gagal", RecordKind::Income, dec!(1), "2025-01-01");

        let result: Result<()> = storage.mutate("test", |tx| {
            insert_record(tx, 1, &record, 0, 0)?;
            Err(Error::Other("boom".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(storage.count_records(1).unwrap(), 0);
    }
}
