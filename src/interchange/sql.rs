//! Pseudo-SQL codec for the `financial_reports` dump format.
//!
//! The dump is not executed as SQL. It is a list of
//! `INSERT INTO financial_reports (...) VALUES (...);` statements with a
//! `:user_id` placeholder as the first value; the importer reads the nine
//! values after the placeholder positionally and assigns the owner itself.
//!
//! String literals use backslash escapes (`\'`, `\"`, `\\`). Quote and
//! escape state is tracked for the whole statement, so semicolons,
//! parentheses and colons inside literals are left alone.

use tracing::warn;

use crate::interchange::types::{ExportRow, RawRow, RawValue};
use crate::model::millis_to_iso;

/// Value positions after the owner placeholder.
pub const VALUE_COLUMNS: [&str; 9] = [
    "title",
    "description",
    "type",
    "amount",
    "report_date",
    "category",
    "photo",
    "created_at",
    "updated_at",
];

const INSERT_HEAD: &str = "INSERT INTO financial_reports (user_id, title, description, type, \
                           amount, report_date, category, photo, created_at, updated_at) VALUES (";

/// Quote a value as a single-quoted literal, or `NULL` when absent.
#[must_use]
pub fn sql_quote(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "NULL".to_string();
    };

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if matches!(ch, '\'' | '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}

/// Render export rows as a commented dump of INSERT statements.
#[must_use]
pub fn render_sql_dump(rows: &[ExportRow], generated_at: &str) -> String {
    let mut sql = String::new();
    sql.push_str("-- Financial Reports Export\n");
    sql.push_str(&format!("-- Generated at: {generated_at}\n"));
    sql.push_str(&format!("-- Total records: {}\n\n", rows.len()));
    sql.push_str("-- Note: user_id will be set during import\n");
    sql.push_str("-- Photo paths are relative to the photos directory in the ZIP\n\n");

    for row in rows {
        let values = [
            sql_quote(Some(&row.title)),
            sql_quote(row.description.as_deref()),
            sql_quote(Some(&row.kind)),
            row.amount.clone(),
            sql_quote(Some(&row.report_date)),
            sql_quote(row.category.as_deref()),
            sql_quote(row.photo.as_deref()),
            sql_quote(Some(&row.created_at)),
            sql_quote(Some(&row.updated_at)),
        ];

        sql.push_str(INSERT_HEAD);
        sql.push_str("\n    :user_id,\n");
        sql.push_str(
            &values
                .iter()
                .map(|v| format!("    {v}"))
                .collect::<Vec<_>>()
                .join(",\n"),
        );
        sql.push_str("\n);\n\n");
    }

    sql
}

/// Extract every `financial_reports` INSERT from a dump and parse it.
///
/// Statements whose values do not parse into a full row are dropped with a
/// warning; they are not import errors.
#[must_use]
pub fn parse_sql_dump(text: &str) -> Vec<RawRow> {
    let lower = text.to_ascii_lowercase();
    let mut rows = Vec::new();
    let mut pos = 0;

    while let Some(found) = lower[pos..].find("insert into") {
        let start = pos + found;
        match match_insert(text, &lower, start) {
            Some((values, end)) => {
                match parse_insert_values(values) {
                    Some(row) => rows.push(row),
                    None => warn!(offset = start, "dropping INSERT with fewer than 9 values"),
                }
                pos = end;
            }
            None => pos = start + "insert into".len(),
        }
    }

    rows
}

/// Match one statement starting at `start` (which points at `INSERT INTO`).
///
/// Returns the text between the VALUES parentheses and the offset just
/// past the terminating semicolon.
fn match_insert<'a>(text: &'a str, lower: &str, start: usize) -> Option<(&'a str, usize)> {
    let mut i = start + "insert into".len();
    let after_keyword = skip_ws(lower, i);
    if after_keyword == i {
        return None;
    }
    i = after_keyword;

    i = expect(lower, i, "financial_reports")?;
    i = skip_ws(lower, i);
    i = expect(lower, i, "(")?;
    i += lower[i..].find(')')? + 1;
    i = skip_ws(lower, i);
    i = expect(lower, i, "values")?;
    i = skip_ws(lower, i);
    i = expect(lower, i, "(")?;

    let values_start = i;
    let mut in_string = false;
    let mut escape = false;
    for (offset, ch) in text[values_start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '\'' => in_string = !in_string,
            ')' if !in_string => {
                let close = values_start + offset;
                let after = skip_ws(lower, close + 1);
                if lower[after..].starts_with(';') {
                    return Some((&text[values_start..close], after + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn skip_ws(s: &str, from: usize) -> usize {
    s[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(s.len(), |(offset, _)| from + offset)
}

fn expect(s: &str, at: usize, token: &str) -> Option<usize> {
    s[at..].starts_with(token).then_some(at + token.len())
}

/// One comma-separated value with whether any part of it was quoted.
struct Token {
    text: String,
    quoted: bool,
}

/// Parse the inside of a `VALUES (...)` clause into a row.
///
/// Returns `None` when fewer than nine values remain after removing
/// `:name` placeholders.
#[must_use]
pub fn parse_insert_values(values: &str) -> Option<RawRow> {
    let cleaned = strip_placeholders(values).replace(['\n', '\r'], " ");
    let tokens = split_values(cleaned.trim());

    if tokens.len() < VALUE_COLUMNS.len() {
        return None;
    }

    let mut row = RawRow::new();
    for (column, token) in VALUE_COLUMNS.iter().zip(&tokens) {
        let value = literal(token);
        let raw = match *column {
            "amount" => value.map(|v| match v.parse::<f64>() {
                Ok(n) => RawValue::Number(n),
                Err(_) => RawValue::Text(v),
            }),
            "created_at" | "updated_at" => Some(RawValue::Text(
                value.unwrap_or_else(|| millis_to_iso(chrono::Utc::now().timestamp_millis())),
            )),
            _ => value.map(RawValue::Text),
        };
        row.set(column, raw);
    }

    Some(row)
}

/// Unquoted `NULL` (any case) is absent; everything else is its trimmed text.
fn literal(token: &Token) -> Option<String> {
    let text = token.text.trim();
    if !token.quoted && text.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(text.to_string())
    }
}

/// Remove `:name` placeholders (plus trailing whitespace and one comma)
/// that appear outside string literals.
fn strip_placeholders(values: &str) -> String {
    let mut out = String::with_capacity(values.len());
    let mut chars = values.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if escape {
            escape = false;
            out.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => {
                escape = true;
                out.push(ch);
            }
            '\'' => {
                in_string = !in_string;
                out.push(ch);
            }
            ':' if !in_string && chars.peek().is_some_and(|c| is_word(*c)) => {
                while chars.peek().is_some_and(|c| is_word(*c)) {
                    chars.next();
                }
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                if chars.peek() == Some(&',') {
                    chars.next();
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split on commas outside quotes, dropping the quotes and applying escapes.
fn split_values(values: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_string = false;
    let mut escape = false;

    for ch in values.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '\'' => {
                in_string = !in_string;
                quoted = true;
            }
            ',' if !in_string => {
                tokens.push(Token {
                    text: current.trim().to_string(),
                    quoted,
                });
                current.clear();
                quoted = false;
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() || quoted {
        tokens.push(Token {
            text: current.trim().to_string(),
            quoted,
        });
    }

    tokens
}
