use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::categories::{find_by_name, list_categories};
use crate::categorizer::Categorizer;
use crate::error::{FinError, Result};
use crate::models::{Transaction, TransactionInput, TransactionType};

const SELECT_TRANSACTION: &str = "SELECT t.id, t.date, t.description, t.value, t.type, c.name \
     FROM transactions t LEFT JOIN categories c ON t.category_id = c.id";

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let date: String = row.get(1)?;
    let kind: String = row.get(4)?;
    Ok(Transaction {
        id: row.get(0)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        description: row.get(2)?,
        value: row.get(3)?,
        kind: kind.parse().map_err(|e: FinError| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        category_name: row.get(5)?,
    })
}

fn validate(input: &TransactionInput) -> Result<()> {
    if input.description.trim().is_empty() {
        return Err(FinError::Validation("Description is required".into()));
    }
    if !input.value.is_finite() || input.value <= 0.0 {
        return Err(FinError::Validation(format!(
            "Value must be positive, got {}",
            input.value
        )));
    }
    Ok(())
}

fn category_id_for(conn: &Connection, name: &str) -> Result<i64> {
    find_by_name(conn, name)?
        .map(|c| c.id)
        .ok_or_else(|| FinError::NotFound(format!("Category '{}'", name.trim())))
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(&format!("{SELECT_TRANSACTION} WHERE t.id = ?1"), [id], row_to_transaction)
        .optional()?
        .ok_or_else(|| FinError::NotFound(format!("Transaction {id}")))
}

/// Manual entry. Date defaults to today; without an explicit category the
/// description is matched against category keywords.
pub fn create_transaction(conn: &Connection, input: &TransactionInput) -> Result<Transaction> {
    validate(input)?;
    let date = input.date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let description = input.description.trim();

    let category_id = match input.category_name.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(name) => Some(category_id_for(conn, name)?),
        None => {
            let categories = list_categories(conn)?;
            let matched = Categorizer::new(&categories).match_description(description).map(str::to_string);
            debug!(category = ?matched, "auto-tagged manual entry");
            matched.and_then(|name| categories.into_iter().find(|c| c.name == name).map(|c| c.id))
        }
    };

    conn.execute(
        "INSERT INTO transactions (date, description, value, type, category_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            date.format("%Y-%m-%d").to_string(),
            description,
            input.value,
            input.kind.as_str(),
            category_id,
        ],
    )?;
    get_transaction(conn, conn.last_insert_rowid())
}

/// Full replace of an existing transaction. A missing date keeps the stored
/// one; a missing category clears it.
pub fn update_transaction(conn: &Connection, id: i64, input: &TransactionInput) -> Result<Transaction> {
    validate(input)?;
    let existing = get_transaction(conn, id)?;
    let date = input.date.unwrap_or(existing.date);
    let category_id = match input.category_name.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(name) => Some(category_id_for(conn, name)?),
        None => None,
    };
    conn.execute(
        "UPDATE transactions SET date = ?1, description = ?2, value = ?3, type = ?4, category_id = ?5 WHERE id = ?6",
        rusqlite::params![
            date.format("%Y-%m-%d").to_string(),
            input.description.trim(),
            input.value,
            input.kind.as_str(),
            category_id,
            id,
        ],
    )?;
    get_transaction(conn, id)
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(FinError::NotFound(format!("Transaction {id}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Case-insensitive match against description or category name.
    pub search: Option<String>,
    pub kind: Option<TransactionType>,
    /// Calendar month as `YYYY-MM`.
    pub month: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub total_investment: f64,
    pub balance: f64,
}

pub fn parse_month(month: &str) -> Result<(i32, u32)> {
    let invalid = || FinError::Validation(format!("Invalid month '{month}' (expected YYYY-MM)"));
    let (y, m) = month.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month_num: u32 = m.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month_num) {
        return Err(invalid());
    }
    Ok((year, month_num))
}

/// Newest first (date, then id).
pub fn list_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    if let Some(kind) = filter.kind {
        params.push(kind.as_str().to_string());
        clauses.push("t.type = ?");
    }
    if let Some(month) = &filter.month {
        let (year, month_num) = parse_month(month)?;
        params.push(format!("{year:04}-{month_num:02}-%"));
        clauses.push("t.date LIKE ?");
    }
    if let Some(from) = filter.from {
        params.push(from.format("%Y-%m-%d").to_string());
        clauses.push("t.date >= ?");
    }
    if let Some(to) = filter.to {
        params.push(to.format("%Y-%m-%d").to_string());
        clauses.push("t.date <= ?");
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!("{SELECT_TRANSACTION}{where_clause} ORDER BY t.date DESC, t.id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let needle = filter.search.as_deref().map(|s| s.trim().to_lowercase());
    let rows = rows.into_iter().filter(|t| match &needle {
        Some(n) if !n.is_empty() => {
            t.description.to_lowercase().contains(n.as_str())
                || t.category_name
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(n.as_str()))
        }
        _ => true,
    });
    Ok(match filter.limit {
        Some(limit) => rows.take(limit).collect(),
        None => rows.collect(),
    })
}

pub fn summarize(transactions: &[Transaction]) -> TransactionSummary {
    let mut summary = TransactionSummary::default();
    for t in transactions {
        match t.kind {
            TransactionType::Income => summary.total_income += t.value,
            TransactionType::Expense => summary.total_expense += t.value,
            TransactionType::Investment => summary.total_investment += t.value,
        }
    }
    summary.balance = summary.total_income - summary.total_expense;
    summary
}

/// Distinct `YYYY-MM` months that have transactions, newest first.
pub fn available_months(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT substr(date, 1, 7) AS month FROM transactions ORDER BY month DESC",
    )?;
    let months = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(months)
}

pub fn uncategorized_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE category_id IS NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::add_category;
    use crate::db::test_db;

    fn input(date: &str, description: &str, value: f64, kind: TransactionType) -> TransactionInput {
        TransactionInput {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            description: description.to_string(),
            value,
            kind,
            category_name: None,
        }
    }

    #[test]
    fn test_create_defaults_date_to_today() {
        let (_dir, conn) = test_db();
        let mut entry = input("", "Café", 7.5, TransactionType::Expense);
        entry.date = None;
        let t = create_transaction(&conn, &entry).unwrap();
        assert_eq!(t.date, chrono::Local::now().date_naive());
        assert_eq!(t.description, "Café");
    }

    #[test]
    fn test_create_rejects_non_positive_value() {
        let (_dir, conn) = test_db();
        for bad in [0.0, -10.0, f64::NAN] {
            let err = create_transaction(&conn, &input("2025-01-01", "X", bad, TransactionType::Income)).unwrap_err();
            assert!(err.to_string().contains("positive"));
        }
    }

    #[test]
    fn test_create_rejects_blank_description() {
        let (_dir, conn) = test_db();
        let err = create_transaction(&conn, &input("2025-01-01", "  ", 1.0, TransactionType::Income)).unwrap_err();
        assert!(err.to_string().contains("Description is required"));
    }

    #[test]
    fn test_create_auto_tags_by_keyword() {
        let (_dir, conn) = test_db();
        add_category(&conn, "Transporte", Some("uber")).unwrap();
        let t = create_transaction(&conn, &input("2025-01-01", "Uber centro", 20.0, TransactionType::Expense)).unwrap();
        assert_eq!(t.category_name.as_deref(), Some("Transporte"));
    }

    #[test]
    fn test_create_with_unknown_category_fails() {
        let (_dir, conn) = test_db();
        let mut entry = input("2025-01-01", "X", 1.0, TransactionType::Expense);
        entry.category_name = Some("Nope".into());
        assert!(matches!(create_transaction(&conn, &entry).unwrap_err(), FinError::NotFound(_)));
    }

    #[test]
    fn test_update_is_full_replace() {
        let (_dir, conn) = test_db();
        add_category(&conn, "Lazer", Some("cinema")).unwrap();
        let t = create_transaction(&conn, &input("2025-01-01", "Cinema", 30.0, TransactionType::Expense)).unwrap();
        assert_eq!(t.category_name.as_deref(), Some("Lazer"));

        let updated = update_transaction(&conn, t.id, &input("2025-02-01", "Reembolso", 30.0, TransactionType::Income)).unwrap();
        assert_eq!(updated.description, "Reembolso");
        assert_eq!(updated.kind, TransactionType::Income);
        assert_eq!(updated.date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(updated.category_name, None);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let (_dir, conn) = test_db();
        let entry = input("2025-01-01", "X", 1.0, TransactionType::Income);
        assert!(matches!(update_transaction(&conn, 5, &entry).unwrap_err(), FinError::NotFound(_)));
        assert!(matches!(delete_transaction(&conn, 5).unwrap_err(), FinError::NotFound(_)));
    }

    #[test]
    fn test_list_filters_and_summary() {
        let (_dir, conn) = test_db();
        add_category(&conn, "Alimentação", Some("padaria")).unwrap();
        create_transaction(&conn, &input("2025-01-05", "Salário", 5000.0, TransactionType::Income)).unwrap();
        create_transaction(&conn, &input("2025-01-10", "Padaria", 25.0, TransactionType::Expense)).unwrap();
        create_transaction(&conn, &input("2025-02-02", "CDB", 1000.0, TransactionType::Investment)).unwrap();

        let all = list_transactions(&conn, &TransactionFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].description, "CDB");

        let jan = list_transactions(&conn, &TransactionFilter { month: Some("2025-01".into()), ..Default::default() }).unwrap();
        assert_eq!(jan.len(), 2);
        let summary = summarize(&jan);
        assert_eq!(summary.total_income, 5000.0);
        assert_eq!(summary.total_expense, 25.0);
        assert_eq!(summary.balance, 4975.0);

        let by_category = list_transactions(&conn, &TransactionFilter { search: Some("ALIMENTA".into()), ..Default::default() }).unwrap();
        assert_eq!(by_category.len(), 1);

        let expenses = list_transactions(&conn, &TransactionFilter { kind: Some(TransactionType::Expense), ..Default::default() }).unwrap();
        assert_eq!(expenses.len(), 1);

        let limited = list_transactions(&conn, &TransactionFilter { limit: Some(2), ..Default::default() }).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_bad_month_filter_rejected() {
        let (_dir, conn) = test_db();
        let err = list_transactions(&conn, &TransactionFilter { month: Some("2025-13".into()), ..Default::default() }).unwrap_err();
        assert!(err.to_string().contains("Invalid month"));
    }

    #[test]
    fn test_available_months_and_uncategorized() {
        let (_dir, conn) = test_db();
        create_transaction(&conn, &input("2024-12-31", "A", 1.0, TransactionType::Income)).unwrap();
        create_transaction(&conn, &input("2025-01-01", "B", 1.0, TransactionType::Income)).unwrap();
        create_transaction(&conn, &input("2025-01-09", "C", 1.0, TransactionType::Income)).unwrap();
        assert_eq!(available_months(&conn).unwrap(), vec!["2025-01", "2024-12"]);
        assert_eq!(uncategorized_count(&conn).unwrap(), 3);
    }
}
