use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::error::{FinError, Result};

pub const UNCATEGORIZED: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// Date filter helper
// ---------------------------------------------------------------------------

/// SQL condition (always non-empty) and parameters for an optional inclusive
/// date range on `t.date`.
fn date_filter(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(String, Vec<String>)> {
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(FinError::Validation(format!(
                "--from ({f}) must not be after --to ({t})"
            )));
        }
    }
    let mut clauses = vec!["1 = 1".to_string()];
    let mut params = Vec::new();
    if let Some(f) = from {
        clauses.push(format!("t.date >= ?{}", params.len() + 1));
        params.push(f.format("%Y-%m-%d").to_string());
    }
    if let Some(t) = to {
        clauses.push(format!("t.date <= ?{}", params.len() + 1));
        params.push(t.format("%Y-%m-%d").to_string());
    }
    Ok((clauses.join(" AND "), params))
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kpis {
    pub total_income: f64,
    pub total_expense: f64,
    pub total_investment: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardKpis {
    pub current: Kpis,
    pub previous: Kpis,
    pub income_change_percentage: f64,
    pub expense_change_percentage: f64,
    pub investment_change_percentage: f64,
    pub balance_change_percentage: f64,
}

pub fn kpis_for_period(conn: &Connection, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Kpis> {
    let (clause, params) = date_filter(from, to)?;
    let sql = format!("SELECT t.type, SUM(t.value) FROM transactions t WHERE {clause} GROUP BY t.type");
    let mut stmt = conn.prepare(&sql)?;
    let totals = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut kpis = Kpis::default();
    for (kind, total) in totals {
        let total = total.unwrap_or(0.0);
        match kind.as_str() {
            "income" => kpis.total_income = total,
            "expense" => kpis.total_expense = total,
            "investment" => kpis.total_investment = total,
            _ => {}
        }
    }
    kpis.balance = kpis.total_income - kpis.total_expense;
    Ok(kpis)
}

/// Percent change rounded to two decimals; 0 when there is no previous value.
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (((current - previous) / previous) * 100.0 * 100.0).round() / 100.0
}

/// The period of equal length that ends the day before `from`.
pub fn previous_period(from: NaiveDate, to: NaiveDate) -> (NaiveDate, NaiveDate) {
    let length = to - from;
    let prev_end = from - Duration::days(1);
    (prev_end - length, prev_end)
}

/// KPIs for the range plus their change against the preceding period of
/// equal length. Without a closed range the deltas are all zero.
pub fn dashboard_kpis(conn: &Connection, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DashboardKpis> {
    let current = kpis_for_period(conn, from, to)?;
    let previous = match (from, to) {
        (Some(f), Some(t)) => {
            let (prev_from, prev_to) = previous_period(f, t);
            kpis_for_period(conn, Some(prev_from), Some(prev_to))?
        }
        _ => Kpis::default(),
    };
    Ok(DashboardKpis {
        income_change_percentage: percentage_change(current.total_income, previous.total_income),
        expense_change_percentage: percentage_change(current.total_expense, previous.total_expense),
        investment_change_percentage: percentage_change(current.total_investment, previous.total_investment),
        balance_change_percentage: percentage_change(current.balance, previous.balance),
        current,
        previous,
    })
}

// ---------------------------------------------------------------------------
// Expense breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryExpense {
    pub name: String,
    pub value: f64,
}

/// Expense totals per category, largest first.
pub fn expenses_by_category(
    conn: &Connection,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<CategoryExpense>> {
    let (clause, params) = date_filter(from, to)?;
    let sql = format!(
        "SELECT c.name, SUM(t.value) AS total \
         FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
         WHERE t.type = 'expense' AND {clause} \
         GROUP BY c.name ORDER BY total DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
        Ok(CategoryExpense {
            name: row
                .get::<_, Option<String>>(0)?
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            value: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Balance over time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub income: f64,
    pub expense: f64,
    /// Running income minus expense, accumulated from the start of the range.
    pub balance: f64,
}

pub fn balance_over_time(
    conn: &Connection,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<BalancePoint>> {
    let (clause, params) = date_filter(from, to)?;
    let sql = format!(
        "SELECT t.date, \
                SUM(CASE WHEN t.type = 'income' THEN t.value ELSE 0 END), \
                SUM(CASE WHEN t.type = 'expense' THEN t.value ELSE 0 END) \
         FROM transactions t WHERE {clause} GROUP BY t.date ORDER BY t.date"
    );
    let mut stmt = conn.prepare(&sql)?;
    let days = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, f64>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut running = 0.0;
    let mut points = Vec::with_capacity(days.len());
    for (day, income, expense) in days {
        let Ok(date) = NaiveDate::parse_from_str(&day, "%Y-%m-%d") else {
            continue;
        };
        running += income - expense;
        points.push(BalancePoint {
            date,
            income,
            expense,
            balance: running,
        });
    }
    Ok(points)
}
