use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::categories::get_category;
use crate::error::{FinError, Result};
use crate::models::{Goal, GoalInput, GoalPeriod, GoalType};

const SELECT_GOAL: &str = "SELECT id, name, type, target_amount, current_amount, period, deadline, category_id FROM goals";

fn conversion_error(col: usize, e: FinError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_goal(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
    let kind: String = row.get(2)?;
    let period: String = row.get(5)?;
    let deadline: Option<String> = row.get(6)?;
    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: kind.parse().map_err(|e| conversion_error(2, e))?,
        target_amount: row.get(3)?,
        current_amount: row.get(4)?,
        period: period.parse().map_err(|e| conversion_error(5, e))?,
        deadline: deadline.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        category_id: row.get(7)?,
    })
}

pub fn get_goal(conn: &Connection, id: i64) -> Result<Goal> {
    conn.query_row(&format!("{SELECT_GOAL} WHERE id = ?1"), [id], row_to_goal)
        .optional()?
        .ok_or_else(|| FinError::NotFound(format!("Goal {id}")))
}

fn validate(conn: &Connection, input: &GoalInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(FinError::Validation("Name is required".into()));
    }
    if !input.target_amount.is_finite() || input.target_amount <= 0.0 {
        return Err(FinError::Validation("Target amount must be positive".into()));
    }
    match (input.period, input.deadline) {
        (GoalPeriod::Deadline, None) => {
            return Err(FinError::Validation("A deadline goal needs a deadline date".into()))
        }
        (GoalPeriod::Monthly, Some(_)) => {
            return Err(FinError::Validation("A monthly goal cannot have a deadline date".into()))
        }
        _ => {}
    }
    match (input.kind, input.current_amount) {
        (GoalType::Limit, Some(amount)) if amount != 0.0 => {
            return Err(FinError::Validation(
                "The current amount of a limit goal is derived from expenses and cannot be set".into(),
            ))
        }
        (GoalType::Saving, Some(amount)) if !amount.is_finite() || amount < 0.0 => {
            return Err(FinError::Validation("Current amount cannot be negative".into()))
        }
        _ => {}
    }
    if let Some(category_id) = input.category_id {
        get_category(conn, category_id)?;
    }
    Ok(())
}

pub fn create_goal(conn: &Connection, input: &GoalInput) -> Result<Goal> {
    validate(conn, input)?;
    let current = match input.kind {
        GoalType::Saving => input.current_amount.unwrap_or(0.0),
        GoalType::Limit => 0.0,
    };
    conn.execute(
        "INSERT INTO goals (name, type, target_amount, current_amount, period, deadline, category_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            input.name.trim(),
            input.kind.as_str(),
            input.target_amount,
            current,
            input.period.as_str(),
            input.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
            input.category_id,
        ],
    )?;
    get_goal(conn, conn.last_insert_rowid())
}

/// Replace a goal's definition. An absent current amount keeps the stored one.
pub fn update_goal(conn: &Connection, id: i64, input: &GoalInput) -> Result<Goal> {
    validate(conn, input)?;
    let existing = get_goal(conn, id)?;
    let current = match input.kind {
        GoalType::Saving => input.current_amount.unwrap_or(existing.current_amount),
        GoalType::Limit => 0.0,
    };
    conn.execute(
        "UPDATE goals SET name = ?1, type = ?2, target_amount = ?3, current_amount = ?4, \
         period = ?5, deadline = ?6, category_id = ?7 WHERE id = ?8",
        rusqlite::params![
            input.name.trim(),
            input.kind.as_str(),
            input.target_amount,
            current,
            input.period.as_str(),
            input.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
            input.category_id,
            id,
        ],
    )?;
    get_goal(conn, id)
}

pub fn delete_goal(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM goals WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(FinError::NotFound(format!("Goal {id}")));
    }
    Ok(())
}

/// Add money to a saving goal. Read-modify-write: concurrent contributions
/// may lose updates, which single-user use accepts.
pub fn contribute(conn: &Connection, id: i64, amount: f64) -> Result<Goal> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(FinError::Validation("Contribution must be positive".into()));
    }
    let goal = get_goal(conn, id)?;
    if goal.kind != GoalType::Saving {
        return Err(FinError::Validation(
            "Contributions are only allowed for saving goals".into(),
        ));
    }
    let new_amount = goal.current_amount + amount;
    conn.execute(
        "UPDATE goals SET current_amount = ?1 WHERE id = ?2",
        rusqlite::params![new_amount, id],
    )?;
    info!(goal_id = id, amount, total = new_amount, "contribution added");
    get_goal(conn, id)
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GoalProgress {
    pub goal: Goal,
    pub category_name: Option<String>,
    pub progress_value: f64,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalsSummary {
    pub total_saved_current: f64,
    pub total_saved_target: f64,
    pub total_limit_spent: f64,
    pub total_limit_target: f64,
    pub active_goals_count: usize,
    pub saving_goals_count: usize,
    pub limit_goals_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GoalsPage {
    pub summary: GoalsSummary,
    pub goals: Vec<GoalProgress>,
}

/// Expenses counted against a limit goal: its category only, and only the
/// current month (up to `today`) for monthly limits.
pub fn limit_spent(conn: &Connection, goal: &Goal, today: NaiveDate) -> Result<f64> {
    let Some(category_id) = goal.category_id else {
        return Ok(0.0);
    };
    let spent: Option<f64> = match goal.period {
        GoalPeriod::Monthly => {
            let first = today.with_day(1).unwrap_or(today);
            conn.query_row(
                "SELECT SUM(value) FROM transactions WHERE type = 'expense' AND category_id = ?1 \
                 AND date >= ?2 AND date <= ?3",
                rusqlite::params![
                    category_id,
                    first.format("%Y-%m-%d").to_string(),
                    today.format("%Y-%m-%d").to_string(),
                ],
                |row| row.get(0),
            )?
        }
        GoalPeriod::Deadline => conn.query_row(
            "SELECT SUM(value) FROM transactions WHERE type = 'expense' AND category_id = ?1",
            [category_id],
            |row| row.get(0),
        )?,
    };
    Ok(spent.unwrap_or(0.0))
}

pub fn list_goals(conn: &Connection, period: Option<GoalPeriod>, today: NaiveDate) -> Result<GoalsPage> {
    let mut stmt = conn.prepare(&format!("{SELECT_GOAL} ORDER BY id"))?;
    let goals = stmt
        .query_map([], row_to_goal)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut page = GoalsPage::default();
    for mut goal in goals.into_iter().filter(|g| period.map_or(true, |p| g.period == p)) {
        let category_name = match goal.category_id {
            Some(id) => Some(get_category(conn, id)?.name),
            None => None,
        };
        let progress_value = match goal.kind {
            GoalType::Saving => {
                page.summary.total_saved_current += goal.current_amount;
                page.summary.total_saved_target += goal.target_amount;
                page.summary.saving_goals_count += 1;
                goal.current_amount
            }
            GoalType::Limit => {
                let spent = limit_spent(conn, &goal, today)?;
                goal.current_amount = spent;
                if goal.period == GoalPeriod::Monthly {
                    page.summary.total_limit_spent += spent;
                    page.summary.total_limit_target += goal.target_amount;
                    page.summary.limit_goals_count += 1;
                }
                spent
            }
        };
        let progress_percentage = if goal.target_amount > 0.0 {
            progress_value * 100.0 / goal.target_amount
        } else {
            0.0
        };
        page.goals.push(GoalProgress {
            goal,
            category_name,
            progress_value,
            progress_percentage,
        });
    }
    page.summary.active_goals_count = page.goals.len();
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::{add_category, delete_category};
    use crate::db::test_db;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn saving(name: &str, target: f64) -> GoalInput {
        GoalInput {
            name: name.to_string(),
            kind: GoalType::Saving,
            target_amount: target,
            current_amount: None,
            period: GoalPeriod::Deadline,
            deadline: Some(date("2025-12-31")),
            category_id: None,
        }
    }

    fn limit(name: &str, target: f64, category_id: i64) -> GoalInput {
        GoalInput {
            name: name.to_string(),
            kind: GoalType::Limit,
            target_amount: target,
            current_amount: None,
            period: GoalPeriod::Monthly,
            deadline: None,
            category_id: Some(category_id),
        }
    }

    fn expense(conn: &Connection, day: &str, value: f64, category_id: i64) {
        conn.execute(
            "INSERT INTO transactions (date, description, value, type, category_id) VALUES (?1, 'x', ?2, 'expense', ?3)",
            rusqlite::params![day, value, category_id],
        )
        .unwrap();
    }

    #[test]
    fn test_create_saving_goal_starts_at_zero() {
        let (_dir, conn) = test_db();
        let goal = create_goal(&conn, &saving("Viagem", 5000.0)).unwrap();
        assert_eq!(goal.current_amount, 0.0);
        assert_eq!(goal.kind, GoalType::Saving);
    }

    #[test]
    fn test_validation_rules() {
        let (_dir, conn) = test_db();
        let mut g = saving("Viagem", 0.0);
        assert!(create_goal(&conn, &g).unwrap_err().to_string().contains("positive"));
        g.target_amount = 100.0;
        g.deadline = None;
        assert!(create_goal(&conn, &g).unwrap_err().to_string().contains("deadline"));
        g.deadline = Some(date("2025-06-01"));
        g.category_id = Some(42);
        assert!(matches!(create_goal(&conn, &g).unwrap_err(), FinError::NotFound(_)));

        let cat = add_category(&conn, "Lazer", None).unwrap();
        let mut l = limit("Lazer", 300.0, cat);
        l.current_amount = Some(50.0);
        assert!(create_goal(&conn, &l).unwrap_err().to_string().contains("derived"));
    }

    #[test]
    fn test_contribute_adds_to_saving_goal() {
        let (_dir, conn) = test_db();
        let mut input = saving("Reserva", 1000.0);
        input.current_amount = Some(100.0);
        let goal = create_goal(&conn, &input).unwrap();
        contribute(&conn, goal.id, 50.0).unwrap();
        let goal = contribute(&conn, goal.id, 25.5).unwrap();
        assert_eq!(goal.current_amount, 175.5);
    }

    #[test]
    fn test_contribute_rejects_limit_and_non_positive() {
        let (_dir, conn) = test_db();
        let cat = add_category(&conn, "Lazer", None).unwrap();
        let l = create_goal(&conn, &limit("Lazer", 300.0, cat)).unwrap();
        assert!(contribute(&conn, l.id, 10.0).unwrap_err().to_string().contains("saving goals"));
        let s = create_goal(&conn, &saving("Reserva", 1000.0)).unwrap();
        assert!(contribute(&conn, s.id, 0.0).is_err());
        assert!(contribute(&conn, s.id, -5.0).is_err());
        assert!(matches!(contribute(&conn, 999, 5.0).unwrap_err(), FinError::NotFound(_)));
    }

    #[test]
    fn test_monthly_limit_progress_is_derived() {
        let (_dir, conn) = test_db();
        let cat = add_category(&conn, "Lazer", None).unwrap();
        let other = add_category(&conn, "Mercado", None).unwrap();
        create_goal(&conn, &limit("Lazer", 200.0, cat)).unwrap();

        expense(&conn, "2025-03-02", 50.0, cat);
        expense(&conn, "2025-03-10", 30.0, cat);
        expense(&conn, "2025-02-27", 500.0, cat); // previous month
        expense(&conn, "2025-03-20", 70.0, cat); // after today
        expense(&conn, "2025-03-05", 90.0, other);

        let page = list_goals(&conn, None, date("2025-03-15")).unwrap();
        let progress = &page.goals[0];
        assert_eq!(progress.progress_value, 80.0);
        assert_eq!(progress.goal.current_amount, 80.0);
        assert_eq!(progress.progress_percentage, 40.0);
        assert_eq!(progress.category_name.as_deref(), Some("Lazer"));
        assert_eq!(page.summary.total_limit_spent, 80.0);
        assert_eq!(page.summary.limit_goals_count, 1);
    }

    #[test]
    fn test_list_goals_summary_and_period_filter() {
        let (_dir, conn) = test_db();
        let cat = add_category(&conn, "Lazer", None).unwrap();
        let mut s = saving("Reserva", 1000.0);
        s.current_amount = Some(250.0);
        create_goal(&conn, &s).unwrap();
        create_goal(&conn, &limit("Lazer", 300.0, cat)).unwrap();

        let page = list_goals(&conn, None, date("2025-03-15")).unwrap();
        assert_eq!(page.summary.active_goals_count, 2);
        assert_eq!(page.summary.saving_goals_count, 1);
        assert_eq!(page.summary.total_saved_current, 250.0);
        assert_eq!(page.summary.total_saved_target, 1000.0);
        assert_eq!(page.goals[0].progress_percentage, 25.0);

        let monthly = list_goals(&conn, Some(GoalPeriod::Monthly), date("2025-03-15")).unwrap();
        assert_eq!(monthly.goals.len(), 1);
        assert_eq!(monthly.goals[0].goal.name, "Lazer");
    }

    #[test]
    fn test_update_keeps_current_when_absent() {
        let (_dir, conn) = test_db();
        let goal = create_goal(&conn, &saving("Reserva", 1000.0)).unwrap();
        contribute(&conn, goal.id, 40.0).unwrap();
        let updated = update_goal(&conn, goal.id, &saving("Reserva grande", 2000.0)).unwrap();
        assert_eq!(updated.name, "Reserva grande");
        assert_eq!(updated.current_amount, 40.0);
        assert_eq!(updated.target_amount, 2000.0);
    }

    #[test]
    fn test_delete_goal_and_category_detach() {
        let (_dir, conn) = test_db();
        let cat = add_category(&conn, "Lazer", None).unwrap();
        let goal = create_goal(&conn, &limit("Lazer", 300.0, cat)).unwrap();
        delete_category(&conn, cat).unwrap();
        assert_eq!(get_goal(&conn, goal.id).unwrap().category_id, None);
        delete_goal(&conn, goal.id).unwrap();
        assert!(matches!(delete_goal(&conn, goal.id).unwrap_err(), FinError::NotFound(_)));
    }
}
