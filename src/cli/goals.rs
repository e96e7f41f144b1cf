use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::categories::find_by_name;
use crate::cli::{open_db, parse_date_opt};
use crate::error::{FinError, Result};
use crate::fmt::money;
use crate::goals::{contribute as add_contribution, create_goal, delete_goal, get_goal, list_goals, update_goal};
use crate::models::{GoalInput, GoalPeriod, GoalType};

fn category_id(conn: &Connection, name: Option<&str>) -> Result<Option<i64>> {
    match name {
        Some(n) => find_by_name(conn, n)?
            .map(|c| Some(c.id))
            .ok_or_else(|| FinError::NotFound(format!("Category '{}'", n.trim()))),
        None => Ok(None),
    }
}

pub struct GoalArgs {
    pub name: Option<String>,
    pub target: Option<f64>,
    pub kind: Option<String>,
    pub period: Option<String>,
    pub deadline: Option<String>,
    pub category: Option<String>,
    pub current: Option<f64>,
}

pub fn add(name: &str, target: f64, args: GoalArgs) -> Result<()> {
    let conn = open_db()?;
    let input = GoalInput {
        name: name.to_string(),
        kind: args.kind.as_deref().unwrap_or("saving").parse()?,
        target_amount: target,
        current_amount: args.current,
        period: args.period.as_deref().unwrap_or("monthly").parse()?,
        deadline: parse_date_opt(args.deadline.as_deref())?,
        category_id: category_id(&conn, args.category.as_deref())?,
    };
    let goal = create_goal(&conn, &input)?;
    println!("Added goal {}: {} ({})", goal.id, goal.name, money(goal.target_amount));
    Ok(())
}

pub fn list(period: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let period: Option<GoalPeriod> = period.map(str::parse::<GoalPeriod>).transpose()?;
    let page = list_goals(&conn, period, chrono::Local::now().date_naive())?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Period", "Category", "Progress", "Target", "%"]);
    for p in &page.goals {
        let pct = format!("{:.1}%", p.progress_percentage);
        let pct = match p.goal.kind {
            GoalType::Limit if p.progress_percentage > 100.0 => pct.red().to_string(),
            GoalType::Saving if p.progress_percentage >= 100.0 => pct.green().to_string(),
            _ => pct,
        };
        let period = match p.goal.deadline {
            Some(d) => format!("until {}", d.format("%d/%m/%Y")),
            None => p.goal.period.as_str().to_string(),
        };
        table.add_row(vec![
            Cell::new(p.goal.id),
            Cell::new(&p.goal.name),
            Cell::new(p.goal.kind.as_str()),
            Cell::new(period),
            Cell::new(p.category_name.as_deref().unwrap_or("-")),
            Cell::new(money(p.progress_value)),
            Cell::new(money(p.goal.target_amount)),
            Cell::new(pct),
        ]);
    }
    println!("Goals\n{table}");

    let s = &page.summary;
    println!("Active goals:   {}", s.active_goals_count);
    println!(
        "Saved:          {} of {} ({} goals)",
        money(s.total_saved_current),
        money(s.total_saved_target),
        s.saving_goals_count
    );
    println!(
        "Monthly limits: {} of {} ({} goals)",
        money(s.total_limit_spent),
        money(s.total_limit_target),
        s.limit_goals_count
    );
    Ok(())
}

/// Omitted fields keep their stored value.
pub fn update(id: i64, args: GoalArgs) -> Result<()> {
    let conn = open_db()?;
    let current = get_goal(&conn, id)?;
    let kind = match args.kind.as_deref() {
        Some(k) => k.parse()?,
        None => current.kind,
    };
    let period = match args.period.as_deref() {
        Some(p) => p.parse()?,
        None => current.period,
    };
    let deadline = match args.deadline.as_deref() {
        Some(d) => parse_date_opt(Some(d))?,
        None if period == GoalPeriod::Monthly => None,
        None => current.deadline,
    };
    let category_id = match args.category.as_deref() {
        Some(name) => category_id(&conn, Some(name))?,
        None => current.category_id,
    };
    let input = GoalInput {
        name: args.name.unwrap_or(current.name),
        kind,
        target_amount: args.target.unwrap_or(current.target_amount),
        current_amount: args.current,
        period,
        deadline,
        category_id,
    };
    let goal = update_goal(&conn, id, &input)?;
    println!("Updated goal {}: {}", goal.id, goal.name);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_db()?;
    delete_goal(&conn, id)?;
    println!("Deleted goal {id}");
    Ok(())
}

pub fn contribute(id: i64, amount: f64) -> Result<()> {
    let conn = open_db()?;
    let goal = add_contribution(&conn, id, amount)?;
    println!(
        "{} now at {} of {}",
        goal.name,
        money(goal.current_amount).green(),
        money(goal.target_amount)
    );
    Ok(())
}
