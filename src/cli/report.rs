use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, parse_date_opt};
use crate::dashboard;
use crate::error::Result;
use crate::fmt::{money, percent};

fn signed_money(val: f64) -> String {
    if val >= 0.0 {
        money(val).green().to_string()
    } else {
        money(val).red().to_string()
    }
}

pub fn kpis(from_date: Option<String>, to_date: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let from = parse_date_opt(from_date.as_deref())?;
    let to = parse_date_opt(to_date.as_deref())?;
    let data = dashboard::dashboard_kpis(&conn, from, to)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Current", "Previous", "Change"]);
    let rows = [
        ("Income", data.current.total_income, data.previous.total_income, data.income_change_percentage),
        ("Expenses", data.current.total_expense, data.previous.total_expense, data.expense_change_percentage),
        (
            "Investments",
            data.current.total_investment,
            data.previous.total_investment,
            data.investment_change_percentage,
        ),
    ];
    for (label, current, previous, change) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(money(current)),
            Cell::new(money(previous)),
            Cell::new(percent(change)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Balance".bold()),
        Cell::new(signed_money(data.current.balance)),
        Cell::new(money(data.previous.balance)),
        Cell::new(percent(data.balance_change_percentage)),
    ]);
    println!("Key Figures\n{table}");
    if from.is_none() || to.is_none() {
        println!("Pass both --from and --to to compare with the previous period.");
    }
    Ok(())
}

pub fn expenses(from_date: Option<String>, to_date: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let rows = dashboard::expenses_by_category(
        &conn,
        parse_date_opt(from_date.as_deref())?,
        parse_date_opt(to_date.as_deref())?,
    )?;
    let total: f64 = rows.iter().map(|r| r.value).sum();

    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", "%"]);
    for r in &rows {
        let pct = if total > 0.0 { r.value / total * 100.0 } else { 0.0 };
        table.add_row(vec![
            Cell::new(&r.name),
            Cell::new(money(r.value)),
            Cell::new(format!("{pct:.1}%")),
        ]);
    }
    table.add_row(vec![Cell::new("Total".bold()), Cell::new(money(total)), Cell::new("")]);
    println!("Expenses by Category\n{table}");
    Ok(())
}

pub fn balance(from_date: Option<String>, to_date: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let points = dashboard::balance_over_time(
        &conn,
        parse_date_opt(from_date.as_deref())?,
        parse_date_opt(to_date.as_deref())?,
    )?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Income", "Expenses", "Balance"]);
    for p in &points {
        table.add_row(vec![
            Cell::new(p.date.format("%d/%m/%Y")),
            Cell::new(money(p.income)),
            Cell::new(money(p.expense)),
            Cell::new(signed_money(p.balance)),
        ]);
    }
    println!("Balance Over Time\n{table}");
    Ok(())
}
