use rusqlite::OptionalExtension;

use crate::db::{get_connection, DB_FILE};
use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;
use crate::transactions::uncategorized_count;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!(
        "Aliases:    {}",
        if settings.column_aliases.is_some() { "custom" } else { "default" }
    );

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `fintrack init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let transactions: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    let categories: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0))?;
    let goals: i64 = conn.query_row("SELECT count(*) FROM goals", [], |r| r.get(0))?;
    let imports: i64 = conn.query_row("SELECT count(*) FROM import_logs", [], |r| r.get(0))?;
    let last_import: Option<(String, String)> = conn
        .query_row(
            "SELECT file_name, imported_at FROM import_logs ORDER BY id DESC LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let balance: f64 = conn.query_row(
        "SELECT COALESCE(SUM(CASE type WHEN 'income' THEN value WHEN 'expense' THEN -value ELSE 0 END), 0.0) \
         FROM transactions",
        [],
        |r| r.get(0),
    )?;

    println!();
    println!("Transactions:   {transactions}");
    println!("Uncategorized:  {}", uncategorized_count(&conn)?);
    println!("Categories:     {categories}");
    println!("Goals:          {goals}");
    println!("Balance:        {}", money(balance));
    println!("Imports:        {imports}");
    if let Some((file, at)) = last_import {
        println!("Last import:    {file} ({at})");
    }
    Ok(())
}
