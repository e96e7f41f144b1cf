use comfy_table::{Cell, Table};

use crate::categories::{add_category, delete_category, get_category, list_categories, update_category, usage_count};
use crate::cli::open_db;
use crate::error::Result;

pub fn add(name: &str, keywords: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let id = add_category(&conn, name, keywords)?;
    println!("Added category {id}: {}", name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let categories = list_categories(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Keywords", "Transactions"]);
    for cat in categories {
        let used = usage_count(&conn, cat.id)?;
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(cat.keywords.unwrap_or_default()),
            Cell::new(used),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

/// Omitted fields keep their stored value.
pub fn update(id: i64, name: Option<&str>, keywords: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let current = get_category(&conn, id)?;
    let name = name.unwrap_or(&current.name);
    let keywords = keywords.or(current.keywords.as_deref());
    update_category(&conn, id, name, keywords)?;
    println!("Updated category {id}: {}", name.trim());
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_db()?;
    let detached = delete_category(&conn, id)?;
    println!("Deleted category {id} ({detached} transactions now uncategorized)");
    Ok(())
}
