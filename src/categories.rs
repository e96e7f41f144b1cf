use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{FinError, Result};
use crate::models::Category;

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        keywords: row.get(2)?,
    })
}

/// All categories in creation order. This order drives keyword tie-breaks.
pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, keywords FROM categories ORDER BY id ASC")?;
    let categories = stmt
        .query_map([], row_to_category)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, keywords FROM categories WHERE id = ?1",
        [id],
        row_to_category,
    )
    .optional()?
    .ok_or_else(|| FinError::NotFound(format!("Category {id}")))
}

/// Case-insensitive lookup by name (Unicode-aware, unlike SQLite's NOCASE).
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Category>> {
    let wanted = name.trim().to_lowercase();
    Ok(list_categories(conn)?
        .into_iter()
        .find(|c| c.name.to_lowercase() == wanted))
}

fn ensure_name_free(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<()> {
    if let Some(existing) = find_by_name(conn, name)? {
        if Some(existing.id) != exclude_id {
            return Err(FinError::Validation(format!(
                "Category name already exists: {}",
                existing.name
            )));
        }
    }
    Ok(())
}

fn clean_keywords(keywords: Option<&str>) -> Option<String> {
    keywords
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

pub fn add_category(conn: &Connection, name: &str, keywords: Option<&str>) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FinError::Validation("Name is required".into()));
    }
    ensure_name_free(conn, name, None)?;
    conn.execute(
        "INSERT INTO categories (name, keywords) VALUES (?1, ?2)",
        rusqlite::params![name, clean_keywords(keywords)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_category(conn: &Connection, id: i64, name: &str, keywords: Option<&str>) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FinError::Validation("Name is required".into()));
    }
    ensure_name_free(conn, name, Some(id))?;
    let updated = conn.execute(
        "UPDATE categories SET name = ?1, keywords = ?2 WHERE id = ?3",
        rusqlite::params![name, clean_keywords(keywords), id],
    )?;
    if updated == 0 {
        return Err(FinError::NotFound(format!("Category {id}")));
    }
    Ok(())
}

/// Delete a category, detaching (not deleting) the transactions and goals
/// that reference it. Returns how many transactions were detached.
pub fn delete_category(conn: &Connection, id: i64) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let detached = tx.execute(
        "UPDATE transactions SET category_id = NULL WHERE category_id = ?1",
        [id],
    )?;
    tx.execute("UPDATE goals SET category_id = NULL WHERE category_id = ?1", [id])?;
    let deleted = tx.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(FinError::NotFound(format!("Category {id}")));
    }
    tx.commit()?;
    info!(category_id = id, detached, "deleted category");
    Ok(detached)
}

pub fn usage_count(conn: &Connection, id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE category_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(count)
}
