use std::sync::LazyLock;

use regex::Regex;
use rusqlite::Connection;
use tracing::debug;

use crate::categories::list_categories;
use crate::error::Result;
use crate::models::{Category, NormalizedRow};

static KEYWORD_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;,]").expect("valid keyword separator regex"));

/// Split a category's keyword text into lowercase, non-empty entries.
pub fn split_keywords(raw: &str) -> Vec<String> {
    KEYWORD_SEPARATOR
        .split(raw)
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect()
}

/// Keyword matcher over an ordered category snapshot.
///
/// Matching is a linear scan: categories are tried in snapshot order and the
/// first one with a keyword contained in the description (case-insensitive
/// substring, not tokenized) wins.
#[derive(Debug, Clone, Default)]
pub struct Categorizer {
    entries: Vec<(String, Vec<String>)>,
}

impl Categorizer {
    pub fn new(categories: &[Category]) -> Self {
        let entries = categories
            .iter()
            .map(|c| (c.name.clone(), split_keywords(c.keywords.as_deref().unwrap_or(""))))
            .filter(|(_, keywords)| !keywords.is_empty())
            .collect();
        Self { entries }
    }

    pub fn match_description(&self, description: &str) -> Option<&str> {
        let desc_lower = description.to_lowercase();
        self.entries
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| desc_lower.contains(kw.as_str())))
            .map(|(name, _)| name.as_str())
    }

    /// Fill in a category for rows that have none; explicit categories pass through.
    pub fn categorize(&self, mut row: NormalizedRow) -> NormalizedRow {
        if row.category_name.is_none() {
            row.category_name = self.match_description(&row.description).map(str::to_string);
            if let Some(name) = &row.category_name {
                debug!(row = row.index, category = %name, "auto-categorized");
            }
        }
        row
    }
}

pub struct CategorizeResult {
    pub categorized: usize,
    pub still_uncategorized: usize,
}

/// Re-run keyword matching over stored transactions that have no category.
pub fn categorize_transactions(conn: &Connection) -> Result<CategorizeResult> {
    let categories = list_categories(conn)?;
    let categorizer = Categorizer::new(&categories);

    let mut txn_stmt = conn.prepare(
        "SELECT id, description FROM transactions WHERE category_id IS NULL ORDER BY id",
    )?;
    let uncategorized: Vec<(i64, String)> = txn_stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut categorized = 0usize;
    let mut still_uncategorized = 0usize;

    for (txn_id, description) in &uncategorized {
        let matched = categorizer
            .match_description(description)
            .and_then(|name| categories.iter().find(|c| c.name == name));
        match matched {
            Some(category) => {
                conn.execute(
                    "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
                    rusqlite::params![category.id, txn_id],
                )?;
                categorized += 1;
            }
            None => still_uncategorized += 1,
        }
    }

    Ok(CategorizeResult {
        categorized,
        still_uncategorized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::add_category;
    use crate::db::test_db;
    use crate::models::TransactionType;
    use chrono::NaiveDate;

    fn cat(id: i64, name: &str, keywords: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            keywords: Some(keywords.to_string()),
        }
    }

    fn normalized(description: &str, category: Option<&str>) -> NormalizedRow {
        NormalizedRow {
            index: 1,
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            description: description.to_string(),
            value: 10.0,
            kind: TransactionType::Expense,
            category_name: category.map(str::to_string),
        }
    }

    #[test]
    fn test_case_insensitive_substring_match() {
        let c = Categorizer::new(&[cat(1, "Lazer", "cinema,ifood"), cat(2, "Transporte", "uber")]);
        assert_eq!(c.match_description("Ifood pedido 123"), Some("Lazer"));
        assert_eq!(c.match_description("UBER *TRIP"), Some("Transporte"));
        assert_eq!(c.match_description("pedido ifood delivery"), Some("Lazer"));
        assert_eq!(c.match_description("Farmácia"), None);
    }

    #[test]
    fn test_category_order_breaks_ties() {
        let first = Categorizer::new(&[cat(1, "Lazer", "ifood"), cat(2, "Alimentação", "pedido")]);
        assert_eq!(first.match_description("Ifood pedido 123"), Some("Lazer"));
        let second = Categorizer::new(&[cat(2, "Alimentação", "pedido"), cat(1, "Lazer", "ifood")]);
        assert_eq!(second.match_description("Ifood pedido 123"), Some("Alimentação"));
    }

    #[test]
    fn test_blank_keywords_ignored() {
        let c = Categorizer::new(&[cat(1, "Vazio", " , ;  ,"), cat(2, "Mercado", "; ,carrefour,")]);
        assert_eq!(c.match_description("anything"), None);
        assert_eq!(c.match_description("CARREFOUR 22"), Some("Mercado"));
        assert_eq!(split_keywords("a; b ,,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_explicit_category_never_overridden() {
        let c = Categorizer::new(&[cat(1, "Lazer", "ifood")]);
        let row = c.categorize(normalized("Ifood pedido", Some("Mercado")));
        assert_eq!(row.category_name.as_deref(), Some("Mercado"));
        let row = c.categorize(normalized("Ifood pedido", None));
        assert_eq!(row.category_name.as_deref(), Some("Lazer"));
    }

    #[test]
    fn test_categorize_transactions_updates_uncategorized() {
        let (_dir, conn) = test_db();
        add_category(&conn, "Transporte", Some("uber,99pop")).unwrap();
        for desc in ["UBER TRIP", "Padaria"] {
            conn.execute(
                "INSERT INTO transactions (date, description, value, type) VALUES ('2025-01-15', ?1, 10, 'expense')",
                [desc],
            )
            .unwrap();
        }
        let result = categorize_transactions(&conn).unwrap();
        assert_eq!(result.categorized, 1);
        assert_eq!(result.still_uncategorized, 1);
        let name: String = conn
            .query_row(
                "SELECT c.name FROM transactions t JOIN categories c ON t.category_id = c.id",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(name, "Transporte");
    }
}
