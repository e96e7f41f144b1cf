use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::categorizer::Categorizer;
use crate::error::{FinError, Result};
use crate::ingest::read_table;
use crate::models::{Category, ImportResult, NormalizedRow, RowError};
use crate::normalizer::{normalize_row, AliasTable};

// ---------------------------------------------------------------------------
// Store seam
// ---------------------------------------------------------------------------

/// What the import pipeline needs from the transaction store.
pub trait ImportStore {
    /// Ordered category snapshot, read once per batch.
    fn list_categories(&self) -> Result<Vec<Category>>;
    fn insert_transaction(&self, row: &NormalizedRow, category_id: Option<i64>) -> Result<i64>;
    /// True when a transaction with the same date, description, value and type exists.
    fn fingerprint_exists(&self, row: &NormalizedRow) -> Result<bool>;
    fn record_import(&self, checksum: &str, result: &ImportResult) -> Result<()>;
}

impl ImportStore for Connection {
    fn list_categories(&self) -> Result<Vec<Category>> {
        crate::categories::list_categories(self)
    }

    fn insert_transaction(&self, row: &NormalizedRow, category_id: Option<i64>) -> Result<i64> {
        self.execute(
            "INSERT INTO transactions (date, description, value, type, category_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                row.date.format("%Y-%m-%d").to_string(),
                row.description,
                row.value,
                row.kind.as_str(),
                category_id,
            ],
        )?;
        Ok(self.last_insert_rowid())
    }

    fn fingerprint_exists(&self, row: &NormalizedRow) -> Result<bool> {
        let mut stmt = self.prepare_cached(
            "SELECT 1 FROM transactions WHERE date = ?1 AND description = ?2 AND abs(value - ?3) < 0.005 AND type = ?4",
        )?;
        Ok(stmt.exists(rusqlite::params![
            row.date.format("%Y-%m-%d").to_string(),
            row.description,
            row.value,
            row.kind.as_str(),
        ])?)
    }

    fn record_import(&self, checksum: &str, result: &ImportResult) -> Result<()> {
        self.execute(
            "INSERT INTO import_logs (file_name, checksum, rows_imported, rows_failed) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                result.file_name,
                checksum,
                result.rows_imported as i64,
                result.rows_failed as i64,
            ],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub aliases: AliasTable,
    /// Skip rows whose date/description/value/type already exist. Off by
    /// default: re-importing a file normally duplicates its transactions.
    pub skip_duplicates: bool,
}

pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn row_error(row_index: usize, err: FinError) -> RowError {
    let reason = match err {
        FinError::RowValidation { field, reason, .. } => format!("invalid {field}: {reason}"),
        FinError::Persistence { reason, .. } => reason,
        other => other.to_string(),
    };
    RowError { row_index, reason }
}

/// Resolve the row's category name against the batch snapshot.
fn resolve_category(row: &NormalizedRow, categories: &[Category]) -> Result<Option<i64>> {
    let Some(name) = &row.category_name else {
        return Ok(None);
    };
    let wanted = name.to_lowercase();
    categories
        .iter()
        .find(|c| c.name.to_lowercase() == wanted)
        .map(|c| Some(c.id))
        .ok_or_else(|| FinError::Persistence {
            row_index: row.index,
            reason: format!("unknown category '{name}'"),
        })
}

fn persist_row<S: ImportStore + ?Sized>(
    store: &S,
    row: &NormalizedRow,
    categories: &[Category],
    options: &ImportOptions,
) -> Result<i64> {
    let category_id = resolve_category(row, categories)?;
    if options.skip_duplicates && store.fingerprint_exists(row)? {
        return Err(FinError::Persistence {
            row_index: row.index,
            reason: "duplicate of an existing transaction".into(),
        });
    }
    store.insert_transaction(row, category_id)
}

/// Parse, normalize, categorize and persist one uploaded file.
///
/// Unsupported or unreadable files and a failed category fetch abort the whole
/// import. Anything that goes wrong with a single row is recorded in
/// `ImportResult::errors` and the remaining rows still import.
pub fn import_transactions<S: ImportStore + ?Sized>(
    store: &S,
    bytes: &[u8],
    file_name: &str,
    options: &ImportOptions,
) -> Result<ImportResult> {
    let raw_rows = read_table(bytes, file_name)?;
    let categories = store
        .list_categories()
        .map_err(|e| FinError::CategoryLookup(e.to_string()))?;
    let categorizer = Categorizer::new(&categories);

    let mut result = ImportResult {
        file_name: file_name.to_string(),
        rows_total: raw_rows.len(),
        ..ImportResult::default()
    };

    for raw in &raw_rows {
        let outcome = normalize_row(raw, &options.aliases)
            .map(|row| categorizer.categorize(row))
            .and_then(|row| persist_row(store, &row, &categories, options));
        match outcome {
            Ok(_) => result.rows_imported += 1,
            Err(err) => {
                let err = row_error(raw.index, err);
                warn!(row = err.row_index, reason = %err.reason, "row not imported");
                result.errors.push(err);
            }
        }
    }
    result.rows_failed = result.errors.len();
    result.errors.sort_by_key(|e| e.row_index);

    if let Err(e) = store.record_import(&compute_checksum(bytes), &result) {
        warn!(error = %e, "failed to record import log");
    }
    info!(
        file = file_name,
        imported = result.rows_imported,
        failed = result.rows_failed,
        "import finished"
    );
    Ok(result)
}
