use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    #[error("Could not read file as a table: {0}")]
    CorruptFile(String),

    #[error("Row {row_index}: invalid {field}: {reason}")]
    RowValidation {
        row_index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("Row {row_index}: {reason}")]
    Persistence { row_index: usize, reason: String },

    #[error("Could not load categories: {0}")]
    CategoryLookup(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, FinError>;
