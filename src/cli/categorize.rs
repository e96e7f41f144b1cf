use crate::categorizer::categorize_transactions;
use crate::cli::open_db;
use crate::error::Result;

pub fn run() -> Result<()> {
    let conn = open_db()?;
    let result = categorize_transactions(&conn)?;
    println!(
        "{} categorized, {} still uncategorized",
        result.categorized, result.still_uncategorized
    );
    Ok(())
}
