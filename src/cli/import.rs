use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::importer::{import_transactions, ImportOptions};
use crate::models::ImportResult;
use crate::settings::load_settings;

pub fn run(file: &str, skip_duplicates: bool) -> Result<()> {
    let path = Path::new(file);
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    let conn = open_db()?;
    let options = ImportOptions {
        aliases: load_settings().aliases(),
        skip_duplicates,
    };
    let result = import_transactions(&conn, &bytes, &file_name, &options)?;
    print_result(&result);
    Ok(())
}

fn print_result(result: &ImportResult) {
    let headline = format!("{} of {} rows imported", result.rows_imported, result.rows_total);
    if result.rows_failed == 0 {
        println!("{}", headline.green());
        return;
    }
    println!("{} ({} failed)", headline.yellow(), result.rows_failed);

    let mut table = Table::new();
    table.set_header(vec!["Row", "Reason"]);
    for error in &result.errors {
        table.add_row(vec![Cell::new(error.row_index), Cell::new(&error.reason)]);
    }
    println!("{table}");
}
