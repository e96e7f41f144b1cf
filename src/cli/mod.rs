pub mod categories;
pub mod categorize;
pub mod goals;
pub mod import;
pub mod init;
pub mod prefs;
pub mod report;
pub mod status;
pub mod transactions;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::open_data_dir;
use crate::error::{FinError, Result};
use crate::normalizer::parse_date;
use crate::settings::get_data_dir;

/// Open the configured database, creating the schema on first use.
pub(crate) fn open_db() -> Result<Connection> {
    open_data_dir(&get_data_dir())
}

/// Parse an optional date argument in any of the accepted import formats.
pub(crate) fn parse_date_opt(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| parse_date(s).ok_or_else(|| FinError::Validation(format!("Invalid date: {s}"))))
        .transpose()
}

#[derive(Parser)]
#[command(name = "fintrack", about = "Personal finance tracker: import bank statements, categorize, set goals.")]
pub struct Cli {
    /// Log pipeline progress to stderr (same as RUST_LOG=fintrack=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for fintrack data (default: ~/Documents/fintrack)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a CSV/XLSX statement and auto-categorize its rows.
    Import {
        /// Path to CSV or XLSX file to import
        file: String,
        /// Reject rows identical to an existing transaction
        #[arg(long = "skip-duplicates")]
        skip_duplicates: bool,
    },
    /// Re-run keyword matching on uncategorized transactions.
    Categorize,
    /// Manage transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Manage categories and their keywords.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage saving and spending-limit goals.
    Goals {
        #[command(subcommand)]
        command: GoalsCommands,
    },
    /// Dashboard reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Show or change notification preferences.
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Add a transaction by hand.
    Add {
        description: String,
        /// Positive amount
        value: f64,
        /// income, expense or investment
        #[arg(long = "type")]
        kind: String,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Category name (default: matched from keywords)
        #[arg(long)]
        category: Option<String>,
    },
    /// List transactions, newest first.
    List {
        /// Text to find in the description or category name
        #[arg(long)]
        search: Option<String>,
        /// income, expense or investment
        #[arg(long = "type")]
        kind: Option<String>,
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Edit a transaction; omitted fields keep their current value.
    Edit {
        /// Transaction ID (shown in `fintrack tx list`)
        id: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        value: Option<f64>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Remove the category
        #[arg(long = "clear-category", conflicts_with = "category")]
        clear_category: bool,
    },
    /// Delete a transaction.
    Delete {
        id: i64,
    },
    /// List months that have transactions.
    Months,
    /// List transactions without a category.
    Uncategorized,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        name: String,
        /// Comma or semicolon separated keywords, e.g. "uber;99 taxi"
        #[arg(long)]
        keywords: Option<String>,
    },
    /// List all categories.
    List,
    /// Update a category's name and keywords.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        keywords: Option<String>,
    },
    /// Delete a category; its transactions become uncategorized.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum GoalsCommands {
    /// Add a goal.
    Add {
        name: String,
        /// Target amount
        target: f64,
        /// saving or limit
        #[arg(long = "type", default_value = "saving")]
        kind: String,
        /// monthly or deadline
        #[arg(long, default_value = "monthly")]
        period: String,
        /// Deadline date (required for deadline goals)
        #[arg(long)]
        deadline: Option<String>,
        /// Category name the goal tracks
        #[arg(long)]
        category: Option<String>,
        /// Amount already saved (saving goals only)
        #[arg(long)]
        current: Option<f64>,
    },
    /// List goals with progress.
    List {
        /// monthly or deadline
        #[arg(long)]
        period: Option<String>,
    },
    /// Update a goal; omitted fields keep their current value.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        current: Option<f64>,
    },
    /// Delete a goal.
    Delete {
        id: i64,
    },
    /// Add money to a saving goal.
    Contribute {
        id: i64,
        amount: f64,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Income, expense, investment and balance with change vs. the previous period.
    Kpis {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Expenses grouped by category.
    Expenses {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Daily income, expense and running balance.
    Balance {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PrefsCommands {
    /// Show all preferences.
    Show,
    /// Set a preference, e.g. `fintrack prefs set email_alerts true`.
    Set {
        key: String,
        value: String,
    },
    /// Restore default preferences.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_import_flags() {
        let cli = Cli::try_parse_from(["fintrack", "import", "extrato.csv", "--skip-duplicates"]).unwrap();
        match cli.command {
            Commands::Import { file, skip_duplicates } => {
                assert_eq!(file, "extrato.csv");
                assert!(skip_duplicates);
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn test_edit_category_flags_conflict() {
        let parsed = Cli::try_parse_from(["fintrack", "tx", "edit", "1", "--category", "Lazer", "--clear-category"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_date_opt() {
        assert_eq!(
            parse_date_opt(Some("05/01/2025")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
        assert_eq!(parse_date_opt(None).unwrap(), None);
        assert!(parse_date_opt(Some("ontem")).is_err());
    }
}
