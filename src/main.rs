mod categories;
mod categorizer;
mod cli;
mod dashboard;
mod db;
mod error;
mod fmt;
mod goals;
mod importer;
mod ingest;
mod models;
mod normalizer;
mod preferences;
mod settings;
mod transactions;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{CategoriesCommands, Cli, Commands, GoalsCommands, PrefsCommands, ReportCommands, TxCommands};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("fintrack=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { file, skip_duplicates } => cli::import::run(&file, skip_duplicates),
        Commands::Categorize => cli::categorize::run(),
        Commands::Tx { command } => match command {
            TxCommands::Add {
                description,
                value,
                kind,
                date,
                category,
            } => cli::transactions::add(&description, value, &kind, date.as_deref(), category.as_deref()),
            TxCommands::List {
                search,
                kind,
                month,
                from_date,
                to_date,
                limit,
            } => cli::transactions::list(search, kind, month, from_date, to_date, limit),
            TxCommands::Edit {
                id,
                description,
                value,
                kind,
                date,
                category,
                clear_category,
            } => cli::transactions::edit(
                id,
                cli::transactions::EditArgs {
                    description,
                    value,
                    kind,
                    date,
                    category,
                    clear_category,
                },
            ),
            TxCommands::Delete { id } => cli::transactions::delete(id),
            TxCommands::Months => cli::transactions::months(),
            TxCommands::Uncategorized => cli::transactions::uncategorized(),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { name, keywords } => cli::categories::add(&name, keywords.as_deref()),
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::Update { id, name, keywords } => {
                cli::categories::update(id, name.as_deref(), keywords.as_deref())
            }
            CategoriesCommands::Delete { id } => cli::categories::delete(id),
        },
        Commands::Goals { command } => match command {
            GoalsCommands::Add {
                name,
                target,
                kind,
                period,
                deadline,
                category,
                current,
            } => cli::goals::add(
                &name,
                target,
                cli::goals::GoalArgs {
                    name: None,
                    target: None,
                    kind: Some(kind),
                    period: Some(period),
                    deadline,
                    category,
                    current,
                },
            ),
            GoalsCommands::List { period } => cli::goals::list(period.as_deref()),
            GoalsCommands::Update {
                id,
                name,
                target,
                kind,
                period,
                deadline,
                category,
                current,
            } => cli::goals::update(
                id,
                cli::goals::GoalArgs {
                    name,
                    target,
                    kind,
                    period,
                    deadline,
                    category,
                    current,
                },
            ),
            GoalsCommands::Delete { id } => cli::goals::delete(id),
            GoalsCommands::Contribute { id, amount } => cli::goals::contribute(id, amount),
        },
        Commands::Report { command } => match command {
            ReportCommands::Kpis { from_date, to_date } => cli::report::kpis(from_date, to_date),
            ReportCommands::Expenses { from_date, to_date } => cli::report::expenses(from_date, to_date),
            ReportCommands::Balance { from_date, to_date } => cli::report::balance(from_date, to_date),
        },
        Commands::Prefs { command } => match command {
            PrefsCommands::Show => cli::prefs::show(),
            PrefsCommands::Set { key, value } => cli::prefs::set(&key, &value),
            PrefsCommands::Reset => cli::prefs::reset(),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
