use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, parse_date_opt};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{Transaction, TransactionInput, TransactionType};
use crate::transactions::{
    available_months, create_transaction, delete_transaction, get_transaction, list_transactions,
    summarize, update_transaction, TransactionFilter,
};

fn colored_value(t: &Transaction) -> String {
    match t.kind {
        TransactionType::Income => money(t.value).green().to_string(),
        TransactionType::Expense => money(t.value).red().to_string(),
        TransactionType::Investment => money(t.value).blue().to_string(),
    }
}

fn print_transactions(transactions: &[Transaction]) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Category", "Type", "Value"]);
    for t in transactions {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date.format("%d/%m/%Y")),
            Cell::new(&t.description),
            Cell::new(t.category_name.as_deref().unwrap_or("-")),
            Cell::new(t.kind),
            Cell::new(colored_value(t)),
        ]);
    }
    println!("{table}");
}

pub fn add(
    description: &str,
    value: f64,
    kind: &str,
    date: Option<&str>,
    category: Option<&str>,
) -> Result<()> {
    let conn = open_db()?;
    let input = TransactionInput {
        date: parse_date_opt(date)?,
        description: description.to_string(),
        value,
        kind: kind.parse()?,
        category_name: category.map(str::to_string),
    };
    let t = create_transaction(&conn, &input)?;
    println!(
        "Added transaction {}: {} {} ({})",
        t.id,
        t.description,
        money(t.value),
        t.category_name.as_deref().unwrap_or("uncategorized")
    );
    Ok(())
}

pub fn list(
    search: Option<String>,
    kind: Option<String>,
    month: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let conn = open_db()?;
    let filter = TransactionFilter {
        search,
        kind: kind.as_deref().map(str::parse::<TransactionType>).transpose()?,
        month,
        from: parse_date_opt(from_date.as_deref())?,
        to: parse_date_opt(to_date.as_deref())?,
        limit,
    };
    let transactions = list_transactions(&conn, &filter)?;
    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }
    print_transactions(&transactions);

    let summary = summarize(&transactions);
    println!("Income:      {}", money(summary.total_income).green());
    println!("Expenses:    {}", money(summary.total_expense).red());
    println!("Investments: {}", money(summary.total_investment).blue());
    let balance = money(summary.balance);
    if summary.balance >= 0.0 {
        println!("Balance:     {}", balance.green().bold());
    } else {
        println!("Balance:     {}", balance.red().bold());
    }
    Ok(())
}

pub struct EditArgs {
    pub description: Option<String>,
    pub value: Option<f64>,
    pub kind: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub clear_category: bool,
}

pub fn edit(id: i64, args: EditArgs) -> Result<()> {
    let conn = open_db()?;
    let current = get_transaction(&conn, id)?;
    let category_name = if args.clear_category {
        None
    } else {
        args.category.or(current.category_name)
    };
    let input = TransactionInput {
        date: Some(parse_date_opt(args.date.as_deref())?.unwrap_or(current.date)),
        description: args.description.unwrap_or(current.description),
        value: args.value.unwrap_or(current.value),
        kind: match args.kind {
            Some(k) => k.parse()?,
            None => current.kind,
        },
        category_name,
    };
    let t = update_transaction(&conn, id, &input)?;
    println!("Updated transaction {}: {} {}", t.id, t.description, money(t.value));
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_db()?;
    delete_transaction(&conn, id)?;
    println!("Deleted transaction {id}");
    Ok(())
}

pub fn months() -> Result<()> {
    let conn = open_db()?;
    let months = available_months(&conn)?;
    if months.is_empty() {
        println!("No transactions yet.");
    }
    for month in months {
        println!("{month}");
    }
    Ok(())
}

pub fn uncategorized() -> Result<()> {
    let conn = open_db()?;
    let transactions: Vec<Transaction> = list_transactions(&conn, &TransactionFilter::default())?
        .into_iter()
        .filter(|t| t.category_name.is_none())
        .collect();
    if transactions.is_empty() {
        println!("{}", "Every transaction has a category.".green());
        return Ok(());
    }
    print_transactions(&transactions);
    println!(
        "{} uncategorized. Add keywords with `fintrack categories update` and run `fintrack categorize`.",
        transactions.len().to_string().yellow()
    );
    Ok(())
}
