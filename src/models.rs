use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::FinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Income,
    Expense,
    Investment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Investment => "investment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = FinError;

    /// Accepts the canonical names plus the pt-BR labels bank exports use.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "receita" | "entrada" => Ok(Self::Income),
            "expense" | "despesa" | "saída" | "saida" => Ok(Self::Expense),
            "investment" | "investimento" => Ok(Self::Investment),
            other => Err(FinError::Validation(format!(
                "Invalid transaction type: {other} (must be income, expense or investment)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub value: f64,
    pub kind: TransactionType,
    pub category_name: Option<String>,
}

/// Payload for a manual entry or a full-replace edit.
#[derive(Debug, Clone)]
pub struct TransactionInput {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub value: f64,
    pub kind: TransactionType,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalType {
    Saving,
    Limit,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saving => "saving",
            Self::Limit => "limit",
        }
    }
}

impl FromStr for GoalType {
    type Err = FinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "saving" => Ok(Self::Saving),
            "limit" => Ok(Self::Limit),
            other => Err(FinError::Validation(format!(
                "Invalid goal type: {other} (must be 'saving' or 'limit')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalPeriod {
    Monthly,
    Deadline,
}

impl GoalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Deadline => "deadline",
        }
    }
}

impl FromStr for GoalPeriod {
    type Err = FinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "deadline" => Ok(Self::Deadline),
            other => Err(FinError::Validation(format!(
                "Invalid goal period: {other} (must be 'monthly' or 'deadline')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub kind: GoalType,
    pub target_amount: f64,
    pub current_amount: f64,
    pub period: GoalPeriod,
    pub deadline: Option<NaiveDate>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GoalInput {
    pub name: String,
    pub kind: GoalType,
    pub target_amount: f64,
    pub current_amount: Option<f64>,
    pub period: GoalPeriod,
    pub deadline: Option<NaiveDate>,
    pub category_id: Option<i64>,
}

/// One data row of an uploaded spreadsheet as `(header, value)` pairs in
/// column order.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 1-based position among data rows (the header row is not counted).
    pub index: usize,
    pub cells: Vec<(String, String)>,
}

impl RawRow {
    /// Value under a header exactly as written.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }
}

/// A row after column normalization, before categorization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub index: usize,
    pub date: NaiveDate,
    pub description: String,
    pub value: f64,
    pub kind: TransactionType,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub file_name: String,
    pub rows_total: usize,
    pub rows_imported: usize,
    pub rows_failed: usize,
    pub errors: Vec<RowError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_accepts_portuguese_labels() {
        assert_eq!("Despesa".parse::<TransactionType>().unwrap(), TransactionType::Expense);
        assert_eq!("SAÍDA".parse::<TransactionType>().unwrap(), TransactionType::Expense);
        assert_eq!(" receita ".parse::<TransactionType>().unwrap(), TransactionType::Income);
        assert_eq!("investimento".parse::<TransactionType>().unwrap(), TransactionType::Investment);
    }

    #[test]
    fn test_transaction_type_rejects_unknown() {
        let err = "transfer".parse::<TransactionType>().unwrap_err();
        assert!(err.to_string().contains("Invalid transaction type"));
    }

    #[test]
    fn test_goal_enums_parse() {
        assert_eq!("Limit".parse::<GoalType>().unwrap(), GoalType::Limit);
        assert_eq!("monthly".parse::<GoalPeriod>().unwrap(), GoalPeriod::Monthly);
        assert!("weekly".parse::<GoalPeriod>().is_err());
    }
}
