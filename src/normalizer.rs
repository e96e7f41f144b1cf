use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FinError, Result};
use crate::models::{NormalizedRow, RawRow, TransactionType};

/// Date formats tried in order; the first successful parse wins.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)R\$|US\$|[$€£\s\u{a0}]").expect("valid currency regex"));

/// Source header names accepted for each canonical column, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasTable {
    pub date: Vec<String>,
    pub description: Vec<String>,
    pub value: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub category: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            date: owned(&["date", "data", "data_transacao"]),
            description: owned(&["description", "descrição", "descricao", "histórico"]),
            value: owned(&["value", "valor", "amount"]),
            kind: owned(&["type", "tipo"]),
            category: owned(&["category", "categoria", "category_name"]),
        }
    }
}

/// Lowercase, trim and strip the Latin diacritics common in pt-BR headers.
pub fn fold_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

struct FoldedRow<'a> {
    cells: HashMap<String, &'a str>,
}

impl<'a> FoldedRow<'a> {
    fn new(row: &'a RawRow) -> Self {
        let mut cells = HashMap::with_capacity(row.cells.len());
        for (header, value) in &row.cells {
            cells.entry(fold_header(header)).or_insert(value.as_str());
        }
        Self { cells }
    }

    /// Value of the first alias present in the row, trimmed; blank counts as absent.
    fn get(&self, aliases: &[String]) -> Option<&'a str> {
        aliases
            .iter()
            .find_map(|alias| self.cells.get(&fold_header(alias)).copied())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

fn invalid(row_index: usize, field: &'static str, reason: impl Into<String>) -> FinError {
    FinError::RowValidation {
        row_index,
        field,
        reason: reason.into(),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().split(['T', ' ']).next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Parse a money string into a signed number.
///
/// Currency symbols and whitespace are ignored. A leading or trailing `-`, or
/// surrounding parentheses, make the result negative. When both `.` and `,`
/// appear, the rightmost one is the decimal point.
pub fn parse_value(raw: &str) -> Option<f64> {
    let mut s = CURRENCY.replace_all(raw, "").into_owned();
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.to_string();
    }
    if let Some(rest) = s.strip_prefix('-').or_else(|| s.strip_suffix('-')) {
        negative = !negative;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }

    let normalized = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            s.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => single_separator(&s, '.'),
        (None, Some(_)) => single_separator(&s, ','),
        (None, None) => s,
    };

    if !normalized.chars().any(|c| c.is_ascii_digit())
        || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }
    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// With only one kind of separator, it is a decimal point when it occurs once
/// and is not followed by exactly three digits (or the integer part is zero);
/// otherwise it groups thousands.
fn single_separator(s: &str, sep: char) -> String {
    let count = s.matches(sep).count();
    let Some(pos) = s.rfind(sep) else {
        return s.to_string();
    };
    let digits_after = s.len() - pos - 1;
    let int_part = &s[..pos];
    let is_decimal = count == 1 && (digits_after != 3 || int_part.is_empty() || int_part == "0");
    if is_decimal {
        s.replace(sep, ".")
    } else {
        s.replace(sep, "")
    }
}

/// Map one raw spreadsheet row onto the canonical transaction shape.
pub fn normalize_row(row: &RawRow, aliases: &AliasTable) -> Result<NormalizedRow> {
    let folded = FoldedRow::new(row);
    let idx = row.index;

    let raw_date = folded
        .get(&aliases.date)
        .ok_or_else(|| invalid(idx, "date", "missing"))?;
    let date = parse_date(raw_date)
        .ok_or_else(|| invalid(idx, "date", format!("unrecognized date '{raw_date}'")))?;

    let raw_value = folded
        .get(&aliases.value)
        .ok_or_else(|| invalid(idx, "value", "missing"))?;
    let signed = parse_value(raw_value)
        .ok_or_else(|| invalid(idx, "value", format!("unrecognized amount '{raw_value}'")))?;
    if !signed.is_finite() {
        return Err(invalid(idx, "value", "amount out of range"));
    }
    let value = signed.abs();
    if value <= 0.0 {
        return Err(invalid(idx, "value", "must be positive"));
    }

    let kind = match folded.get(&aliases.kind) {
        Some(raw_type) => raw_type
            .parse::<TransactionType>()
            .map_err(|_| invalid(idx, "type", format!("unknown type '{raw_type}'")))?,
        None if signed < 0.0 => TransactionType::Expense,
        None => TransactionType::Income,
    };

    let description = folded
        .get(&aliases.description)
        .ok_or_else(|| invalid(idx, "description", "missing"))?
        .to_string();

    let category_name = folded.get(&aliases.category).map(str::to_string);

    Ok(NormalizedRow {
        index: idx,
        date,
        description,
        value,
        kind,
        category_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        RawRow {
            index: 1,
            cells: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn field_of(err: FinError) -> &'static str {
        match err {
            FinError::RowValidation { field, .. } => field,
            other => panic!("expected row validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_value_infers_expense() {
        let r = row(&[("Data", "05/01/2025"), ("Descrição", "Padaria"), ("Valor", "-150,50")]);
        let n = normalize_row(&r, &AliasTable::default()).unwrap();
        assert_eq!(n.value, 150.50);
        assert_eq!(n.kind, TransactionType::Expense);
        assert_eq!(n.date, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
    }

    #[test]
    fn test_ptbr_thousands() {
        assert_eq!(parse_value("1.200,00"), Some(1200.0));
        let r = row(&[("date", "2025-01-05"), ("description", "Salário"), ("value", "1.200,00")]);
        let n = normalize_row(&r, &AliasTable::default()).unwrap();
        assert_eq!(n.value, 1200.0);
        assert_eq!(n.kind, TransactionType::Income);
    }

    #[test]
    fn test_parse_value_variants() {
        assert_eq!(parse_value("R$ 1.234,56"), Some(1234.56));
        assert_eq!(parse_value("$1,234.56"), Some(1234.56));
        assert_eq!(parse_value("1,234,567"), Some(1234567.0));
        assert_eq!(parse_value("1.200"), Some(1200.0));
        assert_eq!(parse_value("1,5"), Some(1.5));
        assert_eq!(parse_value("0.125"), Some(0.125));
        assert_eq!(parse_value("150.1250"), Some(150.125));
        assert_eq!(parse_value("12,3456"), Some(12.3456));
        assert_eq!(parse_value("(50,00)"), Some(-50.0));
        assert_eq!(parse_value("150,00-"), Some(-150.0));
        assert_eq!(parse_value("+42"), Some(42.0));
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value("1e5"), None);
        assert_eq!(parse_value(""), None);
    }

    #[test]
    fn test_parse_date_order() {
        assert_eq!(parse_date("2025-02-03"), NaiveDate::from_ymd_opt(2025, 2, 3));
        assert_eq!(parse_date("03/02/2025"), NaiveDate::from_ymd_opt(2025, 2, 3));
        assert_eq!(parse_date("2025-02-03 00:00:00"), NaiveDate::from_ymd_opt(2025, 2, 3));
        assert_eq!(parse_date("2025-02-03T10:00:00"), NaiveDate::from_ymd_opt(2025, 2, 3));
        assert_eq!(parse_date("31/02/2025"), None);
        assert_eq!(parse_date("ontem"), None);
    }

    #[test]
    fn test_explicit_type_overrides_sign() {
        let r = row(&[("Date", "2025-01-05"), ("Description", "Estorno"), ("Value", "-30"), ("Type", "Receita")]);
        let n = normalize_row(&r, &AliasTable::default()).unwrap();
        assert_eq!(n.kind, TransactionType::Income);
        assert_eq!(n.value, 30.0);
    }

    #[test]
    fn test_blank_type_falls_back_to_sign() {
        let r = row(&[("Date", "2025-01-05"), ("Description", "Taxa"), ("Value", "-3"), ("Type", "  ")]);
        let n = normalize_row(&r, &AliasTable::default()).unwrap();
        assert_eq!(n.kind, TransactionType::Expense);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let r = row(&[("Date", "2025-01-05"), ("Description", "X"), ("Value", "3"), ("Type", "transfer")]);
        assert_eq!(field_of(normalize_row(&r, &AliasTable::default()).unwrap_err()), "type");
    }

    #[test]
    fn test_headers_case_and_whitespace_insensitive() {
        let r = row(&[("  DATA ", "2025-01-05"), ("DESCRICAO", "Uber"), (" valor", "12")]);
        let n = normalize_row(&r, &AliasTable::default()).unwrap();
        assert_eq!(n.description, "Uber");
    }

    #[test]
    fn test_first_matching_alias_wins() {
        let r = row(&[("date", "2025-01-05"), ("data", "2024-12-31"), ("description", "X"), ("value", "1")]);
        let n = normalize_row(&r, &AliasTable::default()).unwrap();
        assert_eq!(n.date, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
    }

    #[test]
    fn test_headers_folding_together_keep_leftmost_column() {
        let r = row(&[("date", "2025-01-05"), ("Descrição", "Primeira"), ("Descricao", "Segunda"), ("value", "1")]);
        for _ in 0..20 {
            let n = normalize_row(&r, &AliasTable::default()).unwrap();
            assert_eq!(n.description, "Primeira");
        }
    }

    #[test]
    fn test_custom_alias_table() {
        let aliases = AliasTable {
            value: vec!["montante".into()],
            ..AliasTable::default()
        };
        let r = row(&[("date", "2025-01-05"), ("description", "X"), ("Montante", "9,90")]);
        assert_eq!(normalize_row(&r, &aliases).unwrap().value, 9.90);
    }

    #[test]
    fn test_missing_description_rejected() {
        let r = row(&[("date", "2025-01-05"), ("description", "   "), ("value", "10")]);
        assert_eq!(field_of(normalize_row(&r, &AliasTable::default()).unwrap_err()), "description");
    }

    #[test]
    fn test_bad_date_and_value_rejected() {
        let r = row(&[("date", "32/13/2025"), ("description", "X"), ("value", "10")]);
        assert_eq!(field_of(normalize_row(&r, &AliasTable::default()).unwrap_err()), "date");
        let r = row(&[("date", "2025-01-01"), ("description", "X"), ("value", "dez")]);
        assert_eq!(field_of(normalize_row(&r, &AliasTable::default()).unwrap_err()), "value");
        let r = row(&[("date", "2025-01-01"), ("description", "X"), ("value", "0,00")]);
        assert_eq!(field_of(normalize_row(&r, &AliasTable::default()).unwrap_err()), "value");
    }

    #[test]
    fn test_overflowing_value_rejected() {
        let huge = "9".repeat(400);
        let r = row(&[("date", "2025-01-01"), ("description", "X"), ("value", huge.as_str())]);
        match normalize_row(&r, &AliasTable::default()).unwrap_err() {
            FinError::RowValidation { field, reason, .. } => {
                assert_eq!(field, "value");
                assert!(reason.contains("out of range"));
            }
            other => panic!("expected row validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_category_column_trimmed() {
        let r = row(&[("date", "2025-01-05"), ("description", "X"), ("value", "1"), ("Categoria", " Lazer ")]);
        let n = normalize_row(&r, &AliasTable::default()).unwrap();
        assert_eq!(n.category_name.as_deref(), Some("Lazer"));
    }

    #[test]
    fn test_alias_table_partial_override_from_json() {
        let table: AliasTable = serde_json::from_str(r#"{"type": ["natureza"]}"#).unwrap();
        assert_eq!(table.kind, vec!["natureza".to_string()]);
        assert_eq!(table.date, AliasTable::default().date);
    }
}
