/// Format a float as Brazilian reais: R$ 1.234,56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative && cents != "0.00" {
        format!("-R$ {grouped},{dec_part}")
    } else {
        format!("R$ {grouped},{dec_part}")
    }
}

/// Signed percentage with two decimals: +12,50%
pub fn percent(val: f64) -> String {
    let body = format!("{:.2}", val.abs()).replace('.', ",");
    if val > 0.0 {
        format!("+{body}%")
    } else if val < 0.0 {
        format!("-{body}%")
    } else {
        format!("{body}%")
    }
}
