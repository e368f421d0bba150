use colored::Colorize;

/// Dollar amount with thousands separators: `$1,234.56`, `-$42.00`.
pub fn money(val: f64) -> String {
    let cents = (val.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if val < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// [`money`] in red for outflows and green for inflows.
pub fn signed_money(val: f64) -> String {
    if val < 0.0 {
        money(val).red().to_string()
    } else {
        money(val).green().to_string()
    }
}

/// Cut `s` to at most `max` characters, marking the cut with `…`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}\u{2026}")
}
