// src/utils/format.rs
// Number formatting shared by the text reports.

/// Formats `value` with `decimals` fraction digits and `,` thousands separators,
/// e.g. `13666666.67` with 0 decimals -> `13,666,667`.
pub fn with_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0" and "-0.00" read badly in a report
    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Formats a percentage with two decimals and a trailing `%`.
pub fn percent(value: f64) -> String {
    format!("{}%", with_thousands(value, 2))
}

/// Parses a figure printed by [`with_thousands`] back into a number.
pub fn parse_grouped(text: &str) -> Option<f64> {
    text.trim().replace(',', "").parse::<f64>().ok()
}

/// `value` as it reads once printed with `decimals` digits, so a figure kept in
/// memory compares exactly like the same figure read back from a report.
pub fn as_rendered(value: f64, decimals: usize) -> f64 {
    parse_grouped(&with_thousands(value, decimals)).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_thousands_groups_integer_part() {
        assert_eq!(with_thousands(13_666_666.67, 0), "13,666,667");
        assert_eq!(with_thousands(1_234.5, 2), "1,234.50");
        assert_eq!(with_thousands(999.0, 0), "999");
        assert_eq!(with_thousands(-1_000_000.0, 0), "-1,000,000");
    }

    #[test]
    fn test_with_thousands_never_prints_negative_zero() {
        assert_eq!(with_thousands(-0.001, 2), "0.00");
    }

    #[test]
    fn test_percent_and_parse_back() {
        assert_eq!(percent(-12.5), "-12.50%");
        assert_eq!(percent(1_250.0), "1,250.00%");
        assert_eq!(parse_grouped("1,234.50"), Some(1234.5));
        assert_eq!(parse_grouped("-1,000"), Some(-1000.0));
        assert_eq!(parse_grouped("N/A"), None);
    }

    #[test]
    fn test_as_rendered_matches_printed_figure() {
        assert_eq!(as_rendered(102.49999999999997, 2), 102.5);
        assert_eq!(as_rendered(2.4999999999999716, 2), 2.5);
        assert_eq!(as_rendered(1_234_567.891, 0), 1_234_568.0);
        let tiny = as_rendered(-0.000975, 2);
        assert_eq!(tiny, 0.0);
        assert!(tiny.is_sign_positive(), "Printed as 0.00, so no negative zero either");
    }
}
