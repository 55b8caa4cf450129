//! Formatting utilities for CLI output.

/// Format a large number with commas for readability.
///
/// # Examples
///
/// ```
/// use pc_cli_common::format_number;
///
/// assert_eq!(format_number(0), "0");
/// assert_eq!(format_number(1234), "1,234");
/// assert_eq!(format_number(1234567), "1,234,567");
/// ```
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

/// Format a per-second rate with one decimal place.
///
/// # Examples
///
/// ```
/// use pc_cli_common::format_rate;
///
/// assert_eq!(format_rate(12.345, "items"), "12.3 items/sec");
/// ```
pub fn format_rate(rate: f64, unit: &str) -> String {
    format!("{:.1} {}/sec", rate, unit)
}
