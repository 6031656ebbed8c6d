// Utility helpers for lenient parsing, percentages and number formatting.
//
// Cell values coming out of a spreadsheet are messy; everything here returns
// a safe default instead of an error so the pipeline keeps rendering.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `100 * part / whole` rounded half-up to an integer percentage.
///
/// Integer arithmetic keeps the 50% boundary exact. An empty whole is 0.
pub fn percent_round(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u64;
    let whole = whole as u64;
    ((200 * part + whole) / (2 * whole)) as u32
}

/// Percent label: no decimal for whole values, one decimal otherwise.
pub fn format_percent(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}%", v as i64)
    } else {
        format!("{:.1}%", v)
    }
}

/// Plain number text for table cells and search: `5` rather than `5.0`.
pub fn format_plain(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators
    // (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Used for counts in console messages (e.g., `1,204 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_numbers_fall_back_to_none() {
        assert_eq!(parse_f64_safe(Some(" 4 ")), Some(4.0));
        assert_eq!(parse_f64_safe(Some("12,500")), Some(12500.0));
        assert_eq!(parse_f64_safe(Some("PKR 500")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("--")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent_round(1, 2), 50);
        assert_eq!(percent_round(1, 8), 13);
        assert_eq!(percent_round(1, 3), 33);
        assert_eq!(percent_round(2, 3), 67);
        assert_eq!(percent_round(0, 0), 0);
        assert_eq!(percent_round(12, 12), 100);
    }

    #[test]
    fn percent_labels() {
        assert_eq!(format_percent(50.0), "50%");
        assert_eq!(format_percent(12.5), "12.5%");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_int(9855), "9,855");
        assert_eq!(format_plain(3.0), "3");
        assert_eq!(format_plain(2.5), "2.5");
    }
}
