//! Safe per-cell coercion from spreadsheet text to typed values.
//!
//! The source directory uses German number formatting: `.` as thousands
//! separator and `,` as decimal separator. Blank and NA-like cells coerce
//! to `None` instead of erroring; the pipeline never fails on a single
//! bad cell.

/// Cell values the source uses for "no data".
fn is_na(s: &str) -> bool {
    matches!(s, "" | "-" | "nan" | "NaN" | "NA" | "n/a" | "N/A")
}

/// Trimmed string, or `None` for blank/NA cells.
pub fn to_str_safe(raw: &str) -> Option<String> {
    let s = raw.trim();
    if is_na(s) {
        return None;
    }
    Some(s.to_string())
}

/// Integer with thousands separators stripped: `"72.461"` -> `72461`.
///
/// All non-digit characters except a leading sign are dropped before
/// parsing; anything still unparsable yields `None`.
pub fn to_int_safe(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if is_na(s) {
        return None;
    }
    let s: String = s.replace('.', "").replace(' ', "");
    let cleaned: String = s
        .chars()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(_, c)| c)
        .collect();
    cleaned.parse::<i64>().ok()
}

/// Float in source locale: thousands `.` stripped first, then decimal `,`
/// normalized, so `"22.972,5"` -> `22972.5`. The strip order is load-bearing
/// and mirrors the source formatting exactly.
pub fn to_float_safe(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if is_na(s) {
        return None;
    }
    let s = s.replace('.', "").replace(' ', "");
    let s = s.replace(',', ".");
    let cleaned: String = s
        .chars()
        .enumerate()
        .filter(|(i, c)| {
            c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))
        })
        .map(|(_, c)| c)
        .collect();
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_blank_and_na() {
        assert_eq!(to_str_safe("  "), None);
        assert_eq!(to_str_safe("nan"), None);
        assert_eq!(to_str_safe("-"), None);
        assert_eq!(to_str_safe(" Potsdam "), Some("Potsdam".to_string()));
    }

    #[test]
    fn test_int_thousands_separator() {
        assert_eq!(to_int_safe("72.461"), Some(72461));
        assert_eq!(to_int_safe(" 1 024 "), Some(1024));
        assert_eq!(to_int_safe("37"), Some(37));
    }

    #[test]
    fn test_int_garbage() {
        assert_eq!(to_int_safe("abc"), None);
        assert_eq!(to_int_safe(""), None);
        assert_eq!(to_int_safe("ca. 120"), Some(120));
    }

    #[test]
    fn test_int_signed() {
        assert_eq!(to_int_safe("-5"), Some(-5));
    }

    #[test]
    fn test_float_locale() {
        assert_eq!(to_float_safe("22.972,5"), Some(22972.5));
        assert_eq!(to_float_safe("0,5"), Some(0.5));
        assert_eq!(to_float_safe("22.972"), Some(22972.0));
    }

    #[test]
    fn test_float_garbage() {
        assert_eq!(to_float_safe("n/a"), None);
        assert_eq!(to_float_safe("x"), None);
    }
}
