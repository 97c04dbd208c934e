//! Per-field rules for the five output columns.
//!
//! Each rule takes one raw cell. The date and balance rules return `None`
//! when the value cannot be read; the caller turns that into an empty
//! field without dropping the row.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Cell;

/// Output format for Document Date.
pub const OUTPUT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Strict formats, tried in order. Order decides ambiguous values such as
/// `01/02/2024`, which is read day-first.
pub const STRICT_DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Shape each strict format must match. chrono accepts any year width for
/// `%Y`, so the four-digit year is enforced here.
static STRICT_SHAPES: Lazy<[Regex; 5]> = Lazy::new(|| {
    let re = |p: &str| Regex::new(p).expect("static regex");
    [
        re(r"^\d{1,2}/\d{1,2}/\d{4}$"),
        re(r"^\d{4}-\d{1,2}-\d{1,2}$"),
        re(r"^\d{1,2}-\d{1,2}-\d{4}$"),
        re(r"^\d{1,2}/\d{1,2}/\d{4}$"),
        re(r"^\d{4}/\d{1,2}/\d{1,2}$"),
    ]
});

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d)(st|nd|rd|th)\b").expect("static regex"));

static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+").expect("static regex")
});

static TIME_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<date>.+?)(?:T|\s+)\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?\s*(?:am|pm)?\s*(?:z|utc|gmt|[+-]\d{2}:?\d{2})?$",
    )
    .expect("static regex")
});

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<a>\d{1,4})[./\- ](?P<b>\d{1,2})[./\- ](?P<c>\d{1,4})$").expect("static regex")
});

/// Month and year only, in either order (`2024-03`, `03/2024`).
static PARTIAL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<a>\d{1,4})[./\- ](?P<b>\d{1,4})$").expect("static regex"));

static ISO_YEAR_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-").expect("static regex"));

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

// =============================================================================
// Verbatim columns
// =============================================================================

/// Debtor Reference and Document Number: the cell's text, untouched.
pub fn verbatim(cell: &Cell) -> String {
    cell.to_string()
}

// =============================================================================
// Transaction Type
// =============================================================================

/// Uppercase, then replace every `CRN` substring with `CRD`.
///
/// This is a substring replace: `MICRNA` becomes `MICRDA`.
pub fn transaction_type(cell: &Cell) -> String {
    cell.to_string().to_uppercase().replace("CRN", "CRD")
}

// =============================================================================
// Document Date
// =============================================================================

/// Normalize a date cell to `DD/MM/YYYY`.
///
/// Native spreadsheet dates format directly. Text goes through the strict
/// formats, then the lenient day-first parser. Anything else is `None`.
pub fn document_date(cell: &Cell) -> Option<String> {
    let date = match cell {
        Cell::DateTime(dt) => dt.date(),
        Cell::String(s) => parse_strict_date(s).or_else(|| parse_lenient_date(s))?,
        _ => return None,
    };
    Some(date.format(OUTPUT_DATE_FORMAT).to_string())
}

/// Try [`STRICT_DATE_FORMATS`] in order; first match wins.
pub fn parse_strict_date(s: &str) -> Option<NaiveDate> {
    STRICT_DATE_FORMATS
        .iter()
        .zip(STRICT_SHAPES.iter())
        .filter(|(_, shape)| shape.is_match(s))
        .find_map(|(fmt, _)| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Day-first general date parser used when no strict format matches.
///
/// A missing day defaults to the 1st (`March 2024`, `2024-03`). A year is
/// either four digits or two digits (pivoted by [`expand_year`]); any other
/// width is rejected rather than guessed.
pub fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if ISO_YEAR_PREFIX.is_match(trimmed) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(dt.date_naive());
        }
        if let Ok(dt) = trimmed.parse::<NaiveDateTime>() {
            return Some(dt.date());
        }
    }

    let cleaned = ORDINAL.replace_all(trimmed, "$1");
    let cleaned = WEEKDAY.replace(&cleaned, "");
    let date_part = match TIME_TAIL.captures(&cleaned) {
        Some(caps) => caps["date"].trim().to_string(),
        None => cleaned.to_string(),
    };

    if let Some(caps) = NUMERIC_DATE.captures(&date_part) {
        return numeric_date(&caps["a"], &caps["b"], &caps["c"]);
    }
    if let Some(caps) = PARTIAL_DATE.captures(&date_part) {
        return month_year(&caps["a"], &caps["b"]);
    }

    if date_part.bytes().all(|b| b.is_ascii_digit()) {
        return match date_part.len() {
            8 => NaiveDate::parse_from_str(&date_part, "%Y%m%d").ok(),
            4 => NaiveDate::from_ymd_opt(date_part.parse().ok()?, 1, 1),
            _ => None,
        };
    }

    named_month_date(&date_part)
}

/// Resolve three numeric parts. A leading four-digit part is the year;
/// otherwise the year is last and the day comes first unless it cannot be
/// a day, in which case day and month swap.
fn numeric_date(a: &str, b: &str, c: &str) -> Option<NaiveDate> {
    let num = |s: &str| s.parse::<u32>().ok();

    if a.len() == 4 {
        if c.len() > 2 {
            return None;
        }
        let (year, x, y) = (num(a)? as i32, num(b)?, num(c)?);
        return NaiveDate::from_ymd_opt(year, x, y).or_else(|| NaiveDate::from_ymd_opt(year, y, x));
    }

    if b.len() > 2 || a.len() > 2 {
        return None;
    }

    let year = expand_year(c)?;
    let (x, y) = (num(a)?, num(b)?);
    NaiveDate::from_ymd_opt(year, y, x).or_else(|| NaiveDate::from_ymd_opt(year, x, y))
}

/// Month and four-digit year in either order, on the 1st of the month.
fn month_year(a: &str, b: &str) -> Option<NaiveDate> {
    let (year, month) = match (a.len(), b.len()) {
        (4, 1 | 2) => (a, b),
        (1 | 2, 4) => (b, a),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// Dates spelled with a month name, full or abbreviated, in any position.
///
/// The remaining numbers are a day and a year, or a year alone (day 1).
/// A four-digit number is always the year; with two short numbers the
/// first is the day and the second a two-digit year.
fn named_month_date(s: &str) -> Option<NaiveDate> {
    let spaced = s.replace([',', '-', '/', '.'], " ");
    let mut month = None;
    let mut numbers = Vec::new();

    for token in spaced.split_whitespace() {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            numbers.push(token);
        } else if month.is_none() {
            month = Some(month_from_name(token)?);
        } else {
            return None;
        }
    }
    let month = month?;

    let (day, year) = match numbers.as_slice() {
        [y] if y.len() == 4 => ("1", *y),
        [y, d] if y.len() == 4 && d.len() <= 2 => (*d, *y),
        [d, y] if d.len() <= 2 && (y.len() == 4 || y.len() == 2) => (*d, *y),
        _ => return None,
    };

    NaiveDate::from_ymd_opt(expand_year(year)?, month, day.parse().ok()?)
}

/// Month number for an English month name or its three-letter abbreviation
/// (`Sept` is also accepted).
fn month_from_name(token: &str) -> Option<u32> {
    let token = token.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| {
            *name == token || ((3..=4).contains(&token.len()) && name.starts_with(token.as_str()))
        })
        .map(|i| i as u32 + 1)
}

/// Two-digit years pivot at 69: `00`-`68` are 20xx, `69`-`99` are 19xx.
/// Four-digit years pass through; other widths are not years.
fn expand_year(s: &str) -> Option<i32> {
    let year = s.parse::<i32>().ok()?;
    match s.len() {
        1 | 2 if year < 69 => Some(2000 + year),
        1 | 2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}

// =============================================================================
// Document Balance
// =============================================================================

/// Format a balance with exactly two decimals.
///
/// Thousands-separator commas, and underscores between digits, are removed
/// before parsing. Non-numeric and
/// non-finite values are `None`.
pub fn document_balance(cell: &Cell) -> Option<String> {
    let value = match cell {
        Cell::Int(i) => *i as f64,
        Cell::Float(f) => *f,
        Cell::String(s) => {
            let digits = strip_digit_groups(&s.replace(',', ""));
            digits.trim().parse::<f64>().ok()?
        }
        Cell::Empty | Cell::Bool(_) | Cell::DateTime(_) => return None,
    };

    if !value.is_finite() {
        return None;
    }
    Some(format!("{:.2}", value))
}

/// Drop `_` digit-group separators (`1_000`). An underscore that is not
/// between two digits is kept, so the value still fails to parse.
fn strip_digit_groups(s: &str) -> String {
    let bytes = s.as_bytes();
    s.char_indices()
        .filter(|&(i, c)| {
            c != '_'
                || !(i > 0
                    && bytes[i - 1].is_ascii_digit()
                    && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
        })
        .map(|(_, c)| c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn text(s: &str) -> Cell {
        Cell::String(s.to_string())
    }

    fn date(s: &str) -> String {
        document_date(&text(s)).unwrap_or_default()
    }

    #[test]
    fn test_transaction_type() {
        assert_eq!(transaction_type(&text("crn")), "CRD");
        assert_eq!(transaction_type(&text("crnpay")), "CRDPAY");
        assert_eq!(transaction_type(&text("MICRNA")), "MICRDA");
        assert_eq!(transaction_type(&text("inv")), "INV");
        assert_eq!(transaction_type(&text("crncrn")), "CRDCRD");
        assert_eq!(transaction_type(&Cell::Empty), "");
    }

    #[test]
    fn test_verbatim_copy() {
        assert_eq!(verbatim(&text(" 007 ")), " 007 ");
        assert_eq!(verbatim(&Cell::Float(100.0)), "100");
        assert_eq!(verbatim(&Cell::Empty), "");
        assert_eq!(verbatim(&Cell::Bool(true)), "True");
        assert_eq!(transaction_type(&Cell::Bool(false)), "FALSE");
    }

    #[test]
    fn test_strict_formats() {
        assert_eq!(date("31/12/2023"), "31/12/2023");
        assert_eq!(date("2024-03-05"), "05/03/2024");
        assert_eq!(date("05-03-2024"), "05/03/2024");
        assert_eq!(date("2024/03/05"), "05/03/2024");
        assert_eq!(date("1/2/2024"), "01/02/2024");
    }

    #[test]
    fn test_ambiguous_date_is_day_first() {
        assert_eq!(date("01/02/2024"), "01/02/2024");
    }

    #[test]
    fn test_month_first_when_day_first_impossible() {
        assert_eq!(date("12/31/2023"), "31/12/2023");
    }

    #[test]
    fn test_lenient_fallback() {
        assert_eq!(date("2024-03-05 10:30:00"), "05/03/2024");
        assert_eq!(date("2024-03-05T10:30:00Z"), "05/03/2024");
        assert_eq!(date(" 31/12/2023 "), "31/12/2023");
        assert_eq!(date("05.03.2024"), "05/03/2024");
        assert_eq!(date("5 Mar 2024"), "05/03/2024");
        assert_eq!(date("March 5, 2024"), "05/03/2024");
        assert_eq!(date("5th March 2024"), "05/03/2024");
        assert_eq!(date("Tue, 5 Mar 2024"), "05/03/2024");
        assert_eq!(date("05-Mar-2024"), "05/03/2024");
        assert_eq!(date("20240305"), "05/03/2024");
        assert_eq!(date("05/03/24"), "05/03/2024");
        assert_eq!(date("05/03/99"), "05/03/1999");
    }

    #[test]
    fn test_full_month_names() {
        assert_eq!(date("5 March 2024"), "05/03/2024");
        assert_eq!(date("5th March 2024"), "05/03/2024");
        assert_eq!(date("March 5th, 2024"), "05/03/2024");
        assert_eq!(date("2024 September 30"), "30/09/2024");
        assert_eq!(date("Sept 1, 2023"), "01/09/2023");
        assert_eq!(date("Wednesday, 1st May 2024"), "01/05/2024");
    }

    #[test]
    fn test_month_name_year_width() {
        assert_eq!(date("5 Mar 24"), "05/03/2024");
        assert_eq!(date("Mar 5 24"), "05/03/2024");
        assert_eq!(date("5-Mar-99"), "05/03/1999");
        assert_eq!(document_date(&text("5 Mar 024")), None);
        assert_eq!(document_date(&text("5 Mar 20245")), None);
    }

    #[test]
    fn test_missing_day_is_first_of_month() {
        assert_eq!(date("Mar 2024"), "01/03/2024");
        assert_eq!(date("March 2024"), "01/03/2024");
        assert_eq!(date("Dec 1999"), "01/12/1999");
        assert_eq!(date("2024-03"), "01/03/2024");
        assert_eq!(date("03/2024"), "01/03/2024");
        assert_eq!(date("2024"), "01/01/2024");
    }

    #[test]
    fn test_lenient_rejects_partial_or_odd_widths() {
        for value in [
            "Mar",
            "5 Mar",
            "Mar 24",
            "13/2024",
            "2024-13",
            "05/03",
            "05/03/024",
            "2024-03-005",
            "5 Foo 2024",
            "March April 2024",
        ] {
            assert_eq!(document_date(&text(value)), None, "{value}");
        }
    }

    #[test]
    fn test_lenient_years_are_plausible() {
        for value in [
            "Jan 2024",
            "5 Mar 24",
            "March 5, 2024",
            "05/03/24",
            "2024-03",
            "Tue, 5 Mar 2024",
        ] {
            let parsed = parse_lenient_date(value).unwrap();
            assert!((1969..=2068).contains(&parsed.year()), "{value} -> {parsed}");
        }
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(document_date(&text("not-a-date")), None);
        assert_eq!(document_date(&text("32/13/2024")), None);
        assert_eq!(document_date(&text("")), None);
        assert_eq!(document_date(&Cell::Empty), None);
        assert_eq!(document_date(&Cell::Float(45000.0)), None);
    }

    #[test]
    fn test_native_datetime_cell() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        assert_eq!(document_date(&Cell::DateTime(dt)).as_deref(), Some("05/03/2024"));
    }

    #[test]
    fn test_balance_formatting() {
        assert_eq!(document_balance(&text("1,234.5")).as_deref(), Some("1234.50"));
        assert_eq!(document_balance(&text("10")).as_deref(), Some("10.00"));
        assert_eq!(document_balance(&text("1,000")).as_deref(), Some("1000.00"));
        assert_eq!(document_balance(&text("-12.346")).as_deref(), Some("-12.35"));
        assert_eq!(document_balance(&text(" 7 ")).as_deref(), Some("7.00"));
        assert_eq!(document_balance(&Cell::Float(1234.5)).as_deref(), Some("1234.50"));
        assert_eq!(document_balance(&Cell::Int(3)).as_deref(), Some("3.00"));
    }

    #[test]
    fn test_balance_digit_group_underscores() {
        assert_eq!(document_balance(&text("1_000")).as_deref(), Some("1000.00"));
        assert_eq!(document_balance(&text("1_234_567.5")).as_deref(), Some("1234567.50"));
        assert_eq!(document_balance(&text("_1000")), None);
        assert_eq!(document_balance(&text("1000_")), None);
        assert_eq!(document_balance(&text("1__000")), None);
    }

    #[test]
    fn test_balance_failures() {
        assert_eq!(document_balance(&text("abc")), None);
        assert_eq!(document_balance(&text("nan")), None);
        assert_eq!(document_balance(&text("inf")), None);
        assert_eq!(document_balance(&Cell::Empty), None);
        assert_eq!(document_balance(&Cell::Bool(true)), None);
    }
}
