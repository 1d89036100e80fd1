use crate::error::ReceiptError;
use regex::Regex;
use time::{Date, Month};

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a model answer such as `42.50`, `$42.50`, `US$42.50` or `USD 1,042.50`.
pub fn parse_amount(answer: &str) -> Result<f64, ReceiptError> {
    let re = Regex::new(
        r"^\s*(?:[A-Za-z]{1,3}\s*)?[$€£¥]?\s*(-?\d{1,3}(?:,\d{3})+(?:\.\d*)?|-?\d+(?:\.\d*)?|-?\.\d+)\s*(?:[A-Za-z]{3})?\s*$",
    )
    .map_err(|e| ReceiptError::AnswerParse(e.to_string()))?;

    let cap = re
        .captures(answer)
        .ok_or_else(|| ReceiptError::AnswerParse(format!("not an amount: {answer:?}")))?;

    cap[1]
        .replace(',', "")
        .parse::<f64>()
        .map_err(|e| ReceiptError::AnswerParse(format!("not an amount: {answer:?} ({e})")))
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a model answer into a calendar date.
///
/// Numeric dates are read month-first; day-first only when the first field
/// cannot be a month.
pub fn parse_date(answer: &str) -> Result<Date, ReceiptError> {
    let fail = || ReceiptError::AnswerParse(format!("not a date: {answer:?}"));

    // a date never starts right after a digit or separator ("1/2/3/2024")
    const START: &str = r"(?:^|[^\d/.\-])";

    // 2024-03-05, 2024/03/05
    let iso = Regex::new(&format!(r"{START}(\d{{4}})[-/.](\d{{1,2}})[-/.](\d{{1,2}})\b"))
        .map_err(|_| fail())?;
    if let Some(c) = iso.captures(answer) {
        return ymd(&c[1], &c[2], &c[3]).ok_or_else(fail);
    }

    // 03/05/2024, 3-5-24, 03.05.2024
    let numeric = Regex::new(&format!(r"{START}(\d{{1,2}})[-/.](\d{{1,2}})[-/.](\d{{2}}|\d{{4}})\b"))
        .map_err(|_| fail())?;
    if let Some(c) = numeric.captures(answer) {
        return ymd(&c[3], &c[1], &c[2])
            .or_else(|| ymd(&c[3], &c[2], &c[1]))
            .ok_or_else(fail);
    }

    // March 5, 2024 / Mar 5 2024 / Mar-05-2024
    let month_first = Regex::new(
        r"(?i)\b([a-z]{3,9})\.?[\s\-/]+(\d{1,2})(?:st|nd|rd|th)?,?[\s\-/]+(\d{4}|\d{2})\b",
    )
    .map_err(|_| fail())?;
    if let Some(c) = month_first.captures(answer) {
        if let Some(month) = month_from_name(&c[1]) {
            return named(&c[3], month, &c[2]).ok_or_else(fail);
        }
    }

    // 2024-Mar-05
    let year_first = Regex::new(r"(?i)\b(\d{4})[\s\-/]+([a-z]{3,9})\.?[\s\-/]+(\d{1,2})\b")
        .map_err(|_| fail())?;
    if let Some(c) = year_first.captures(answer) {
        if let Some(month) = month_from_name(&c[2]) {
            return named(&c[1], month, &c[3]).ok_or_else(fail);
        }
    }

    // 5 March 2024 / 05-Mar-2024
    let day_first =
        Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[\s\-]+([a-z]{3,9})\.?[\s\-,]+(\d{4}|\d{2})\b")
            .map_err(|_| fail())?;
    if let Some(c) = day_first.captures(answer) {
        if let Some(month) = month_from_name(&c[2]) {
            return named(&c[3], month, &c[1]).ok_or_else(fail);
        }
    }

    // 20240305
    let compact = Regex::new(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:$|\D)").map_err(|_| fail())?;
    if let Some(c) = compact.captures(answer) {
        return ymd(&c[1], &c[2], &c[3]).ok_or_else(fail);
    }

    Err(fail())
}

/// `M/D/YYYY`, no zero padding.
pub fn format_sheet_date(date: Date) -> String {
    format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year())
}

fn year(raw: &str) -> Option<i32> {
    let y: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + y } else { y })
}

fn ymd(y: &str, m: &str, d: &str) -> Option<Date> {
    let month = Month::try_from(m.parse::<u8>().ok()?).ok()?;
    named(y, month, d)
}

fn named(y: &str, month: Month, d: &str) -> Option<Date> {
    Date::from_calendar_date(year(y)?, month, d.parse().ok()?).ok()
}

fn month_from_name(name: &str) -> Option<Month> {
    let lower = name.to_lowercase();
    let month = match lower.get(..3)? {
        "jan" => Month::January,
        "feb" => Month::February,
        "mar" => Month::March,
        "apr" => Month::April,
        "may" => Month::May,
        "jun" => Month::June,
        "jul" => Month::July,
        "aug" => Month::August,
        "sep" => Month::September,
        "oct" => Month::October,
        "nov" => Month::November,
        "dec" => Month::December,
        _ => return None,
    };
    // "Mayday" is not a month; full names and common abbreviations are
    let full = month.to_string().to_lowercase();
    full.starts_with(&lower).then_some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: Month, d: u8) -> Date {
        Date::from_calendar_date(y, m, d).unwrap()
    }

    #[test]
    fn test_amounts() {
        assert_eq!(parse_amount("42.50").unwrap(), 42.5);
        assert_eq!(parse_amount("$42.50").unwrap(), 42.5);
        assert_eq!(parse_amount(" 17 ").unwrap(), 17.0);
        assert_eq!(parse_amount("$1,042.50").unwrap(), 1042.5);
        assert_eq!(parse_amount("USD 9.99").unwrap(), 9.99);
        assert_eq!(parse_amount("€ 3.20").unwrap(), 3.2);
        assert_eq!(parse_amount("42.").unwrap(), 42.0);
        assert_eq!(parse_amount("US$42.50").unwrap(), 42.5);
        assert_eq!(parse_amount("S$12.00").unwrap(), 12.0);
        assert_eq!(parse_amount("US$ 1,200.").unwrap(), 1200.0);
    }

    #[test]
    fn test_bad_amounts() {
        for bad in ["", "Total", "42.50.1", "twelve dollars", "1,2,3"] {
            assert!(
                matches!(parse_amount(bad), Err(ReceiptError::AnswerParse(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_numeric_dates_are_month_first() {
        assert_eq!(parse_date("03/05/2024").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("3-5-24").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("03.05.2024").unwrap(), date(2024, Month::March, 5));
        // first field can't be a month
        assert_eq!(parse_date("25/12/2023").unwrap(), date(2023, Month::December, 25));
    }

    #[test]
    fn test_iso_and_named_dates() {
        assert_eq!(parse_date("2024-01-10").unwrap(), date(2024, Month::January, 10));
        assert_eq!(parse_date("2024/02/20").unwrap(), date(2024, Month::February, 20));
        assert_eq!(parse_date("March 5, 2024").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("Sept 1st 2023").unwrap(), date(2023, Month::September, 1));
        assert_eq!(parse_date("5 Mar 2024").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("05-Mar-2024").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("Date 03/05/2024").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("Mar-05-2024").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("Mar/05/24").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("2024-Mar-05").unwrap(), date(2024, Month::March, 5));
        assert_eq!(parse_date("20240305").unwrap(), date(2024, Month::March, 5));
    }

    #[test]
    fn test_bad_dates() {
        for bad in ["", "yesterday", "13/13/2024", "02/30/2024", "Mayday 5 2024", "1/2/3/2024", "20241305"] {
            assert!(
                matches!(parse_date(bad), Err(ReceiptError::AnswerParse(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_sheet_date_format() {
        assert_eq!(format_sheet_date(date(2024, Month::March, 5)), "3/5/2024");
        assert_eq!(format_sheet_date(date(2023, Month::December, 25)), "12/25/2023");
    }
}
