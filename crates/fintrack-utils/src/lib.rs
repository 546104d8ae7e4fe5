//! Display formatting and date helpers
//!
//! Pure functions shared by the renderer and the form transformations.
//! Display dates are `MM/DD/YYYY`; submitted dates are canonical UTC
//! midnight instants (`YYYY-MM-DDT00:00:00.000Z`).

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use convert_case::{Case, Casing};
use rust_decimal::prelude::*;
use thiserror::Error;

/// Display format for dates
pub const DISPLAY_DATE_FORMAT: &str = "%m/%d/%Y";

/// Format of plain calendar dates
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Error type for parsing helpers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Invalid date: '{input}'")]
    InvalidDate { input: String },

    #[error("Invalid number: '{input}'")]
    InvalidNumber { input: String },

    #[error("Number out of range: '{input}'")]
    OutOfRange { input: String },
}

/// Format a number with thousands separators
pub fn format_number<T: ToString>(n: T) -> String {
    group_digits(&n.to_string(), ",")
}

/// Insert `separator` every three digits of the integer part, keeping sign and fraction
fn group_digits(s: &str, separator: &str) -> String {
    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(pos) => (&unsigned[..pos], &unsigned[pos..]),
        None => (unsigned, ""),
    };

    let mut grouped = String::new();
    let mut count = 0;
    for c in int_part.chars().rev() {
        if count == 3 {
            grouped.push_str(&separator.chars().rev().collect::<String>());
            count = 0;
        }
        grouped.push(c);
        count += 1;
    }
    let int_grouped: String = grouped.chars().rev().collect();
    format!("{}{}{}", sign, int_grouped, frac_part)
}

/// Round half away from zero and render with exactly `places` decimals
pub fn display_decimals(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", places as usize, rounded)
}

/// Render a monetary amount, e.g. `-$1,234.50`
pub fn display_currency(amount: Decimal, symbol: &str, places: u32, separator: &str) -> String {
    let fixed = display_decimals(amount.abs(), places);
    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{}{}{}", sign, symbol, group_digits(&fixed, separator))
}

/// Render a ratio as a percentage number (without the `%` sign)
pub fn display_percentage(ratio: Decimal, places: u32) -> Result<String, FormatError> {
    ratio
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|percent| display_decimals(percent, places))
        .ok_or_else(|| FormatError::OutOfRange { input: ratio.to_string() })
}

/// Parse a date in any of the accepted input shapes
///
/// Accepts RFC 3339 instants, plain `YYYY-MM-DD` dates and display dates
/// (`MM/DD/YYYY`). Instants keep their UTC calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate, FormatError> {
    let trimmed = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, DISPLAY_DATE_FORMAT))
        .map_err(|_| FormatError::InvalidDate { input: input.to_string() })
}

/// Render a stored date string for display
pub fn display_date(input: &str) -> Result<String, FormatError> {
    parse_date(input).map(|date| date.format(DISPLAY_DATE_FORMAT).to_string())
}

/// Render an instant for display using its UTC calendar date
pub fn display_datetime(instant: &DateTime<Utc>) -> String {
    instant.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Convert a user-entered date into the canonical submission form
pub fn consume_date(input: &str) -> Result<String, FormatError> {
    let date = parse_date(input)?;
    let midnight = date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| FormatError::InvalidDate { input: input.to_string() })?
        .and_utc();
    Ok(midnight.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse a user-entered decimal with the default `$` symbol and `,` grouping
pub fn parse_decimal(input: &str) -> Result<Decimal, FormatError> {
    parse_decimal_with(input, "$", ",")
}

/// Parse a user-entered decimal such as `-$1,234.50`
///
/// Only the currency symbol, whitespace and well-placed thousands separators
/// are tolerated; anything else is rejected rather than dropped.
pub fn parse_decimal_with(input: &str, symbol: &str, separator: &str) -> Result<Decimal, FormatError> {
    let invalid = || FormatError::InvalidNumber { input: input.to_string() };

    let mut rest = input.trim();
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped.trim_start();
    }
    if !symbol.is_empty() {
        if let Some(stripped) = rest.strip_prefix(symbol) {
            rest = stripped.trim_start();
        }
    }
    if !negative {
        if let Some(stripped) = rest.strip_prefix('-') {
            negative = true;
            rest = stripped;
        }
    }

    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (rest, None),
    };
    let groups: Vec<&str> = if separator.is_empty() {
        vec![int_part]
    } else {
        int_part.split(separator).collect()
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let grouped = groups.len() > 1;
    for (i, group) in groups.iter().enumerate() {
        let well_sized = match (grouped, i) {
            (false, _) => true,
            (true, 0) => (1..=3).contains(&group.len()),
            (true, _) => group.len() == 3,
        };
        if !well_sized || !all_digits(group) {
            return Err(invalid());
        }
    }
    let digits: String = groups.concat();
    let fraction = frac_part.unwrap_or("");
    if !all_digits(fraction) || (digits.is_empty() && fraction.is_empty()) {
        return Err(invalid());
    }

    let mut canonical = String::from(if negative { "-" } else { "" });
    canonical.push_str(if digits.is_empty() { "0" } else { digits.as_str() });
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }
    Decimal::from_str(&canonical).map_err(|_| FormatError::OutOfRange { input: input.to_string() })
}

/// Turn `tickerSymbol`, `ticker_symbol` or `category` into `Ticker Symbol` / `Category`
pub fn title_case(name: &str) -> String {
    name.to_case(Case::Title)
}

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(content: &str) -> String {
    let mut escaped = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(123), "123");
        assert_eq!(format_number(-1234.5), "-1,234.5");
    }

    #[test]
    fn test_display_decimals_pads_and_rounds() {
        assert_eq!(display_decimals(dec("1.5"), 3), "1.500");
        assert_eq!(display_decimals(dec("2.0005"), 3), "2.001");
        assert_eq!(display_decimals(dec("10"), 0), "10");
    }

    #[test]
    fn test_display_currency() {
        assert_eq!(display_currency(dec("1234.5"), "$", 2, ","), "$1,234.50");
        assert_eq!(display_currency(dec("-5"), "$", 2, ","), "-$5.00");
        assert_eq!(display_currency(dec("0"), "$", 2, ","), "$0.00");
    }

    #[test]
    fn test_display_percentage() {
        assert_eq!(display_percentage(dec("0.0004"), 3).unwrap(), "0.040");
        assert_eq!(display_percentage(dec("0.015"), 3).unwrap(), "1.500");
    }

    #[test]
    fn test_display_percentage_overflow_is_an_error() {
        let huge = Decimal::MAX;
        assert_eq!(
            display_percentage(huge, 3),
            Err(FormatError::OutOfRange { input: huge.to_string() })
        );
    }

    #[test]
    fn test_display_date_accepts_plain_and_instant() {
        assert_eq!(display_date("2023-01-05").unwrap(), "01/05/2023");
        assert_eq!(display_date("2023-01-05T00:00:00.000Z").unwrap(), "01/05/2023");
        assert!(display_date("yesterday").is_err());
    }

    #[test]
    fn test_consume_date_canonical_form() {
        assert_eq!(consume_date("01/05/2023").unwrap(), "2023-01-05T00:00:00.000Z");
        assert_eq!(consume_date("2023-01-05").unwrap(), "2023-01-05T00:00:00.000Z");
        assert_eq!(
            consume_date("13/45/2023"),
            Err(FormatError::InvalidDate { input: "13/45/2023".to_string() })
        );
    }

    #[test]
    fn test_date_round_trip_keeps_calendar_date() {
        let shown = display_date("2023-01-05").unwrap();
        let submitted = consume_date(&shown).unwrap();
        assert_eq!(parse_date(&submitted).unwrap(), NaiveDate::from_ymd_opt(2023, 1, 5).unwrap());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("$1,234.50").unwrap(), dec("1234.50"));
        assert_eq!(parse_decimal(" -$5 ").unwrap(), dec("-5"));
        assert_eq!(parse_decimal("$-5").unwrap(), dec("-5"));
        assert_eq!(parse_decimal(".5").unwrap(), dec("0.5"));
        assert_eq!(parse_decimal("12.500").unwrap(), dec("12.5"));
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn test_parse_decimal_rejects_instead_of_dropping() {
        for input in ["1e3", "12abc3", "1,5", "1,23,456", "1.2.3", "--5", "$", "", "5%"] {
            assert_eq!(
                parse_decimal(input),
                Err(FormatError::InvalidNumber { input: input.to_string() }),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_decimal_with_other_conventions() {
        assert_eq!(parse_decimal_with("€1 234.5", "€", " ").unwrap(), dec("1234.5"));
        assert!(parse_decimal_with("1,234", "€", " ").is_err());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("category"), "Category");
        assert_eq!(title_case("tickerSymbol"), "Ticker Symbol");
        assert_eq!(title_case("expense_ratio"), "Expense Ratio");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"R&D\"</b>"), "&lt;b&gt;&quot;R&amp;D&quot;&lt;/b&gt;");
    }
}
