//! Calendar date parsing and validation
//!
//! Dates arrive from callers as free-form strings. Parsing accepts the
//! canonical `YYYY-MM-DD` layout (month and day may drop their leading zero,
//! so `2024-6-1` is the same day as `2024-06-01`) and the slash-separated
//! `YYYY/MM/DD` variant. Anything that does not name a real calendar day is
//! rejected, as is any day outside [`min_supported_date`]..=[`max_supported_date`].

use chrono::NaiveDate;

use crate::{CoverwatchError, Result};

/// Layouts tried in order when parsing a date string
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Canonical rendering used in responses and log messages
pub const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%d";

/// Earliest date accepted by [`parse_date`] (1900-01-01)
pub fn min_supported_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Latest date accepted by [`parse_date`] (2100-12-31)
pub fn max_supported_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2100, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Parse a caller-supplied date.
///
/// `None`, empty and whitespace-only input yield [`CoverwatchError::DateRequired`];
/// unparseable input and impossible days (`2024-02-30`) yield
/// [`CoverwatchError::InvalidDateFormat`]; real days outside the supported
/// range yield [`CoverwatchError::DateOutOfRange`].
pub fn parse_date(input: Option<&str>) -> Result<NaiveDate> {
    let raw = match input.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(CoverwatchError::DateRequired),
    };

    if !has_date_shape(raw) {
        return Err(CoverwatchError::InvalidDateFormat);
    }

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or(CoverwatchError::InvalidDateFormat)?;

    check_supported_range(date)?;
    Ok(date)
}

/// Four-digit year, then one- or two-digit month and day, all separated by
/// the same `-` or `/`. chrono alone would also take signs and inner spaces.
fn has_date_shape(raw: &str) -> bool {
    let Some(sep) = raw.chars().find(|c| !c.is_ascii_digit()) else {
        return false;
    };
    if sep != '-' && sep != '/' {
        return false;
    }

    let parts: Vec<&str> = raw.split(sep).collect();
    match parts.as_slice() {
        [year, month, day] => {
            year.len() == 4
                && (1..=2).contains(&month.len())
                && (1..=2).contains(&day.len())
                && parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit()))
        }
        _ => false,
    }
}

/// Reject dates outside the supported range
pub fn check_supported_range(date: NaiveDate) -> Result<()> {
    let min = min_supported_date();
    let max = max_supported_date();
    if date < min || date > max {
        return Err(CoverwatchError::DateOutOfRange { min, max });
    }
    Ok(())
}

/// Format a date the way responses and log messages expect it
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_or_blank_input_is_required() {
        for input in [None, Some(""), Some("   "), Some("\t\n")] {
            assert!(
                matches!(parse_date(input), Err(CoverwatchError::DateRequired)),
                "input {:?} should be DateRequired",
                input
            );
        }
    }

    #[test]
    fn malformed_input_is_invalid_format() {
        for input in [
            "invalid-date",
            "2024-13-01",
            "2024-02-30",
            "32/12/2024",
            "2024/12/32",
            "abcd-ef-gh",
            "2024-06-01T10:00:00",
        ] {
            assert!(
                matches!(parse_date(Some(input)), Err(CoverwatchError::InvalidDateFormat)),
                "input {:?} should be InvalidDateFormat",
                input
            );
        }
    }

    #[test]
    fn out_of_range_is_distinct_from_format_errors() {
        for input in ["1899-12-31", "2101-01-01"] {
            assert!(
                matches!(
                    parse_date(Some(input)),
                    Err(CoverwatchError::DateOutOfRange { .. })
                ),
                "input {:?} should be DateOutOfRange",
                input
            );
        }
    }

    #[test]
    fn signs_spaces_and_mixed_separators_are_invalid_format() {
        for input in [
            "+2024-06-01",
            "-2024-06-01",
            "2024-06- 01",
            "2024 -06-01",
            "2024-+6-01",
            "2024-06/01",
            "02024-06-01",
            "2024-006-01",
            "24-06-01",
            "2024-06-01-",
            "20240601",
        ] {
            assert!(
                matches!(parse_date(Some(input)), Err(CoverwatchError::InvalidDateFormat)),
                "input {:?} should be InvalidDateFormat",
                input
            );
        }
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert_eq!(parse_date(Some("1900-01-01")).unwrap(), ymd(1900, 1, 1));
        assert_eq!(parse_date(Some("2100-12-31")).unwrap(), ymd(2100, 12, 31));
    }

    #[test]
    fn unpadded_month_and_day_are_the_same_date() {
        let expected = ymd(2024, 6, 1);
        for input in ["2024-06-01", "2024-6-1", "2024-06-1", "2024-6-01", " 2024-06-01 "] {
            assert_eq!(parse_date(Some(input)).unwrap(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn leap_day_only_in_leap_years() {
        assert_eq!(parse_date(Some("2024-02-29")).unwrap(), ymd(2024, 2, 29));
        assert!(matches!(
            parse_date(Some("2023-02-29")),
            Err(CoverwatchError::InvalidDateFormat)
        ));
    }

    #[test]
    fn slash_layout_is_accepted() {
        assert_eq!(parse_date(Some("2024/12/31")).unwrap(), ymd(2024, 12, 31));
    }

    #[test]
    fn format_is_zero_padded() {
        assert_eq!(format_date(ymd(2024, 6, 1)), "2024-06-01");
    }
}
