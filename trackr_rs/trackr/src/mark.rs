//! Date and race-time parsing for scraped results.
//!
//! Dates arrive as `MM-DD-YY`, `M/D/YY` or a range whose trailing six to eight
//! characters hold the final day. Marks are `[M:]SS[.ff]`.

use chrono::NaiveDate;

use crate::{TrackrError, NO_TIME};

const DATE_TOKEN_LEN: usize = 8;
const DATE_FORMAT: &str = "%m/%d/%y";

/// Reduce a raw date (possibly a range) to a zero-padded `MM/DD/YY` token, or
/// `None` when the trailing characters are not a month/day/two-digit-year date.
/// Month and day may be one or two digits.
pub fn normalize_date(raw: &str) -> Option<String> {
    let chars: Vec<char> = raw.trim_end().chars().collect();
    let start = chars.len().saturating_sub(DATE_TOKEN_LEN);
    let tail: String = chars[start..]
        .iter()
        .map(|&c| if c == '-' { '/' } else { c })
        .collect();

    let mut fields = tail.rsplit('/');
    let year = fields.next().filter(|f| is_digits(f, 2, 2))?;
    let day = fields.next().filter(|f| is_digits(f, 1, 2))?;
    let month = fields
        .next()
        .map(str::trim_start)
        .filter(|f| is_digits(f, 1, 2))?;
    Some(format!("{:0>2}/{:0>2}/{}", month, day, year))
}

fn is_digits(field: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&field.len()) && field.bytes().all(|b| b.is_ascii_digit())
}

pub fn parse_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, DATE_FORMAT).ok()
}

/// `normalize_date` followed by `parse_date`.
pub fn race_date(raw: &str) -> Option<NaiveDate> {
    normalize_date(raw).as_deref().and_then(parse_date)
}

/// Convert `[M:]SS[.ff]` to elapsed seconds.
///
/// The no-time sentinel, more than two components and anything non-numeric are
/// rejected rather than coerced.
pub fn mark_to_seconds(mark: &str) -> Result<f64, TrackrError> {
    let invalid = || TrackrError::InvalidMark(mark.to_string());
    let trimmed = mark.trim();
    if trimmed == NO_TIME {
        return Err(invalid());
    }

    let mut parts = trimmed.rsplit(':');
    let seconds_part = parts.next().ok_or_else(invalid)?;
    let minutes_part = parts.next();
    if parts.next().is_some() {
        return Err(invalid());
    }

    let seconds = parse_seconds(seconds_part).ok_or_else(invalid)?;
    let minutes = match minutes_part {
        Some(part) => parse_minutes(part).ok_or_else(invalid)?,
        None => 0,
    };
    Ok(minutes as f64 * 60.0 + seconds)
}

fn parse_seconds(part: &str) -> Option<f64> {
    let digits = part.chars().filter(|c| c.is_ascii_digit()).count();
    let dots = part.chars().filter(|&c| c == '.').count();
    if digits == 0 || dots > 1 || digits + dots != part.len() {
        return None;
    }
    part.parse::<f64>().ok()
}

fn parse_minutes(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Format elapsed seconds as `M:SS.ff`.
pub fn seconds_to_mark(total: f64) -> String {
    if !total.is_finite() {
        return NO_TIME.to_string();
    }
    let sign = if total < 0.0 { "-" } else { "" };
    // Round once on hundredths so 59.996 carries into the minute.
    let hundredths = (total.abs() * 100.0).round() as u64;
    let minutes = hundredths / 6000;
    let rem = hundredths % 6000;
    format!("{}{}:{:02}.{:02}", sign, minutes, rem / 100, rem % 100)
}

/// Axis label form of a time: `M:SS`.
pub fn short_mark(total: f64) -> String {
    let full = seconds_to_mark(total);
    match full.rfind('.') {
        Some(idx) => full[..idx].to_string(),
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_normalize_date_forms() {
        assert_eq!(normalize_date("02-01-20").as_deref(), Some("02/01/20"));
        assert_eq!(normalize_date("02/01/20").as_deref(), Some("02/01/20"));
        assert_eq!(
            normalize_date("01/31/20-02/01/20").as_deref(),
            Some("02/01/20")
        );
        assert_eq!(normalize_date("Jan 31-02-01-20 ").as_deref(), Some("02/01/20"));
    }

    #[test]
    fn test_normalize_date_single_digit_fields() {
        assert_eq!(normalize_date("2/1/20").as_deref(), Some("02/01/20"));
        assert_eq!(normalize_date("12/1/20").as_deref(), Some("12/01/20"));
        assert_eq!(normalize_date("1/31/20-2/1/20").as_deref(), Some("02/01/20"));
        assert_eq!(normalize_date("12/31/19-1-5-20").as_deref(), Some("01/05/20"));
        assert_eq!(normalize_date("Sat 12/1/20").as_deref(), Some("12/01/20"));
        assert_eq!(race_date("2/1/20"), NaiveDate::from_ymd_opt(2020, 2, 1));
    }

    #[test]
    fn test_normalize_date_rejects_other_shapes() {
        assert_eq!(normalize_date("2/1/2020"), None);
        assert_eq!(normalize_date("123/1/20"), None);
        assert_eq!(race_date("2020-02-01"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("Feb 1, 20"), None);
    }

    #[test]
    fn test_parse_date_two_digit_year() {
        assert_eq!(
            race_date("02-01-20"),
            NaiveDate::from_ymd_opt(2020, 2, 1)
        );
        assert_eq!(race_date("13/40/20"), None);
    }

    #[test]
    fn test_mark_to_seconds() {
        assert_close(mark_to_seconds("1:05.32").unwrap(), 65.32);
        assert_close(mark_to_seconds("14.20").unwrap(), 14.20);
        assert_close(mark_to_seconds("16:30.00").unwrap(), 990.0);
        assert_close(mark_to_seconds("15:45").unwrap(), 945.0);
    }

    #[test]
    fn test_mark_to_seconds_rejects_malformed() {
        for bad in ["NT", "1:02:03.4", "", ":12", "12.3.4", "DNF", "-5.0", "1e3", "14.2h"] {
            assert!(mark_to_seconds(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_seconds_to_mark() {
        assert_eq!(seconds_to_mark(65.32), "1:05.32");
        assert_eq!(seconds_to_mark(945.0), "15:45.00");
        assert_eq!(seconds_to_mark(14.2), "0:14.20");
        assert_eq!(seconds_to_mark(59.996), "1:00.00");
        assert_eq!(seconds_to_mark(f64::NAN), "NT");
    }

    #[test]
    fn test_mark_round_trip_preserves_value() {
        for mark in ["1:05.32", "14.20", "4:01.09", "29:59.99", "9.58", "2:00"] {
            let seconds = mark_to_seconds(mark).unwrap();
            let again = mark_to_seconds(&seconds_to_mark(seconds)).unwrap();
            assert_close(again, seconds);
        }
    }

    #[test]
    fn test_short_mark() {
        assert_eq!(short_mark(65.32), "1:05");
        assert_eq!(short_mark(990.0), "16:30");
    }
}
