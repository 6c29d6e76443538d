//! Permissive string-to-value conversions for individual fields.
//!
//! A bad value never fails a parse. Numbers that won't parse are `NaN`
//! (or `None` for integers), dates that won't parse are `None`.
//! Numbers parse the forgiving way the .skiz format has always been read:
//! leading whitespace is skipped, and the longest numeric prefix wins,
//! so `"12.5 km/h"` is `12.5`.

use std::num::IntErrorKind;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Largest distance from the epoch, in milliseconds, a timestamp may have.
const MAX_TIMESTAMP_MILLIS: f64 = 8.64e15;

/// Date-time layouts with an explicit offset, tried in order
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f %z",
    "%Y/%m/%d %H:%M:%S%.f %z",
];

/// Date-time layouts without an offset, read as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Parses the longest decimal prefix of `field` as a float.
///
/// Missing fields and fields with no numeric prefix are `NaN`.
pub fn float(field: Option<&str>) -> f64 {
    field
        .and_then(|f| {
            let f = f.trim_start();
            f[..float_prefix_len(f)].parse().ok()
        })
        .unwrap_or(f64::NAN)
}

/// Parses the longest base-10 integer prefix of `field`.
///
/// Values too large for an `i64` saturate to `i64::MAX` (or `i64::MIN`).
pub fn integer(field: Option<&str>) -> Option<i64> {
    let field = field?.trim_start();
    let bytes = field.as_bytes();
    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = count_digits(&bytes[sign..]);
    if digits == 0 {
        return None;
    }
    match field[..sign + digits].parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// `"true"` is true, and everything else (including nothing) is false.
pub fn boolean(field: Option<&str>) -> bool {
    field.map(str::trim) == Some("true")
}

/// Reads a field holding seconds since the Unix epoch
/// (possibly fractional) as a UTC timestamp with millisecond precision.
pub fn epoch_seconds(field: Option<&str>) -> Option<DateTime<Utc>> {
    let millis = (float(field) * 1000.0).trunc();
    if !millis.is_finite() || millis.abs() > MAX_TIMESTAMP_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Reads a field holding a written-out date, like
/// `2021-01-15T09:12:34.000Z` or `2021-01-15 09:12:34 +0100`.
///
/// Times without an offset, and bare dates, are taken to be UTC.
pub fn date(field: Option<&str>) -> Option<DateTime<Utc>> {
    let field = field?.trim();
    if field.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(field) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(field, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    // Trailing "Z" for formats chrono's RFC 3339 parser won't take,
    // like "2021-01-15 09:12:34Z".
    let naive_field = field.strip_suffix('Z').unwrap_or(field);
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive_field, format) {
            return Some(dt.and_utc());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(field, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc2822(field)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Length of the longest prefix of `s` that reads as a decimal number
/// (or `Infinity`), or zero if there isn't one.
fn float_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut at = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    if s[at..].starts_with("Infinity") {
        return at + "Infinity".len();
    }

    let integral = count_digits(&bytes[at..]);
    at += integral;
    let mut fractional = 0;
    if bytes.get(at) == Some(&b'.') {
        fractional = count_digits(&bytes[at + 1..]);
        if integral > 0 || fractional > 0 {
            at += 1 + fractional;
        }
    }
    if integral == 0 && fractional == 0 {
        return 0;
    }

    // An exponent only counts if it has digits.
    if matches!(bytes.get(at), Some(b'e' | b'E')) {
        let mut exp_at = at + 1;
        if matches!(bytes.get(exp_at), Some(b'+' | b'-')) {
            exp_at += 1;
        }
        let exp_digits = count_digits(&bytes[exp_at.min(bytes.len())..]);
        if exp_digits > 0 {
            at = exp_at + exp_digits;
        }
    }
    at
}
