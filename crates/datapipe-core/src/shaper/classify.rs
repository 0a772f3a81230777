//! Value classification
//!
//! Maps a JSON value onto a [`PropertyType`]. Strings get a second look:
//! anything that starts with a digit and parses as one of the supported
//! timestamp layouts is a `date`.

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

use crate::model::PropertyType;

/// `2006-01-02T15:04:05`, before fraction and zone
const RFC3339_LAYOUT: &str = "dddd-dd-ddTdd:dd:dd";

/// `02 Jan 06 15:04 `, before the zone
const RFC822_LAYOUT: &str = "dd aaa dd dd:dd ";

const RFC3339_LOCAL: &str = "%Y-%m-%dT%H:%M:%S%.f";
const RFC3339_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
const RFC822_LOCAL: &str = "%d %b %y %H:%M";
const RFC822_NUMERIC_ZONE: &str = "%d %b %y %H:%M %z";

pub fn classify(value: &Value) -> PropertyType {
    match value {
        Value::String(s) if is_date(s) => PropertyType::Date,
        Value::String(_) => PropertyType::String,
        Value::Number(_) => PropertyType::Number,
        Value::Bool(_) => PropertyType::Bool,
        Value::Object(_) => PropertyType::Object,
        Value::Null | Value::Array(_) => PropertyType::Unknown,
    }
}

/// True for non-empty strings starting with a digit that match one of the
/// layouts `2006-01-02T15:04:05Z07:00` (optionally with fractional seconds),
/// `02 Jan 06 15:04 MST` or `02 Jan 06 15:04 -0700`
pub fn is_date(value: &str) -> bool {
    let starts_with_digit = value.chars().next().is_some_and(|c| c.is_ascii_digit());
    if !starts_with_digit {
        return false;
    }
    is_rfc3339(value) || is_rfc822(value)
}

/// `d` is an ASCII digit, `a` an ASCII letter, anything else is literal
fn matches_layout(value: &[u8], layout: &str) -> bool {
    value.len() == layout.len()
        && value.iter().zip(layout.bytes()).all(|(&c, l)| match l {
            b'd' => c.is_ascii_digit(),
            b'a' => c.is_ascii_alphabetic(),
            _ => c == l,
        })
}

fn is_rfc3339(value: &str) -> bool {
    let bytes = value.as_bytes();
    let head = RFC3339_LAYOUT.len();
    if bytes.len() <= head || !matches_layout(&bytes[..head], RFC3339_LAYOUT) {
        return false;
    }

    let mut rest = &bytes[head..];
    if let Some(fraction) = rest.strip_prefix(b".") {
        let digits = fraction.iter().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return false;
        }
        rest = &fraction[digits..];
    }

    match rest {
        b"Z" => NaiveDateTime::parse_from_str(&value[..value.len() - 1], RFC3339_LOCAL).is_ok(),
        [b'+' | b'-', zone @ ..] if matches_layout(zone, "dd:dd") => {
            DateTime::parse_from_str(value, RFC3339_OFFSET).is_ok()
        }
        _ => false,
    }
}

fn is_rfc822(value: &str) -> bool {
    let bytes = value.as_bytes();
    let head = RFC822_LAYOUT.len();
    if bytes.len() <= head || !matches_layout(&bytes[..head], RFC822_LAYOUT) {
        return false;
    }

    match &bytes[head..] {
        [b'+' | b'-', zone @ ..] if matches_layout(zone, "dddd") => {
            DateTime::parse_from_str(value, RFC822_NUMERIC_ZONE).is_ok()
        }
        zone if is_zone_abbreviation(zone) => {
            NaiveDateTime::parse_from_str(&value[..head - 1], RFC822_LOCAL).is_ok()
        }
        _ => false,
    }
}

/// `MST`, `UTC`, `CEST` and friends: three upper-case letters, or four to
/// five ending in `T`
fn is_zone_abbreviation(zone: &[u8]) -> bool {
    if !zone.iter().all(u8::is_ascii_uppercase) {
        return false;
    }
    match zone.len() {
        3 => true,
        4 | 5 => zone.last() == Some(&b'T'),
        _ => false,
    }
}
