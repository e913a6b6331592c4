//! Field decoding and range checks shared by every sentence family

use chrono::{NaiveDate, NaiveTime};
use std::fmt::Display;
use thiserror::Error;

/// Structural, range and consistency failures raised while parsing a sentence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Empty input
    #[error("empty sentence")]
    Empty,

    /// Sentence prefix does not belong to the parser it was handed to
    #[error("expected prefix {expected}, got {actual}")]
    UnexpectedPrefix {
        /// Prefix the parser handles
        expected: String,
        /// Prefix found in the sentence
        actual: String,
    },

    /// Positional sentence with the wrong number of fields
    #[error("{family}: expected {expected} fields, got {actual}")]
    FieldCount {
        /// Sentence family
        family: &'static str,
        /// Required field count
        expected: usize,
        /// Fields present
        actual: usize,
    },

    /// Tagged token without `=`
    #[error("{family}: malformed tagged field {token:?}, expected TAG=VALUE")]
    MalformedTag {
        /// Sentence family
        family: &'static str,
        /// Offending token
        token: String,
    },

    /// Tag not defined for this family
    #[error("{family}: unknown tag {tag}")]
    UnknownTag {
        /// Sentence family
        family: &'static str,
        /// Offending tag
        tag: String,
    },

    /// Tag (or a synonym of it) given twice
    #[error("{family}: duplicate tag {tag}")]
    DuplicateTag {
        /// Sentence family
        family: &'static str,
        /// Repeated tag
        tag: String,
    },

    /// Required tags absent after the whole sentence was scanned
    #[error("{family}: missing required tags {}", tags.join(", "))]
    MissingTags {
        /// Sentence family
        family: &'static str,
        /// Canonical names of the missing tags
        tags: Vec<String>,
    },

    /// Value that cannot be decoded as the field's type
    #[error("invalid {field} value {value:?}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Raw value
        value: String,
        /// What was expected
        reason: String,
    },

    /// Value outside its documented range
    #[error("{field} value {value} out of range, must be {bound}")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
        /// Human readable bound, e.g. `[0, 360)`
        bound: String,
    },

    /// Cross-field rule violated
    #[error("{field} value {value} violates rule: {rule}")]
    Inconsistent {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
        /// Rule that was broken
        rule: String,
    },

    /// Declared element count differs from the number of values
    #[error("{field} declares {declared} values but {actual} were given")]
    CountMismatch {
        /// Count field name
        field: &'static str,
        /// Declared count
        declared: usize,
        /// Values present
        actual: usize,
    },
}

/// Result alias for sentence parsing
pub type FormatResult<T> = Result<T, FormatError>;

/// Upper and lower bound of a numeric field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// `[min, max]`
    Closed(f64, f64),
    /// `[min, max)`
    HalfOpen(f64, f64),
    /// `(min, max]`
    LeftOpen(f64, f64),
    /// `[min, inf)`
    AtLeast(f64),
}

impl Bound {
    fn contains(self, v: f64) -> bool {
        match self {
            Bound::Closed(lo, hi) => v >= lo && v <= hi,
            Bound::HalfOpen(lo, hi) => v >= lo && v < hi,
            Bound::LeftOpen(lo, hi) => v > lo && v <= hi,
            Bound::AtLeast(lo) => v >= lo,
        }
    }
}

impl Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Closed(lo, hi) => write!(f, "in [{lo}, {hi}]"),
            Bound::HalfOpen(lo, hi) => write!(f, "in [{lo}, {hi})"),
            Bound::LeftOpen(lo, hi) => write!(f, "in ({lo}, {hi}]"),
            Bound::AtLeast(lo) => write!(f, ">= {lo}"),
        }
    }
}

pub const HEADING: Bound = Bound::HalfOpen(0.0, 360.0);
pub const DIRECTION: Bound = Bound::HalfOpen(0.0, 360.0);
pub const PITCH: Bound = Bound::Closed(-90.0, 90.0);
pub const ROLL: Bound = Bound::Closed(-180.0, 180.0);
pub const BATTERY: Bound = Bound::Closed(0.0, 100.0);
pub const SOUND_SPEED: Bound = Bound::Closed(1300.0, 1700.0);
pub const PRESSURE: Bound = Bound::Closed(0.0, 20000.0);
pub const TEMPERATURE: Bound = Bound::Closed(-5.0, 50.0);
pub const STD_DEV: Bound = Bound::AtLeast(0.0);
pub const VELOCITY: Bound = Bound::Closed(-10.0, 10.0);
pub const SPEED: Bound = Bound::Closed(0.0, 20.0);
pub const CORRELATION: Bound = Bound::Closed(0.0, 100.0);
pub const AMPLITUDE: Bound = Bound::Closed(0.0, 255.0);
pub const CELL_POSITION: Bound = Bound::Closed(0.0, 1000.0);

/// Check a float against its bound
pub fn check(field: &'static str, value: f64, bound: Bound) -> FormatResult<f64> {
    if value.is_finite() && bound.contains(value) {
        Ok(value)
    } else {
        Err(FormatError::OutOfRange {
            field,
            value: value.to_string(),
            bound: bound.to_string(),
        })
    }
}

/// Check an integer against an inclusive range
pub fn check_int<T>(field: &'static str, value: T, min: T, max: T) -> FormatResult<T>
where
    T: PartialOrd + Display + Copy,
{
    if value >= min && value <= max {
        Ok(value)
    } else {
        Err(FormatError::OutOfRange {
            field,
            value: value.to_string(),
            bound: format!("in [{min}, {max}]"),
        })
    }
}

fn invalid(field: &'static str, value: &str, reason: &str) -> FormatError {
    FormatError::InvalidValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Decode a float field
pub fn float(field: &'static str, raw: &str) -> FormatResult<f64> {
    let raw = raw.trim();
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(field, raw, "expected a number"))
}

/// Decode a float field and check its range
pub fn float_in(field: &'static str, raw: &str, bound: Bound) -> FormatResult<f64> {
    check(field, float(field, raw)?, bound)
}

/// Decode an unsigned integer field
pub fn uint<T: std::str::FromStr>(field: &'static str, raw: &str) -> FormatResult<T> {
    let raw = raw.trim();
    raw.parse::<T>()
        .map_err(|_| invalid(field, raw, "expected an unsigned integer"))
}

/// Decode a hexadecimal code field (error/status words)
pub fn hex_code(field: &'static str, raw: &str) -> FormatResult<u32> {
    let raw = raw.trim();
    u32::from_str_radix(raw, 16).map_err(|_| invalid(field, raw, "expected a hex code"))
}

/// Decode a non-empty text field
pub fn text(field: &'static str, raw: &str) -> FormatResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        Err(invalid(field, raw, "must not be empty"))
    } else {
        Ok(raw.to_string())
    }
}

/// Decode an `MMDDYY` date
pub fn date(field: &'static str, raw: &str) -> FormatResult<NaiveDate> {
    let raw = raw.trim();
    let digits = |r: std::ops::Range<usize>| raw.get(r).and_then(|s| s.parse::<u32>().ok());
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, raw, "expected MMDDYY"));
    }
    let (Some(month), Some(day), Some(year)) = (digits(0..2), digits(2..4), digits(4..6)) else {
        return Err(invalid(field, raw, "expected MMDDYY"));
    };
    let full_year = if year > 80 { 1900 + year } else { 2000 + year };
    NaiveDate::from_ymd_opt(full_year as i32, month, day)
        .ok_or_else(|| invalid(field, raw, "not a calendar date"))
}

/// Decode an `hhmmss` time
pub fn time(field: &'static str, raw: &str) -> FormatResult<NaiveTime> {
    let raw = raw.trim();
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, raw, "expected hhmmss"));
    }
    let part = |r: std::ops::Range<usize>| raw[r].parse::<u32>().unwrap_or(u32::MAX);
    NaiveTime::from_hms_opt(part(0..2), part(2..4), part(4..6))
        .ok_or_else(|| invalid(field, raw, "not a time of day"))
}

/// Wave parameter that may carry the instrument's "no value" sentinel
pub fn wave_value(field: &'static str, raw: &str, bound: Bound) -> FormatResult<Option<f64>> {
    let value = float(field, raw)?;
    if is_sentinel(value) {
        return Ok(None);
    }
    check(field, value, bound).map(Some)
}

fn is_sentinel(value: f64) -> bool {
    [-9.0, -99.0, -999.0, -9999.0].contains(&value)
}

/// Serialized form of a missing wave parameter
pub const SENTINEL: &str = "-9.00";

pub fn fmt_date(d: NaiveDate) -> String {
    d.format("%m%d%y").to_string()
}

pub fn fmt_time(t: NaiveTime) -> String {
    t.format("%H%M%S").to_string()
}

pub fn fmt_hex(code: u32) -> String {
    format!("{code:08X}")
}

pub fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| SENTINEL.to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_rejects_garbage() {
        assert!(float("heading", "12.5").is_ok());
        assert!(matches!(
            float("heading", "abc"),
            Err(FormatError::InvalidValue { field: "heading", .. })
        ));
        assert!(float("heading", "NaN").is_err());
        assert!(float("heading", "").is_err());
    }

    #[test]
    fn test_out_of_range_names_field_value_and_bound() {
        let err = float_in("heading", "360", HEADING).unwrap_err();
        assert_eq!(
            err.to_string(),
            "heading value 360 out of range, must be in [0, 360)"
        );
        assert!(float_in("heading", "359.9", HEADING).is_ok());
        assert!(float_in("std", "-0.1", STD_DEV).is_err());
    }

    #[test]
    fn test_check_int() {
        assert_eq!(check_int("beams", 4u8, 1, 4), Ok(4));
        let err = check_int("beams", 5u8, 1, 4).unwrap_err();
        assert!(err.to_string().contains("in [1, 4]"));
    }

    #[test]
    fn test_date_and_time() {
        let d = date("date", "083013").unwrap();
        assert_eq!(fmt_date(d), "083013");
        assert_eq!(d, NaiveDate::from_ymd_opt(2013, 8, 30).unwrap());
        assert_eq!(date("date", "123199").unwrap().format("%Y").to_string(), "1999");
        assert!(date("date", "133013").is_err());
        assert!(date("date", "08301").is_err());
        assert!(date("date", "+83013").is_err());

        let t = time("time", "132455").unwrap();
        assert_eq!(fmt_time(t), "132455");
        assert!(time("time", "246000").is_err());
    }

    #[test]
    fn test_hex_code() {
        assert_eq!(hex_code("status", "2A480000"), Ok(0x2A48_0000));
        assert_eq!(hex_code("status", "0"), Ok(0));
        assert!(hex_code("status", "XYZ").is_err());
        assert_eq!(fmt_hex(0x2A48_0000), "2A480000");
    }

    #[test]
    fn test_wave_value_sentinels() {
        let b = Bound::Closed(0.0, 50.0);
        assert_eq!(wave_value("hm0", "-9.00", b), Ok(None));
        assert_eq!(wave_value("hm0", "-999", b), Ok(None));
        assert_eq!(wave_value("hm0", "1.25", b), Ok(Some(1.25)));
        assert!(wave_value("hm0", "-1.0", b).is_err());
        assert_eq!(fmt_opt(None), SENTINEL);
    }
}
