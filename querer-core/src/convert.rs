//! String to value conversion.
//!
//! Conversion is driven by the declared type of the field being populated,
//! never by the content of the string: `"1"` is `true` for a `bool` field,
//! `1` for an integer field and `"1"` for a `String` field.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::{QueryError, QueryErrorKind};
#[cfg(feature = "tracing")]
use crate::debug;

/// Layout of a calendar date, `YYYY-MM-DD`.
pub const DATE_LAYOUT: &str = "%Y-%m-%d";

/// Layout of a date and time of day, `YYYY-MM-DDTHH:MM:SS`.
pub const DATE_TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Name under which [`NaiveDateTime`] is registered in the named type table.
pub const NAIVE_DATE_TIME: &str = "chrono::NaiveDateTime";

/// Primitive type category of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `bool`
    Bool,
    /// Signed integers of any width
    Int,
    /// Unsigned integers of any width
    Uint,
    /// Floating point numbers
    Float,
    /// `String`
    String,
}

impl PrimitiveKind {
    /// Human readable name used in error messages
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Uint => "uint",
            PrimitiveKind::Float => "float",
            PrimitiveKind::String => "string",
        }
    }
}

/// The declared type of a field, as far as conversion is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    /// A primitive category
    Primitive(PrimitiveKind),
    /// A structured type, looked up by its path
    Named(&'static str),
}

impl DeclaredType {
    /// Human readable name used in error messages
    pub const fn name(self) -> &'static str {
        match self {
            DeclaredType::Primitive(kind) => kind.name(),
            DeclaredType::Named(name) => name,
        }
    }
}

/// The result of converting a raw string.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// A boolean
    Bool(bool),
    /// A signed integer, before narrowing to the field width
    Int(i64),
    /// An unsigned integer, before narrowing to the field width
    Uint(u64),
    /// A 64-bit float
    Float(f64),
    /// A string, unchanged
    String(String),
    /// A date, or a date and time of day, without timezone
    DateTime(NaiveDateTime),
}

type Parser = fn(&str) -> Result<TypedValue, QueryError>;

fn primitive_parser(kind: PrimitiveKind) -> Parser {
    match kind {
        PrimitiveKind::Bool => parse_bool,
        PrimitiveKind::Int => parse_int,
        PrimitiveKind::Uint => parse_uint,
        PrimitiveKind::Float => parse_float,
        PrimitiveKind::String => parse_string,
    }
}

fn named_parser(name: &str) -> Option<Parser> {
    match name {
        NAIVE_DATE_TIME => Some(parse_date_time),
        _ => None,
    }
}

/// Convert `raw` into a value of the declared type.
///
/// Types outside the primitive and named tables fail with
/// [`QueryErrorKind::UnsupportedType`].
pub fn convert(raw: &str, ty: DeclaredType) -> Result<TypedValue, QueryError> {
    let parser = match ty {
        DeclaredType::Primitive(kind) => primitive_parser(kind),
        DeclaredType::Named(name) => named_parser(name).ok_or_else(|| {
            QueryError::new(QueryErrorKind::UnsupportedType { type_name: name })
        })?,
    };

    parser(raw).inspect_err(|_err| {
        debug!(raw, ty = ty.name(), err = %_err, "conversion failed");
    })
}

fn parse_bool(raw: &str) -> Result<TypedValue, QueryError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(TypedValue::Bool(true)),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(TypedValue::Bool(false)),
        _ => Err(QueryError::invalid_value(raw, "bool", "invalid syntax")),
    }
}

fn parse_int(raw: &str) -> Result<TypedValue, QueryError> {
    raw.parse::<i64>()
        .map(TypedValue::Int)
        .map_err(|err| QueryError::invalid_value(raw, "int", err))
}

fn parse_uint(raw: &str) -> Result<TypedValue, QueryError> {
    // `u64::from_str` tolerates a leading `+`; unsigned input is digits only
    if raw.starts_with('+') {
        return Err(QueryError::invalid_value(raw, "uint", "invalid syntax"));
    }
    raw.parse::<u64>()
        .map(TypedValue::Uint)
        .map_err(|err| QueryError::invalid_value(raw, "uint", err))
}

fn parse_float(raw: &str) -> Result<TypedValue, QueryError> {
    let f = raw
        .parse::<f64>()
        .map_err(|err| QueryError::invalid_value(raw, "float", err))?;
    // overflowing literals parse as infinity; only spelled-out ones may
    if !f.is_finite() && !names_non_finite(raw) {
        return Err(QueryError::invalid_value(raw, "float", "value out of range"));
    }
    Ok(TypedValue::Float(f))
}

fn names_non_finite(raw: &str) -> bool {
    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    ["inf", "infinity", "nan"]
        .iter()
        .any(|name| unsigned.eq_ignore_ascii_case(name))
}

fn parse_string(raw: &str) -> Result<TypedValue, QueryError> {
    Ok(TypedValue::String(raw.to_owned()))
}

/// `0` marks a position that must hold an ASCII digit.
const DATE_SHAPE: &[u8; 10] = b"0000-00-00";
const DATE_TIME_SHAPE: &[u8; 19] = b"0000-00-00T00:00:00";

fn matches_shape(raw: &[u8], shape: &[u8]) -> bool {
    raw.len() == shape.len()
        && raw.iter().zip(shape).all(|(&b, &s)| match s {
            b'0' => b.is_ascii_digit(),
            _ => b == s,
        })
}

fn parse_date_time(raw: &str) -> Result<TypedValue, QueryError> {
    let invalid = |reason: String| {
        QueryError::new(QueryErrorKind::InvalidDateValue {
            raw: raw.to_owned(),
            reason,
        })
    };

    let (shape, layout_name) = match raw.len() {
        10 => (&DATE_SHAPE[..], "YYYY-MM-DD"),
        19 => (&DATE_TIME_SHAPE[..], "YYYY-MM-DDTHH:MM:SS"),
        _ => {
            return Err(QueryError::new(QueryErrorKind::InvalidDateLength {
                raw: raw.to_owned(),
            }));
        }
    };

    // chrono skips padding and takes signed years, so the layout is checked first
    if !matches_shape(raw.as_bytes(), shape) {
        return Err(invalid(format!("does not match layout {layout_name}")));
    }

    let parsed = if raw.len() == 10 {
        NaiveDate::parse_from_str(raw, DATE_LAYOUT).map(|date| date.and_time(NaiveTime::MIN))
    } else {
        NaiveDateTime::parse_from_str(raw, DATE_TIME_LAYOUT)
    };
    let parsed = parsed.map_err(|err| invalid(err.to_string()))?;

    // a leap second is stored as second 59 with an overflowing nanosecond
    if parsed.nanosecond() >= 1_000_000_000 {
        return Err(invalid("second out of range".to_owned()));
    }

    Ok(TypedValue::DateTime(parsed))
}
