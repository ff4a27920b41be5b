// crates/geodata-core/src/core/value.rs
// ============================================================================
// Module: Field Values
// Description: Normalized native-typed field values and JSON coercion.
// Purpose: Convert untrusted JSON values into the fixed data-type enumeration.
// Dependencies: crate::core::dataset, bigdecimal, time, serde_json
// ============================================================================

//! ## Overview
//! Inbound payload values are loosely typed JSON. Each declared [`DataType`]
//! has exactly one lossless coercion rule, dispatched over the type
//! enumeration. A value that cannot be represented without loss in the
//! declared native type is rejected; the field validator reports that as a
//! type mismatch. Coercion is pure and performs no I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use bigdecimal::BigDecimal;
use regex_lite::Regex;
use serde_json::Value;
use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::Time;
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::core::dataset::DataType;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// ISO calendar date format.
const DATE_ISO: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
/// Slash-separated calendar date format.
const DATE_SLASH: &[FormatItem<'static>] = format_description!("[year]/[month]/[day]");
/// Compact calendar date format.
const DATE_COMPACT: &[FormatItem<'static>] = format_description!("[year][month][day]");
/// Time of day with seconds.
const TIME_HMS: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
/// Time of day without seconds.
const TIME_HM: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
/// Timestamp with a space separator.
const TIMESTAMP_SPACE: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
/// Timestamp with a `T` separator.
const TIMESTAMP_T: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// UUID string form, hyphenated or as 32 contiguous hex digits.
static UUID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        "^([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}|[0-9a-fA-F]{32})$",
    )
    .ok()
});

// ============================================================================
// SECTION: Field Value
// ============================================================================

/// A field value normalized to its declared native type.
///
/// # Invariants
/// - The variant always matches the field's declared [`DataType`]; `Null` is
///   the only variant shared across types.
/// - Values round-trip to JSON without loss via [`FieldValue::to_json`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// SQL NULL.
    Null,
    /// 16-bit integer.
    Smallint(i16),
    /// 32-bit integer.
    Integer(i32),
    /// 64-bit integer.
    Bigint(i64),
    /// Boolean.
    Boolean(bool),
    /// Arbitrary-precision decimal.
    Numeric(BigDecimal),
    /// 64-bit floating point (also used for `real` columns).
    Double(f64),
    /// Character data.
    Text(String),
    /// Calendar date.
    Date(Date),
    /// Time of day.
    Time(Time),
    /// Date and time without zone offset.
    Timestamp(PrimitiveDateTime),
    /// Date and time with zone offset.
    TimestampTz(OffsetDateTime),
    /// JSON document.
    Json(Value),
    /// UUID in canonical lowercase hyphenated form.
    Uuid(String),
    /// Attachment file reference.
    FileRef(String),
}

impl FieldValue {
    /// Returns whether the value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as a decimal for bounds and precision checks.
    ///
    /// Non-numeric values return `None`.
    #[must_use]
    pub fn as_decimal(&self) -> Option<BigDecimal> {
        match self {
            Self::Smallint(value) => Some(BigDecimal::from(i64::from(*value))),
            Self::Integer(value) => Some(BigDecimal::from(i64::from(*value))),
            Self::Bigint(value) => Some(BigDecimal::from(*value)),
            Self::Numeric(value) => Some(value.clone()),
            Self::Double(value) => BigDecimal::from_str(&format_float(*value)).ok(),
            _ => None,
        }
    }

    /// Returns the canonical string form used for length, pattern, and
    /// enumerated-value checks.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Smallint(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Bigint(value) => value.to_string(),
            Self::Boolean(value) => value.to_string(),
            Self::Numeric(value) => value.normalized().to_string(),
            Self::Double(value) => format_float(*value),
            Self::Text(value) | Self::Uuid(value) | Self::FileRef(value) => value.clone(),
            Self::Date(value) => {
                value.format(DATE_ISO).unwrap_or_default()
            }
            Self::Time(value) => value.format(TIME_HMS).unwrap_or_default(),
            Self::Timestamp(value) => value.format(TIMESTAMP_SPACE).unwrap_or_default(),
            Self::TimestampTz(value) => value.format(&Rfc3339).unwrap_or_default(),
            Self::Json(value) => value.to_string(),
        }
    }

    /// Converts the value back into JSON for store writes and responses.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Smallint(value) => Value::from(*value),
            Self::Integer(value) => Value::from(*value),
            Self::Bigint(value) => Value::from(*value),
            Self::Boolean(value) => Value::from(*value),
            Self::Double(value) => Value::from(*value),
            Self::Numeric(value) => {
                let rendered = value.normalized().to_string();
                serde_json::Number::from_str(&rendered)
                    .map_or_else(|_| Value::String(rendered), Value::Number)
            }
            Self::Json(value) => value.clone(),
            _ => Value::String(self.canonical_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Coerces a raw JSON value into the declared native type.
///
/// Returns `None` when the value cannot be represented losslessly, which the
/// field validator reports as a type mismatch. JSON `null` coerces to
/// [`FieldValue::Null`] for every type; null-allowance is a constraint
/// concern, not a type concern.
#[must_use]
pub fn coerce_value(data_type: DataType, raw: &Value) -> Option<FieldValue> {
    if raw.is_null() {
        return Some(FieldValue::Null);
    }
    match data_type {
        DataType::Smallint => {
            coerce_integer(raw).and_then(|v| i16::try_from(v).ok()).map(FieldValue::Smallint)
        }
        DataType::Integer => {
            coerce_integer(raw).and_then(|v| i32::try_from(v).ok()).map(FieldValue::Integer)
        }
        DataType::Bigint => coerce_integer(raw).map(FieldValue::Bigint),
        DataType::Boolean => coerce_boolean(raw).map(FieldValue::Boolean),
        DataType::Numeric => coerce_decimal(raw).map(FieldValue::Numeric),
        DataType::Real | DataType::DoublePrecision => coerce_float(raw).map(FieldValue::Double),
        DataType::Character | DataType::CharacterVarying | DataType::Text => {
            coerce_text(raw).map(FieldValue::Text)
        }
        DataType::Date => coerce_date(raw).map(FieldValue::Date),
        DataType::Time => coerce_time(raw).map(FieldValue::Time),
        DataType::Timestamp => coerce_timestamp(raw).map(FieldValue::Timestamp),
        DataType::TimestampTz => coerce_timestamp_tz(raw).map(FieldValue::TimestampTz),
        DataType::Json | DataType::Jsonb => Some(FieldValue::Json(raw.clone())),
        DataType::Uuid => coerce_uuid(raw).map(FieldValue::Uuid),
        DataType::File => raw.as_str().map(|s| FieldValue::FileRef(s.to_string())),
    }
}

/// Coerces a JSON number or numeric string into an `i64` without loss.
fn coerce_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Coerces a JSON bool or recognized boolean string.
///
/// Numbers are rejected: a JSON `1` is not a boolean, and the store would
/// reject the column assignment anyway.
fn coerce_boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("true") || text == "1" {
                Some(true)
            } else if text.eq_ignore_ascii_case("false") || text == "0" {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Coerces a JSON number or numeric string into a decimal.
fn coerce_decimal(raw: &Value) -> Option<BigDecimal> {
    match raw {
        Value::Number(number) => BigDecimal::from_str(&number.to_string()).ok(),
        Value::String(text) => BigDecimal::from_str(text.trim()).ok(),
        _ => None,
    }
}

/// Coerces a JSON number or numeric string into a finite float.
fn coerce_float(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Coerces scalar JSON values into character data.
///
/// Numbers and booleans stringify, matching the permissive casts of
/// relational character columns; structured values are rejected.
fn coerce_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerces a calendar date from its recognized string forms.
fn coerce_date(raw: &Value) -> Option<Date> {
    let text = raw.as_str()?.trim();
    Date::parse(text, DATE_ISO)
        .or_else(|_| Date::parse(text, DATE_SLASH))
        .or_else(|_| Date::parse(text, DATE_COMPACT))
        .ok()
}

/// Coerces a time of day from its recognized string forms.
fn coerce_time(raw: &Value) -> Option<Time> {
    let text = raw.as_str()?.trim();
    Time::parse(text, TIME_HMS).or_else(|_| Time::parse(text, TIME_HM)).ok()
}

/// Coerces a zone-less timestamp; a date-only value means midnight.
fn coerce_timestamp(raw: &Value) -> Option<PrimitiveDateTime> {
    let text = raw.as_str()?.trim();
    PrimitiveDateTime::parse(text, TIMESTAMP_SPACE)
        .or_else(|_| PrimitiveDateTime::parse(text, TIMESTAMP_T))
        .ok()
        .or_else(|| coerce_date(raw).map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT)))
}

/// Coerces a zoned timestamp; zone-less forms are read as UTC.
fn coerce_timestamp_tz(raw: &Value) -> Option<OffsetDateTime> {
    let text = raw.as_str()?.trim();
    if let Ok(value) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(value);
    }
    coerce_timestamp(raw).map(PrimitiveDateTime::assume_utc)
}

/// Coerces a UUID string into canonical lowercase hyphenated form.
fn coerce_uuid(raw: &Value) -> Option<String> {
    let text = raw.as_str()?.trim();
    let pattern = UUID_PATTERN.as_ref()?;
    if !pattern.is_match(text) {
        return None;
    }
    let hex: String = text.chars().filter(|c| *c != '-').collect::<String>().to_lowercase();
    Some(format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32]))
}

/// Renders a float without scientific notation for canonical strings.
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Fractional part is zero and magnitude is bounded above."
        )]
        let integral = value as i64;
        integral.to_string()
    } else {
        value.to_string()
    }
}
