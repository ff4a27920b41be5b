// crates/geodata-core/src/runtime/field.rs
// ============================================================================
// Module: Field Validator
// Description: Per-field constraint validation against declared metadata.
// Purpose: Convert one raw payload value into a validated, normalized write.
// Dependencies: crate::core, bigdecimal, regex-lite
// ============================================================================

//! ## Overview
//! The field validator is a pure function from (field definition, raw value,
//! context) to a validation outcome. Rules apply in a fixed order and the
//! first failing rule wins for that field; fields validate independently so
//! a record's report can enumerate every problem at once.
//!
//! Rule order: required, type coercion, length, pattern, numeric bounds and
//! precision, enumerated values, read-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;
use bigdecimal::Zero;
use regex_lite::Regex;
use serde_json::Number;
use serde_json::Value;

use crate::core::ConstraintViolation;
use crate::core::DataType;
use crate::core::FieldDef;
use crate::core::FieldValue;
use crate::core::Operation;
use crate::core::coerce_value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Epsilon for step-granularity remainders.
const STEP_EPSILON: &str = "0.000000001";

// ============================================================================
// SECTION: Context
// ============================================================================

/// Per-request context for one field validation.
///
/// # Invariants
/// - `stored` is the current stored value, present only on update.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    /// Requested operation.
    pub operation: Operation,
    /// Stored raw value of this field, for read-only comparison.
    pub stored: Option<&'a Value>,
    /// Whether this field is the dataset's primary key.
    pub is_primary_key: bool,
    /// Whether the store generates primary keys on insert.
    pub server_generated_key: bool,
}

/// Outcome of one field validation.
///
/// # Invariants
/// - `Skip` means the field produces no column write (absent optional value
///   or an unchanged read-only field); `Write` carries the normalized value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// No column write for this field.
    Skip,
    /// Write the normalized value.
    Write(FieldValue),
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates one raw payload value against its field definition.
///
/// `raw` is `None` when the property is absent from the payload, which is
/// distinct from an explicit JSON null.
///
/// # Errors
///
/// Returns the first violated constraint in rule order.
pub fn validate_field(
    field: &FieldDef,
    raw: Option<&Value>,
    ctx: &FieldContext<'_>,
) -> Result<FieldOutcome, ConstraintViolation> {
    let constraints = &field.constraints;

    // Rule 1: required presence. Blank strings count as missing. The primary
    // key is exempt on create when the store generates keys.
    if is_absent(raw) {
        let key_exempt =
            ctx.is_primary_key && ctx.operation == Operation::Create && ctx.server_generated_key;
        if constraints.required && !key_exempt {
            return Err(ConstraintViolation::MissingRequired);
        }
        if raw.is_none() {
            return Ok(FieldOutcome::Skip);
        }
    }
    let Some(raw) = raw else {
        return Ok(FieldOutcome::Skip);
    };

    // Rule 2: lossless type coercion.
    let value = coerce_value(field.data_type, raw).ok_or_else(|| {
        ConstraintViolation::TypeMismatch {
            expected: type_label(field.data_type).to_string(),
        }
    })?;

    if !value.is_null() {
        let rendered = value.canonical_string();

        // Rule 3: maximum length of the string form.
        if let Some(maxlength) = constraints.maxlength
            && rendered.chars().count() > maxlength as usize
        {
            return Err(ConstraintViolation::TooLong {
                maxlength,
            });
        }

        // Rule 4: full-match pattern.
        if let Some(pattern) = &constraints.pattern
            && !matches_fully(pattern, &rendered)
        {
            return Err(ConstraintViolation::PatternMismatch);
        }

        // Rule 5: numeric bounds, precision/scale, and step.
        if let Some(decimal) = value.as_decimal() {
            check_bounds(constraints.min.as_ref(), constraints.max.as_ref(), &decimal)?;
            if field.data_type == DataType::Numeric {
                check_precision(
                    constraints.numeric_precision,
                    constraints.numeric_scale,
                    &decimal,
                )?;
            }
            check_step(constraints.step.as_ref(), constraints.min.as_ref(), &decimal)?;
        }

        // Rule 6: enumerated values, compared by canonical string form.
        if let Some(values) = &constraints.values
            && !values.is_empty()
            && !values.iter().any(|allowed| allowed_value_string(&allowed.value) == rendered)
        {
            return Err(ConstraintViolation::NotAnAllowedValue);
        }
    }

    // Rule 7: read-only fields. A differing non-null value on update is a
    // violation; an idempotent resubmission of the stored value is accepted.
    // Read-only fields never produce a column write.
    if constraints.read_only {
        if ctx.operation == Operation::Update
            && !value.is_null()
            && !matches_stored(field, &value, ctx.stored)
        {
            return Err(ConstraintViolation::ReadOnlyViolation);
        }
        return Ok(FieldOutcome::Skip);
    }

    Ok(FieldOutcome::Write(value))
}

// ============================================================================
// SECTION: Rule Helpers
// ============================================================================

/// Returns whether a raw value counts as absent for the required rule.
fn is_absent(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

/// Returns whether the string fully matches the pattern.
///
/// An uncompilable pattern fails closed.
fn matches_fully(pattern: &str, text: &str) -> bool {
    let anchored = format!("^(?:{pattern})$");
    Regex::new(&anchored).is_ok_and(|regex| regex.is_match(text))
}

/// Checks inclusive minimum/maximum bounds.
fn check_bounds(
    min: Option<&Number>,
    max: Option<&Number>,
    value: &BigDecimal,
) -> Result<(), ConstraintViolation> {
    if let Some(min) = min.and_then(number_to_decimal)
        && *value < min
    {
        return Err(ConstraintViolation::OutOfRange);
    }
    if let Some(max) = max.and_then(number_to_decimal)
        && *value > max
    {
        return Err(ConstraintViolation::OutOfRange);
    }
    Ok(())
}

/// Checks declared precision and scale for `numeric` fields.
///
/// Too many integer digits is an out-of-range condition (the column cannot
/// hold the magnitude); too many fractional digits or significant digits is
/// a precision violation.
fn check_precision(
    precision: Option<u32>,
    scale: Option<u32>,
    value: &BigDecimal,
) -> Result<(), ConstraintViolation> {
    let (Some(precision), Some(scale)) = (precision, scale) else {
        return Ok(());
    };
    let normalized = value.normalized();
    let scale_digits = normalized.fractional_digit_count();
    let significant = normalized.digits();
    let fraction_digits = u32::try_from(scale_digits.max(0)).unwrap_or(u32::MAX);
    // Normalization strips trailing zeros into a negative scale; 1000.00
    // becomes 1 x 10^3, so the stripped magnitude counts as integer digits.
    let integer_digits = if scale_digits < 0 {
        significant.saturating_add(scale_digits.unsigned_abs())
    } else {
        significant.saturating_sub(u64::from(fraction_digits))
    };

    if integer_digits > u64::from(precision.saturating_sub(scale)) {
        return Err(ConstraintViolation::OutOfRange);
    }
    if fraction_digits > scale || significant > u64::from(precision) {
        return Err(ConstraintViolation::PrecisionExceeded);
    }
    Ok(())
}

/// Checks step granularity relative to `min` (or zero when unset).
fn check_step(
    step: Option<&Number>,
    min: Option<&Number>,
    value: &BigDecimal,
) -> Result<(), ConstraintViolation> {
    let Some(step) = step.and_then(number_to_decimal) else {
        return Ok(());
    };
    if step.is_zero() {
        return Ok(());
    }
    let base = min.and_then(number_to_decimal).unwrap_or_else(BigDecimal::zero);
    let quotient = (value - base) / &step;
    let remainder = (&quotient - quotient.round(0)).abs();
    let epsilon = BigDecimal::from_str(STEP_EPSILON).unwrap_or_else(|_| BigDecimal::zero());
    if remainder > epsilon {
        return Err(ConstraintViolation::OutOfRange);
    }
    Ok(())
}

/// Returns the canonical comparison string for an enumerated allowed value.
fn allowed_value_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

/// Returns whether an incoming read-only value equals the stored value.
fn matches_stored(field: &FieldDef, incoming: &FieldValue, stored: Option<&Value>) -> bool {
    stored
        .and_then(|raw| coerce_value(field.data_type, raw))
        .is_some_and(|stored_value| &stored_value == incoming)
}

/// Converts a JSON number constraint into a decimal.
fn number_to_decimal(number: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&number.to_string()).ok()
}

/// Returns a stable label for a data type, used in violation messages.
#[must_use]
pub const fn type_label(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Smallint => "smallint",
        DataType::Integer => "integer",
        DataType::Bigint => "bigint",
        DataType::Boolean => "boolean",
        DataType::Numeric => "numeric",
        DataType::Real => "real",
        DataType::DoublePrecision => "double precision",
        DataType::Character => "character",
        DataType::CharacterVarying => "character varying",
        DataType::Text => "text",
        DataType::Date => "date",
        DataType::Time => "time",
        DataType::Timestamp => "timestamp without time zone",
        DataType::TimestampTz => "timestamp with time zone",
        DataType::Json => "json",
        DataType::Jsonb => "jsonb",
        DataType::Uuid => "uuid",
        DataType::File => "file",
    }
}
