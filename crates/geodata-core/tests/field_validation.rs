// crates/geodata-core/tests/field_validation.rs
// ============================================================================
// Module: Field Validation Unit Tests
// Description: Rule-order and constraint coverage for the field validator.
// Purpose: Validate required/blank handling, lossless coercion, length,
//          pattern, numeric precision, enumerations, and read-only fields.
// ============================================================================

//! ## Overview
//! Unit-level tests for field validation invariants:
//! - Required values reject absence, null, and blank strings
//! - Type coercion is lossless or fails
//! - Numeric precision/scale distinguishes magnitude from granularity
//! - Read-only fields accept only idempotent resubmissions

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use geodata_core::ConstraintSet;
use geodata_core::ConstraintViolation;
use geodata_core::DataType;
use geodata_core::FieldDef;
use geodata_core::FieldValue;
use geodata_core::Operation;
use geodata_core::runtime::FieldContext;
use geodata_core::runtime::FieldOutcome;
use geodata_core::runtime::validate_field;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn field(data_type: DataType, constraints: ConstraintSet) -> FieldDef {
    FieldDef {
        name: "value".to_string(),
        data_type,
        constraints,
    }
}

fn create_ctx() -> FieldContext<'static> {
    FieldContext {
        operation: Operation::Create,
        stored: None,
        is_primary_key: false,
        server_generated_key: true,
    }
}

fn update_ctx(stored: Option<&Value>) -> FieldContext<'_> {
    FieldContext {
        operation: Operation::Update,
        stored,
        is_primary_key: false,
        server_generated_key: true,
    }
}

fn numeric_5_2() -> FieldDef {
    field(
        DataType::Numeric,
        ConstraintSet {
            numeric_precision: Some(5),
            numeric_scale: Some(2),
            ..ConstraintSet::default()
        },
    )
}

// ============================================================================
// SECTION: Required and Absence
// ============================================================================

#[test]
fn required_rejects_absent_null_and_blank() {
    let def = field(
        DataType::Text,
        ConstraintSet {
            required: true,
            ..ConstraintSet::default()
        },
    );
    for raw in [None, Some(Value::Null), Some(json!(""))] {
        let result = validate_field(&def, raw.as_ref(), &create_ctx());
        assert_eq!(result, Err(ConstraintViolation::MissingRequired), "raw: {raw:?}");
    }
}

#[test]
fn optional_absent_field_produces_no_write() {
    let def = field(DataType::Text, ConstraintSet::default());
    let result = validate_field(&def, None, &update_ctx(None)).unwrap();
    assert_eq!(result, FieldOutcome::Skip);
}

#[test]
fn optional_explicit_null_writes_null() {
    let def = field(DataType::Integer, ConstraintSet::default());
    let result = validate_field(&def, Some(&Value::Null), &update_ctx(None)).unwrap();
    assert_eq!(result, FieldOutcome::Write(FieldValue::Null));
}

#[test]
fn required_primary_key_is_exempt_on_create_with_generated_keys() {
    let def = field(
        DataType::Integer,
        ConstraintSet {
            required: true,
            ..ConstraintSet::default()
        },
    );
    let ctx = FieldContext {
        is_primary_key: true,
        ..create_ctx()
    };
    assert_eq!(validate_field(&def, None, &ctx).unwrap(), FieldOutcome::Skip);
}

// ============================================================================
// SECTION: Type Coercion
// ============================================================================

#[test]
fn integer_accepts_numeric_strings_and_rejects_fractions() {
    let def = field(DataType::Integer, ConstraintSet::default());
    let ok = validate_field(&def, Some(&json!("42")), &create_ctx()).unwrap();
    assert_eq!(ok, FieldOutcome::Write(FieldValue::Integer(42)));

    for raw in [json!(1.5), json!("1.5"), json!(true), json!([1])] {
        let result = validate_field(&def, Some(&raw), &create_ctx());
        assert!(
            matches!(result, Err(ConstraintViolation::TypeMismatch { .. })),
            "raw: {raw:?}"
        );
    }
}

#[test]
fn smallint_rejects_out_of_width_values() {
    let def = field(DataType::Smallint, ConstraintSet::default());
    let result = validate_field(&def, Some(&json!(40_000)), &create_ctx());
    assert!(matches!(result, Err(ConstraintViolation::TypeMismatch { .. })));
}

#[test]
fn boolean_rejects_json_numbers() {
    let def = field(DataType::Boolean, ConstraintSet::default());
    let ok = validate_field(&def, Some(&json!("true")), &create_ctx()).unwrap();
    assert_eq!(ok, FieldOutcome::Write(FieldValue::Boolean(true)));
    let result = validate_field(&def, Some(&json!(1)), &create_ctx());
    assert!(matches!(result, Err(ConstraintViolation::TypeMismatch { .. })));
}

#[test]
fn date_accepts_recognized_forms_only() {
    let def = field(DataType::Date, ConstraintSet::default());
    for raw in ["2024-03-31", "2024/03/31", "20240331"] {
        let result = validate_field(&def, Some(&json!(raw)), &create_ctx());
        assert!(matches!(result, Ok(FieldOutcome::Write(FieldValue::Date(_)))), "raw: {raw}");
    }
    let result = validate_field(&def, Some(&json!("31.03.2024")), &create_ctx());
    assert!(matches!(result, Err(ConstraintViolation::TypeMismatch { .. })));
}

#[test]
fn uuid_canonicalizes_to_lowercase_hyphenated() {
    let def = field(DataType::Uuid, ConstraintSet::default());
    let raw = json!("550E8400E29B41D4A716446655440000");
    let result = validate_field(&def, Some(&raw), &create_ctx()).unwrap();
    assert_eq!(
        result,
        FieldOutcome::Write(FieldValue::Uuid(
            "550e8400-e29b-41d4-a716-446655440000".to_string()
        ))
    );
}

// ============================================================================
// SECTION: Length and Pattern
// ============================================================================

#[test]
fn maxlength_counts_characters_of_string_form() {
    let def = field(
        DataType::CharacterVarying,
        ConstraintSet {
            maxlength: Some(3),
            ..ConstraintSet::default()
        },
    );
    assert!(validate_field(&def, Some(&json!("abc")), &create_ctx()).is_ok());
    let result = validate_field(&def, Some(&json!("abcd")), &create_ctx());
    assert_eq!(result, Err(ConstraintViolation::TooLong { maxlength: 3 }));
}

#[test]
fn pattern_requires_a_full_match() {
    let def = field(
        DataType::Text,
        ConstraintSet {
            pattern: Some("[A-Z]{2}-[0-9]+".to_string()),
            ..ConstraintSet::default()
        },
    );
    assert!(validate_field(&def, Some(&json!("AB-12")), &create_ctx()).is_ok());
    for raw in ["xAB-12", "AB-12x", "ab-12"] {
        let result = validate_field(&def, Some(&json!(raw)), &create_ctx());
        assert_eq!(result, Err(ConstraintViolation::PatternMismatch), "raw: {raw}");
    }
}

#[test]
fn pattern_applies_to_numeric_string_form() {
    let def = field(
        DataType::Integer,
        ConstraintSet {
            pattern: Some("[0-9]{4}".to_string()),
            ..ConstraintSet::default()
        },
    );
    assert!(validate_field(&def, Some(&json!(1234)), &create_ctx()).is_ok());
    let result = validate_field(&def, Some(&json!(123)), &create_ctx());
    assert_eq!(result, Err(ConstraintViolation::PatternMismatch));
}

// ============================================================================
// SECTION: Numeric Bounds, Precision, and Step
// ============================================================================

#[test]
fn numeric_5_2_accepts_extremes_and_classifies_failures() {
    let def = numeric_5_2();
    for raw in [json!("999.99"), json!("-999.99"), json!(0), json!("12.34")] {
        assert!(validate_field(&def, Some(&raw), &create_ctx()).is_ok(), "raw: {raw:?}");
    }
    // Magnitude beyond the column is out of range, not a precision problem.
    let result = validate_field(&def, Some(&json!("1000.00")), &create_ctx());
    assert_eq!(result, Err(ConstraintViolation::OutOfRange));
    // Excess fractional digits exceed the scale.
    let result = validate_field(&def, Some(&json!("12.345")), &create_ctx());
    assert_eq!(result, Err(ConstraintViolation::PrecisionExceeded));
}

#[test]
fn power_of_ten_magnitudes_stay_out_of_range() {
    // Trailing-zero values normalize to one significant digit; the stripped
    // magnitude must still count against the integer-digit budget.
    let def = numeric_5_2();
    for raw in [json!("1000.00"), json!("100000"), json!(10_000), json!("-1000.00")] {
        let result = validate_field(&def, Some(&raw), &create_ctx());
        assert_eq!(result, Err(ConstraintViolation::OutOfRange), "raw: {raw:?}");
    }
    // The same shape within budget still passes.
    assert!(validate_field(&def, Some(&json!("100.00")), &create_ctx()).is_ok());
}

#[test]
fn bounds_are_inclusive() {
    let def = field(
        DataType::Integer,
        ConstraintSet {
            min: Some(serde_json::Number::from(0)),
            max: Some(serde_json::Number::from(10)),
            ..ConstraintSet::default()
        },
    );
    for raw in [json!(0), json!(10)] {
        assert!(validate_field(&def, Some(&raw), &create_ctx()).is_ok());
    }
    for raw in [json!(-1), json!(11)] {
        let result = validate_field(&def, Some(&raw), &create_ctx());
        assert_eq!(result, Err(ConstraintViolation::OutOfRange), "raw: {raw:?}");
    }
}

#[test]
fn step_is_anchored_at_min() {
    let def = field(
        DataType::Numeric,
        ConstraintSet {
            min: Some(serde_json::Number::from_f64(0.5).unwrap()),
            step: Some(serde_json::Number::from_f64(0.25).unwrap()),
            ..ConstraintSet::default()
        },
    );
    for raw in ["0.5", "0.75", "1.0"] {
        assert!(validate_field(&def, Some(&json!(raw)), &create_ctx()).is_ok(), "raw: {raw}");
    }
    let result = validate_field(&def, Some(&json!("0.6")), &create_ctx());
    assert_eq!(result, Err(ConstraintViolation::OutOfRange));
}

// ============================================================================
// SECTION: Enumerated Values
// ============================================================================

#[test]
fn enumerated_values_compare_by_canonical_string() {
    let def = field(
        DataType::Integer,
        ConstraintSet {
            values: Some(
                serde_json::from_value(json!([
                    { "label": "Low", "value": 1 },
                    { "label": "High", "value": "2" }
                ]))
                .unwrap(),
            ),
            ..ConstraintSet::default()
        },
    );
    // A JSON number matches a string-typed allowed value with the same form.
    for raw in [json!(1), json!("1"), json!(2)] {
        assert!(validate_field(&def, Some(&raw), &create_ctx()).is_ok(), "raw: {raw:?}");
    }
    let result = validate_field(&def, Some(&json!(3)), &create_ctx());
    assert_eq!(result, Err(ConstraintViolation::NotAnAllowedValue));
}

// ============================================================================
// SECTION: Read-Only Fields
// ============================================================================

#[test]
fn read_only_accepts_idempotent_resubmission() {
    let def = field(
        DataType::Text,
        ConstraintSet {
            read_only: true,
            ..ConstraintSet::default()
        },
    );
    let stored = json!("locked");
    let result = validate_field(&def, Some(&json!("locked")), &update_ctx(Some(&stored)));
    assert_eq!(result, Ok(FieldOutcome::Skip));
}

#[test]
fn read_only_rejects_differing_value_on_update() {
    let def = field(
        DataType::Text,
        ConstraintSet {
            read_only: true,
            ..ConstraintSet::default()
        },
    );
    let stored = json!("locked");
    let result = validate_field(&def, Some(&json!("changed")), &update_ctx(Some(&stored)));
    assert_eq!(result, Err(ConstraintViolation::ReadOnlyViolation));
}

#[test]
fn read_only_never_produces_a_write_on_create() {
    let def = field(
        DataType::Text,
        ConstraintSet {
            read_only: true,
            ..ConstraintSet::default()
        },
    );
    let result = validate_field(&def, Some(&json!("seeded")), &create_ctx());
    assert_eq!(result, Ok(FieldOutcome::Skip));
}

// ============================================================================
// SECTION: Rule Order
// ============================================================================

#[test]
fn earlier_rules_win() {
    // A value that is both too long and pattern-breaking reports length.
    let def = field(
        DataType::Text,
        ConstraintSet {
            maxlength: Some(2),
            pattern: Some("[a-z]+".to_string()),
            ..ConstraintSet::default()
        },
    );
    let result = validate_field(&def, Some(&json!("ABCDEF")), &create_ctx());
    assert_eq!(result, Err(ConstraintViolation::TooLong { maxlength: 2 }));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    /// Any in-range two-decimal value passes the numeric(5,2) constraints.
    #[test]
    fn numeric_5_2_accepts_all_in_range_cents(cents in -99_999_i64..=99_999_i64) {
        let def = numeric_5_2();
        let raw = json!(format!("{}.{:02}", cents / 100, (cents % 100).abs()));
        prop_assert!(validate_field(&def, Some(&raw), &create_ctx()).is_ok());
    }

    /// Integer round-trips preserve the value exactly.
    #[test]
    fn bigint_coercion_is_lossless(value in proptest::num::i64::ANY) {
        let def = field(DataType::Bigint, ConstraintSet::default());
        let result = validate_field(&def, Some(&json!(value)), &create_ctx()).unwrap();
        prop_assert_eq!(result, FieldOutcome::Write(FieldValue::Bigint(value)));
    }
}
