// crates/geodata-core/src/core/errors.rs
// ============================================================================
// Module: Engine Errors
// Description: Constraint violations, validation reports, and request errors.
// Purpose: Aggregate every problem in a rejected payload into one response.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! Validation-kind errors are recoverable and collected per field and
//! relation path, so a single response can enumerate every problem in a
//! rejected payload. Request-level errors either short-circuit before field
//! validation (permission and dataset existence) or surface execution
//! failures (write conflicts, store outages) as distinct retryable /
//! non-retryable classes. The engine never retries on its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::grant::Operation;
use crate::core::identifiers::DatasetId;

// ============================================================================
// SECTION: Constraint Violations
// ============================================================================

/// Violated-constraint identifier for one field-level validation failure.
///
/// # Invariants
/// - Variants are stable for programmatic handling and wire serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintViolation {
    /// Required value is absent, null, or blank.
    MissingRequired,
    /// Value cannot be losslessly converted to the declared type.
    TypeMismatch {
        /// Declared data type label.
        expected: String,
    },
    /// String form exceeds the maximum length.
    TooLong {
        /// Configured maximum length.
        maxlength: u32,
    },
    /// String form does not fully match the configured pattern.
    PatternMismatch,
    /// Numeric value is outside the configured or step bounds.
    OutOfRange,
    /// Numeric value exceeds configured precision or scale.
    PrecisionExceeded,
    /// Value is not among the enumerated allowed values.
    NotAnAllowedValue,
    /// Incoming value differs from the stored value of a read-only field.
    ReadOnlyViolation,
    /// NULL geometry supplied but the dataset forbids it.
    NullGeometryNotAllowed,
    /// Geometry payload is malformed or of the wrong type family.
    InvalidGeometry {
        /// Human-readable reason.
        reason: String,
    },
    /// Attachment exceeds the applicable size limit.
    AttachmentTooLarge {
        /// Applicable maximum size in bytes.
        max_bytes: u64,
    },
    /// Attachment extension is not in the applicable allow-list.
    AttachmentExtensionDenied,
    /// Scan collaborator reported the attachment as infected.
    MalwareDetected,
    /// Scan collaborator was unreachable and soft-fail is disabled.
    ScanUnavailable,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired => f.write_str("missing required value"),
            Self::TypeMismatch { expected } => {
                write!(f, "invalid value for type {expected}")
            }
            Self::TooLong { maxlength } => {
                write!(f, "value must be shorter than {maxlength} characters")
            }
            Self::PatternMismatch => f.write_str("value does not match pattern"),
            Self::OutOfRange => f.write_str("value is out of range"),
            Self::PrecisionExceeded => f.write_str("value exceeds numeric precision"),
            Self::NotAnAllowedValue => f.write_str("value is not an allowed value"),
            Self::ReadOnlyViolation => f.write_str("field is read-only"),
            Self::NullGeometryNotAllowed => f.write_str("geometry cannot be null"),
            Self::InvalidGeometry { reason } => write!(f, "invalid geometry: {reason}"),
            Self::AttachmentTooLarge { max_bytes } => {
                write!(f, "attachment exceeds {max_bytes} bytes")
            }
            Self::AttachmentExtensionDenied => f.write_str("forbidden file extension"),
            Self::MalwareDetected => f.write_str("forbidden file content"),
            Self::ScanUnavailable => f.write_str("attachment scan unavailable"),
        }
    }
}

// ============================================================================
// SECTION: Field Paths
// ============================================================================

/// Location of a failing value within a feature payload.
///
/// # Invariants
/// - `relation` is `None` for primary-record fields and names the relation
///   table plus record index for nested fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPath {
    /// Relation table and zero-based record index, for nested fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<(DatasetId, usize)>,
    /// Field name; empty for record-level problems such as geometry.
    pub field: String,
}

impl FieldPath {
    /// Builds a path for a primary-record field.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            relation: None,
            field: name.into(),
        }
    }

    /// Builds a path for the primary record's geometry.
    #[must_use]
    pub fn geometry() -> Self {
        Self::field("")
    }

    /// Rebases the path into a relation record.
    #[must_use]
    pub fn in_relation(mut self, table: DatasetId, index: usize) -> Self {
        self.relation = Some((table, index));
        self
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.relation, self.field.is_empty()) {
            (Some((table, index)), false) => write!(f, "{table}[{index}].{}", self.field),
            (Some((table, index)), true) => write!(f, "{table}[{index}]"),
            (None, false) => f.write_str(&self.field),
            (None, true) => f.write_str("geometry"),
        }
    }
}

// ============================================================================
// SECTION: Validation Report
// ============================================================================

/// One field-level validation failure with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Location of the failing value.
    pub path: FieldPath,
    /// Violated constraint.
    pub violation: ConstraintViolation,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.violation)
    }
}

/// Aggregated validation failures for one feature payload.
///
/// # Invariants
/// - A non-empty report rejects the whole record; no partial success is
///   ever reported for a single feature mutation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Collected failures in field order.
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the report carries no failures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a failure at the given path.
    pub fn push(&mut self, path: FieldPath, violation: ConstraintViolation) {
        self.errors.push(ValidationError {
            path,
            violation,
        });
    }

    /// Absorbs another report, rebasing its paths into a relation record.
    pub fn absorb_relation(&mut self, table: &DatasetId, index: usize, other: Self) {
        for mut error in other.errors {
            error.path.relation = Some((table.clone(), index));
            self.errors.push(error);
        }
    }

    /// Absorbs another report unchanged.
    pub fn absorb(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }
}

// ============================================================================
// SECTION: Engine Errors
// ============================================================================

/// Request-level engine errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `WriteConflict` is retryable by the caller; `StoreUnavailable` is not
///   necessarily; the engine itself never retries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Dataset is unknown or not readable by the requesting role-set.
    /// The two cases are deliberately indistinguishable.
    #[error("dataset not found: {dataset}")]
    DatasetNotFound {
        /// Requested dataset.
        dataset: DatasetId,
    },
    /// Operation or field-set not permitted for the requesting role-set.
    #[error("permission denied for {operation:?} on {dataset}")]
    PermissionDenied {
        /// Requested dataset.
        dataset: DatasetId,
        /// Requested operation.
        operation: Operation,
        /// Fields outside the writable set, when the denial is field-level.
        fields: Vec<String>,
    },
    /// Feature payload failed validation; the report enumerates every
    /// problem.
    #[error("feature validation failed ({} error(s))", report.errors.len())]
    ValidationFailed {
        /// Aggregated field/relation failures.
        report: ValidationReport,
    },
    /// Nested relation payload is structurally invalid.
    #[error("relation validation failed at {path}: {reason}")]
    RelationValidationFailed {
        /// Path locating the failing relation record.
        path: FieldPath,
        /// Human-readable reason.
        reason: String,
    },
    /// Requested feature does not exist.
    #[error("feature not found in {dataset}")]
    FeatureNotFound {
        /// Requested dataset.
        dataset: DatasetId,
    },
    /// Store rejected the commit (e.g. uniqueness violation); retryable.
    #[error("write conflict: {detail}")]
    WriteConflict {
        /// Store-reported detail.
        detail: String,
    },
    /// Store is unreachable or failed outside of constraint enforcement.
    #[error("store unavailable: {detail}")]
    StoreUnavailable {
        /// Store-reported detail.
        detail: String,
    },
}
