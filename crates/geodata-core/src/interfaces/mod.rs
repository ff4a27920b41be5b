// crates/geodata-core/src/interfaces/mod.rs
// ============================================================================
// Module: GeoData Interfaces
// Description: Backend-agnostic interfaces for stores, scanners, and clocks.
// Purpose: Define the contract surfaces used by the mutation coordinator.
// Dependencies: crate::core, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! Interfaces define how the engine integrates with external systems without
//! embedding backend-specific details. Store implementations provide scoped
//! transactions; the coordinator guarantees release (commit or rollback) on
//! every exit path. Scan collaborators are consulted before any transaction
//! is opened, so their bounded timeout is the only suspension point outside
//! the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::DatasetDef;
use crate::core::UploadMeta;

// ============================================================================
// SECTION: Records
// ============================================================================

/// A record as read from the store, with raw JSON-compatible values.
///
/// # Invariants
/// - `pk` is the primary-key value in its JSON form.
/// - `geometry` is the stored GeoJSON value (JSON null for NULL geometry)
///   when the dataset has a geometry column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredRecord {
    /// Primary-key value.
    pub pk: Value,
    /// Attribute values keyed by column name.
    pub attributes: BTreeMap<String, Value>,
    /// Stored geometry value for spatial datasets.
    pub geometry: Option<Value>,
}

/// Geometry write instruction.
///
/// # Invariants
/// - The engine never reprojects in-process; when `source_srid` differs from
///   `target_srid` the store is instructed to reproject on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryWrite {
    /// GeoJSON geometry value; JSON null writes a NULL geometry.
    pub geojson: Value,
    /// SRID of the supplied coordinates.
    pub source_srid: i32,
    /// SRID of the stored column.
    pub target_srid: i32,
}

impl GeometryWrite {
    /// Returns whether the store must reproject the value on write.
    #[must_use]
    pub const fn needs_reprojection(&self) -> bool {
        self.source_srid != self.target_srid
    }
}

/// A validated, permission-filtered record write.
///
/// # Invariants
/// - `columns` holds only grant-visible, non-read-only attributes plus
///   server-computed audit fields, already normalized to JSON forms the
///   store can bind directly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordWrite {
    /// Primary-key value; `None` lets the store generate one on insert.
    pub pk: Option<Value>,
    /// Column values keyed by column name.
    pub columns: BTreeMap<String, Value>,
    /// Geometry write instruction for spatial datasets; `None` leaves the
    /// stored geometry untouched.
    pub geometry: Option<GeometryWrite>,
}

// ============================================================================
// SECTION: Attribute Filters
// ============================================================================

/// Comparison operator of an attribute filter, in its wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Equal.
    #[serde(rename = "=")]
    Eq,
    /// Not equal.
    #[serde(rename = "!=")]
    Ne,
    /// Less than.
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal.
    #[serde(rename = "<=")]
    Le,
    /// Greater than.
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal.
    #[serde(rename = ">=")]
    Ge,
}

/// One attribute comparison of a filtered list read.
///
/// A list read applies its filters as a conjunction: a record matches when
/// every filter matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    /// Dataset field the comparison targets.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Comparand in its JSON form; JSON null turns equality tests into
    /// null checks.
    pub value: Value,
}

impl AttributeFilter {
    /// Evaluates the filter against a record with SQL comparison semantics:
    /// a NULL or absent stored value matches nothing except an explicit
    /// null equality test, and comparisons across value kinds never match.
    #[must_use]
    pub fn matches(&self, record: &StoredRecord) -> bool {
        let stored = record.attributes.get(&self.field).unwrap_or(&Value::Null);
        if self.value.is_null() {
            return match self.op {
                FilterOp::Eq => stored.is_null(),
                FilterOp::Ne => !stored.is_null(),
                _ => false,
            };
        }
        let Some(ordering) = compare_scalars(stored, &self.value) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ne => ordering != Ordering::Equal,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Le => ordering != Ordering::Greater,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// Orders two JSON scalars of the same kind; mixed kinds are incomparable.
fn compare_scalars(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            left.as_f64()?.partial_cmp(&right.as_f64()?)
        }
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

// ============================================================================
// SECTION: Feature Store
// ============================================================================

/// Feature store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling: `Conflict` maps to a
///   retryable write conflict, everything else to store unavailability.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store rejected a statement due to a constraint (uniqueness, foreign
    /// key, check).
    #[error("store constraint conflict: {0}")]
    Conflict(String),
    /// Store is unreachable or an I/O failure occurred.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Request references data the store cannot represent.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

/// One transaction scope covering all statements of a single request.
///
/// # Invariants
/// - Every transaction ends in exactly one `commit` or `rollback` call;
///   dropping without either must roll back.
/// - Reads observe the transaction's own uncommitted writes.
pub trait FeatureTransaction {
    /// Reads one record by primary-key value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn fetch_record(
        &mut self,
        dataset: &DatasetDef,
        pk: &Value,
    ) -> Result<Option<StoredRecord>, StoreError>;

    /// Reads the records of a dataset matching every filter, in primary-key
    /// order. An empty filter slice reads the whole dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn list_records(
        &mut self,
        dataset: &DatasetDef,
        filters: &[AttributeFilter],
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Reads the relation rows whose foreign key equals `fk_value`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn relation_records(
        &mut self,
        relation_dataset: &DatasetDef,
        fk_field: &str,
        fk_value: &Value,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Inserts a record, returning the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on constraint violations.
    fn insert_record(
        &mut self,
        dataset: &DatasetDef,
        write: &RecordWrite,
    ) -> Result<StoredRecord, StoreError>;

    /// Updates the record with the given primary key, returning the stored
    /// row, or `None` when the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on constraint violations.
    fn update_record(
        &mut self,
        dataset: &DatasetDef,
        pk: &Value,
        write: &RecordWrite,
    ) -> Result<Option<StoredRecord>, StoreError>;

    /// Deletes the record with the given primary key; returns whether a row
    /// was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    fn delete_record(&mut self, dataset: &DatasetDef, pk: &Value) -> Result<bool, StoreError>;

    /// Commits every statement issued in this scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the commit fails; no statement is then
    /// observable.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Rolls back every statement issued in this scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the rollback itself fails.
    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Feature store providing one transaction scope per request.
pub trait FeatureStore {
    /// Opens a transaction scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when no transaction can be acquired.
    fn begin(&self) -> Result<Box<dyn FeatureTransaction + '_>, StoreError>;
}

impl<S: FeatureStore + ?Sized> FeatureStore for std::sync::Arc<S> {
    fn begin(&self) -> Result<Box<dyn FeatureTransaction + '_>, StoreError> {
        (**self).begin()
    }
}

// ============================================================================
// SECTION: Attachment Scanner
// ============================================================================

/// Scan collaborator verdict for an attachment file.
///
/// # Invariants
/// - Variants are stable and exhaustive for scan outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    /// File is clean.
    Clean,
    /// File is infected; `signature` names the detection when known.
    Infected {
        /// Detection signature reported by the scanner.
        signature: String,
    },
}

/// Scan collaborator errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Collaborator was unreachable or timed out.
    #[error("scan collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Attachment scan collaborator.
pub trait AttachmentScanner: Send + Sync {
    /// Scans an uploaded file and returns the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] when the collaborator is unreachable; the
    /// attachment validator applies the configured soft-fail policy.
    fn scan(&self, upload: &UploadMeta) -> Result<ScanVerdict, ScanError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Wall-clock seam for audit stamping.
///
/// The engine never reads wall-clock time directly; tests inject fixed
/// clocks to keep stamped records deterministic.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now_utc(&self) -> OffsetDateTime;

    /// Returns the current local time; defaults to UTC when the local
    /// offset is unavailable.
    fn now_local(&self) -> OffsetDateTime {
        let now = self.now_utc();
        time::UtcOffset::current_local_offset().map_or(now, |offset| now.to_offset(offset))
    }
}

/// System wall-clock.
///
/// # Invariants
/// - Reads the process-wide system time on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
