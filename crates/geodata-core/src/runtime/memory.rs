// crates/geodata-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Feature Store
// Description: Mutex-guarded feature store with snapshot transactions.
// Purpose: Back engine tests and demos without an external database.
// Dependencies: crate::core, crate::interfaces, crate::runtime::relations
// ============================================================================

//! ## Overview
//! The in-memory store keeps one row table per dataset behind a mutex. A
//! transaction holds the state lock for its whole lifetime and works on a
//! deep snapshot; commit writes the snapshot back, rollback discards it.
//! Holding the lock serializes transaction scopes the way the durable
//! store's immediate transactions do, so one scope can never overwrite
//! rows another scope committed meanwhile.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;

use crate::core::DatasetDef;
use crate::core::DatasetId;
use crate::interfaces::AttributeFilter;
use crate::interfaces::FeatureStore;
use crate::interfaces::FeatureTransaction;
use crate::interfaces::RecordWrite;
use crate::interfaces::StoreError;
use crate::interfaces::StoredRecord;
use crate::runtime::relations::pk_matches;

// ============================================================================
// SECTION: State
// ============================================================================

/// Row table for one dataset.
#[derive(Debug, Clone, Default)]
struct Table {
    /// Stored rows in insertion order.
    rows: Vec<StoredRecord>,
    /// Next generated integer key.
    next_key: i64,
}

/// Whole-store state.
#[derive(Debug, Clone, Default)]
struct StoreState {
    /// Tables keyed by dataset id.
    tables: BTreeMap<DatasetId, Table>,
}

/// In-memory feature store.
///
/// # Invariants
/// - A transaction holds the state mutex from begin until commit or
///   rollback; scopes never overlap, so a commit can only write changes
///   made against the latest committed state.
#[derive(Debug, Default)]
pub struct InMemoryFeatureStore {
    state: Mutex<StoreState>,
}

impl InMemoryFeatureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds rows for a dataset, advancing the key counter past any integer
    /// keys present.
    pub fn seed(&self, dataset: &DatasetId, rows: Vec<StoredRecord>) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let table = state.tables.entry(dataset.clone()).or_default();
        for row in &rows {
            if let Some(key) = row.pk.as_i64() {
                table.next_key = table.next_key.max(key);
            }
        }
        table.rows.extend(rows);
    }

    /// Returns a copy of the committed rows of a dataset.
    #[must_use]
    pub fn rows(&self, dataset: &DatasetId) -> Vec<StoredRecord> {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.tables.get(dataset).map(|table| table.rows.clone()).unwrap_or_default()
    }
}

impl FeatureStore for InMemoryFeatureStore {
    fn begin(&self) -> Result<Box<dyn FeatureTransaction + '_>, StoreError> {
        let guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let snapshot = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            snapshot,
        }))
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Snapshot transaction over the in-memory store.
///
/// Dropping without commit releases the lock with the committed state
/// untouched, which is the rollback semantics.
struct InMemoryTransaction<'a> {
    /// Locked store state, held for the scope's whole lifetime.
    guard: MutexGuard<'a, StoreState>,
    /// Private working copy committed back into the guard.
    snapshot: StoreState,
}

impl InMemoryTransaction<'_> {
    /// Returns the mutable table of a dataset, creating it on first write.
    fn table(&mut self, dataset: &DatasetDef) -> &mut Table {
        self.snapshot.tables.entry(dataset.id.clone()).or_default()
    }

    /// Applies a record write onto a row.
    fn apply(row: &mut StoredRecord, write: &RecordWrite) {
        for (name, value) in &write.columns {
            row.attributes.insert(name.clone(), value.clone());
        }
        if let Some(geometry) = &write.geometry {
            row.geometry = Some(geometry.geojson.clone());
        }
    }
}

impl FeatureTransaction for InMemoryTransaction<'_> {
    fn fetch_record(
        &mut self,
        dataset: &DatasetDef,
        pk: &Value,
    ) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.table(dataset).rows.iter().find(|row| pk_matches(&row.pk, pk)).cloned())
    }

    fn list_records(
        &mut self,
        dataset: &DatasetDef,
        filters: &[AttributeFilter],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self
            .table(dataset)
            .rows
            .iter()
            .filter(|row| filters.iter().all(|filter| filter.matches(row)))
            .cloned()
            .collect())
    }

    fn relation_records(
        &mut self,
        relation_dataset: &DatasetDef,
        fk_field: &str,
        fk_value: &Value,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self
            .table(relation_dataset)
            .rows
            .iter()
            .filter(|row| {
                row.attributes.get(fk_field).is_some_and(|value| pk_matches(value, fk_value))
            })
            .cloned()
            .collect())
    }

    fn insert_record(
        &mut self,
        dataset: &DatasetDef,
        write: &RecordWrite,
    ) -> Result<StoredRecord, StoreError> {
        let table = self.table(dataset);
        let pk = match &write.pk {
            Some(pk) => {
                if table.rows.iter().any(|row| pk_matches(&row.pk, pk)) {
                    return Err(StoreError::Conflict(format!(
                        "duplicate key in {}",
                        dataset.id
                    )));
                }
                pk.clone()
            }
            None => {
                table.next_key += 1;
                Value::from(table.next_key)
            }
        };
        let mut row = StoredRecord {
            pk,
            attributes: BTreeMap::new(),
            geometry: dataset.geometry.as_ref().map(|_| Value::Null),
        };
        Self::apply(&mut row, write);
        table.rows.push(row.clone());
        Ok(row)
    }

    fn update_record(
        &mut self,
        dataset: &DatasetDef,
        pk: &Value,
        write: &RecordWrite,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let table = self.table(dataset);
        let Some(row) = table.rows.iter_mut().find(|row| pk_matches(&row.pk, pk)) else {
            return Ok(None);
        };
        Self::apply(row, write);
        Ok(Some(row.clone()))
    }

    fn delete_record(&mut self, dataset: &DatasetDef, pk: &Value) -> Result<bool, StoreError> {
        let table = self.table(dataset);
        let before = table.rows.len();
        table.rows.retain(|row| !pk_matches(&row.pk, pk));
        Ok(table.rows.len() < before)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self {
            mut guard,
            snapshot,
        } = *self;
        *guard = snapshot;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
