// crates/geodata-core/src/runtime/relations.rs
// ============================================================================
// Module: Relation Resolver
// Description: Structural checks and replace-diff planning for 1:N relations.
// Purpose: Turn nested relation arrays into per-table insert/update/delete
//          plans against the stored relation rows.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! A feature payload may carry relation arrays keyed by configured relation
//! table names. The submitted array is the desired final state: stored rows
//! absent from it are deleted, rows with a primary key are updated, rows
//! without one are inserted. The parent's primary key always binds the
//! foreign key; client-supplied foreign-key values are overridden. Relation
//! nesting is limited to one level.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::DatasetDef;
use crate::core::EngineError;
use crate::core::FeaturePayload;
use crate::core::FieldPath;
use crate::core::RelationDef;
use crate::interfaces::StoredRecord;

// ============================================================================
// SECTION: Structural Checks
// ============================================================================

/// Pairs each relation array in the payload with its configured relation.
///
/// # Errors
///
/// Returns [`EngineError::RelationValidationFailed`] for unknown relation
/// keys, non-Feature members, and nested relations beyond one level.
pub fn collect_relations<'a>(
    parent: &'a DatasetDef,
    payload: &'a FeaturePayload,
) -> Result<Vec<(&'a RelationDef, &'a Vec<FeaturePayload>)>, EngineError> {
    let mut collected = Vec::with_capacity(payload.relations.len());
    for (table, records) in &payload.relations {
        let Some(relation) = parent.relation(table) else {
            return Err(EngineError::RelationValidationFailed {
                path: FieldPath::field("").in_relation(table.clone(), 0),
                reason: format!("no relation to {table} is configured"),
            });
        };
        for (index, record) in records.iter().enumerate() {
            if !record.is_feature() {
                return Err(EngineError::RelationValidationFailed {
                    path: FieldPath::field("").in_relation(table.clone(), index),
                    reason: "relation record is not a GeoJSON Feature".to_string(),
                });
            }
            if !record.relations.is_empty() {
                return Err(EngineError::RelationValidationFailed {
                    path: FieldPath::field("").in_relation(table.clone(), index),
                    reason: "relations cannot nest further relations".to_string(),
                });
            }
        }
        collected.push((relation, records));
    }
    Ok(collected)
}

// ============================================================================
// SECTION: Replace Diff
// ============================================================================

/// Insert/update/delete plan for one relation table.
///
/// # Invariants
/// - `updates` pair a stored primary key with its replacement payload.
/// - `deletes` hold stored primary keys absent from the submitted array.
#[derive(Debug, Default)]
pub struct RelationDiff<'a> {
    /// Payload records to insert.
    pub inserts: Vec<(usize, &'a FeaturePayload)>,
    /// Payload records updating an existing stored row.
    pub updates: Vec<(usize, Value, &'a FeaturePayload)>,
    /// Stored primary keys to delete.
    pub deletes: Vec<Value>,
}

/// Diffs the submitted relation array against the stored relation rows.
///
/// # Errors
///
/// Returns [`EngineError::RelationValidationFailed`] when a submitted record
/// carries a primary key that does not belong to this feature's relation
/// rows.
pub fn diff_relation<'a>(
    relation: &RelationDef,
    stored: &[StoredRecord],
    incoming: &'a [FeaturePayload],
) -> Result<RelationDiff<'a>, EngineError> {
    let mut diff = RelationDiff::default();
    let mut kept: Vec<bool> = vec![false; stored.len()];

    for (index, record) in incoming.iter().enumerate() {
        match &record.id {
            None | Some(Value::Null) => diff.inserts.push((index, record)),
            Some(id) => {
                let position = stored.iter().position(|row| pk_matches(&row.pk, id));
                match position {
                    Some(slot) => {
                        kept[slot] = true;
                        diff.updates.push((index, stored[slot].pk.clone(), record));
                    }
                    None => {
                        return Err(EngineError::RelationValidationFailed {
                            path: FieldPath::field("").in_relation(relation.table.clone(), index),
                            reason: "record does not belong to this feature".to_string(),
                        });
                    }
                }
            }
        }
    }

    for (slot, row) in stored.iter().enumerate() {
        if !kept[slot] {
            diff.deletes.push(row.pk.clone());
        }
    }
    Ok(diff)
}

/// Compares primary-key values across JSON number/string forms.
#[must_use]
pub fn pk_matches(stored: &Value, incoming: &Value) -> bool {
    if stored == incoming {
        return true;
    }
    pk_string(stored).is_some_and(|left| pk_string(incoming).is_some_and(|right| left == right))
}

/// Renders a scalar primary-key value as a comparison string.
fn pk_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
