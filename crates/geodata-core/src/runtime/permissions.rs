// crates/geodata-core/src/runtime/permissions.rs
// ============================================================================
// Module: Permission Resolution
// Description: Role-set grant resolution and request authorization checks.
// Purpose: Gate every request on resolved grants before validation runs.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Permissions resolve per (dataset, role-set) by combining the per-role
//! grants configured for the dataset. Authorization runs before any field
//! validation: an unreadable dataset is reported as not found so probing
//! cannot distinguish "absent" from "forbidden", a disallowed operation is a
//! permission denial, and payload fields outside the granted attribute set
//! are collected and reported together.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::DatasetDef;
use crate::core::DatasetId;
use crate::core::EngineError;
use crate::core::FeaturePayload;
use crate::core::FieldDef;
use crate::core::Grant;
use crate::core::Operation;
use crate::core::RoleName;
use crate::interfaces::AttributeFilter;

// ============================================================================
// SECTION: Permission Set
// ============================================================================

/// Resolved per-role grants for every configured dataset.
///
/// # Invariants
/// - Immutable once built; grant resolution never mutates stored grants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    /// Per-dataset, per-role grants.
    pub datasets: BTreeMap<DatasetId, BTreeMap<RoleName, Grant>>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the grant of one role on one dataset.
    pub fn insert(&mut self, dataset: DatasetId, role: RoleName, grant: Grant) {
        self.datasets.entry(dataset).or_default().insert(role, grant);
    }

    /// Resolves the combined grant of a role-set on a dataset.
    ///
    /// Roles without a configured grant contribute nothing. An unknown
    /// dataset resolves to the empty grant.
    #[must_use]
    pub fn resolve(&self, dataset: &DatasetId, roles: &[RoleName]) -> Grant {
        let Some(role_grants) = self.datasets.get(dataset) else {
            return Grant::none();
        };
        Grant::union_of(roles.iter().filter_map(|role| role_grants.get(role)))
    }
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Checks that the grant permits the requested operation.
///
/// # Errors
///
/// Returns [`EngineError::DatasetNotFound`] when the dataset is not readable
/// under the grant, and [`EngineError::PermissionDenied`] when the operation
/// flag is missing.
pub fn ensure_operation(
    dataset: &DatasetId,
    grant: &Grant,
    operation: Operation,
) -> Result<(), EngineError> {
    if !grant.readable {
        return Err(EngineError::DatasetNotFound {
            dataset: dataset.clone(),
        });
    }
    if !grant.permits(operation) {
        return Err(EngineError::PermissionDenied {
            dataset: dataset.clone(),
            operation,
            fields: Vec::new(),
        });
    }
    Ok(())
}

/// Checks that every payload property targeting a dataset field is within
/// the granted attribute set.
///
/// Property names that match no configured field are ignored; the write path
/// drops them. The primary key travels as the feature id, not a property.
///
/// # Errors
///
/// Returns [`EngineError::PermissionDenied`] naming every out-of-grant field.
pub fn ensure_writable_fields(
    dataset: &DatasetDef,
    grant: &Grant,
    operation: Operation,
    payload: &FeaturePayload,
) -> Result<(), EngineError> {
    let denied: Vec<String> = payload
        .properties
        .keys()
        .filter(|name| dataset.field(name).is_some() && !grant.permits_attribute(name))
        .cloned()
        .collect();
    if denied.is_empty() {
        return Ok(());
    }
    Err(EngineError::PermissionDenied {
        dataset: dataset.id.clone(),
        operation,
        fields: denied,
    })
}

/// Checks that every filtered field is a visible dataset field under the
/// grant.
///
/// Filters over unknown, hidden, or ungranted fields are denied together as
/// a read permission failure, so filtering cannot probe invisible columns.
///
/// # Errors
///
/// Returns [`EngineError::PermissionDenied`] naming every invisible field.
pub fn ensure_filterable_fields(
    dataset: &DatasetDef,
    grant: &Grant,
    filters: &[AttributeFilter],
) -> Result<(), EngineError> {
    let denied: Vec<String> = filters
        .iter()
        .filter(|filter| {
            !dataset.field(&filter.field).is_some_and(|field| {
                !field.constraints.hidden && grant.permits_attribute(&field.name)
            })
        })
        .map(|filter| filter.field.clone())
        .collect();
    if denied.is_empty() {
        return Ok(());
    }
    Err(EngineError::PermissionDenied {
        dataset: dataset.id.clone(),
        operation: Operation::Read,
        fields: denied,
    })
}

/// Iterates the fields visible in read responses under the grant.
///
/// Hidden fields are stored but never rendered; ungranted fields are
/// omitted entirely.
pub fn visible_fields<'a>(
    dataset: &'a DatasetDef,
    grant: &'a Grant,
) -> impl Iterator<Item = &'a FieldDef> {
    dataset
        .fields
        .iter()
        .filter(|field| !field.constraints.hidden && grant.permits_attribute(&field.name))
}
