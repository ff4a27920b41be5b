// crates/geodata-config/src/resolve.rs
// ============================================================================
// Module: Engine Resolution
// Description: Conversion of validated tenant documents into engine config.
// Purpose: Produce the immutable EngineConfig one generation at a time.
// Dependencies: crate::document, geodata-core
// ============================================================================

//! ## Overview
//! Resolution maps documents onto the engine's immutable data model. It runs
//! after validation, so lookups are total; the output is built fresh on
//! every configuration generation and swapped in atomically by the host.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use geodata_core::DatasetDef;
use geodata_core::DatasetId;
use geodata_core::FieldDef;
use geodata_core::GeometryDef;
use geodata_core::Grant;
use geodata_core::RelationDef;
use geodata_core::runtime::EngineConfig;
use geodata_core::runtime::PermissionSet;

use crate::document::DatasetDoc;
use crate::document::TenantDoc;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves a validated tenant document into an engine configuration.
#[must_use]
pub fn resolve_tenant(tenant: &TenantDoc) -> EngineConfig {
    let mut datasets = BTreeMap::new();
    for dataset in &tenant.datasets {
        datasets.insert(dataset.name.clone(), resolve_dataset(dataset));
    }

    let mut permissions = PermissionSet::new();
    for role in &tenant.roles {
        for grant in &role.permissions {
            permissions.insert(
                grant.dataset.clone(),
                role.role.clone(),
                Grant {
                    attributes: grant.attributes.iter().cloned().collect(),
                    readable: grant.readable,
                    creatable: grant.creatable,
                    updatable: grant.updatable,
                    deletable: grant.deletable,
                    writable: grant.writable,
                },
            );
        }
    }

    EngineConfig {
        datasets,
        permissions,
        attachment_policy: tenant.attachments.clone(),
        audit: tenant.audit.clone(),
    }
}

/// Resolves one dataset document.
fn resolve_dataset(doc: &DatasetDoc) -> DatasetDef {
    DatasetDef {
        id: doc.name.clone(),
        endpoints: doc.endpoints.clone(),
        schema: doc.schema.clone(),
        table_name: doc.table_name.clone(),
        primary_key: doc.primary_key.clone(),
        fields: doc
            .fields
            .iter()
            .map(|field| FieldDef {
                name: field.name.clone(),
                data_type: field.data_type,
                constraints: field.constraints.clone(),
            })
            .collect(),
        geometry: doc.geometry.as_ref().map(|geometry| GeometryDef {
            geometry_column: geometry.geometry_column.clone(),
            geometry_type: geometry.geometry_type,
            srid: geometry.srid,
            allow_null: geometry.allow_null,
        }),
        relations: doc
            .relations
            .iter()
            .map(|relation| RelationDef {
                table: relation.table.clone(),
                fk_field: relation.fk_field.clone(),
                sort_field: relation.sort_field.clone(),
            })
            .collect(),
        attachment_policy: doc.attachments.clone(),
        server_generated_key: doc.server_generated_key,
    }
}

/// Convenience lookup of one resolved dataset by id.
#[must_use]
pub fn resolve_single_dataset(tenant: &TenantDoc, id: &DatasetId) -> Option<DatasetDef> {
    tenant.datasets.iter().find(|dataset| &dataset.name == id).map(resolve_dataset)
}
