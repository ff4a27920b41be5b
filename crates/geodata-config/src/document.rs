// crates/geodata-config/src/document.rs
// ============================================================================
// Module: Tenant Configuration Documents
// Description: Serde model of the tenant dataset and permission documents.
// Purpose: Parse tenant configuration JSON into typed documents.
// Dependencies: geodata-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A tenant configuration carries two documents: resources (datasets with
//! fields, geometry, relations, and attachment policies) and permissions
//! (per-role grants on those datasets), plus tenant-global attachment and
//! audit settings. Documents are plain serde models; structural rules live
//! in [`crate::validate`], resolution into engine types in
//! [`crate::resolve`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use geodata_core::AttachmentPolicy;
use geodata_core::ConstraintSet;
use geodata_core::DataType;
use geodata_core::DatasetId;
use geodata_core::GeometryType;
use geodata_core::RoleName;
use geodata_core::StoreEndpoints;
use geodata_core::runtime::AuditConfig;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Resource Documents
// ============================================================================

/// One field of a dataset resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDoc {
    /// Column name.
    pub name: String,
    /// Declared data type.
    pub data_type: DataType,
    /// Declared constraints.
    #[serde(default)]
    pub constraints: ConstraintSet,
}

/// Geometry metadata of a dataset resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryDoc {
    /// Geometry column name.
    pub geometry_column: String,
    /// Declared geometry type family.
    pub geometry_type: GeometryType,
    /// Spatial reference identifier of the stored geometry.
    pub srid: i32,
    /// Whether NULL geometries are accepted.
    #[serde(default)]
    pub allow_null: bool,
}

/// 1:N relation declaration of a dataset resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDoc {
    /// Dataset identifier of the relation table.
    pub table: DatasetId,
    /// Foreign-key field name on the relation table.
    pub fk_field: String,
    /// Optional sort column for ordered relation arrays.
    #[serde(default)]
    pub sort_field: Option<String>,
}

/// One dataset resource.
///
/// # Invariants
/// - `name` is unique within the tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDoc {
    /// Dataset identifier.
    pub name: DatasetId,
    /// Store connection references.
    pub endpoints: StoreEndpoints,
    /// Database schema name.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Table name.
    pub table_name: String,
    /// Primary-key field name.
    pub primary_key: String,
    /// Ordered field declarations.
    pub fields: Vec<FieldDoc>,
    /// Optional geometry metadata.
    #[serde(default)]
    pub geometry: Option<GeometryDoc>,
    /// 1:N relation declarations.
    #[serde(default)]
    pub relations: Vec<RelationDoc>,
    /// Optional per-dataset attachment policy; fully replaces the global one.
    #[serde(default)]
    pub attachments: Option<AttachmentPolicy>,
    /// Whether the primary key is generated by the store on insert.
    #[serde(default = "default_true")]
    pub server_generated_key: bool,
}

/// Serde default for the database schema.
fn default_schema() -> String {
    "public".to_string()
}

/// Serde default for flags that default to true.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Permission Documents
// ============================================================================

/// Grant of one role on one dataset.
///
/// # Invariants
/// - Flags mirror [`geodata_core::Grant`]; the consistency closure applies
///   at resolution time, not in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetGrantDoc {
    /// Target dataset identifier.
    pub dataset: DatasetId,
    /// Visible attribute names.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Whether the dataset is readable.
    #[serde(default)]
    pub readable: bool,
    /// Whether new features may be created.
    #[serde(default)]
    pub creatable: bool,
    /// Whether existing features may be updated.
    #[serde(default)]
    pub updatable: bool,
    /// Whether existing features may be deleted.
    #[serde(default)]
    pub deletable: bool,
    /// Whether the dataset is writable.
    #[serde(default)]
    pub writable: bool,
}

/// All grants of one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDoc {
    /// Role name.
    pub role: RoleName,
    /// Dataset grants of the role.
    #[serde(default)]
    pub permissions: Vec<DatasetGrantDoc>,
}

// ============================================================================
// SECTION: Tenant Document
// ============================================================================

/// Complete tenant configuration document.
///
/// # Invariants
/// - Structural rules are enforced by [`crate::validate::validate_tenant`],
///   never assumed from parsing alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantDoc {
    /// Dataset resources.
    pub datasets: Vec<DatasetDoc>,
    /// Role permission documents.
    pub roles: Vec<RoleDoc>,
    /// Tenant-global attachment policy.
    pub attachments: AttachmentPolicy,
    /// Audit column configuration.
    pub audit: AuditConfig,
}
