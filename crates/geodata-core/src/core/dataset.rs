// crates/geodata-core/src/core/dataset.rs
// ============================================================================
// Module: Dataset Definitions
// Description: Dataset, field, geometry, relation, and attachment metadata.
// Purpose: Describe one relational/spatial table and its editing constraints.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! Dataset definitions are loaded once per configuration generation and
//! referenced immutably by every request. A definition maps a dataset name to
//! one table plus its field constraints, geometry metadata, 1:N relations,
//! and an optional attachment policy overriding the tenant-global one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use serde_json::Value;

use crate::core::identifiers::DatasetId;

// ============================================================================
// SECTION: Data Types
// ============================================================================

/// Declared data type of a dataset field.
///
/// # Invariants
/// - Variants are stable for serialization and configuration matching.
/// - Each variant has exactly one coercion rule in the field validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// 16-bit integer.
    Smallint,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Bigint,
    /// Boolean.
    Boolean,
    /// Arbitrary-precision decimal, optionally constrained by precision/scale.
    Numeric,
    /// 32-bit floating point.
    Real,
    /// 64-bit floating point.
    DoublePrecision,
    /// Fixed-length character string.
    Character,
    /// Variable-length character string with optional maximum length.
    CharacterVarying,
    /// Unbounded text.
    Text,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time without zone offset.
    Timestamp,
    /// Date and time with zone offset.
    TimestampTz,
    /// JSON document.
    Json,
    /// Binary JSON document.
    Jsonb,
    /// UUID string.
    Uuid,
    /// Attachment file reference.
    File,
}

impl DataType {
    /// Returns whether the type is one of the integer family.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Smallint | Self::Integer | Self::Bigint)
    }

    /// Returns whether the type is numeric (integral, decimal, or floating).
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Smallint
                | Self::Integer
                | Self::Bigint
                | Self::Numeric
                | Self::Real
                | Self::DoublePrecision
        )
    }

    /// Returns whether the type is a character type.
    #[must_use]
    pub const fn is_character(self) -> bool {
        matches!(self, Self::Character | Self::CharacterVarying | Self::Text)
    }

    /// Returns whether the type is a JSON document type.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json | Self::Jsonb)
    }
}

// ============================================================================
// SECTION: Field Constraints
// ============================================================================

/// One allowed value for an enumerated field, as a label/value pair.
///
/// # Invariants
/// - `value` comparison uses the canonical string form, never the label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowedValue {
    /// Display label shown by editing clients.
    pub label: String,
    /// Stored value.
    pub value: Value,
}

/// Constraint set declared for one field.
///
/// # Invariants
/// - All constraints are optional; an empty set accepts any type-valid value.
/// - Constraints never widen a type's value domain, only narrow it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSet {
    /// Maximum length of the value's string form.
    pub maxlength: Option<u32>,
    /// Regex the value's string form must fully match.
    pub pattern: Option<String>,
    /// Inclusive numeric minimum.
    pub min: Option<Number>,
    /// Inclusive numeric maximum.
    pub max: Option<Number>,
    /// Maximum total significant digits for numeric fields.
    pub numeric_precision: Option<u32>,
    /// Maximum digits after the decimal point for numeric fields.
    pub numeric_scale: Option<u32>,
    /// Required granularity relative to `min` (or zero when unset).
    pub step: Option<Number>,
    /// Enumerated allowed values.
    pub values: Option<Vec<AllowedValue>>,
    /// Server-managed field; incoming changes are rejected.
    #[serde(rename = "readOnly")]
    pub read_only: bool,
    /// Value must be present and non-blank.
    pub required: bool,
    /// Field is stored but omitted from read responses.
    pub hidden: bool,
    /// Per-field attachment extension allow-list, overriding dataset and
    /// global lists.
    pub fileextensions: Option<Vec<String>>,
}

/// Field definition: name, declared type, and constraint set.
///
/// # Invariants
/// - A field is validated against exactly this type/constraint set within one
///   request; definitions never change mid-request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Column name.
    pub name: String,
    /// Declared data type.
    pub data_type: DataType,
    /// Declared constraints.
    #[serde(default)]
    pub constraints: ConstraintSet,
}

// ============================================================================
// SECTION: Geometry Metadata
// ============================================================================

/// Geometry type family declared for a dataset, including Z-variants.
///
/// # Invariants
/// - Variants are stable for serialization and configuration matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeometryType {
    /// Single point.
    Point,
    /// Single point with Z coordinate.
    PointZ,
    /// Point collection.
    Multipoint,
    /// Point collection with Z coordinates.
    MultipointZ,
    /// Line string.
    Linestring,
    /// Line string with Z coordinates.
    LinestringZ,
    /// Line string collection.
    Multilinestring,
    /// Line string collection with Z coordinates.
    MultilinestringZ,
    /// Polygon.
    Polygon,
    /// Polygon with Z coordinates.
    PolygonZ,
    /// Polygon collection.
    Multipolygon,
    /// Polygon collection with Z coordinates.
    MultipolygonZ,
    /// Heterogeneous geometry collection.
    GeometryCollection,
    /// Heterogeneous geometry collection with Z coordinates.
    GeometryCollectionZ,
    /// Any geometry type.
    Geometry,
}

impl GeometryType {
    /// Returns whether the declared type carries a Z coordinate.
    #[must_use]
    pub const fn has_z(self) -> bool {
        matches!(
            self,
            Self::PointZ
                | Self::MultipointZ
                | Self::LinestringZ
                | Self::MultilinestringZ
                | Self::PolygonZ
                | Self::MultipolygonZ
                | Self::GeometryCollectionZ
        )
    }

    /// Returns the GeoJSON type name of the declared family, or `None` for
    /// the wildcard `Geometry` type.
    #[must_use]
    pub const fn geojson_family(self) -> Option<&'static str> {
        match self {
            Self::Point | Self::PointZ => Some("Point"),
            Self::Multipoint | Self::MultipointZ => Some("MultiPoint"),
            Self::Linestring | Self::LinestringZ => Some("LineString"),
            Self::Multilinestring | Self::MultilinestringZ => Some("MultiLineString"),
            Self::Polygon | Self::PolygonZ => Some("Polygon"),
            Self::Multipolygon | Self::MultipolygonZ => Some("MultiPolygon"),
            Self::GeometryCollection | Self::GeometryCollectionZ => Some("GeometryCollection"),
            Self::Geometry => None,
        }
    }
}

/// Geometry metadata for a dataset.
///
/// # Invariants
/// - `srid` is positive.
/// - `allow_null` defaults to false: geometry is mandatory unless configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryDef {
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

// ============================================================================
// SECTION: Relations
// ============================================================================

/// 1:N relation definition linking a dependent dataset to this one.
///
/// # Invariants
/// - Relation rows are keyed by `fk_field` equal to the parent's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Dataset identifier of the relation table.
    pub table: DatasetId,
    /// Foreign-key field name on the relation table.
    pub fk_field: String,
    /// Optional sort column for ordered relation arrays.
    #[serde(default)]
    pub sort_field: Option<String>,
}

// ============================================================================
// SECTION: Attachment Policy
// ============================================================================

/// Attachment validation policy, either tenant-global or per-dataset.
///
/// # Invariants
/// - A per-dataset policy fully replaces the global one; values are never
///   intersected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentPolicy {
    /// Comma-separated allow-list of file extensions (with leading dot).
    /// Empty means any extension is accepted.
    pub allowed_extensions: String,
    /// Maximum attachment file size in bytes.
    pub max_attachment_file_size: u64,
    /// Whether a scan-collaborator outage passes (`true`) or fails (`false`)
    /// the attachment.
    pub scan_soft_fail: bool,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: String::new(),
            max_attachment_file_size: 10 * 1024 * 1024,
            scan_soft_fail: false,
        }
    }
}

// ============================================================================
// SECTION: Dataset Definition
// ============================================================================

/// Store endpoint references for a dataset.
///
/// # Invariants
/// - `write` falls back to `read` when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEndpoints {
    /// Read endpoint reference.
    pub read: String,
    /// Optional separate write endpoint reference.
    #[serde(default)]
    pub write: Option<String>,
}

impl StoreEndpoints {
    /// Returns the effective write endpoint.
    #[must_use]
    pub fn write_endpoint(&self) -> &str {
        self.write.as_deref().unwrap_or(&self.read)
    }
}

/// Complete definition of one dataset.
///
/// # Invariants
/// - Immutable once loaded; shared by reference across concurrent requests.
/// - `fields` order is the declared column order and is preserved in output.
/// - `primary_key` names a column that need not appear in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDef {
    /// Dataset identifier.
    pub id: DatasetId,
    /// Store connection references.
    pub endpoints: StoreEndpoints,
    /// Database schema name.
    pub schema: String,
    /// Table name.
    pub table_name: String,
    /// Primary-key field name.
    pub primary_key: String,
    /// Ordered field definitions.
    pub fields: Vec<FieldDef>,
    /// Optional geometry metadata; `None` for datasets without geometry.
    #[serde(default)]
    pub geometry: Option<GeometryDef>,
    /// 1:N relation definitions.
    #[serde(default)]
    pub relations: Vec<RelationDef>,
    /// Optional per-dataset attachment policy overriding the global one.
    #[serde(default)]
    pub attachment_policy: Option<AttachmentPolicy>,
    /// Whether the primary key is generated by the store on insert.
    #[serde(default = "default_true")]
    pub server_generated_key: bool,
}

/// Serde default helper for flags that default to true.
const fn default_true() -> bool {
    true
}

impl DatasetDef {
    /// Looks up a field definition by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Looks up a relation definition by its table dataset id.
    #[must_use]
    pub fn relation(&self, table: &DatasetId) -> Option<&RelationDef> {
        self.relations.iter().find(|relation| &relation.table == table)
    }
}
