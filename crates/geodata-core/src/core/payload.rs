// crates/geodata-core/src/core/payload.rs
// ============================================================================
// Module: Feature Payloads
// Description: GeoJSON Feature wire forms for inbound and outbound records.
// Purpose: Parse untrusted feature payloads and render stored records.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! Features travel as GeoJSON. The `properties` map carries attribute values,
//! `geometry` carries the spatial value, and properties may additionally hold
//! relation arrays under keys matching configured relation table names. The
//! payload types here are deliberately loose; every value is untrusted until
//! the validators have normalized it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::DatasetId;

// ============================================================================
// SECTION: CRS
// ============================================================================

/// GeoJSON named CRS object.
///
/// # Invariants
/// - Only the `name` CRS type is supported; the engine rejects others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrsRef {
    /// CRS object type; must be `name`.
    #[serde(rename = "type")]
    pub crs_type: String,
    /// CRS properties holding the identifier.
    pub properties: CrsProperties,
}

/// Properties of a named CRS object.
///
/// # Invariants
/// - `name` is an OGC URN or `EPSG:<srid>` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrsProperties {
    /// CRS identifier string.
    pub name: String,
}

impl CrsRef {
    /// Builds the canonical OGC URN CRS reference for an SRID.
    #[must_use]
    pub fn epsg(srid: i32) -> Self {
        Self {
            crs_type: "name".to_string(),
            properties: CrsProperties {
                name: format!("urn:ogc:def:crs:EPSG::{srid}"),
            },
        }
    }

    /// Parses the SRID out of the CRS identifier.
    ///
    /// Accepts `EPSG:<srid>`, `urn:ogc:def:crs:EPSG::<srid>`, and the
    /// equivalent OGC URNs; `CRS84` maps to EPSG:4326. Returns `None` for
    /// unrecognized identifiers or a non-`name` CRS type.
    #[must_use]
    pub fn srid(&self) -> Option<i32> {
        if self.crs_type != "name" {
            return None;
        }
        parse_crs_name(&self.properties.name)
    }
}

/// Parses an SRID from a CRS identifier string.
#[must_use]
pub fn parse_crs_name(name: &str) -> Option<i32> {
    if let Some(rest) = name.strip_prefix("EPSG:") {
        return rest.parse::<i32>().ok().filter(|srid| *srid > 0);
    }
    if name.starts_with("urn:ogc:def:crs") {
        let tail = name.rsplit(':').next()?;
        if tail == "CRS84" {
            return Some(4326);
        }
        return tail.parse::<i32>().ok().filter(|srid| *srid > 0);
    }
    None
}

// ============================================================================
// SECTION: Feature Payload
// ============================================================================

/// Inbound GeoJSON Feature payload.
///
/// # Invariants
/// - `feature_type` must be `Feature`; anything else fails validation.
/// - `geometry` distinguishes "absent" from "explicitly null" because the two
///   validate differently on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePayload {
    /// GeoJSON object type; must be `Feature`.
    #[serde(rename = "type")]
    pub feature_type: String,
    /// Primary-key value; absent on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Attribute values keyed by field name.
    pub properties: Map<String, Value>,
    /// Geometry value; `None` when the key is absent, `Some(Value::Null)`
    /// when explicitly null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    /// Declared CRS of the geometry value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<CrsRef>,
    /// Nested relation arrays keyed by relation table name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<DatasetId, Vec<FeaturePayload>>,
}

impl FeaturePayload {
    /// Creates an empty feature payload.
    #[must_use]
    pub fn new() -> Self {
        Self {
            feature_type: "Feature".to_string(),
            id: None,
            properties: Map::new(),
            geometry: None,
            crs: None,
            relations: BTreeMap::new(),
        }
    }

    /// Returns whether the payload declares the GeoJSON `Feature` type.
    #[must_use]
    pub fn is_feature(&self) -> bool {
        self.feature_type == "Feature"
    }

    /// Returns the SRID declared by the payload's CRS, if any.
    #[must_use]
    pub fn declared_srid(&self) -> Option<i32> {
        self.crs.as_ref().and_then(CrsRef::srid)
    }
}

impl Default for FeaturePayload {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Outbound Features
// ============================================================================

/// Outbound GeoJSON Feature built from a stored record.
///
/// # Invariants
/// - `properties` holds only attributes visible under the requesting grant,
///   with hidden fields omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// GeoJSON object type; always `Feature`.
    #[serde(rename = "type")]
    pub feature_type: String,
    /// Primary-key value.
    pub id: Value,
    /// Visible attribute values.
    pub properties: Map<String, Value>,
    /// Geometry value; JSON null for NULL geometries.
    pub geometry: Value,
    /// CRS of the geometry; `None` for datasets without geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<CrsRef>,
    /// Relation arrays keyed by relation table name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<DatasetId, Vec<Feature>>,
}

/// Outbound GeoJSON FeatureCollection for bulk reads.
///
/// # Invariants
/// - All member features share the collection CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// GeoJSON object type; always `FeatureCollection`.
    #[serde(rename = "type")]
    pub collection_type: String,
    /// Member features.
    pub features: Vec<Feature>,
    /// CRS shared by all member features.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<CrsRef>,
}

impl FeatureCollection {
    /// Creates a feature collection from features and an optional CRS.
    #[must_use]
    pub fn new(features: Vec<Feature>, crs: Option<CrsRef>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            features,
            crs,
        }
    }
}

// ============================================================================
// SECTION: Uploads
// ============================================================================

/// Metadata for one uploaded attachment file.
///
/// # Invariants
/// - `field_name` names a `file`-typed field of the target dataset.
/// - `size_bytes` is the actual content size, never the Content-Length claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMeta {
    /// Target field name.
    pub field_name: String,
    /// Original file name, used for extension checks.
    pub file_name: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// File content submitted to the scan collaborator.
    pub content: Vec<u8>,
}
