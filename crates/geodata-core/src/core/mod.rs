// crates/geodata-core/src/core/mod.rs
// ============================================================================
// Module: GeoData Core Types
// Description: Data model shared by validators, coordinator, and stores.
// Purpose: Group identifier, dataset, grant, payload, value, and error types.
// Dependencies: serde, serde_json, bigdecimal, time, thiserror
// ============================================================================

//! ## Overview
//! The core module holds the immutable data model: identifiers, dataset
//! definitions, permission grants, feature payload wire forms, normalized
//! field values, and the error taxonomy. Everything here is plain data;
//! behavior lives in [`crate::runtime`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dataset;
pub mod errors;
pub mod grant;
pub mod identifiers;
pub mod payload;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dataset::AllowedValue;
pub use dataset::AttachmentPolicy;
pub use dataset::ConstraintSet;
pub use dataset::DataType;
pub use dataset::DatasetDef;
pub use dataset::FieldDef;
pub use dataset::GeometryDef;
pub use dataset::GeometryType;
pub use dataset::RelationDef;
pub use dataset::StoreEndpoints;
pub use errors::ConstraintViolation;
pub use errors::EngineError;
pub use errors::FieldPath;
pub use errors::ValidationError;
pub use errors::ValidationReport;
pub use grant::Grant;
pub use grant::Operation;
pub use identifiers::DatasetId;
pub use identifiers::RoleName;
pub use identifiers::UserIdentity;
pub use payload::CrsProperties;
pub use payload::CrsRef;
pub use payload::Feature;
pub use payload::FeatureCollection;
pub use payload::FeaturePayload;
pub use payload::UploadMeta;
pub use payload::parse_crs_name;
pub use value::FieldValue;
pub use value::coerce_value;
