// crates/geodata-config/src/lib.rs
// ============================================================================
// Module: GeoData Config Library
// Description: Tenant configuration model, validation, and resolution.
// Purpose: Load dataset and permission documents into engine configuration.
// Dependencies: geodata-core, regex-lite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! GeoData Config defines the tenant configuration documents (dataset
//! resources and role permissions), validates them structurally, and
//! resolves them into the engine's immutable configuration. Invariants:
//! - A load either yields a fully valid configuration or a typed error
//!   enumerating every structural issue.
//! - Resolution never mutates shared state; each generation is a fresh
//!   value the host swaps in atomically.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod document;
pub mod load;
pub mod resolve;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::DatasetDoc;
pub use document::DatasetGrantDoc;
pub use document::FieldDoc;
pub use document::GeometryDoc;
pub use document::RelationDoc;
pub use document::RoleDoc;
pub use document::TenantDoc;
pub use load::ConfigError;
pub use load::load_engine_config;
pub use load::parse_tenant;
pub use resolve::resolve_single_dataset;
pub use resolve::resolve_tenant;
pub use validate::ConfigIssue;
pub use validate::ConfigValidationError;
pub use validate::validate_tenant;
