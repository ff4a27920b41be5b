// crates/geodata-core/src/runtime/mod.rs
// ============================================================================
// Module: GeoData Runtime
// Description: Validators, permission resolution, and the mutation engine.
// Purpose: Group the behavioral half of the crate over the core data model.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime turns the immutable data model into behavior: field,
//! geometry, and attachment validators; grant resolution; audit stamping;
//! relation planning; and the mutation coordinator tying them together over
//! a feature store. The in-memory store backs tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod attachment;
pub mod audit;
pub mod field;
pub mod geometry;
pub mod memory;
pub mod mutation;
pub mod permissions;
pub mod relations;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use attachment::AttachmentCheck;
pub use attachment::effective_extensions;
pub use attachment::effective_policy;
pub use attachment::validate_attachment;
pub use audit::AuditConfig;
pub use audit::apply_audit_stamps;
pub use audit::apply_upload_stamps;
pub use field::FieldContext;
pub use field::FieldOutcome;
pub use field::validate_field;
pub use geometry::resolve_source_srid;
pub use geometry::validate_geometry;
pub use memory::InMemoryFeatureStore;
pub use mutation::EngineConfig;
pub use mutation::MutationEngine;
pub use mutation::RequestContext;
pub use permissions::PermissionSet;
pub use permissions::ensure_operation;
pub use permissions::ensure_writable_fields;
pub use permissions::visible_fields;
pub use relations::RelationDiff;
pub use relations::collect_relations;
pub use relations::diff_relation;
pub use telemetry::MutationMetrics;
pub use telemetry::NoopMetrics;
pub use telemetry::RequestOutcome;
