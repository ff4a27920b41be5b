// crates/geodata-core/src/lib.rs
// ============================================================================
// Module: GeoData Core Library
// Description: Feature validation and transactional mutation engine.
// Purpose: Validate GeoJSON feature payloads and apply atomic CRUD writes.
// Dependencies: bigdecimal, regex-lite, serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! GeoData Core validates untrusted GeoJSON feature payloads against
//! per-dataset metadata and applies them through pluggable feature stores.
//! Invariants:
//! - Every request runs permission checks before any validation or read.
//! - A rejected payload reports every field and relation problem at once.
//! - A mutation touching a feature and its relation rows commits atomically
//!   or not at all; exactly one transaction per request, released on every
//!   exit path.
//! - Attachment scans finish before the transaction opens.
//!
//! Security posture: payload values, geometries, and uploaded files are
//! untrusted input; validators normalize or reject them before any store
//! statement is issued.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::AllowedValue;
pub use core::AttachmentPolicy;
pub use core::ConstraintSet;
pub use core::ConstraintViolation;
pub use core::CrsRef;
pub use core::DataType;
pub use core::DatasetDef;
pub use core::DatasetId;
pub use core::EngineError;
pub use core::Feature;
pub use core::FeatureCollection;
pub use core::FeaturePayload;
pub use core::FieldDef;
pub use core::FieldPath;
pub use core::FieldValue;
pub use core::GeometryDef;
pub use core::GeometryType;
pub use core::Grant;
pub use core::Operation;
pub use core::RelationDef;
pub use core::RoleName;
pub use core::StoreEndpoints;
pub use core::UploadMeta;
pub use core::UserIdentity;
pub use core::ValidationError;
pub use core::ValidationReport;
pub use interfaces::AttachmentScanner;
pub use interfaces::AttributeFilter;
pub use interfaces::Clock;
pub use interfaces::FeatureStore;
pub use interfaces::FeatureTransaction;
pub use interfaces::FilterOp;
pub use interfaces::GeometryWrite;
pub use interfaces::RecordWrite;
pub use interfaces::ScanError;
pub use interfaces::ScanVerdict;
pub use interfaces::StoreError;
pub use interfaces::StoredRecord;
pub use interfaces::SystemClock;
pub use runtime::AuditConfig;
pub use runtime::EngineConfig;
pub use runtime::InMemoryFeatureStore;
pub use runtime::MutationEngine;
pub use runtime::MutationMetrics;
pub use runtime::NoopMetrics;
pub use runtime::PermissionSet;
pub use runtime::RequestContext;
pub use runtime::RequestOutcome;
