// crates/geodata-store-sqlite/src/lib.rs
// ============================================================================
// Module: GeoData SQLite Store Library
// Description: Durable FeatureStore implementation backed by SQLite.
// Purpose: Provide real relational transaction scopes for single-node use.
// Dependencies: geodata-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! GeoData `SQLite` Store persists dataset rows in one `SQLite` database
//! file. It exists for single-node deployments and for exercising the engine
//! against a real transaction scope rather than the in-memory store.
//! Invariants:
//! - One dedicated connection per transaction scope under `BEGIN IMMEDIATE`.
//! - Dropping an unfinished transaction rolls back.
//! - The store never reprojects; mismatched SRIDs are rejected as invalid.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteFeatureStore;
pub use store::SqliteJournalMode;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
