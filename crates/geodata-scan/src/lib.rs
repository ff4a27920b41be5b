// crates/geodata-scan/src/lib.rs
// ============================================================================
// Module: GeoData Scan Library
// Description: HTTP attachment scan collaborator client.
// Purpose: Implement the engine's scanner seam against an external service.
// Dependencies: geodata-core, reqwest, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! GeoData Scan provides the HTTP implementation of the engine's attachment
//! scanner seam. Invariants:
//! - Every scan request carries a hard timeout.
//! - Transport failures and malformed responses report the collaborator
//!   unavailable rather than producing a verdict; the engine's soft-fail
//!   policy decides whether the upload passes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::HttpScanner;
pub use client::HttpScannerConfig;
pub use client::ScanClientError;
