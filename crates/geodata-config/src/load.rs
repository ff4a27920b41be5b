// crates/geodata-config/src/load.rs
// ============================================================================
// Module: Configuration Loading
// Description: File loading, parsing, validation, and resolution pipeline.
// Purpose: Turn a tenant configuration file into an engine configuration.
// Dependencies: crate::document, crate::resolve, crate::validate, serde_json
// ============================================================================

//! ## Overview
//! Loading is a strict pipeline: read, parse, validate, resolve. Any stage
//! failure aborts the load with a typed error; a tenant never serves
//! requests from a partially valid configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use geodata_core::runtime::EngineConfig;
use thiserror::Error;

use crate::document::TenantDoc;
use crate::resolve::resolve_tenant;
use crate::validate::ConfigValidationError;
use crate::validate::validate_tenant;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration load errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file is not valid JSON for the document model.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// Document violates structural rules.
    #[error(transparent)]
    Invalid(#[from] ConfigValidationError),
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Parses and validates a tenant document from a JSON string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
pub fn parse_tenant(raw: &str) -> Result<TenantDoc, ConfigError> {
    let tenant: TenantDoc = serde_json::from_str(raw)?;
    validate_tenant(&tenant)?;
    Ok(tenant)
}

/// Loads a tenant configuration file into an engine configuration.
///
/// # Errors
///
/// Returns [`ConfigError`] when any pipeline stage fails.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let raw = fs::read_to_string(path)?;
    let tenant = parse_tenant(&raw)?;
    Ok(resolve_tenant(&tenant))
}
