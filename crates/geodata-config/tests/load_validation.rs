// crates/geodata-config/tests/load_validation.rs
// ============================================================================
// Module: Load and Resolution Tests
// Description: File-loading pipeline and engine-config resolution coverage.
// Purpose: Ensure loads fail closed and resolved configs drive the engine.
// ============================================================================

//! ## Overview
//! Pipeline tests for configuration loading:
//! - Read/parse/validate stages produce typed errors
//! - Resolution maps documents onto engine datasets and grants
//! - A resolved configuration serves engine requests end to end

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::sync::Arc;

use geodata_config::ConfigError;
use geodata_config::load_engine_config;
use geodata_config::parse_tenant;
use geodata_config::resolve_tenant;
use geodata_core::DatasetId;
use geodata_core::FeaturePayload;
use geodata_core::InMemoryFeatureStore;
use geodata_core::MutationEngine;
use geodata_core::RequestContext;
use geodata_core::RoleName;
use geodata_core::SystemClock;
use geodata_core::UserIdentity;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn tenant_json() -> String {
    json!({
        "datasets": [
            {
                "name": "wells",
                "endpoints": { "read": "store" },
                "table_name": "wells",
                "primary_key": "id",
                "fields": [
                    { "name": "label", "data_type": "text", "constraints": { "required": true } }
                ],
                "geometry": {
                    "geometry_column": "geom",
                    "geometry_type": "POINT",
                    "srid": 4326
                }
            }
        ],
        "roles": [
            {
                "role": "editor",
                "permissions": [
                    { "dataset": "wells", "attributes": ["label"], "writable": true }
                ]
            }
        ],
        "audit": {
            "edit_user_field": "modified_by",
            "write_utc_timestamps": true
        }
    })
    .to_string()
}

// ============================================================================
// SECTION: Pipeline Stages
// ============================================================================

#[test]
fn missing_file_reports_io_error() {
    let dir = TempDir::new().unwrap();
    let result = load_engine_config(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn malformed_json_reports_parse_error() {
    let result = parse_tenant("{ not json");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn unknown_data_type_reports_parse_error() {
    let raw = json!({
        "datasets": [{
            "name": "wells",
            "endpoints": { "read": "store" },
            "table_name": "wells",
            "primary_key": "id",
            "fields": [{ "name": "label", "data_type": "varchar2" }]
        }]
    })
    .to_string();
    assert!(matches!(parse_tenant(&raw), Err(ConfigError::Parse(_))));
}

#[test]
fn structural_issues_report_validation_error() {
    let raw = json!({
        "datasets": [{
            "name": "wells",
            "endpoints": { "read": "store" },
            "table_name": "wells",
            "primary_key": "id",
            "fields": [{ "name": "label", "data_type": "text" }],
            "relations": [{ "table": "missing", "fk_field": "x" }]
        }]
    })
    .to_string();
    assert!(matches!(parse_tenant(&raw), Err(ConfigError::Invalid(_))));
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

#[test]
fn load_resolves_datasets_grants_and_audit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tenant.json");
    fs::write(&path, tenant_json()).unwrap();

    let config = load_engine_config(&path).unwrap();
    let wells = config.dataset(&DatasetId::new("wells")).unwrap();
    assert_eq!(wells.primary_key, "id");
    assert_eq!(wells.geometry.as_ref().unwrap().srid, 4326);

    let grant =
        config.permissions.resolve(&DatasetId::new("wells"), &[RoleName::new("editor")]);
    assert!(grant.writable);
    assert!(grant.readable);

    assert_eq!(config.audit.edit_user_field.as_deref(), Some("modified_by"));
}

#[test]
fn resolved_config_serves_engine_requests() {
    let tenant = parse_tenant(&tenant_json()).unwrap();
    let engine = MutationEngine::new(
        Arc::new(resolve_tenant(&tenant)),
        Arc::new(InMemoryFeatureStore::new()),
        Arc::new(SystemClock),
    );
    let ctx = RequestContext {
        user: UserIdentity::new("alice"),
        roles: vec![RoleName::new("editor")],
    };

    let mut payload = FeaturePayload::new();
    payload.properties.insert("label".to_string(), json!("W-1"));
    payload.geometry = Some(json!({ "type": "Point", "coordinates": [8.5, 47.4] }));

    let created = engine.create_feature(&ctx, &DatasetId::new("wells"), &payload, &[]).unwrap();
    assert_eq!(created.properties.get("label"), Some(&json!("W-1")));
    assert_eq!(
        engine.list_features(&ctx, &DatasetId::new("wells"), &[]).unwrap().features.len(),
        1
    );
}
