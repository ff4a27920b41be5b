// crates/geodata-config/tests/tenant_validation.rs
// ============================================================================
// Module: Tenant Validation Tests
// Description: Structural rule coverage for tenant documents.
// Purpose: Ensure invalid documents fail closed with every issue reported.
// ============================================================================

//! ## Overview
//! Validation tests for tenant document rules:
//! - Dataset and field uniqueness
//! - Relation target and foreign-key resolution
//! - Constraint applicability per data type
//! - Grant references to datasets and attributes

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

use geodata_config::ConfigIssue;
use geodata_config::TenantDoc;
use geodata_config::validate_tenant;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn tenant(value: serde_json::Value) -> TenantDoc {
    serde_json::from_value(value).unwrap()
}

fn base_dataset(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "endpoints": { "read": "store" },
        "table_name": name,
        "primary_key": "id",
        "fields": [
            { "name": "id", "data_type": "integer" },
            { "name": "label", "data_type": "text" }
        ]
    })
}

fn issues(doc: &TenantDoc) -> Vec<ConfigIssue> {
    match validate_tenant(doc) {
        Ok(()) => Vec::new(),
        Err(error) => error.issues,
    }
}

// ============================================================================
// SECTION: Uniqueness
// ============================================================================

#[test]
fn valid_minimal_tenant_passes() {
    let doc = tenant(json!({ "datasets": [base_dataset("points")] }));
    assert!(validate_tenant(&doc).is_ok());
}

#[test]
fn duplicate_dataset_names_are_rejected() {
    let doc = tenant(json!({
        "datasets": [base_dataset("points"), base_dataset("points")]
    }));
    assert!(
        issues(&doc)
            .iter()
            .any(|issue| matches!(issue, ConfigIssue::DuplicateDataset { .. }))
    );
}

#[test]
fn duplicate_field_names_are_rejected() {
    let mut dataset = base_dataset("points");
    dataset["fields"] = json!([
        { "name": "label", "data_type": "text" },
        { "name": "label", "data_type": "text" }
    ]);
    let doc = tenant(json!({ "datasets": [dataset] }));
    assert!(
        issues(&doc).iter().any(|issue| matches!(issue, ConfigIssue::DuplicateField { .. }))
    );
}

// ============================================================================
// SECTION: Relations
// ============================================================================

#[test]
fn relation_target_must_exist() {
    let mut dataset = base_dataset("points");
    dataset["relations"] = json!([{ "table": "missing", "fk_field": "point_id" }]);
    let doc = tenant(json!({ "datasets": [dataset] }));
    assert!(
        issues(&doc)
            .iter()
            .any(|issue| matches!(issue, ConfigIssue::UnknownRelationTarget { .. }))
    );
}

#[test]
fn relation_fk_field_must_exist_on_target() {
    let mut parent = base_dataset("points");
    parent["relations"] = json!([{ "table": "logs", "fk_field": "point_id" }]);
    let doc = tenant(json!({ "datasets": [parent, base_dataset("logs")] }));
    assert!(
        issues(&doc)
            .iter()
            .any(|issue| matches!(issue, ConfigIssue::MissingForeignKeyField { .. }))
    );
}

// ============================================================================
// SECTION: Constraints and Geometry
// ============================================================================

#[test]
fn non_positive_srid_is_rejected() {
    let mut dataset = base_dataset("points");
    dataset["geometry"] = json!({
        "geometry_column": "geom",
        "geometry_type": "POINT",
        "srid": 0
    });
    let doc = tenant(json!({ "datasets": [dataset] }));
    assert!(issues(&doc).iter().any(|issue| matches!(issue, ConfigIssue::InvalidSrid { .. })));
}

#[test]
fn uncompilable_pattern_is_rejected() {
    let mut dataset = base_dataset("points");
    dataset["fields"] = json!([
        { "name": "code", "data_type": "text", "constraints": { "pattern": "([A-Z" } }
    ]);
    let doc = tenant(json!({ "datasets": [dataset] }));
    assert!(
        issues(&doc).iter().any(|issue| matches!(issue, ConfigIssue::InvalidPattern { .. }))
    );
}

#[test]
fn scale_above_precision_is_rejected() {
    let mut dataset = base_dataset("points");
    dataset["fields"] = json!([
        {
            "name": "value",
            "data_type": "numeric",
            "constraints": { "numeric_precision": 3, "numeric_scale": 5 }
        }
    ]);
    let doc = tenant(json!({ "datasets": [dataset] }));
    assert!(
        issues(&doc)
            .iter()
            .any(|issue| matches!(issue, ConfigIssue::ScaleAbovePrecision { .. }))
    );
}

#[test]
fn type_bound_constraints_must_match_the_field_type() {
    let mut dataset = base_dataset("points");
    dataset["fields"] = json!([
        { "name": "label", "data_type": "text", "constraints": { "min": 1 } },
        { "name": "photo", "data_type": "text", "constraints": { "fileextensions": ["jpg"] } },
        { "name": "count", "data_type": "integer", "constraints": { "numeric_precision": 5, "numeric_scale": 2 } }
    ]);
    let doc = tenant(json!({ "datasets": [dataset] }));
    let found = issues(&doc);
    assert_eq!(
        found
            .iter()
            .filter(|issue| matches!(issue, ConfigIssue::InapplicableConstraint { .. }))
            .count(),
        3
    );
}

// ============================================================================
// SECTION: Grants
// ============================================================================

#[test]
fn grants_must_reference_configured_datasets_and_attributes() {
    let doc = tenant(json!({
        "datasets": [base_dataset("points")],
        "roles": [
            {
                "role": "editor",
                "permissions": [
                    { "dataset": "missing", "readable": true },
                    { "dataset": "points", "attributes": ["label", "ghost"], "readable": true }
                ]
            }
        ]
    }));
    let found = issues(&doc);
    assert!(found.iter().any(|issue| matches!(issue, ConfigIssue::UnknownGrantDataset { .. })));
    assert!(
        found.iter().any(|issue| matches!(
            issue,
            ConfigIssue::UnknownGrantAttribute { attribute, .. } if attribute == "ghost"
        ))
    );
}

#[test]
fn primary_key_counts_as_a_grantable_attribute() {
    let doc = tenant(json!({
        "datasets": [base_dataset("points")],
        "roles": [
            {
                "role": "viewer",
                "permissions": [
                    { "dataset": "points", "attributes": ["id"], "readable": true }
                ]
            }
        ]
    }));
    assert!(validate_tenant(&doc).is_ok());
}

#[test]
fn every_issue_is_collected_in_one_pass() {
    let mut bad = base_dataset("points");
    bad["geometry"] = json!({
        "geometry_column": "geom",
        "geometry_type": "POINT",
        "srid": -1
    });
    bad["relations"] = json!([{ "table": "missing", "fk_field": "x" }]);
    let doc = tenant(json!({
        "datasets": [bad],
        "roles": [
            { "role": "r", "permissions": [{ "dataset": "nope", "readable": true }] }
        ]
    }));
    assert!(issues(&doc).len() >= 3);
}
