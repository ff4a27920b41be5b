// crates/geodata-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Transaction scope and record mapping coverage.
// Purpose: Ensure the SQLite store honors the feature-store contract.
// ============================================================================

//! ## Overview
//! Store tests against a real database file:
//! - Insert/fetch/update/delete round trips with generated and explicit keys
//! - Constraint conflicts map to the conflict error
//! - Uncommitted scopes leave nothing observable
//! - The mutation engine runs end to end over this store

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

use std::collections::BTreeMap;
use std::sync::Arc;

use geodata_core::AttachmentPolicy;
use geodata_core::AttributeFilter;
use geodata_core::ConstraintSet;
use geodata_core::DataType;
use geodata_core::DatasetDef;
use geodata_core::DatasetId;
use geodata_core::EngineConfig;
use geodata_core::FeaturePayload;
use geodata_core::FieldDef;
use geodata_core::FilterOp;
use geodata_core::GeometryDef;
use geodata_core::GeometryType;
use geodata_core::GeometryWrite;
use geodata_core::Grant;
use geodata_core::MutationEngine;
use geodata_core::PermissionSet;
use geodata_core::RecordWrite;
use geodata_core::RequestContext;
use geodata_core::RoleName;
use geodata_core::StoreEndpoints;
use geodata_core::StoreError;
use geodata_core::SystemClock;
use geodata_core::UserIdentity;
use geodata_core::interfaces::FeatureStore;
use geodata_core::runtime::AuditConfig;
use geodata_store_sqlite::SqliteFeatureStore;
use geodata_store_sqlite::SqliteJournalMode;
use geodata_store_sqlite::SqliteStoreConfig;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn points_dataset() -> DatasetDef {
    DatasetDef {
        id: DatasetId::new("points"),
        endpoints: StoreEndpoints {
            read: "store".to_string(),
            write: None,
        },
        schema: "public".to_string(),
        table_name: "points".to_string(),
        primary_key: "id".to_string(),
        fields: vec![
            FieldDef {
                name: "label".to_string(),
                data_type: DataType::Text,
                constraints: ConstraintSet {
                    required: true,
                    ..ConstraintSet::default()
                },
            },
            FieldDef {
                name: "rank".to_string(),
                data_type: DataType::Integer,
                constraints: ConstraintSet::default(),
            },
        ],
        geometry: Some(GeometryDef {
            geometry_column: "geom".to_string(),
            geometry_type: GeometryType::Point,
            srid: 4326,
            allow_null: false,
        }),
        relations: vec![],
        attachment_policy: None,
        server_generated_key: true,
    }
}

fn logs_dataset() -> DatasetDef {
    DatasetDef {
        id: DatasetId::new("logs"),
        endpoints: StoreEndpoints {
            read: "store".to_string(),
            write: None,
        },
        schema: "public".to_string(),
        table_name: "logs".to_string(),
        primary_key: "id".to_string(),
        fields: vec![
            FieldDef {
                name: "note".to_string(),
                data_type: DataType::Text,
                constraints: ConstraintSet::default(),
            },
            FieldDef {
                name: "point_id".to_string(),
                data_type: DataType::Integer,
                constraints: ConstraintSet::default(),
            },
        ],
        geometry: None,
        relations: vec![],
        attachment_policy: None,
        server_generated_key: true,
    }
}

fn open_store(dir: &TempDir) -> SqliteFeatureStore {
    let store = SqliteFeatureStore::open(SqliteStoreConfig {
        path: dir.path().join("features.db"),
        busy_timeout_ms: 5_000,
        journal_mode: SqliteJournalMode::Wal,
    })
    .unwrap();
    store.ensure_dataset(&points_dataset(), &[]).unwrap();
    store.ensure_dataset(&logs_dataset(), &[]).unwrap();
    store
}

fn point_write(label: &str, rank: i64) -> RecordWrite {
    let mut columns = BTreeMap::new();
    columns.insert("label".to_string(), json!(label));
    columns.insert("rank".to_string(), json!(rank));
    RecordWrite {
        pk: None,
        columns,
        geometry: Some(GeometryWrite {
            geojson: json!({ "type": "Point", "coordinates": [8.54, 47.38] }),
            source_srid: 4326,
            target_srid: 4326,
        }),
    }
}

// ============================================================================
// SECTION: Record Round Trips
// ============================================================================

#[test]
fn insert_generates_key_and_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let dataset = points_dataset();

    let mut txn = store.begin().unwrap();
    let inserted = txn.insert_record(&dataset, &point_write("alpha", 3)).unwrap();
    assert_ne!(inserted.pk, Value::Null);
    assert_eq!(inserted.attributes.get("label"), Some(&json!("alpha")));
    assert_eq!(inserted.attributes.get("rank"), Some(&json!(3)));
    assert_eq!(
        inserted.geometry,
        Some(json!({ "type": "Point", "coordinates": [8.54, 47.38] }))
    );
    let pk = inserted.pk.clone();
    txn.commit().unwrap();

    let mut txn = store.begin().unwrap();
    let fetched = txn.fetch_record(&dataset, &pk).unwrap().unwrap();
    assert_eq!(fetched, inserted);
    txn.rollback().unwrap();
}

#[test]
fn explicit_key_is_honored_and_duplicates_conflict() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let dataset = points_dataset();

    let mut write = point_write("beta", 1);
    write.pk = Some(json!(7));

    let mut txn = store.begin().unwrap();
    let inserted = txn.insert_record(&dataset, &write).unwrap();
    assert_eq!(inserted.pk, json!(7));

    let duplicate = txn.insert_record(&dataset, &write);
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
}

#[test]
fn update_merges_columns_and_missing_rows_return_none() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let dataset = points_dataset();

    let mut txn = store.begin().unwrap();
    let pk = txn.insert_record(&dataset, &point_write("gamma", 5)).unwrap().pk;

    let mut patch = RecordWrite::default();
    patch.columns.insert("rank".to_string(), json!(9));
    let updated = txn.update_record(&dataset, &pk, &patch).unwrap().unwrap();
    assert_eq!(updated.attributes.get("rank"), Some(&json!(9)));
    assert_eq!(updated.attributes.get("label"), Some(&json!("gamma")));

    assert!(txn.update_record(&dataset, &json!(9_999), &patch).unwrap().is_none());
}

#[test]
fn delete_reports_whether_a_row_was_removed() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let dataset = points_dataset();

    let mut txn = store.begin().unwrap();
    let pk = txn.insert_record(&dataset, &point_write("delta", 0)).unwrap().pk;
    assert!(txn.delete_record(&dataset, &pk).unwrap());
    assert!(!txn.delete_record(&dataset, &pk).unwrap());
}

#[test]
fn relation_records_filter_by_foreign_key_in_key_order() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let logs = logs_dataset();

    let mut txn = store.begin().unwrap();
    for (note, point_id) in [("first", 1), ("other", 2), ("second", 1)] {
        let mut columns = BTreeMap::new();
        columns.insert("note".to_string(), json!(note));
        columns.insert("point_id".to_string(), json!(point_id));
        txn.insert_record(
            &logs,
            &RecordWrite {
                pk: None,
                columns,
                geometry: None,
            },
        )
        .unwrap();
    }

    let rows = txn.relation_records(&logs, "point_id", &json!(1)).unwrap();
    let notes: Vec<&Value> =
        rows.iter().filter_map(|row| row.attributes.get("note")).collect();
    assert_eq!(notes, vec![&json!("first"), &json!("second")]);
}

#[test]
fn list_records_applies_attribute_filters_in_sql() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let dataset = points_dataset();

    let mut txn = store.begin().unwrap();
    for (label, rank) in [("alpha", 1), ("beta", 5), ("gamma", 9)] {
        txn.insert_record(&dataset, &point_write(label, rank)).unwrap();
    }

    let ranked = txn
        .list_records(
            &dataset,
            &[AttributeFilter {
                field: "rank".to_string(),
                op: FilterOp::Ge,
                value: json!(5),
            }],
        )
        .unwrap();
    let labels: Vec<&Value> =
        ranked.iter().filter_map(|row| row.attributes.get("label")).collect();
    assert_eq!(labels, vec![&json!("beta"), &json!("gamma")]);

    // Filters compose as a conjunction.
    let narrowed = txn
        .list_records(
            &dataset,
            &[
                AttributeFilter {
                    field: "rank".to_string(),
                    op: FilterOp::Ge,
                    value: json!(5),
                },
                AttributeFilter {
                    field: "label".to_string(),
                    op: FilterOp::Ne,
                    value: json!("gamma"),
                },
            ],
        )
        .unwrap();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].attributes.get("label"), Some(&json!("beta")));

    // A null comparand is a null check, not a value comparison.
    let nulls = txn
        .list_records(
            &dataset,
            &[AttributeFilter {
                field: "rank".to_string(),
                op: FilterOp::Eq,
                value: Value::Null,
            }],
        )
        .unwrap();
    assert!(nulls.is_empty());
}

// ============================================================================
// SECTION: Transaction Scope
// ============================================================================

#[test]
fn rollback_discards_every_statement() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let dataset = points_dataset();

    let mut txn = store.begin().unwrap();
    let pk = txn.insert_record(&dataset, &point_write("ghost", 1)).unwrap().pk;
    txn.rollback().unwrap();

    let mut txn = store.begin().unwrap();
    assert!(txn.fetch_record(&dataset, &pk).unwrap().is_none());
}

#[test]
fn dropping_an_unfinished_scope_rolls_back() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let dataset = points_dataset();

    {
        let mut txn = store.begin().unwrap();
        txn.insert_record(&dataset, &point_write("orphan", 1)).unwrap();
    }

    let mut txn = store.begin().unwrap();
    assert!(txn.list_records(&dataset, &[]).unwrap().is_empty());
}

#[test]
fn mismatched_srid_writes_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let dataset = points_dataset();

    let mut write = point_write("projected", 1);
    if let Some(geometry) = &mut write.geometry {
        geometry.source_srid = 3857;
    }

    let mut txn = store.begin().unwrap();
    let result = txn.insert_record(&dataset, &write);
    assert!(matches!(result, Err(StoreError::Invalid(_))));
}

// ============================================================================
// SECTION: Engine Integration
// ============================================================================

#[test]
fn engine_mutations_run_over_the_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut permissions = PermissionSet::new();
    permissions.insert(
        DatasetId::new("points"),
        RoleName::new("editor"),
        Grant {
            attributes: ["label".to_string(), "rank".to_string()].into_iter().collect(),
            writable: true,
            ..Grant::default()
        },
    );
    let mut datasets = BTreeMap::new();
    datasets.insert(DatasetId::new("points"), points_dataset());
    let config = EngineConfig {
        datasets,
        permissions,
        attachment_policy: AttachmentPolicy::default(),
        audit: AuditConfig::default(),
    };

    let engine = MutationEngine::new(Arc::new(config), store, Arc::new(SystemClock));
    let ctx = RequestContext {
        user: UserIdentity::new("alice"),
        roles: vec![RoleName::new("editor")],
    };

    let mut payload = FeaturePayload::new();
    payload.properties.insert("label".to_string(), json!("station"));
    payload.properties.insert("rank".to_string(), json!(2));
    payload.geometry = Some(json!({ "type": "Point", "coordinates": [7.45, 46.95] }));

    let created =
        engine.create_feature(&ctx, &DatasetId::new("points"), &payload, &[]).unwrap();
    assert_eq!(created.properties.get("label"), Some(&json!("station")));

    let read = engine.read_feature(&ctx, &DatasetId::new("points"), &created.id).unwrap();
    assert_eq!(read.properties.get("rank"), Some(&json!(2)));
    assert_eq!(read.geometry, json!({ "type": "Point", "coordinates": [7.45, 46.95] }));
}
