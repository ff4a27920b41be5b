// crates/geodata-core/src/runtime/mutation.rs
// ============================================================================
// Module: Mutation Coordinator
// Description: Transactional feature CRUD over validators and a store.
// Purpose: Run permission checks, validation, and atomic multi-table writes
//          for one request.
// Dependencies: crate::core, crate::interfaces, crate::runtime, serde_json
// ============================================================================

//! ## Overview
//! The coordinator owns the request lifecycle: resolve the grant, check the
//! operation, validate attachments (before any transaction opens), then run
//! all reads, validation, and writes of one request inside a single store
//! transaction. A mutation touching a feature and its relation rows commits
//! atomically or not at all; validation failures roll back without side
//! effects. The coordinator never retries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::core::AttachmentPolicy;
use crate::core::ConstraintViolation;
use crate::core::CrsRef;
use crate::core::DataType;
use crate::core::DatasetDef;
use crate::core::DatasetId;
use crate::core::EngineError;
use crate::core::Feature;
use crate::core::FeatureCollection;
use crate::core::FeaturePayload;
use crate::core::FieldPath;
use crate::core::Grant;
use crate::core::Operation;
use crate::core::RelationDef;
use crate::core::RoleName;
use crate::core::UploadMeta;
use crate::core::UserIdentity;
use crate::core::ValidationReport;
use crate::interfaces::AttachmentScanner;
use crate::interfaces::AttributeFilter;
use crate::interfaces::Clock;
use crate::interfaces::FeatureStore;
use crate::interfaces::FeatureTransaction;
use crate::interfaces::RecordWrite;
use crate::interfaces::StoreError;
use crate::interfaces::StoredRecord;
use crate::runtime::attachment::validate_attachment;
use crate::runtime::audit::AuditConfig;
use crate::runtime::audit::apply_audit_stamps;
use crate::runtime::audit::apply_upload_stamps;
use crate::runtime::field::FieldContext;
use crate::runtime::field::FieldOutcome;
use crate::runtime::field::validate_field;
use crate::runtime::geometry::resolve_source_srid;
use crate::runtime::geometry::validate_geometry;
use crate::runtime::permissions::PermissionSet;
use crate::runtime::permissions::ensure_filterable_fields;
use crate::runtime::permissions::ensure_operation;
use crate::runtime::permissions::ensure_writable_fields;
use crate::runtime::permissions::visible_fields;
use crate::runtime::relations::collect_relations;
use crate::runtime::relations::diff_relation;
use crate::runtime::telemetry::MutationMetrics;
use crate::runtime::telemetry::NoopMetrics;
use crate::runtime::telemetry::RequestOutcome;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Resolved tenant configuration shared by every request.
///
/// # Invariants
/// - Immutable once built; a configuration reload builds a new value and
///   swaps the [`Arc`], never mutating in place.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Dataset definitions keyed by dataset id.
    pub datasets: BTreeMap<DatasetId, DatasetDef>,
    /// Per-dataset, per-role grants.
    pub permissions: PermissionSet,
    /// Tenant-global attachment policy.
    pub attachment_policy: AttachmentPolicy,
    /// Audit column configuration.
    pub audit: AuditConfig,
}

impl EngineConfig {
    /// Looks up a dataset definition.
    #[must_use]
    pub fn dataset(&self, id: &DatasetId) -> Option<&DatasetDef> {
        self.datasets.get(id)
    }
}

/// Identity and role-set of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated identity, used for audit stamps.
    pub user: UserIdentity,
    /// Resolved role-set of the identity.
    pub roles: Vec<RoleName>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Feature mutation engine for one tenant.
///
/// # Invariants
/// - Exactly one store transaction per request, released on every exit path.
/// - Attachment scans complete before the transaction opens.
pub struct MutationEngine<S> {
    config: Arc<EngineConfig>,
    store: S,
    scanner: Option<Arc<dyn AttachmentScanner>>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MutationMetrics>,
}

impl<S: FeatureStore> MutationEngine<S> {
    /// Creates an engine with no scanner and discarded metrics.
    pub fn new(config: Arc<EngineConfig>, store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            scanner: None,
            clock,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Attaches an attachment scan collaborator.
    #[must_use]
    pub fn with_scanner(mut self, scanner: Arc<dyn AttachmentScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Attaches a metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MutationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Reads one feature by primary-key value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DatasetNotFound`], [`EngineError::FeatureNotFound`],
    /// or store errors.
    pub fn read_feature(
        &self,
        ctx: &RequestContext,
        dataset_id: &DatasetId,
        pk: &Value,
    ) -> Result<Feature, EngineError> {
        let (dataset, grant) = self.authorize(ctx, dataset_id, Operation::Read)?;
        let mut txn = self.store.begin().map_err(map_store_error)?;
        let result = self.read_in_txn(&mut *txn, ctx, dataset, &grant, pk);
        let _ = txn.rollback();
        self.record(dataset_id, Operation::Read, &result);
        result
    }

    /// Lists the features of a dataset matching every attribute filter as a
    /// feature collection. An empty filter slice lists the whole dataset.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DatasetNotFound`], [`EngineError::PermissionDenied`]
    /// for filters over invisible fields, or store errors.
    pub fn list_features(
        &self,
        ctx: &RequestContext,
        dataset_id: &DatasetId,
        filters: &[AttributeFilter],
    ) -> Result<FeatureCollection, EngineError> {
        let (dataset, grant) = self.authorize(ctx, dataset_id, Operation::Read)?;
        ensure_filterable_fields(dataset, &grant, filters)?;
        let mut txn = self.store.begin().map_err(map_store_error)?;
        let result = (|| {
            let records = txn.list_records(dataset, filters).map_err(map_store_error)?;
            let features = records
                .into_iter()
                .map(|record| self.render_feature(&mut *txn, ctx, dataset, &grant, &record, false))
                .collect::<Result<Vec<_>, _>>()?;
            let crs = dataset.geometry.as_ref().map(|geom| CrsRef::epsg(geom.srid));
            Ok(FeatureCollection::new(features, crs))
        })();
        let _ = txn.rollback();
        self.record(dataset_id, Operation::Read, &result);
        result
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Creates a feature, with its relation rows, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns permission, validation, or store errors; nothing is written
    /// on any error.
    pub fn create_feature(
        &self,
        ctx: &RequestContext,
        dataset_id: &DatasetId,
        payload: &FeaturePayload,
        uploads: &[UploadMeta],
    ) -> Result<Feature, EngineError> {
        self.mutate(ctx, dataset_id, Operation::Create, None, payload, uploads)
    }

    /// Updates a feature, replacing its relation rows, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns permission, validation, or store errors; nothing is written
    /// on any error.
    pub fn update_feature(
        &self,
        ctx: &RequestContext,
        dataset_id: &DatasetId,
        pk: &Value,
        payload: &FeaturePayload,
        uploads: &[UploadMeta],
    ) -> Result<Feature, EngineError> {
        self.mutate(ctx, dataset_id, Operation::Update, Some(pk), payload, uploads)
    }

    /// Deletes a feature and its relation rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FeatureNotFound`] when no row matches, or
    /// permission and store errors.
    pub fn delete_feature(
        &self,
        ctx: &RequestContext,
        dataset_id: &DatasetId,
        pk: &Value,
    ) -> Result<(), EngineError> {
        let (dataset, _grant) = self.authorize(ctx, dataset_id, Operation::Delete)?;
        let mut txn = self.store.begin().map_err(map_store_error)?;
        let result = (|| {
            for relation in &dataset.relations {
                let Some(relation_dataset) = self.config.dataset(&relation.table) else {
                    continue;
                };
                let rows = txn
                    .relation_records(relation_dataset, &relation.fk_field, pk)
                    .map_err(map_store_error)?;
                for row in rows {
                    txn.delete_record(relation_dataset, &row.pk).map_err(map_store_error)?;
                }
            }
            if !txn.delete_record(dataset, pk).map_err(map_store_error)? {
                return Err(EngineError::FeatureNotFound {
                    dataset: dataset.id.clone(),
                });
            }
            Ok(())
        })();
        let result = finish(txn, result);
        self.record(dataset_id, Operation::Delete, &result);
        result
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Resolves the dataset definition and grant, gating on the operation.
    fn authorize(
        &self,
        ctx: &RequestContext,
        dataset_id: &DatasetId,
        operation: Operation,
    ) -> Result<(&DatasetDef, Grant), EngineError> {
        let Some(dataset) = self.config.dataset(dataset_id) else {
            return Err(EngineError::DatasetNotFound {
                dataset: dataset_id.clone(),
            });
        };
        let grant = self.config.permissions.resolve(dataset_id, &ctx.roles);
        ensure_operation(dataset_id, &grant, operation)?;
        Ok((dataset, grant))
    }

    /// Shared create/update path.
    fn mutate(
        &self,
        ctx: &RequestContext,
        dataset_id: &DatasetId,
        operation: Operation,
        pk: Option<&Value>,
        payload: &FeaturePayload,
        uploads: &[UploadMeta],
    ) -> Result<Feature, EngineError> {
        let outcome = self.mutate_inner(ctx, dataset_id, operation, pk, payload, uploads);
        self.record(dataset_id, operation, &outcome);
        outcome
    }

    /// Create/update body: authorization, scans, then the transaction.
    fn mutate_inner(
        &self,
        ctx: &RequestContext,
        dataset_id: &DatasetId,
        operation: Operation,
        pk: Option<&Value>,
        payload: &FeaturePayload,
        uploads: &[UploadMeta],
    ) -> Result<Feature, EngineError> {
        let (dataset, grant) = self.authorize(ctx, dataset_id, operation)?;

        if !payload.is_feature() {
            let mut report = ValidationReport::new();
            report.push(
                FieldPath::field("type"),
                ConstraintViolation::TypeMismatch {
                    expected: "Feature".to_string(),
                },
            );
            return Err(EngineError::ValidationFailed {
                report,
            });
        }
        ensure_writable_fields(dataset, &grant, operation, payload)?;

        // Relation grants resolve up front; an unreadable relation dataset
        // fails the whole request before any scan or transaction work. The
        // operation flags are checked against the diff inside the
        // transaction, where inserts, updates, and deletes are known.
        let relation_arrays = collect_relations(dataset, payload)?;
        let mut relation_targets = Vec::with_capacity(relation_arrays.len());
        for (relation, records) in relation_arrays {
            let relation_dataset = self.relation_dataset(relation)?;
            let relation_grant =
                self.config.permissions.resolve(&relation_dataset.id, &ctx.roles);
            ensure_operation(&relation_dataset.id, &relation_grant, Operation::Read)?;
            for record in records {
                ensure_writable_fields(relation_dataset, &relation_grant, operation, record)?;
            }
            relation_targets.push((relation, relation_dataset, relation_grant, records));
        }

        // Attachments validate (and scan) before the transaction opens.
        let mut report = ValidationReport::new();
        for upload in uploads {
            self.check_upload(dataset, &grant, operation, upload, &mut report)?;
        }

        let mut txn = self.store.begin().map_err(map_store_error)?;
        let result = self.mutate_in_txn(
            &mut *txn,
            ctx,
            dataset,
            &grant,
            operation,
            pk,
            payload,
            uploads,
            &relation_targets,
            report,
        );
        finish(txn, result)
    }

    /// Validates one upload's policy and scan, recording the scan outcome.
    fn check_upload(
        &self,
        dataset: &DatasetDef,
        grant: &Grant,
        operation: Operation,
        upload: &UploadMeta,
        report: &mut ValidationReport,
    ) -> Result<(), EngineError> {
        let path = FieldPath::field(&upload.field_name);
        match dataset.field(&upload.field_name) {
            Some(field) if field.data_type == DataType::File => {
                if !grant.permits_attribute(&upload.field_name) {
                    return Err(EngineError::PermissionDenied {
                        dataset: dataset.id.clone(),
                        operation,
                        fields: vec![upload.field_name.clone()],
                    });
                }
            }
            _ => {
                report.push(
                    path,
                    ConstraintViolation::TypeMismatch {
                        expected: "file".to_string(),
                    },
                );
                return Ok(());
            }
        }
        match validate_attachment(
            dataset,
            &self.config.attachment_policy,
            upload,
            self.scanner.as_deref(),
        ) {
            Ok(check) => self.metrics.record_scan(&dataset.id, check.scan_outcome),
            Err(violation) => {
                let outcome = match &violation {
                    ConstraintViolation::MalwareDetected => Some("infected"),
                    ConstraintViolation::ScanUnavailable => Some("unavailable"),
                    _ => None,
                };
                if let Some(outcome) = outcome {
                    self.metrics.record_scan(&dataset.id, outcome);
                }
                report.push(path, violation);
            }
        }
        Ok(())
    }

    /// Validation and writes of one mutation inside its transaction.
    #[allow(
        clippy::too_many_arguments,
        reason = "Single internal call site carrying the full request state."
    )]
    fn mutate_in_txn(
        &self,
        txn: &mut dyn FeatureTransaction,
        ctx: &RequestContext,
        dataset: &DatasetDef,
        grant: &Grant,
        operation: Operation,
        pk: Option<&Value>,
        payload: &FeaturePayload,
        uploads: &[UploadMeta],
        relation_targets: &[(&RelationDef, &DatasetDef, Grant, &Vec<FeaturePayload>)],
        mut report: ValidationReport,
    ) -> Result<Feature, EngineError> {
        // Existing state is read inside the transaction so read-only
        // comparisons and relation diffs see a consistent snapshot.
        let existing = match (operation, pk) {
            (Operation::Update, Some(pk)) => {
                let record = txn.fetch_record(dataset, pk).map_err(map_store_error)?;
                Some(record.ok_or_else(|| EngineError::FeatureNotFound {
                    dataset: dataset.id.clone(),
                })?)
            }
            _ => None,
        };

        let mut write =
            prepare_record(dataset, grant, operation, payload, existing.as_ref(), &mut report);

        // Relation diffs and per-record validation.
        let mut relation_plans = Vec::with_capacity(relation_targets.len());
        for (relation, relation_dataset, relation_grant, records) in relation_targets {
            let stored = match existing.as_ref().map(|record| &record.pk) {
                Some(parent_pk) => txn
                    .relation_records(relation_dataset, &relation.fk_field, parent_pk)
                    .map_err(map_store_error)?,
                None => Vec::new(),
            };
            let diff = diff_relation(relation, &stored, records)?;

            // Each kind of relation change needs its own operation flag; the
            // parent operation alone never authorizes a relation write.
            if !diff.inserts.is_empty() {
                ensure_operation(&relation_dataset.id, relation_grant, Operation::Create)?;
            }
            if !diff.updates.is_empty() {
                ensure_operation(&relation_dataset.id, relation_grant, Operation::Update)?;
            }
            if !diff.deletes.is_empty() {
                ensure_operation(&relation_dataset.id, relation_grant, Operation::Delete)?;
            }

            let mut inserts = Vec::with_capacity(diff.inserts.len());
            for (index, record) in diff.inserts {
                let mut sub_report = ValidationReport::new();
                let sub_write = prepare_record(
                    relation_dataset,
                    relation_grant,
                    Operation::Create,
                    record,
                    None,
                    &mut sub_report,
                );
                report.absorb_relation(&relation.table, index, sub_report);
                inserts.push(sub_write);
            }
            let mut updates = Vec::with_capacity(diff.updates.len());
            for (index, row_pk, record) in diff.updates {
                let stored_row = stored.iter().find(|row| row.pk == row_pk);
                let mut sub_report = ValidationReport::new();
                let sub_write = prepare_record(
                    relation_dataset,
                    relation_grant,
                    Operation::Update,
                    record,
                    stored_row,
                    &mut sub_report,
                );
                report.absorb_relation(&relation.table, index, sub_report);
                updates.push((row_pk, sub_write));
            }
            relation_plans.push((*relation, *relation_dataset, inserts, updates, diff.deletes));
        }

        if !report.is_empty() {
            self.metrics.record_validation_failure(&dataset.id, report.errors.len());
            return Err(EngineError::ValidationFailed {
                report,
            });
        }

        // Server-computed columns are stamped only after validation passed.
        for upload in uploads {
            write.columns.insert(upload.field_name.clone(), Value::String(upload.file_name.clone()));
        }
        apply_audit_stamps(&self.config.audit, operation, &ctx.user, &*self.clock, &mut write.columns);
        let uploaded: Vec<String> =
            uploads.iter().map(|upload| upload.field_name.clone()).collect();
        apply_upload_stamps(&self.config.audit, &ctx.user, &uploaded, &mut write.columns);

        // Parent write.
        let parent = match operation {
            Operation::Create => {
                if !dataset.server_generated_key {
                    write.pk = payload.id.clone();
                }
                txn.insert_record(dataset, &write).map_err(map_store_error)?
            }
            Operation::Update => {
                let pk = existing
                    .as_ref()
                    .map(|record| record.pk.clone())
                    .ok_or_else(|| EngineError::FeatureNotFound {
                        dataset: dataset.id.clone(),
                    })?;
                txn.update_record(dataset, &pk, &write)
                    .map_err(map_store_error)?
                    .ok_or_else(|| EngineError::FeatureNotFound {
                        dataset: dataset.id.clone(),
                    })?
            }
            Operation::Read | Operation::Delete => {
                return Err(EngineError::StoreUnavailable {
                    detail: "unsupported mutation operation".to_string(),
                });
            }
        };

        // Relation writes, with the parent key binding every foreign key.
        for (relation, relation_dataset, inserts, updates, deletes) in relation_plans {
            for row_pk in deletes {
                txn.delete_record(relation_dataset, &row_pk).map_err(map_store_error)?;
            }
            for (row_pk, mut sub_write) in updates {
                self.stamp_relation(&mut sub_write, relation, &parent.pk, ctx, Operation::Update);
                txn.update_record(relation_dataset, &row_pk, &sub_write)
                    .map_err(map_store_error)?
                    .ok_or_else(|| EngineError::WriteConflict {
                        detail: format!("relation row vanished in {}", relation.table),
                    })?;
            }
            for mut sub_write in inserts {
                self.stamp_relation(&mut sub_write, relation, &parent.pk, ctx, Operation::Create);
                txn.insert_record(relation_dataset, &sub_write).map_err(map_store_error)?;
            }
        }

        self.render_feature(txn, ctx, dataset, grant, &parent, true)
    }

    /// Stamps audit columns and binds the foreign key on a relation write.
    fn stamp_relation(
        &self,
        write: &mut RecordWrite,
        relation: &RelationDef,
        parent_pk: &Value,
        ctx: &RequestContext,
        operation: Operation,
    ) {
        apply_audit_stamps(&self.config.audit, operation, &ctx.user, &*self.clock, &mut write.columns);
        write.columns.insert(relation.fk_field.clone(), parent_pk.clone());
    }

    /// Looks up the dataset definition of a relation table.
    fn relation_dataset(&self, relation: &RelationDef) -> Result<&DatasetDef, EngineError> {
        self.config.dataset(&relation.table).ok_or_else(|| {
            EngineError::RelationValidationFailed {
                path: FieldPath::field("").in_relation(relation.table.clone(), 0),
                reason: "relation table is not a configured dataset".to_string(),
            }
        })
    }

    /// Fetch-and-render body of a single-feature read.
    fn read_in_txn(
        &self,
        txn: &mut dyn FeatureTransaction,
        ctx: &RequestContext,
        dataset: &DatasetDef,
        grant: &Grant,
        pk: &Value,
    ) -> Result<Feature, EngineError> {
        let record = txn
            .fetch_record(dataset, pk)
            .map_err(map_store_error)?
            .ok_or_else(|| EngineError::FeatureNotFound {
                dataset: dataset.id.clone(),
            })?;
        self.render_feature(txn, ctx, dataset, grant, &record, true)
    }

    /// Renders one stored record as an outbound feature.
    ///
    /// Relation arrays render only for relations whose dataset is readable
    /// under the request's role-set; others are omitted.
    fn render_feature(
        &self,
        txn: &mut dyn FeatureTransaction,
        ctx: &RequestContext,
        dataset: &DatasetDef,
        grant: &Grant,
        record: &StoredRecord,
        include_relations: bool,
    ) -> Result<Feature, EngineError> {
        let mut properties = Map::new();
        for field in visible_fields(dataset, grant) {
            let value = record.attributes.get(&field.name).cloned().unwrap_or(Value::Null);
            properties.insert(field.name.clone(), value);
        }

        let mut relations = BTreeMap::new();
        if include_relations {
            for relation in &dataset.relations {
                let Some(relation_dataset) = self.config.dataset(&relation.table) else {
                    continue;
                };
                let relation_grant =
                    self.config.permissions.resolve(&relation_dataset.id, &ctx.roles);
                if !relation_grant.readable {
                    continue;
                }
                let mut rows = txn
                    .relation_records(relation_dataset, &relation.fk_field, &record.pk)
                    .map_err(map_store_error)?;
                sort_relation_rows(relation, &mut rows);
                let rendered = rows
                    .iter()
                    .map(|row| {
                        self.render_feature(txn, ctx, relation_dataset, &relation_grant, row, false)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                relations.insert(relation.table.clone(), rendered);
            }
        }

        let (geometry, crs) = match &dataset.geometry {
            Some(def) => (
                record.geometry.clone().unwrap_or(Value::Null),
                Some(CrsRef::epsg(def.srid)),
            ),
            None => (Value::Null, None),
        };

        Ok(Feature {
            feature_type: "Feature".to_string(),
            id: record.pk.clone(),
            properties,
            geometry,
            crs,
            relations,
        })
    }

    /// Records the request outcome.
    fn record<T>(&self, dataset: &DatasetId, operation: Operation, result: &Result<T, EngineError>) {
        let outcome = match result {
            Ok(_) => RequestOutcome::Success,
            Err(EngineError::WriteConflict { .. } | EngineError::StoreUnavailable { .. }) => {
                RequestOutcome::StoreFailure
            }
            Err(_) => RequestOutcome::Rejected,
        };
        self.metrics.record_request(dataset, operation, outcome);
    }
}

// ============================================================================
// SECTION: Record Preparation
// ============================================================================

/// Validates a payload's fields and geometry into a record write.
///
/// Violations accumulate in `report`; the returned write is only meaningful
/// when the report stays empty.
fn prepare_record(
    dataset: &DatasetDef,
    grant: &Grant,
    operation: Operation,
    payload: &FeaturePayload,
    existing: Option<&StoredRecord>,
    report: &mut ValidationReport,
) -> RecordWrite {
    let mut write = RecordWrite::default();

    for field in &dataset.fields {
        // Ungranted fields cannot be supplied; presence was already gated.
        if !grant.permits_attribute(&field.name) {
            continue;
        }
        let raw = payload.properties.get(&field.name);
        let ctx = FieldContext {
            operation,
            stored: existing.and_then(|record| record.attributes.get(&field.name)),
            is_primary_key: field.name == dataset.primary_key,
            server_generated_key: dataset.server_generated_key,
        };
        match validate_field(field, raw, &ctx) {
            Ok(FieldOutcome::Write(value)) => {
                write.columns.insert(field.name.clone(), value.to_json());
            }
            Ok(FieldOutcome::Skip) => {}
            Err(violation) => report.push(FieldPath::field(&field.name), violation),
        }
    }

    if let Some(def) = &dataset.geometry {
        let geometry_value = match &payload.geometry {
            Some(value) => Some(value.clone()),
            // An absent geometry means "unchanged" on update and NULL on
            // create.
            None if operation == Operation::Create => Some(Value::Null),
            None => None,
        };
        if let Some(value) = geometry_value {
            match resolve_source_srid(def, payload)
                .and_then(|srid| validate_geometry(def, &value, srid))
            {
                Ok(geometry_write) => write.geometry = Some(geometry_write),
                Err(violation) => report.push(FieldPath::geometry(), violation),
            }
        }
    } else if payload.geometry.as_ref().is_some_and(|value| !value.is_null()) {
        report.push(
            FieldPath::geometry(),
            ConstraintViolation::InvalidGeometry {
                reason: "dataset has no geometry column".to_string(),
            },
        );
    }

    write
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Sorts relation rows by the configured sort field, falling back to the
/// primary key.
fn sort_relation_rows(relation: &RelationDef, rows: &mut [StoredRecord]) {
    if let Some(sort_field) = &relation.sort_field {
        rows.sort_by(|left, right| {
            let left_key = left.attributes.get(sort_field).map(sort_key);
            let right_key = right.attributes.get(sort_field).map(sort_key);
            left_key.cmp(&right_key)
        });
    }
}

/// Comparable sort key for a JSON scalar.
fn sort_key(value: &Value) -> (u8, String) {
    match value {
        Value::Number(number) => {
            // Zero-pad so lexicographic order matches numeric order for
            // non-negative integers.
            (0, format!("{:0>20}", number.to_string()))
        }
        Value::String(text) => (1, text.clone()),
        other => (2, other.to_string()),
    }
}

/// Commits on success, rolls back on failure.
fn finish<T>(
    txn: Box<dyn FeatureTransaction + '_>,
    result: Result<T, EngineError>,
) -> Result<T, EngineError> {
    match result {
        Ok(value) => {
            txn.commit().map_err(map_store_error)?;
            Ok(value)
        }
        Err(error) => {
            let _ = txn.rollback();
            Err(error)
        }
    }
}

/// Maps store errors into the engine taxonomy.
fn map_store_error(error: StoreError) -> EngineError {
    match error {
        StoreError::Conflict(detail) => EngineError::WriteConflict {
            detail,
        },
        StoreError::Unavailable(detail) | StoreError::Invalid(detail) => {
            EngineError::StoreUnavailable {
                detail,
            }
        }
    }
}
