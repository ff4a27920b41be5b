// crates/geodata-config/src/validate.rs
// ============================================================================
// Module: Configuration Validation
// Description: Structural rules for tenant configuration documents.
// Purpose: Fail configuration loads closed before any request is served.
// Dependencies: crate::document, geodata-core, regex-lite, thiserror
// ============================================================================

//! ## Overview
//! Validation enforces the structural rules parsing cannot express: unique
//! dataset names, resolvable relation targets with existing foreign-key
//! fields, positive SRIDs, compilable patterns, scale within precision, and
//! grants that reference configured datasets and fields. Every violation is
//! collected so one load reports all problems at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use geodata_core::DataType;
use geodata_core::DatasetId;
use regex_lite::Regex;
use thiserror::Error;

use crate::document::DatasetDoc;
use crate::document::TenantDoc;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// One structural problem in a tenant document.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    /// Two datasets share one name.
    #[error("duplicate dataset name: {dataset}")]
    DuplicateDataset {
        /// Duplicated dataset identifier.
        dataset: DatasetId,
    },
    /// Two fields of one dataset share one name.
    #[error("duplicate field {field} in dataset {dataset}")]
    DuplicateField {
        /// Owning dataset.
        dataset: DatasetId,
        /// Duplicated field name.
        field: String,
    },
    /// Relation references a dataset that is not configured.
    #[error("dataset {dataset} relates to unknown dataset {target}")]
    UnknownRelationTarget {
        /// Owning dataset.
        dataset: DatasetId,
        /// Missing relation target.
        target: DatasetId,
    },
    /// Relation foreign-key field does not exist on the target dataset.
    #[error("relation {dataset} -> {target} names missing fk field {field}")]
    MissingForeignKeyField {
        /// Owning dataset.
        dataset: DatasetId,
        /// Relation target dataset.
        target: DatasetId,
        /// Missing field name.
        field: String,
    },
    /// Geometry SRID is zero or negative.
    #[error("dataset {dataset} declares non-positive srid {srid}")]
    InvalidSrid {
        /// Owning dataset.
        dataset: DatasetId,
        /// Declared SRID.
        srid: i32,
    },
    /// Field pattern does not compile.
    #[error("field {field} in dataset {dataset} has an invalid pattern")]
    InvalidPattern {
        /// Owning dataset.
        dataset: DatasetId,
        /// Field carrying the pattern.
        field: String,
    },
    /// Numeric scale exceeds numeric precision.
    #[error("field {field} in dataset {dataset} declares scale above precision")]
    ScaleAbovePrecision {
        /// Owning dataset.
        dataset: DatasetId,
        /// Field carrying the constraint.
        field: String,
    },
    /// Constraint is declared on a type it cannot apply to.
    #[error("field {field} in dataset {dataset}: {detail}")]
    InapplicableConstraint {
        /// Owning dataset.
        dataset: DatasetId,
        /// Field carrying the constraint.
        field: String,
        /// Problem description.
        detail: String,
    },
    /// Grant references a dataset that is not configured.
    #[error("role {role} grants unknown dataset {dataset}")]
    UnknownGrantDataset {
        /// Granting role.
        role: String,
        /// Missing dataset.
        dataset: DatasetId,
    },
    /// Grant exposes an attribute the dataset does not declare.
    #[error("role {role} grants unknown attribute {attribute} on {dataset}")]
    UnknownGrantAttribute {
        /// Granting role.
        role: String,
        /// Target dataset.
        dataset: DatasetId,
        /// Missing attribute name.
        attribute: String,
    },
}

/// Failed tenant validation carrying every collected issue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tenant configuration invalid ({} issue(s))", issues.len())]
pub struct ConfigValidationError {
    /// Collected issues in document order.
    pub issues: Vec<ConfigIssue>,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a tenant document structurally.
///
/// # Errors
///
/// Returns every collected [`ConfigIssue`] when the document is invalid.
pub fn validate_tenant(tenant: &TenantDoc) -> Result<(), ConfigValidationError> {
    let mut issues = Vec::new();

    let mut datasets: BTreeMap<&DatasetId, &DatasetDoc> = BTreeMap::new();
    for dataset in &tenant.datasets {
        if datasets.insert(&dataset.name, dataset).is_some() {
            issues.push(ConfigIssue::DuplicateDataset {
                dataset: dataset.name.clone(),
            });
        }
    }

    for dataset in &tenant.datasets {
        check_fields(dataset, &mut issues);
        check_geometry(dataset, &mut issues);
        check_relations(dataset, &datasets, &mut issues);
    }
    check_grants(tenant, &datasets, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigValidationError {
            issues,
        })
    }
}

/// Checks field uniqueness and per-field constraint applicability.
fn check_fields(dataset: &DatasetDoc, issues: &mut Vec<ConfigIssue>) {
    let mut seen = BTreeSet::new();
    for field in &dataset.fields {
        if !seen.insert(field.name.as_str()) {
            issues.push(ConfigIssue::DuplicateField {
                dataset: dataset.name.clone(),
                field: field.name.clone(),
            });
        }
        let constraints = &field.constraints;
        if let Some(pattern) = &constraints.pattern
            && Regex::new(&format!("^(?:{pattern})$")).is_err()
        {
            issues.push(ConfigIssue::InvalidPattern {
                dataset: dataset.name.clone(),
                field: field.name.clone(),
            });
        }
        if let (Some(precision), Some(scale)) =
            (constraints.numeric_precision, constraints.numeric_scale)
            && scale > precision
        {
            issues.push(ConfigIssue::ScaleAbovePrecision {
                dataset: dataset.name.clone(),
                field: field.name.clone(),
            });
        }
        if (constraints.numeric_precision.is_some() || constraints.numeric_scale.is_some())
            && field.data_type != DataType::Numeric
        {
            issues.push(ConfigIssue::InapplicableConstraint {
                dataset: dataset.name.clone(),
                field: field.name.clone(),
                detail: "precision/scale require a numeric field".to_string(),
            });
        }
        if constraints.fileextensions.is_some() && field.data_type != DataType::File {
            issues.push(ConfigIssue::InapplicableConstraint {
                dataset: dataset.name.clone(),
                field: field.name.clone(),
                detail: "fileextensions require a file field".to_string(),
            });
        }
        if (constraints.min.is_some() || constraints.max.is_some() || constraints.step.is_some())
            && !field.data_type.is_numeric()
        {
            issues.push(ConfigIssue::InapplicableConstraint {
                dataset: dataset.name.clone(),
                field: field.name.clone(),
                detail: "numeric bounds require a numeric field".to_string(),
            });
        }
    }
}

/// Checks geometry metadata.
fn check_geometry(dataset: &DatasetDoc, issues: &mut Vec<ConfigIssue>) {
    if let Some(geometry) = &dataset.geometry
        && geometry.srid <= 0
    {
        issues.push(ConfigIssue::InvalidSrid {
            dataset: dataset.name.clone(),
            srid: geometry.srid,
        });
    }
}

/// Checks relation targets and foreign-key fields.
fn check_relations(
    dataset: &DatasetDoc,
    datasets: &BTreeMap<&DatasetId, &DatasetDoc>,
    issues: &mut Vec<ConfigIssue>,
) {
    for relation in &dataset.relations {
        let Some(target) = datasets.get(&relation.table) else {
            issues.push(ConfigIssue::UnknownRelationTarget {
                dataset: dataset.name.clone(),
                target: relation.table.clone(),
            });
            continue;
        };
        if !target.fields.iter().any(|field| field.name == relation.fk_field) {
            issues.push(ConfigIssue::MissingForeignKeyField {
                dataset: dataset.name.clone(),
                target: relation.table.clone(),
                field: relation.fk_field.clone(),
            });
        }
    }
}

/// Checks that grants reference configured datasets and declared fields.
fn check_grants(
    tenant: &TenantDoc,
    datasets: &BTreeMap<&DatasetId, &DatasetDoc>,
    issues: &mut Vec<ConfigIssue>,
) {
    for role in &tenant.roles {
        for grant in &role.permissions {
            let Some(dataset) = datasets.get(&grant.dataset) else {
                issues.push(ConfigIssue::UnknownGrantDataset {
                    role: role.role.as_str().to_string(),
                    dataset: grant.dataset.clone(),
                });
                continue;
            };
            for attribute in &grant.attributes {
                let declared = dataset.fields.iter().any(|field| &field.name == attribute)
                    || attribute == &dataset.primary_key;
                if !declared {
                    issues.push(ConfigIssue::UnknownGrantAttribute {
                        role: role.role.as_str().to_string(),
                        dataset: grant.dataset.clone(),
                        attribute: attribute.clone(),
                    });
                }
            }
        }
    }
}
