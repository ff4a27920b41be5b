// crates/geodata-core/src/runtime/audit.rs
// ============================================================================
// Module: Audit Stamping
// Description: Server-computed user and timestamp columns on mutations.
// Purpose: Stamp who changed what and when, outside client control.
// Dependencies: crate::core, crate::interfaces, serde, time
// ============================================================================

//! ## Overview
//! Audit columns are server-computed: any client-supplied value for them is
//! discarded before stamping. Creation columns are written once on create
//! and never touched again; edit columns are written on create and update.
//! Upload-user columns pair a file field with the identity that uploaded
//! its current attachment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::core::Operation;
use crate::core::UserIdentity;
use crate::interfaces::Clock;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Stamp rendering format.
const STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Audit column configuration for a tenant.
///
/// # Invariants
/// - Unset column names disable the corresponding stamp.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Column stamped with the creating identity.
    pub create_user_field: Option<String>,
    /// Column stamped with the creation time.
    pub create_timestamp_field: Option<String>,
    /// Column stamped with the last editing identity.
    pub edit_user_field: Option<String>,
    /// Column stamped with the last edit time.
    pub edit_timestamp_field: Option<String>,
    /// Whether stamps are rendered in UTC instead of local time.
    pub write_utc_timestamps: bool,
    /// Suffix appended to a file field name to form its upload-user column.
    pub upload_user_field_suffix: Option<String>,
}

impl AuditConfig {
    /// Returns every configured audit column name.
    pub fn column_names(&self) -> impl Iterator<Item = &String> {
        self.create_user_field
            .iter()
            .chain(self.create_timestamp_field.iter())
            .chain(self.edit_user_field.iter())
            .chain(self.edit_timestamp_field.iter())
    }

    /// Returns the upload-user column for a file field, when configured.
    #[must_use]
    pub fn upload_user_column(&self, field_name: &str) -> Option<String> {
        self.upload_user_field_suffix
            .as_ref()
            .map(|suffix| format!("{field_name}{suffix}"))
    }
}

// ============================================================================
// SECTION: Stamping
// ============================================================================

/// Applies audit stamps to a prepared column map.
///
/// Client-supplied values for audit columns are removed first. Create stamps
/// apply only on create; edit stamps apply on create and update.
pub fn apply_audit_stamps(
    config: &AuditConfig,
    operation: Operation,
    user: &UserIdentity,
    clock: &dyn Clock,
    columns: &mut BTreeMap<String, Value>,
) {
    for name in config.column_names() {
        columns.remove(name);
    }

    let now = if config.write_utc_timestamps {
        clock.now_utc()
    } else {
        clock.now_local()
    };
    let stamp = now.format(STAMP_FORMAT).unwrap_or_default();

    if operation == Operation::Create {
        if let Some(name) = &config.create_user_field {
            columns.insert(name.clone(), Value::String(user.as_str().to_string()));
        }
        if let Some(name) = &config.create_timestamp_field {
            columns.insert(name.clone(), Value::String(stamp.clone()));
        }
    }
    if let Some(name) = &config.edit_user_field {
        columns.insert(name.clone(), Value::String(user.as_str().to_string()));
    }
    if let Some(name) = &config.edit_timestamp_field {
        columns.insert(name.clone(), Value::String(stamp));
    }
}

/// Applies upload-user stamps for the file fields that received an upload.
pub fn apply_upload_stamps(
    config: &AuditConfig,
    user: &UserIdentity,
    uploaded_fields: &[String],
    columns: &mut BTreeMap<String, Value>,
) {
    for field_name in uploaded_fields {
        if let Some(column) = config.upload_user_column(field_name) {
            columns.insert(column, Value::String(user.as_str().to_string()));
        }
    }
}
