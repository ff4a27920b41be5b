// crates/geodata-core/src/runtime/attachment.rs
// ============================================================================
// Module: Attachment Validator
// Description: Extension, size, and malware checks for uploaded files.
// Purpose: Validate attachments before any transaction opens.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Attachment validation runs before the store transaction so the scan
//! collaborator's bounded timeout never holds a database connection. The
//! applicable policy resolves by precedence: a per-field extension list
//! overrides the dataset policy, which fully replaces the tenant-global
//! policy (values are never intersected). Extension matching is
//! case-insensitive and suffix-based, so compound extensions such as
//! `.tar.gz` work.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::AttachmentPolicy;
use crate::core::ConstraintViolation;
use crate::core::DatasetDef;
use crate::core::UploadMeta;
use crate::interfaces::AttachmentScanner;
use crate::interfaces::ScanVerdict;

// ============================================================================
// SECTION: Policy Resolution
// ============================================================================

/// Returns the attachment policy applicable to a dataset.
#[must_use]
pub fn effective_policy<'a>(
    global: &'a AttachmentPolicy,
    dataset: &'a DatasetDef,
) -> &'a AttachmentPolicy {
    dataset.attachment_policy.as_ref().unwrap_or(global)
}

/// Returns the extension allow-list applicable to one upload.
///
/// A `fileextensions` constraint on the target field overrides the policy
/// list. An empty result accepts any extension.
#[must_use]
pub fn effective_extensions(
    dataset: &DatasetDef,
    policy: &AttachmentPolicy,
    field_name: &str,
) -> Vec<String> {
    if let Some(list) = dataset
        .field(field_name)
        .and_then(|field| field.constraints.fileextensions.as_ref())
    {
        return list.iter().map(|ext| normalize_extension(ext)).collect();
    }
    policy
        .allowed_extensions
        .split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(normalize_extension)
        .collect()
}

/// Lowercases an extension and guarantees a leading dot.
fn normalize_extension(ext: &str) -> String {
    let lowered = ext.trim().to_lowercase();
    if lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Outcome of one accepted attachment, carrying the scan label for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentCheck {
    /// Scan outcome label: `clean`, `skipped`, or `soft_fail`.
    pub scan_outcome: &'static str,
}

/// Validates one upload against the applicable policy and scan collaborator.
///
/// Size is checked against the actual content length. When no scanner is
/// configured the scan step is skipped.
///
/// # Errors
///
/// Returns [`ConstraintViolation::AttachmentExtensionDenied`],
/// [`ConstraintViolation::AttachmentTooLarge`],
/// [`ConstraintViolation::MalwareDetected`], or
/// [`ConstraintViolation::ScanUnavailable`] (unless soft-fail is enabled).
pub fn validate_attachment(
    dataset: &DatasetDef,
    global: &AttachmentPolicy,
    upload: &UploadMeta,
    scanner: Option<&dyn AttachmentScanner>,
) -> Result<AttachmentCheck, ConstraintViolation> {
    let policy = effective_policy(global, dataset);

    let allowed = effective_extensions(dataset, policy, &upload.field_name);
    if !allowed.is_empty() {
        let file_name = upload.file_name.to_lowercase();
        if !allowed.iter().any(|ext| file_name.ends_with(ext.as_str())) {
            return Err(ConstraintViolation::AttachmentExtensionDenied);
        }
    }

    let actual_size = upload.content.len() as u64;
    if actual_size > policy.max_attachment_file_size
        || upload.size_bytes > policy.max_attachment_file_size
    {
        return Err(ConstraintViolation::AttachmentTooLarge {
            max_bytes: policy.max_attachment_file_size,
        });
    }

    let Some(scanner) = scanner else {
        return Ok(AttachmentCheck {
            scan_outcome: "skipped",
        });
    };
    match scanner.scan(upload) {
        Ok(ScanVerdict::Clean) => Ok(AttachmentCheck {
            scan_outcome: "clean",
        }),
        Ok(ScanVerdict::Infected { .. }) => Err(ConstraintViolation::MalwareDetected),
        Err(_) if policy.scan_soft_fail => Ok(AttachmentCheck {
            scan_outcome: "soft_fail",
        }),
        Err(_) => Err(ConstraintViolation::ScanUnavailable),
    }
}
