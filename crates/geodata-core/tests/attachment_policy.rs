// crates/geodata-core/tests/attachment_policy.rs
// ============================================================================
// Module: Attachment Policy Unit Tests
// Description: Extension precedence, size limits, and scan verdict handling.
// Purpose: Validate policy replacement, compound extensions, and soft-fail.
// ============================================================================

//! ## Overview
//! Unit-level tests for attachment validation invariants:
//! - Per-dataset policies fully replace the global one
//! - Field-level extension lists override both policies
//! - Compound extensions match case-insensitively
//! - Scan verdicts map to violations with the configured soft-fail behavior

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

use geodata_core::AttachmentPolicy;
use geodata_core::ConstraintSet;
use geodata_core::ConstraintViolation;
use geodata_core::DataType;
use geodata_core::DatasetDef;
use geodata_core::DatasetId;
use geodata_core::FieldDef;
use geodata_core::ScanError;
use geodata_core::ScanVerdict;
use geodata_core::StoreEndpoints;
use geodata_core::UploadMeta;
use geodata_core::interfaces::AttachmentScanner;
use geodata_core::runtime::validate_attachment;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn dataset(policy: Option<AttachmentPolicy>, fileextensions: Option<Vec<String>>) -> DatasetDef {
    DatasetDef {
        id: DatasetId::new("documents"),
        endpoints: StoreEndpoints {
            read: "store".to_string(),
            write: None,
        },
        schema: "public".to_string(),
        table_name: "documents".to_string(),
        primary_key: "id".to_string(),
        fields: vec![FieldDef {
            name: "scan".to_string(),
            data_type: DataType::File,
            constraints: ConstraintSet {
                fileextensions,
                ..ConstraintSet::default()
            },
        }],
        geometry: None,
        relations: Vec::new(),
        attachment_policy: policy,
        server_generated_key: true,
    }
}

fn upload(file_name: &str, size: usize) -> UploadMeta {
    UploadMeta {
        field_name: "scan".to_string(),
        file_name: file_name.to_string(),
        size_bytes: size as u64,
        content: vec![0_u8; size],
    }
}

fn global(extensions: &str, max: u64, soft_fail: bool) -> AttachmentPolicy {
    AttachmentPolicy {
        allowed_extensions: extensions.to_string(),
        max_attachment_file_size: max,
        scan_soft_fail: soft_fail,
    }
}

/// Scanner returning a fixed outcome.
struct FixedScanner(Result<ScanVerdict, ()>);

impl AttachmentScanner for FixedScanner {
    fn scan(&self, _upload: &UploadMeta) -> Result<ScanVerdict, ScanError> {
        self.0
            .clone()
            .map_err(|()| ScanError::Unavailable("scanner offline".to_string()))
    }
}

// ============================================================================
// SECTION: Extension Checks
// ============================================================================

#[test]
fn empty_allow_list_accepts_any_extension() {
    let ds = dataset(None, None);
    let result = validate_attachment(&ds, &global("", 1024, false), &upload("a.bin", 10), None);
    assert!(result.is_ok());
}

#[test]
fn extension_matching_is_case_insensitive_and_supports_compounds() {
    let ds = dataset(None, None);
    let policy = global(".pdf, .tar.gz", 1024, false);
    for name in ["report.PDF", "backup.tar.gz", "backup.TAR.GZ"] {
        assert!(validate_attachment(&ds, &policy, &upload(name, 10), None).is_ok(), "{name}");
    }
    let result = validate_attachment(&ds, &policy, &upload("archive.gz", 10), None);
    assert_eq!(result.unwrap_err(), ConstraintViolation::AttachmentExtensionDenied);
}

#[test]
fn field_extension_list_overrides_every_policy() {
    let ds = dataset(
        Some(global(".pdf", 1024, false)),
        Some(vec!["png".to_string()]),
    );
    let policy = global(".txt", 1024, false);
    assert!(validate_attachment(&ds, &policy, &upload("map.png", 10), None).is_ok());
    let result = validate_attachment(&ds, &policy, &upload("report.pdf", 10), None);
    assert_eq!(result.unwrap_err(), ConstraintViolation::AttachmentExtensionDenied);
}

// ============================================================================
// SECTION: Size Limits
// ============================================================================

#[test]
fn dataset_policy_fully_replaces_the_global_limit() {
    let ds = dataset(Some(global("", 1000, false)), None);
    let tight_global = global("", 500, false);
    assert!(validate_attachment(&ds, &tight_global, &upload("a.bin", 900), None).is_ok());
    let result = validate_attachment(&ds, &tight_global, &upload("a.bin", 1100), None);
    assert_eq!(
        result.unwrap_err(),
        ConstraintViolation::AttachmentTooLarge { max_bytes: 1000 }
    );
}

#[test]
fn size_check_uses_the_actual_content_length() {
    let ds = dataset(None, None);
    let mut deceptive = upload("a.bin", 900);
    deceptive.size_bytes = 10;
    let result = validate_attachment(&ds, &global("", 500, false), &deceptive, None);
    assert_eq!(
        result.unwrap_err(),
        ConstraintViolation::AttachmentTooLarge { max_bytes: 500 }
    );
}

// ============================================================================
// SECTION: Scan Verdicts
// ============================================================================

#[test]
fn clean_verdict_passes() {
    let ds = dataset(None, None);
    let scanner = FixedScanner(Ok(ScanVerdict::Clean));
    let check =
        validate_attachment(&ds, &global("", 1024, false), &upload("a.bin", 10), Some(&scanner))
            .unwrap();
    assert_eq!(check.scan_outcome, "clean");
}

#[test]
fn infected_verdict_rejects_the_attachment() {
    let ds = dataset(None, None);
    let scanner = FixedScanner(Ok(ScanVerdict::Infected {
        signature: "Eicar-Test-Signature".to_string(),
    }));
    let result =
        validate_attachment(&ds, &global("", 1024, false), &upload("a.bin", 10), Some(&scanner));
    assert_eq!(result.unwrap_err(), ConstraintViolation::MalwareDetected);
}

#[test]
fn scanner_outage_respects_the_soft_fail_policy() {
    let ds = dataset(None, None);
    let scanner = FixedScanner(Err(()));
    let strict =
        validate_attachment(&ds, &global("", 1024, false), &upload("a.bin", 10), Some(&scanner));
    assert_eq!(strict.unwrap_err(), ConstraintViolation::ScanUnavailable);

    let lenient =
        validate_attachment(&ds, &global("", 1024, true), &upload("a.bin", 10), Some(&scanner))
            .unwrap();
    assert_eq!(lenient.scan_outcome, "soft_fail");
}
