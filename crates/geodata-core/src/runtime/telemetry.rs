// crates/geodata-core/src/runtime/telemetry.rs
// ============================================================================
// Module: Mutation Telemetry
// Description: Counter hooks for mutation, validation, and scan outcomes.
// Purpose: Let hosts observe engine activity without coupling to a backend.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The engine reports coarse outcome counters through a trait so hosts can
//! bridge to their metrics backend. The default sink discards everything;
//! the engine behaves identically either way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::DatasetId;
use crate::core::Operation;

// ============================================================================
// SECTION: Metrics Trait
// ============================================================================

/// Outcome label for one completed request.
///
/// # Invariants
/// - Variants are stable for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Request committed (or read successfully).
    Success,
    /// Request rejected before any write.
    Rejected,
    /// Request failed at the store.
    StoreFailure,
}

impl RequestOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::StoreFailure => "store_failure",
        }
    }
}

/// Counter sink for engine activity.
pub trait MutationMetrics: Send + Sync {
    /// Records one completed request.
    fn record_request(&self, dataset: &DatasetId, operation: Operation, outcome: RequestOutcome);

    /// Records one rejected payload with its error count.
    fn record_validation_failure(&self, dataset: &DatasetId, error_count: usize);

    /// Records one attachment scan outcome by label (`clean`, `infected`,
    /// `unavailable`).
    fn record_scan(&self, dataset: &DatasetId, outcome: &str);
}

/// Metrics sink that discards every event.
///
/// # Invariants
/// - All methods are no-ops; safe for tests and hosts without a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MutationMetrics for NoopMetrics {
    fn record_request(&self, _dataset: &DatasetId, _operation: Operation, _outcome: RequestOutcome) {
    }

    fn record_validation_failure(&self, _dataset: &DatasetId, _error_count: usize) {}

    fn record_scan(&self, _dataset: &DatasetId, _outcome: &str) {}
}
