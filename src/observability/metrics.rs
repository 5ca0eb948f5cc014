//! Scan metrics
//!
//! - Counters only
//! - Monotonic increase
//! - Shared by any number of blocks; lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for index scans
///
/// Uses Relaxed ordering; counters are independent of each other.
#[derive(Debug, Default)]
pub struct ScanMetrics {
    /// Branch iterators opened
    branches_opened: AtomicU64,
    /// Branches absorbed into a neighbour's scan
    branches_merged: AtomicU64,
    /// Documents pulled from iterators
    documents_read: AtomicU64,
    /// Documents dropped as duplicates
    duplicates_suppressed: AtomicU64,
    /// Conditions rebuilt for an outer row
    conditions_rebuilt: AtomicU64,
    /// Rows returned by get_some
    rows_produced: AtomicU64,
    /// Rows discarded by skip_some
    rows_skipped: AtomicU64,
    /// Scans aborted by an error
    scans_aborted: AtomicU64,
}

impl ScanMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment branches opened
    pub fn increment_branches_opened(&self) {
        self.branches_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment branches merged
    pub fn increment_branches_merged(&self) {
        self.branches_merged.fetch_add(1, Ordering::Relaxed);
    }

    /// Add documents read
    pub fn add_documents_read(&self, count: u64) {
        self.documents_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment duplicates suppressed
    pub fn increment_duplicates_suppressed(&self) {
        self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment conditions rebuilt
    pub fn increment_conditions_rebuilt(&self) {
        self.conditions_rebuilt.fetch_add(1, Ordering::Relaxed);
    }

    /// Add rows produced
    pub fn add_rows_produced(&self, count: u64) {
        self.rows_produced.fetch_add(count, Ordering::Relaxed);
    }

    /// Add rows skipped
    pub fn add_rows_skipped(&self, count: u64) {
        self.rows_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment scans aborted
    pub fn increment_scans_aborted(&self) {
        self.scans_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> ScanMetricsSnapshot {
        ScanMetricsSnapshot {
            branches_opened: self.branches_opened.load(Ordering::Relaxed),
            branches_merged: self.branches_merged.load(Ordering::Relaxed),
            documents_read: self.documents_read.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            conditions_rebuilt: self.conditions_rebuilt.load(Ordering::Relaxed),
            rows_produced: self.rows_produced.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            scans_aborted: self.scans_aborted.load(Ordering::Relaxed),
        }
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanMetricsSnapshot {
    pub branches_opened: u64,
    pub branches_merged: u64,
    pub documents_read: u64,
    pub duplicates_suppressed: u64,
    pub conditions_rebuilt: u64,
    pub rows_produced: u64,
    pub rows_skipped: u64,
    pub scans_aborted: u64,
}
