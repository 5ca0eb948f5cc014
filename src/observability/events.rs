//! Observability events for index scans
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events in a scan's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Block initialized against its plan node
    ScanInitialized,
    /// Condition rebuilt for a new outer row
    ConditionRebuilt,
    /// Branch iterator opened
    BranchOpened,
    /// Adjacent branches merged into one scan
    BranchMerged,
    /// Branch iterator exhausted and closed
    BranchExhausted,
    /// All branches exhausted for the current outer row
    ScanExhausted,
    /// Scan aborted by an error
    ScanAborted,
    /// Block shut down
    ScanShutdown,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ScanInitialized => "INDEX_SCAN_INITIALIZED",
            Event::ConditionRebuilt => "INDEX_SCAN_CONDITION_REBUILT",
            Event::BranchOpened => "INDEX_SCAN_BRANCH_OPENED",
            Event::BranchMerged => "INDEX_SCAN_BRANCH_MERGED",
            Event::BranchExhausted => "INDEX_SCAN_BRANCH_EXHAUSTED",
            Event::ScanExhausted => "INDEX_SCAN_EXHAUSTED",
            Event::ScanAborted => "INDEX_SCAN_ABORTED",
            Event::ScanShutdown => "INDEX_SCAN_SHUTDOWN",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ScanInitialized | Event::ScanShutdown => Severity::Info,
            Event::ScanAborted => Severity::Error,
            _ => Severity::Trace,
        }
    }

    /// Whether the event is a per-branch trace event
    pub fn is_branch_trace(&self) -> bool {
        matches!(
            self,
            Event::BranchOpened | Event::BranchMerged | Event::BranchExhausted
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
