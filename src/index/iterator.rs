//! Index iteration primitive
//!
//! An iterator is opened for one AND-condition and yields exactly the
//! documents matching it. Three variants exist, chosen when the branch is
//! opened:
//!
//! - `LookupIterator`: equality lookup on a hash or primary index, fully
//!   resolved at open time
//! - `RangeIterator`: key-ordered walk over a sorted index, read incrementally
//! - `FullScanIterator`: enumeration of the whole collection
//!
//! Lookup and full-scan iterators are read all at once; callers drain them in
//! a single pass and never reopen them.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;

use crate::condition::AndCondition;

use super::btree::StorageOffset;
use super::errors::IndexResult;
use super::handle::IndexHandle;

/// A document produced by an index scan
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHandle {
    /// Storage identity of the document
    pub offset: StorageOffset,
    /// Document body
    pub body: Arc<Value>,
}

impl DocumentHandle {
    /// Creates a handle
    pub fn new(offset: StorageOffset, body: Arc<Value>) -> Self {
        Self { offset, body }
    }
}

/// Iterator variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorKind {
    /// Equality lookup
    Lookup,
    /// Incremental sorted range walk
    Range,
    /// Full collection enumeration
    FullScan,
}

impl IteratorKind {
    /// Whether the iterator is drained in one pass
    pub fn reads_all_at_once(&self) -> bool {
        !matches!(self, IteratorKind::Range)
    }

    /// Returns the kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            IteratorKind::Lookup => "lookup",
            IteratorKind::Range => "range",
            IteratorKind::FullScan => "full_scan",
        }
    }
}

/// Live cursor over the documents matching one AND-condition
pub trait IndexIterator {
    /// The iterator variant
    fn kind(&self) -> IteratorKind;

    /// Returns up to `at_most` further matches. Fewer than `at_most` (in
    /// particular none) means the iterator is exhausted.
    fn next(&mut self, at_most: usize) -> Vec<DocumentHandle>;

    /// Releases the iterator; later calls to `next` return nothing
    fn close(&mut self);
}

/// Opens iterators on indexes
pub trait IndexAccess {
    /// Whether `index` still exists
    fn contains(&self, index: &IndexHandle) -> bool;

    /// Opens an iterator for `bounds` on `index`.
    ///
    /// Fails with `AERO_INDEX_UNAVAILABLE` if the index no longer exists.
    fn open(
        &self,
        index: &IndexHandle,
        bounds: &AndCondition,
        reverse: bool,
    ) -> IndexResult<Box<dyn IndexIterator>>;
}

/// Equality lookup, resolved when opened
#[derive(Debug)]
pub struct LookupIterator {
    matches: VecDeque<DocumentHandle>,
}

impl LookupIterator {
    /// Wraps the documents found by the lookup, keeping those matching `filter`
    pub fn new(candidates: Vec<DocumentHandle>, filter: &AndCondition) -> Self {
        Self {
            matches: candidates
                .into_iter()
                .filter(|doc| filter.matches(&doc.body))
                .collect(),
        }
    }
}

impl IndexIterator for LookupIterator {
    fn kind(&self) -> IteratorKind {
        IteratorKind::Lookup
    }

    fn next(&mut self, at_most: usize) -> Vec<DocumentHandle> {
        let n = at_most.min(self.matches.len());
        self.matches.drain(..n).collect()
    }

    fn close(&mut self) {
        self.matches.clear();
    }
}

/// Sorted range walk with a lazily applied residual filter
#[derive(Debug)]
pub struct RangeIterator {
    candidates: VecDeque<DocumentHandle>,
    filter: AndCondition,
}

impl RangeIterator {
    /// Walks `candidates` in the given order, yielding those matching `filter`
    pub fn new(candidates: Vec<DocumentHandle>, filter: AndCondition) -> Self {
        Self {
            candidates: candidates.into(),
            filter,
        }
    }
}

impl IndexIterator for RangeIterator {
    fn kind(&self) -> IteratorKind {
        IteratorKind::Range
    }

    fn next(&mut self, at_most: usize) -> Vec<DocumentHandle> {
        let mut out = Vec::new();
        while out.len() < at_most {
            let Some(doc) = self.candidates.pop_front() else {
                break;
            };
            if self.filter.matches(&doc.body) {
                out.push(doc);
            }
        }
        out
    }

    fn close(&mut self) {
        self.candidates.clear();
    }
}

/// Enumerates a collection snapshot
#[derive(Debug)]
pub struct FullScanIterator {
    documents: Vec<DocumentHandle>,
    position: usize,
    filter: AndCondition,
}

impl FullScanIterator {
    /// Scans `documents` in order, yielding those matching `filter`
    pub fn new(documents: Vec<DocumentHandle>, filter: AndCondition) -> Self {
        Self {
            documents,
            position: 0,
            filter,
        }
    }
}

impl IndexIterator for FullScanIterator {
    fn kind(&self) -> IteratorKind {
        IteratorKind::FullScan
    }

    fn next(&mut self, at_most: usize) -> Vec<DocumentHandle> {
        let mut out = Vec::new();
        while out.len() < at_most && self.position < self.documents.len() {
            let doc = &self.documents[self.position];
            self.position += 1;
            if self.filter.matches(&doc.body) {
                out.push(doc.clone());
            }
        }
        out
    }

    fn close(&mut self) {
        self.documents.clear();
        self.position = 0;
    }
}
