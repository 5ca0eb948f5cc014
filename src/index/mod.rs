//! Index subsystem for aeroscan
//!
//! Indexes are derived, in-memory state kept in step with the collection's
//! documents.
//!
//! # Design Principles
//!
//! - Derived state: indexes mirror the document set, never the source of truth
//! - Deterministic: BTreeMap iteration order, sorted offsets
//! - Exact iterators: bounds an index cannot use are applied as a residual filter
//!
//! # Invariants
//!
//! - Offsets under one key are sorted ascending
//! - Opening a dropped index fails with AERO_INDEX_UNAVAILABLE

mod btree;
mod catalog;
mod errors;
mod handle;
mod iterator;

pub use btree::{lookup_path, IndexKey, IndexTree, StorageOffset};
pub use catalog::IndexCatalog;
pub use errors::{IndexError, IndexErrorCode, IndexResult, Severity};
pub use handle::{IndexHandle, IndexId, IndexKind, IndexRef};
pub use iterator::{
    DocumentHandle, FullScanIterator, IndexAccess, IndexIterator, IteratorKind, LookupIterator,
    RangeIterator,
};
