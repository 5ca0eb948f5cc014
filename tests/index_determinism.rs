//! Index Determinism Tests
//!
//! Tests for index invariants:
//! - Index contents do not depend on write order
//! - Lookups return consistent, ascending offsets
//! - The primary index always exists and tracks `_key`

use aeroscan::condition::{AndCondition, RangeInfo};
use aeroscan::index::{
    IndexAccess, IndexCatalog, IndexErrorCode, IndexHandle, IndexId, IndexRef, IteratorKind,
    StorageOffset,
};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn write(catalog: &mut IndexCatalog, key: &str, name: &str, offset: StorageOffset) {
    catalog.apply_write(offset, json!({ "_key": key, "name": name }));
}

fn scan(catalog: &IndexCatalog, index: &IndexRef, bounds: &AndCondition) -> Vec<StorageOffset> {
    let mut iterator = catalog.open(index, bounds, false).unwrap();
    let offsets = iterator.next(usize::MAX).iter().map(|doc| doc.offset).collect();
    iterator.close();
    offsets
}

fn lookup_key(catalog: &IndexCatalog, key: &str) -> Vec<StorageOffset> {
    let primary = catalog.primary().clone();
    let bounds = AndCondition::new(primary.clone()).with_range(RangeInfo::equality("_key", key));
    scan(catalog, &primary, &bounds)
}

fn by_name(catalog: &mut IndexCatalog) -> IndexRef {
    catalog
        .create_index(IndexHandle::sorted(IndexId(1), "idx_name", &["name"]))
        .unwrap()
}

// =============================================================================
// Primary Index Tests
// =============================================================================

/// Primary index returns the offset of the written document.
#[test]
fn test_primary_lookup_correct_offset() {
    let mut catalog = IndexCatalog::new();
    write(&mut catalog, "find_me", "Name", 42);
    assert_eq!(lookup_key(&catalog, "find_me"), vec![42]);
}

/// Missing key returns nothing.
#[test]
fn test_primary_lookup_missing() {
    let mut catalog = IndexCatalog::new();
    write(&mut catalog, "exists", "Name", 0);
    assert!(lookup_key(&catalog, "not_exists").is_empty());
}

/// The primary lookup is answered without scanning.
#[test]
fn test_primary_lookup_is_point_lookup() {
    let mut catalog = IndexCatalog::new();
    write(&mut catalog, "doc1", "Alice", 0);

    let primary = catalog.primary().clone();
    let bounds = AndCondition::new(primary.clone()).with_range(RangeInfo::equality("_key", "doc1"));
    let iterator = catalog.open(&primary, &bounds, false).unwrap();
    assert_eq!(iterator.kind(), IteratorKind::Lookup);
}

#[test]
fn test_primary_cannot_be_dropped() {
    let mut catalog = IndexCatalog::new();
    let primary = catalog.primary().id;
    let err = catalog.drop_index(primary).unwrap_err();
    assert_eq!(err.code(), IndexErrorCode::AeroIndexDefinitionInvalid);
    assert!(catalog.index(primary).is_some());
}

// =============================================================================
// Deterministic Lookup Tests
// =============================================================================

/// Write order does not change what a range scan returns.
#[test]
fn test_scan_independent_of_write_order() {
    let docs = [("a", "Carol", 300), ("b", "Alice", 100), ("c", "Bob", 200), ("d", "Alice", 50)];

    let mut forward = IndexCatalog::new();
    let mut backward = IndexCatalog::new();
    let f_idx = by_name(&mut forward);
    let b_idx = by_name(&mut backward);
    for &(key, name, offset) in &docs {
        write(&mut forward, key, name, offset);
    }
    for &(key, name, offset) in docs.iter().rev() {
        write(&mut backward, key, name, offset);
    }

    let bounds = |index: &IndexRef| {
        AndCondition::new(index.clone()).with_range(RangeInfo::lower("name", "Alice", true))
    };
    let expected = vec![50, 100, 200, 300];
    assert_eq!(scan(&forward, &f_idx, &bounds(&f_idx)), expected);
    assert_eq!(scan(&backward, &b_idx, &bounds(&b_idx)), expected);
}

/// An index created after the writes sees every document.
#[test]
fn test_create_index_builds_from_existing_documents() {
    let mut catalog = IndexCatalog::new();
    write(&mut catalog, "doc1", "Alice", 0);
    write(&mut catalog, "doc2", "Bob", 100);

    let index = by_name(&mut catalog);
    let bounds = AndCondition::new(index.clone()).with_range(RangeInfo::equality("name", "Bob"));
    assert_eq!(scan(&catalog, &index, &bounds), vec![100]);
}

/// A hash index without equality on every field falls back to a filtered
/// scan and stays exact.
#[test]
fn test_partial_hash_bounds_fall_back_to_scan() {
    let mut catalog = IndexCatalog::new();
    let index = catalog
        .create_index(IndexHandle::hash(IndexId(2), "idx_name_key", &["name", "_key"]))
        .unwrap();
    write(&mut catalog, "doc1", "Alice", 0);
    write(&mut catalog, "doc2", "Bob", 100);
    write(&mut catalog, "doc3", "Alice", 200);

    let bounds = AndCondition::new(index.clone()).with_range(RangeInfo::equality("name", "Alice"));
    let iterator = catalog.open(&index, &bounds, false).unwrap();
    assert_eq!(iterator.kind(), IteratorKind::FullScan);
    assert_eq!(scan(&catalog, &index, &bounds), vec![0, 200]);
}

#[test]
fn test_duplicate_index_rejected() {
    let mut catalog = IndexCatalog::new();
    by_name(&mut catalog);
    let err = catalog
        .create_index(IndexHandle::hash(IndexId(1), "other", &["x"]))
        .unwrap_err();
    assert_eq!(err.code(), IndexErrorCode::AeroIndexDefinitionInvalid);
}

// =============================================================================
// Apply Write and Delete Tests
// =============================================================================

/// Apply delete removes from every index.
#[test]
fn test_apply_delete_removes_from_index() {
    let mut catalog = IndexCatalog::new();
    let index = by_name(&mut catalog);
    write(&mut catalog, "to_delete", "Name", 100);
    assert_eq!(lookup_key(&catalog, "to_delete"), vec![100]);

    catalog.apply_delete(100);

    assert!(lookup_key(&catalog, "to_delete").is_empty());
    let bounds = AndCondition::new(index.clone()).with_range(RangeInfo::equality("name", "Name"));
    assert!(scan(&catalog, &index, &bounds).is_empty());
    assert!(catalog.is_empty());
}

/// Rewriting a key at a new offset replaces the previous entry.
#[test]
fn test_update_replaces_entry() {
    let mut catalog = IndexCatalog::new();
    let index = by_name(&mut catalog);
    write(&mut catalog, "doc", "OldName", 100);
    write(&mut catalog, "doc", "NewName", 200);

    assert_eq!(lookup_key(&catalog, "doc"), vec![200]);
    assert_eq!(catalog.len(), 1);
    let old = AndCondition::new(index.clone()).with_range(RangeInfo::equality("name", "OldName"));
    assert!(scan(&catalog, &index, &old).is_empty());
}

// =============================================================================
// Offset Order Tests
// =============================================================================

/// Offsets under one key are ascending regardless of write order.
#[test]
fn test_offsets_ascending_under_one_key() {
    let mut catalog = IndexCatalog::new();
    let index = by_name(&mut catalog);
    write(&mut catalog, "z", "Same", 300);
    write(&mut catalog, "a", "Same", 100);
    write(&mut catalog, "m", "Same", 200);

    let bounds = AndCondition::new(index.clone()).with_range(RangeInfo::equality("name", "Same"));
    let first = scan(&catalog, &index, &bounds);
    assert_eq!(first, vec![100, 200, 300]);
    assert_eq!(scan(&catalog, &index, &bounds), first);
}

/// Empty catalog scans return nothing.
#[test]
fn test_empty_catalog() {
    let mut catalog = IndexCatalog::new();
    let index = by_name(&mut catalog);
    assert!(catalog.is_empty());
    assert!(scan(&catalog, &index, &AndCondition::new(index.clone())).is_empty());
}
