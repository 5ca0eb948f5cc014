//! In-memory index catalog for one collection
//!
//! Indexes are derived state maintained alongside the document set.
//!
//! # API
//!
//! - `create_index(handle)` - Register and build an index
//! - `drop_index(id)` - Remove an index; later opens fail
//! - `apply_write(offset, body)` - Insert or replace a document
//! - `apply_delete(offset)` - Remove a document
//! - `open(index, bounds, reverse)` - Open an iterator (`IndexAccess`)

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use serde_json::Value;

use crate::condition::{AndCondition, RangeBound};

use super::btree::{IndexKey, IndexTree, StorageOffset};
use super::errors::{IndexError, IndexResult};
use super::handle::{IndexHandle, IndexId, IndexKind, IndexRef};
use super::iterator::{
    DocumentHandle, FullScanIterator, IndexAccess, IndexIterator, LookupIterator, RangeIterator,
};

/// Physical structure behind one index
#[derive(Debug)]
enum IndexData {
    /// Primary and sorted indexes: tree on the leading field
    Tree(IndexTree),
    /// Hash index: composite key over all fields
    Hash(BTreeMap<Vec<IndexKey>, Vec<StorageOffset>>),
}

/// Documents of one collection and their indexes
#[derive(Debug)]
pub struct IndexCatalog {
    documents: BTreeMap<StorageOffset, Arc<Value>>,
    definitions: BTreeMap<IndexId, IndexRef>,
    data: HashMap<IndexId, IndexData>,
    primary: IndexRef,
}

impl Default for IndexCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexCatalog {
    /// Id of the primary index
    pub const PRIMARY_ID: IndexId = IndexId(0);

    /// Creates an empty catalog holding only the primary index
    pub fn new() -> Self {
        let primary = IndexHandle::primary(Self::PRIMARY_ID).into_ref();
        let mut definitions = BTreeMap::new();
        definitions.insert(primary.id, primary.clone());
        let mut data = HashMap::new();
        data.insert(primary.id, IndexData::Tree(IndexTree::new()));

        Self {
            documents: BTreeMap::new(),
            definitions,
            data,
            primary,
        }
    }

    /// The primary index
    pub fn primary(&self) -> &IndexRef {
        &self.primary
    }

    /// Registers an index and builds it from the current documents
    pub fn create_index(&mut self, handle: IndexHandle) -> IndexResult<IndexRef> {
        if handle.fields.is_empty() {
            return Err(IndexError::definition_invalid(format!(
                "index {} has no fields",
                handle.name
            )));
        }
        if handle.kind == IndexKind::Primary {
            return Err(IndexError::definition_invalid(
                "the primary index is created with the catalog",
            ));
        }
        if self.definitions.contains_key(&handle.id) {
            return Err(IndexError::definition_invalid(format!(
                "index id {} is already in use",
                handle.id
            )));
        }

        let handle = handle.into_ref();
        let mut data = match handle.kind {
            IndexKind::Hash => IndexData::Hash(BTreeMap::new()),
            IndexKind::Primary | IndexKind::Sorted => IndexData::Tree(IndexTree::new()),
        };
        for (&offset, body) in &self.documents {
            index_document(&handle, &mut data, offset, body);
        }

        self.definitions.insert(handle.id, handle.clone());
        self.data.insert(handle.id, data);
        Ok(handle)
    }

    /// Drops an index; iterators already open are unaffected
    pub fn drop_index(&mut self, id: IndexId) -> IndexResult<()> {
        if id == self.primary.id {
            return Err(IndexError::definition_invalid(
                "the primary index cannot be dropped",
            ));
        }
        match self.definitions.remove(&id) {
            Some(_) => {
                self.data.remove(&id);
                Ok(())
            }
            None => Err(IndexError::unavailable(id)),
        }
    }

    /// Looks up an index by id
    pub fn index(&self, id: IndexId) -> Option<&IndexRef> {
        self.definitions.get(&id)
    }

    /// All indexes in id order
    pub fn indexes(&self) -> impl Iterator<Item = &IndexRef> {
        self.definitions.values()
    }

    /// Inserts or replaces the document at `offset`.
    ///
    /// A document whose `_key` is already stored at another offset replaces
    /// that document.
    pub fn apply_write(&mut self, offset: StorageOffset, body: Value) {
        if self.documents.contains_key(&offset) {
            self.apply_delete(offset);
        }
        if let Some(key) = IndexKey::from_document(&body, "_key") {
            if key != IndexKey::Null {
                let previous = self.lookup_tree(self.primary.id, &key);
                for old in previous {
                    self.apply_delete(old);
                }
            }
        }

        let body = Arc::new(body);
        for handle in self.definitions.values() {
            if let Some(data) = self.data.get_mut(&handle.id) {
                index_document(handle, data, offset, &body);
            }
        }
        self.documents.insert(offset, body);
    }

    /// Removes the document at `offset` from the collection and all indexes
    pub fn apply_delete(&mut self, offset: StorageOffset) {
        let Some(body) = self.documents.remove(&offset) else {
            return;
        };
        for handle in self.definitions.values() {
            if let Some(data) = self.data.get_mut(&handle.id) {
                unindex_document(handle, data, offset, &body);
            }
        }
    }

    /// Document body at `offset`
    pub fn document(&self, offset: StorageOffset) -> Option<&Arc<Value>> {
        self.documents.get(&offset)
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn lookup_tree(&self, id: IndexId, key: &IndexKey) -> Vec<StorageOffset> {
        match self.data.get(&id) {
            Some(IndexData::Tree(tree)) => tree.lookup_eq(key),
            _ => Vec::new(),
        }
    }

    fn handles(&self, offsets: impl IntoIterator<Item = StorageOffset>) -> Vec<DocumentHandle> {
        offsets
            .into_iter()
            .filter_map(|offset| {
                self.documents
                    .get(&offset)
                    .map(|body| DocumentHandle::new(offset, body.clone()))
            })
            .collect()
    }

    fn full_scan(&self, bounds: &AndCondition, reverse: bool) -> Box<dyn IndexIterator> {
        let mut documents = self.handles(self.documents.keys().copied());
        if reverse {
            documents.reverse();
        }
        Box::new(FullScanIterator::new(documents, bounds.clone()))
    }

    fn equality_keys(handle: &IndexHandle, bounds: &AndCondition) -> Option<Vec<IndexKey>> {
        handle
            .fields
            .iter()
            .map(|field| bounds.range(field).and_then(|r| r.equality_value().cloned()))
            .collect()
    }
}

impl IndexAccess for IndexCatalog {
    fn contains(&self, index: &IndexHandle) -> bool {
        self.definitions
            .get(&index.id)
            .is_some_and(|known| known.name == index.name && known.kind == index.kind)
    }

    fn open(
        &self,
        index: &IndexHandle,
        bounds: &AndCondition,
        reverse: bool,
    ) -> IndexResult<Box<dyn IndexIterator>> {
        if !self.contains(index) {
            return Err(IndexError::unavailable(index));
        }
        let Some(data) = self.data.get(&index.id) else {
            return Err(IndexError::unavailable(index));
        };

        match (index.kind, data) {
            (IndexKind::Hash, IndexData::Hash(map)) => match Self::equality_keys(index, bounds) {
                Some(keys) => {
                    let offsets = map.get(&keys).cloned().unwrap_or_default();
                    Ok(Box::new(LookupIterator::new(self.handles(offsets), bounds)))
                }
                None => Ok(self.full_scan(bounds, reverse)),
            },
            (IndexKind::Primary, IndexData::Tree(tree)) => match Self::equality_keys(index, bounds) {
                Some(keys) => {
                    let offsets = keys.first().map(|k| tree.lookup_eq(k)).unwrap_or_default();
                    Ok(Box::new(LookupIterator::new(self.handles(offsets), bounds)))
                }
                None => Ok(self.full_scan(bounds, reverse)),
            },
            (IndexKind::Sorted, IndexData::Tree(tree)) => {
                let leading = index.leading_field().and_then(|field| bounds.range(field));
                match leading {
                    Some(range) => {
                        let mut offsets = tree.lookup_range(
                            to_bound(range.low.as_ref()),
                            to_bound(range.high.as_ref()),
                        );
                        if reverse {
                            offsets.reverse();
                        }
                        Ok(Box::new(RangeIterator::new(self.handles(offsets), bounds.clone())))
                    }
                    None => Ok(self.full_scan(bounds, reverse)),
                }
            }
            _ => Err(IndexError::definition_invalid(format!(
                "index {} has mismatched storage",
                index
            ))),
        }
    }
}

fn to_bound(bound: Option<&RangeBound>) -> Bound<&IndexKey> {
    match bound {
        Some(b) if b.inclusive => Bound::Included(&b.value),
        Some(b) => Bound::Excluded(&b.value),
        None => Bound::Unbounded,
    }
}

fn composite_key(handle: &IndexHandle, body: &Value) -> Option<Vec<IndexKey>> {
    handle
        .fields
        .iter()
        .map(|field| IndexKey::from_document(body, field))
        .collect()
}

fn index_document(handle: &IndexHandle, data: &mut IndexData, offset: StorageOffset, body: &Value) {
    match data {
        IndexData::Tree(tree) => {
            if let Some(key) = handle.leading_field().and_then(|f| IndexKey::from_document(body, f)) {
                tree.insert(key, offset);
            }
        }
        IndexData::Hash(map) => {
            if let Some(key) = composite_key(handle, body) {
                let offsets = map.entry(key).or_default();
                if let Err(pos) = offsets.binary_search(&offset) {
                    offsets.insert(pos, offset);
                }
            }
        }
    }
}

fn unindex_document(handle: &IndexHandle, data: &mut IndexData, offset: StorageOffset, body: &Value) {
    match data {
        IndexData::Tree(tree) => {
            if let Some(key) = handle.leading_field().and_then(|f| IndexKey::from_document(body, f)) {
                tree.remove(&key, offset);
            }
        }
        IndexData::Hash(map) => {
            if let Some(key) = composite_key(handle, body) {
                if let Some(offsets) = map.get_mut(&key) {
                    offsets.retain(|&o| o != offset);
                    if offsets.is_empty() {
                        map.remove(&key);
                    }
                }
            }
        }
    }
}
