//! BTreeMap-based index structures
//!
//! Indexes use BTreeMap<IndexKey, Vec<StorageOffset>> for deterministic ordering.
//! Offsets under one key are always sorted ascending.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

use serde::Serialize;
use serde_json::Value;

/// Index key representing a scalar field value.
///
/// Ordering is deterministic across types: Null < Bool < Number < String.
/// Integers and floats are both numbers and compare numerically. Floats with
/// no fractional part are normalized to `Int` on construction so that equal
/// numbers always have one representation.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IndexKey {
    /// Null or missing attribute
    Null,
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Non-integral float value
    Float(f64),
    /// String value
    String(String),
}

impl IndexKey {
    /// Create a key from a boolean
    pub fn from_bool(v: bool) -> Self {
        IndexKey::Bool(v)
    }

    /// Create a key from an integer
    pub fn from_int(v: i64) -> Self {
        IndexKey::Int(v)
    }

    /// Create a key from a float
    pub fn from_float(v: f64) -> Self {
        if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
            IndexKey::Int(v as i64)
        } else {
            IndexKey::Float(v)
        }
    }

    /// Create a key from a string
    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::String(v.into())
    }

    /// Create a key from a JSON value.
    ///
    /// Arrays and objects are not indexable and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::from_bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(IndexKey::from_int(i))
                } else {
                    n.as_f64().map(IndexKey::from_float)
                }
            }
            Value::String(s) => Some(IndexKey::from_string(s.as_str())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Key for an attribute of a document. Missing attributes index as null.
    pub fn from_document(document: &Value, path: &str) -> Option<Self> {
        match lookup_path(document, path) {
            Some(value) => Self::from_json(value),
            None => Some(IndexKey::Null),
        }
    }

    /// Converts the key back into a JSON value
    pub fn to_json(&self) -> Value {
        match self {
            IndexKey::Null => Value::Null,
            IndexKey::Bool(b) => Value::Bool(*b),
            IndexKey::Int(i) => Value::from(*i),
            IndexKey::Float(f) => Value::from(*f),
            IndexKey::String(s) => Value::String(s.clone()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            IndexKey::Null => 0,
            IndexKey::Bool(_) => 1,
            IndexKey::Int(_) | IndexKey::Float(_) => 2,
            IndexKey::String(_) => 3,
        }
    }
}

/// Resolves a dot-separated attribute path inside a document.
pub fn lookup_path<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (IndexKey::Null, IndexKey::Null) => Ordering::Equal,
            (IndexKey::Bool(a), IndexKey::Bool(b)) => a.cmp(b),
            (IndexKey::Int(a), IndexKey::Int(b)) => a.cmp(b),
            (IndexKey::Float(a), IndexKey::Float(b)) => a.total_cmp(b),
            (IndexKey::Int(a), IndexKey::Float(b)) => (*a as f64).total_cmp(b),
            (IndexKey::Float(a), IndexKey::Int(b)) => a.total_cmp(&(*b as f64)),
            (IndexKey::String(a), IndexKey::String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl From<i64> for IndexKey {
    fn from(v: i64) -> Self {
        IndexKey::from_int(v)
    }
}

impl From<i32> for IndexKey {
    fn from(v: i32) -> Self {
        IndexKey::from_int(i64::from(v))
    }
}

impl From<f64> for IndexKey {
    fn from(v: f64) -> Self {
        IndexKey::from_float(v)
    }
}

impl From<bool> for IndexKey {
    fn from(v: bool) -> Self {
        IndexKey::from_bool(v)
    }
}

impl From<&str> for IndexKey {
    fn from(v: &str) -> Self {
        IndexKey::from_string(v)
    }
}

impl From<String> for IndexKey {
    fn from(v: String) -> Self {
        IndexKey::String(v)
    }
}

/// Storage offset type, the identity of a document
pub type StorageOffset = u64;

/// A single-field sorted index using BTreeMap for deterministic ordering.
#[derive(Debug, Default)]
pub struct IndexTree {
    /// Maps key values to sorted lists of offsets
    tree: BTreeMap<IndexKey, Vec<StorageOffset>>,
}

impl IndexTree {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert an offset for a key.
    ///
    /// Maintains sorted ascending order.
    pub fn insert(&mut self, key: IndexKey, offset: StorageOffset) {
        let offsets = self.tree.entry(key).or_default();

        match offsets.binary_search(&offset) {
            Ok(_) => {}
            Err(pos) => offsets.insert(pos, offset),
        }
    }

    /// Remove an offset for a key.
    ///
    /// If the key has no more offsets, removes the key entirely.
    pub fn remove(&mut self, key: &IndexKey, offset: StorageOffset) {
        if let Some(offsets) = self.tree.get_mut(key) {
            if let Ok(pos) = offsets.binary_search(&offset) {
                offsets.remove(pos);
            }
            if offsets.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Lookup all offsets for an exact key match.
    pub fn lookup_eq(&self, key: &IndexKey) -> Vec<StorageOffset> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    /// Lookup offsets whose key lies between `min` and `max`.
    ///
    /// Returns offsets in key order, ascending offsets within one key.
    /// An empty or inverted range yields no offsets.
    pub fn lookup_range(
        &self,
        min: Bound<&IndexKey>,
        max: Bound<&IndexKey>,
    ) -> Vec<StorageOffset> {
        if range_is_inverted(min, max) {
            return Vec::new();
        }

        self.tree
            .range((min, max))
            .flat_map(|(_, offsets)| offsets.iter().copied())
            .collect()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Returns the total number of offsets
    pub fn offset_count(&self) -> usize {
        self.tree.values().map(|v| v.len()).sum()
    }
}

// BTreeMap::range panics on these, so they are filtered up front.
fn range_is_inverted(min: Bound<&IndexKey>, max: Bound<&IndexKey>) -> bool {
    match (min, max) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_ordering() {
        let keys = vec![
            IndexKey::Null,
            IndexKey::from_bool(false),
            IndexKey::from_bool(true),
            IndexKey::from_int(-100),
            IndexKey::from_float(-0.5),
            IndexKey::from_int(0),
            IndexKey::from_float(0.5),
            IndexKey::from_int(100),
            IndexKey::from_string("aaa"),
            IndexKey::from_string("zzz"),
        ];

        for i in 1..keys.len() {
            assert!(keys[i - 1] < keys[i], "Keys should be ordered");
        }
    }

    #[test]
    fn test_integral_float_normalized() {
        assert_eq!(IndexKey::from_float(3.0), IndexKey::Int(3));
        assert!(matches!(IndexKey::from_json(&json!(3.0)), Some(IndexKey::Int(3))));
        assert_eq!(IndexKey::from_float(2.5), IndexKey::Float(2.5));
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut tree = IndexTree::new();

        tree.insert(IndexKey::from_string("alice"), 100);
        tree.insert(IndexKey::from_string("alice"), 200);
        tree.insert(IndexKey::from_string("bob"), 300);

        assert_eq!(tree.lookup_eq(&IndexKey::from_string("alice")), vec![100, 200]);
        assert_eq!(tree.lookup_eq(&IndexKey::from_string("bob")), vec![300]);
    }

    #[test]
    fn test_remove() {
        let mut tree = IndexTree::new();

        tree.insert(IndexKey::from_int(1), 100);
        tree.insert(IndexKey::from_int(1), 200);

        tree.remove(&IndexKey::from_int(1), 100);
        assert_eq!(tree.lookup_eq(&IndexKey::from_int(1)), vec![200]);

        tree.remove(&IndexKey::from_int(1), 200);
        assert_eq!(tree.key_count(), 0);
    }

    #[test]
    fn test_lookup_range_key_order() {
        let mut tree = IndexTree::new();

        tree.insert(IndexKey::from_int(1), 500);
        tree.insert(IndexKey::from_int(2), 400);
        tree.insert(IndexKey::from_int(3), 300);
        tree.insert(IndexKey::from_int(4), 200);
        tree.insert(IndexKey::from_int(5), 100);

        let two = IndexKey::from_int(2);
        let four = IndexKey::from_int(4);
        let offsets = tree.lookup_range(Bound::Included(&two), Bound::Excluded(&four));
        assert_eq!(offsets, vec![400, 300]);
    }

    #[test]
    fn test_lookup_range_inverted_is_empty() {
        let mut tree = IndexTree::new();
        tree.insert(IndexKey::from_int(1), 1);

        let one = IndexKey::from_int(1);
        assert!(tree
            .lookup_range(Bound::Included(&one), Bound::Excluded(&one))
            .is_empty());
        assert_eq!(tree.offset_count(), 1);
    }

    #[test]
    fn test_from_document_path() {
        let doc = json!({"address": {"city": "Berlin"}, "tags": [1, 2]});
        assert_eq!(
            IndexKey::from_document(&doc, "address.city"),
            Some(IndexKey::from_string("Berlin"))
        );
        assert_eq!(IndexKey::from_document(&doc, "missing"), Some(IndexKey::Null));
        assert_eq!(IndexKey::from_document(&doc, "tags"), None);
    }
}
