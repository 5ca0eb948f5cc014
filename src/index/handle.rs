//! Index handles as chosen by the plan
//!
//! A handle identifies an index and describes what it can answer. Handles are
//! immutable and shared between the plan node and the conditions that target
//! them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Catalog-assigned index identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexId(pub u64);

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical index kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Primary index on `_key`, equality lookups only
    Primary,
    /// Hash index, equality on all fields
    Hash,
    /// Sorted index, ranges on the leading field
    Sorted,
}

impl IndexKind {
    /// Returns the kind name for explain output
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Primary => "primary",
            IndexKind::Hash => "hash",
            IndexKind::Sorted => "sorted",
        }
    }

    /// Whether the index can answer range constraints
    pub fn supports_range(&self) -> bool {
        matches!(self, IndexKind::Sorted)
    }
}

/// Immutable description of one index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexHandle {
    /// Index identifier
    pub id: IndexId,
    /// Index name
    pub name: String,
    /// Physical kind
    pub kind: IndexKind,
    /// Indexed attribute paths, in index order
    pub fields: Vec<String>,
    /// Whether index keys are unique
    pub unique: bool,
    /// Plan-assigned rank; lower ranks are scanned first
    pub rank: u32,
    /// Estimated selectivity in (0, 1]
    pub selectivity: f64,
}

/// Shared index handle
pub type IndexRef = Arc<IndexHandle>;

impl IndexHandle {
    /// The primary index of a collection
    pub fn primary(id: IndexId) -> Self {
        Self {
            id,
            name: "primary".to_string(),
            kind: IndexKind::Primary,
            fields: vec!["_key".to_string()],
            unique: true,
            rank: 0,
            selectivity: 1.0,
        }
    }

    /// A hash index over `fields`
    pub fn hash(id: IndexId, name: impl Into<String>, fields: &[&str]) -> Self {
        Self::with_kind(id, name, IndexKind::Hash, fields)
    }

    /// A sorted index over `fields`
    pub fn sorted(id: IndexId, name: impl Into<String>, fields: &[&str]) -> Self {
        Self::with_kind(id, name, IndexKind::Sorted, fields)
    }

    fn with_kind(id: IndexId, name: impl Into<String>, kind: IndexKind, fields: &[&str]) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique: false,
            rank: u32::try_from(id.0).unwrap_or(u32::MAX),
            selectivity: 1.0,
        }
    }

    /// Marks the index unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the plan rank
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }

    /// Sets the selectivity estimate, clamped into (0, 1]
    pub fn with_selectivity(mut self, selectivity: f64) -> Self {
        self.selectivity = selectivity.clamp(f64::MIN_POSITIVE, 1.0);
        self
    }

    /// Wraps the handle for sharing
    pub fn into_ref(self) -> IndexRef {
        Arc::new(self)
    }

    /// Deterministic ordering key: rank, then identity
    pub fn order_key(&self) -> (u32, IndexId) {
        (self.rank, self.id)
    }

    /// The leading indexed field
    pub fn leading_field(&self) -> Option<&str> {
        self.fields.first().map(String::as_str)
    }
}

impl fmt::Display for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, id {})", self.name, self.kind.as_str(), self.id)
    }
}
