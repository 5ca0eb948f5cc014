//! AND-conditions, OR-conditions and condition ownership

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, Index};

use serde_json::Value;

use crate::index::{IndexKey, IndexRef};

use super::range::RangeInfo;

/// Conjunction of per-attribute constraints answered by one index.
///
/// Holds at most one `RangeInfo` per attribute. Attributes without an entry
/// are unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct AndCondition {
    index: IndexRef,
    ranges: BTreeMap<String, RangeInfo>,
}

impl AndCondition {
    /// Creates an unconstrained condition on `index`
    pub fn new(index: IndexRef) -> Self {
        Self {
            index,
            ranges: BTreeMap::new(),
        }
    }

    /// Adds a constraint, intersecting with any existing one on the same
    /// attribute. The result may become unsatisfiable.
    pub fn with_range(mut self, range: RangeInfo) -> Self {
        self.insert(range);
        self
    }

    /// In-place form of `with_range`
    pub fn insert(&mut self, range: RangeInfo) {
        let merged = match self.ranges.get(&range.attribute) {
            Some(existing) => existing.intersect_unchecked(&range),
            None => range,
        };
        self.ranges.insert(merged.attribute.clone(), merged);
    }

    /// Replaces the constraint on an attribute
    pub(crate) fn replace(&mut self, range: RangeInfo) {
        self.ranges.insert(range.attribute.clone(), range);
    }

    /// Retargets the condition to another index
    pub(crate) fn set_index(&mut self, index: IndexRef) {
        self.index = index;
    }

    /// The index this condition targets
    pub fn index(&self) -> &IndexRef {
        &self.index
    }

    /// Constraints in attribute order
    pub fn ranges(&self) -> impl Iterator<Item = &RangeInfo> {
        self.ranges.values()
    }

    /// Constraint on one attribute, if any
    pub fn range(&self, attribute: &str) -> Option<&RangeInfo> {
        self.ranges.get(attribute)
    }

    /// Constrained attributes in order
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    /// Number of constrained attributes
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// True when some constraint admits no value
    pub fn is_unsatisfiable(&self) -> bool {
        self.ranges.values().any(RangeInfo::is_empty)
    }

    /// Whether every field of the index is constrained by equality
    pub fn is_full_equality(&self) -> bool {
        !self.index.fields.is_empty()
            && self
                .index
                .fields
                .iter()
                .all(|f| self.ranges.get(f).is_some_and(|r| r.is_equality))
    }

    /// Whether a document satisfies every constraint
    pub fn matches(&self, document: &Value) -> bool {
        self.ranges.values().all(|range| {
            IndexKey::from_document(document, &range.attribute)
                .is_some_and(|key| range.contains(&key))
        })
    }
}

impl fmt::Display for AndCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            write!(f, "true")?;
        } else {
            let parts: Vec<String> = self.ranges.values().map(ToString::to_string).collect();
            write!(f, "{}", parts.join(" AND "))?;
        }
        write!(f, " [{}]", self.index.name)
    }
}

/// Disjunction of AND-conditions.
///
/// Branch order affects scan efficiency and duplicate suppression only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrCondition {
    branches: Vec<AndCondition>,
}

impl OrCondition {
    /// Creates an empty condition (matches nothing)
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a branch
    pub fn push(&mut self, branch: AndCondition) {
        self.branches.push(branch);
    }

    /// Builder form of `push`
    pub fn with_branch(mut self, branch: AndCondition) -> Self {
        self.push(branch);
        self
    }

    /// Number of branches
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// True when there are no branches
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Branch by position
    pub fn get(&self, position: usize) -> Option<&AndCondition> {
        self.branches.get(position)
    }

    /// All branches in order
    pub fn branches(&self) -> &[AndCondition] {
        &self.branches
    }

    /// Consumes the condition into its branches
    pub fn into_branches(self) -> Vec<AndCondition> {
        self.branches
    }

    /// Whether a document satisfies at least one branch
    pub fn matches(&self, document: &Value) -> bool {
        self.branches.iter().any(|b| b.matches(document))
    }
}

impl Index<usize> for OrCondition {
    type Output = AndCondition;

    fn index(&self, position: usize) -> &AndCondition {
        &self.branches[position]
    }
}

impl From<Vec<AndCondition>> for OrCondition {
    fn from(branches: Vec<AndCondition>) -> Self {
        Self { branches }
    }
}

impl FromIterator<AndCondition> for OrCondition {
    fn from_iter<I: IntoIterator<Item = AndCondition>>(iter: I) -> Self {
        Self {
            branches: iter.into_iter().collect(),
        }
    }
}

impl Extend<AndCondition> for OrCondition {
    fn extend<I: IntoIterator<Item = AndCondition>>(&mut self, iter: I) {
        self.branches.extend(iter);
    }
}

impl IntoIterator for OrCondition {
    type Item = AndCondition;
    type IntoIter = std::vec::IntoIter<AndCondition>;

    fn into_iter(self) -> Self::IntoIter {
        self.branches.into_iter()
    }
}

impl<'c> IntoIterator for &'c OrCondition {
    type Item = &'c AndCondition;
    type IntoIter = std::slice::Iter<'c, AndCondition>;

    fn into_iter(self) -> Self::IntoIter {
        self.branches.iter()
    }
}

impl fmt::Display for OrCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.branches.is_empty() {
            return write!(f, "false");
        }
        let parts: Vec<String> = self.branches.iter().map(|b| format!("({})", b)).collect();
        write!(f, "{}", parts.join(" OR "))
    }
}

/// The condition a scan runs against.
///
/// `Borrowed` is the plan node's constant condition and is never mutated.
/// `Owned` is built by the block, e.g. per outer row.
#[derive(Debug, Clone)]
pub enum Condition<'a> {
    /// Built and owned by the scan
    Owned(OrCondition),
    /// Constant condition borrowed from the plan
    Borrowed(&'a OrCondition),
}

impl Condition<'_> {
    /// Whether the scan owns the condition
    pub fn is_owned(&self) -> bool {
        matches!(self, Condition::Owned(_))
    }
}

impl Deref for Condition<'_> {
    type Target = OrCondition;

    fn deref(&self) -> &OrCondition {
        match self {
            Condition::Owned(condition) => condition,
            Condition::Borrowed(condition) => condition,
        }
    }
}
