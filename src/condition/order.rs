//! Deterministic ordering of OR-branches
//!
//! Branches are ordered by (1) index rank and identity, (2) their ranges on
//! the index fields, compared lexicographically, (3) their ranges on the
//! remaining attributes by name, then the number of constraints, (4) original
//! position. Only branches with identical constraints tie, so the scan order
//! of distinct branches never depends on the order they were written in.
//! Branches sharing an index and a bound prefix end up adjacent, which is
//! what lets the scan merge them or suppress duplicates at the seam.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::and_or::{AndCondition, OrCondition};
use super::range::RangeInfo;

/// Sorts branches of an OR-condition into scan order
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionOrderer {
    reverse: bool,
}

impl ConditionOrderer {
    /// Creates an orderer; `reverse` flips the bound comparison
    pub fn new(reverse: bool) -> Self {
        Self { reverse }
    }

    /// Returns the scan permutation of `condition`'s branches.
    ///
    /// `prefix[i]` lists the attributes compared for branch `i`, normally
    /// the fields of its index. The sort is stable.
    pub fn sort(&self, condition: &OrCondition, prefix: &[Vec<String>]) -> Vec<usize> {
        let mut coords: Vec<usize> = (0..condition.len()).collect();
        if coords.len() > 1 {
            coords.sort_by(|&a, &b| self.compare(condition, prefix, a, b));
        }
        coords
    }

    /// Compares two branches by position
    pub fn compare(&self, condition: &OrCondition, prefix: &[Vec<String>], a: usize, b: usize) -> Ordering {
        let (left, right) = (&condition[a], &condition[b]);

        left.index()
            .order_key()
            .cmp(&right.index().order_key())
            .then_with(|| {
                let attributes = prefix.get(a).map(Vec::as_slice).unwrap_or(&[]);
                let ordering = compare_on(left, right, attributes.iter().map(String::as_str));
                if self.reverse {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .then_with(|| {
                let attributes = prefix.get(a).map(Vec::as_slice).unwrap_or(&[]);
                let rest: BTreeSet<&str> = left
                    .attributes()
                    .chain(right.attributes())
                    .filter(|name| !attributes.iter().any(|field| field == name))
                    .collect();
                compare_on(left, right, rest)
            })
            .then_with(|| left.range_count().cmp(&right.range_count()))
    }
}

/// Lexicographic comparison on `attributes`; a missing constraint counts as
/// unbounded
fn compare_on<'s>(
    left: &AndCondition,
    right: &AndCondition,
    attributes: impl IntoIterator<Item = &'s str>,
) -> Ordering {
    for attribute in attributes {
        let ordering = match (left.range(attribute), right.range(attribute)) {
            (Some(l), Some(r)) => l.cmp_bounds(r),
            (Some(l), None) => l.cmp_bounds(&RangeInfo::unbounded(attribute)),
            (None, Some(r)) => RangeInfo::unbounded(attribute).cmp_bounds(r),
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Sort prefix for every branch: the fields of the index it targets
pub fn index_prefix(condition: &OrCondition) -> Vec<Vec<String>> {
    condition
        .branches()
        .iter()
        .map(|branch| branch.index().fields.clone())
        .collect()
}
