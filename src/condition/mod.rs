//! Range condition model for index scans
//!
//! Conditions are kept in disjunctive normal form: an `OrCondition` is a list
//! of `AndCondition` branches, each answered by one index and holding one
//! `RangeInfo` per constrained attribute.
//!
//! # Components
//!
//! - `bound` / `range`: single-attribute constraints and their algebra
//! - `and_or`: AND/OR conditions and owned-vs-borrowed conditions
//! - `combine`: intersection, AND-over-OR distribution, list expansion, merging
//! - `order`: deterministic branch ordering

mod and_or;
mod bound;
mod combine;
mod order;
mod range;

pub use and_or::{AndCondition, Condition, OrCondition};
pub use bound::{cmp_high, cmp_low, is_empty, BoundSide, RangeBound};
pub use combine::{cartesian_expand, combine_or, intersect_and, merge_adjacent, restrict};
pub use order::{index_prefix, ConditionOrderer};
pub use range::RangeInfo;
