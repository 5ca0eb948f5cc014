//! Condition combinator
//!
//! Pure functions that keep conditions in DNF while combining them:
//! intersecting AND-conditions, distributing AND over OR, lifting
//! list-valued bounds into top-level branches and merging adjacent branches.

use std::collections::BTreeSet;

use super::and_or::{AndCondition, OrCondition};

/// Intersects two AND-conditions attribute by attribute.
///
/// Returns `None` if any attribute's intersection is empty. The result
/// targets whichever index sorts first by (rank, id), so the operation is
/// commutative.
pub fn intersect_and(a: &AndCondition, b: &AndCondition) -> Option<AndCondition> {
    let (first, second) = if a.index().order_key() <= b.index().order_key() {
        (a, b)
    } else {
        (b, a)
    };

    let mut result = first.clone();
    for range in second.ranges() {
        let merged = match result.range(&range.attribute) {
            Some(existing) => existing.intersect(range)?,
            None => range.clone(),
        };
        result.replace(merged);
    }

    if result.is_unsatisfiable() {
        None
    } else {
        Some(result)
    }
}

/// ANDs two OR-conditions: every lhs/rhs pair is intersected and empty
/// pairs are dropped.
pub fn combine_or(lhs: &[AndCondition], rhs: &[AndCondition]) -> Vec<AndCondition> {
    let mut result = Vec::with_capacity(lhs.len() * rhs.len());
    for left in lhs {
        for right in rhs {
            if let Some(both) = intersect_and(left, right) {
                result.push(both);
            }
        }
    }
    result
}

/// Cross product of per-clause alternatives.
///
/// Each inner list holds the AND-conditions one clause expands into (e.g. a
/// membership test over a list-valued bound). Every combination that picks one
/// alternative per clause is intersected; empty combinations are dropped. An
/// empty alternative list makes the whole product empty.
pub fn cartesian_expand(branches: &[Vec<AndCondition>]) -> OrCondition {
    let Some((first, rest)) = branches.split_first() else {
        return OrCondition::new();
    };

    let mut product: Vec<AndCondition> = first
        .iter()
        .filter(|c| !c.is_unsatisfiable())
        .cloned()
        .collect();

    for alternatives in rest {
        if product.is_empty() {
            break;
        }
        product = combine_or(&product, alternatives);
    }

    OrCondition::from(product)
}

/// Merges two branches into one scan when their union is a single range.
///
/// Both must target the same index, constrain the same attributes, and agree
/// on all of them except at most one; on that one the ranges must overlap or
/// touch. The merged branch holds the hull of the differing ranges.
pub fn merge_adjacent(a: &AndCondition, b: &AndCondition) -> Option<AndCondition> {
    if a.index().id != b.index().id {
        return None;
    }

    let attrs_a: BTreeSet<&str> = a.attributes().collect();
    let attrs_b: BTreeSet<&str> = b.attributes().collect();
    if attrs_a != attrs_b {
        return None;
    }

    let mut differing = a
        .ranges()
        .filter_map(|ra| b.range(&ra.attribute).filter(|rb| *rb != ra).map(|rb| (ra, rb)));

    match (differing.next(), differing.next()) {
        (None, _) => Some(a.clone()),
        (Some((ra, rb)), None) if ra.overlaps_or_touches(rb) => {
            let mut merged = a.clone();
            merged.replace(ra.hull(rb));
            Some(merged)
        }
        _ => None,
    }
}

/// Intersects every branch of `condition` with `filter`, retargeting the
/// survivors to the branch's own index.
pub fn restrict(condition: &OrCondition, filter: &AndCondition) -> OrCondition {
    condition
        .branches()
        .iter()
        .filter_map(|branch| {
            let mut combined = intersect_and(branch, filter)?;
            combined.set_index(branch.index().clone());
            Some(combined)
        })
        .collect()
}
