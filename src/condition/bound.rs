//! Single-sided range bounds
//!
//! A bound is a value plus an inclusive flag. An absent bound (`None`) is
//! unbounded on that side.

use std::cmp::Ordering;

use serde::Serialize;

use crate::index::IndexKey;

/// Which side of a range a bound sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    /// Lower bound
    Low,
    /// Upper bound
    High,
}

/// One side of a range constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeBound {
    /// Bound value
    pub value: IndexKey,
    /// Whether the value itself is admitted
    pub inclusive: bool,
}

impl RangeBound {
    /// Creates an inclusive bound
    pub fn inclusive(value: impl Into<IndexKey>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    /// Creates an exclusive bound
    pub fn exclusive(value: impl Into<IndexKey>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }

    /// Combines two bounds on the same side.
    ///
    /// Without `keep_wider` the tighter bound wins (AND semantics): the larger
    /// low or the smaller high; at equal values inclusive+exclusive yields
    /// exclusive. With `keep_wider` the looser bound wins (hull semantics) and
    /// inclusive+exclusive yields inclusive. An absent bound is unbounded.
    pub fn combine(
        a: Option<&RangeBound>,
        b: Option<&RangeBound>,
        side: BoundSide,
        keep_wider: bool,
    ) -> Option<RangeBound> {
        match (a, b) {
            (None, None) => None,
            (Some(only), None) | (None, Some(only)) => {
                if keep_wider {
                    None
                } else {
                    Some(only.clone())
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.value.cmp(&y.value);
                if ordering == Ordering::Equal {
                    let inclusive = if keep_wider {
                        x.inclusive || y.inclusive
                    } else {
                        x.inclusive && y.inclusive
                    };
                    return Some(RangeBound {
                        value: x.value.clone(),
                        inclusive,
                    });
                }

                let prefer_greater = (side == BoundSide::Low) != keep_wider;
                let x_wins = (ordering == Ordering::Greater) == prefer_greater;
                Some(if x_wins { x.clone() } else { y.clone() })
            }
        }
    }

    /// Whether `key` lies on the admitted side of this bound
    pub fn admits(&self, key: &IndexKey, side: BoundSide) -> bool {
        match (key.cmp(&self.value), side) {
            (Ordering::Equal, _) => self.inclusive,
            (Ordering::Greater, BoundSide::Low) | (Ordering::Less, BoundSide::High) => true,
            _ => false,
        }
    }
}

/// True when no value can satisfy both `low` and `high`.
pub fn is_empty(low: Option<&RangeBound>, high: Option<&RangeBound>) -> bool {
    match (low, high) {
        (Some(low), Some(high)) => match low.value.cmp(&high.value) {
            Ordering::Greater => true,
            Ordering::Equal => !(low.inclusive && high.inclusive),
            Ordering::Less => false,
        },
        _ => false,
    }
}

/// Orders lower bounds by where their range starts. Unbounded starts first.
pub fn cmp_low(a: Option<&RangeBound>, b: Option<&RangeBound>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a
            .value
            .cmp(&b.value)
            .then_with(|| b.inclusive.cmp(&a.inclusive)),
    }
}

/// Orders upper bounds by where their range ends. Unbounded ends last.
pub fn cmp_high(a: Option<&RangeBound>, b: Option<&RangeBound>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a
            .value
            .cmp(&b.value)
            .then_with(|| a.inclusive.cmp(&b.inclusive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tighter_low_picks_greater() {
        let a = RangeBound::inclusive(3);
        let b = RangeBound::inclusive(5);
        let combined = RangeBound::combine(Some(&a), Some(&b), BoundSide::Low, false);
        assert_eq!(combined, Some(RangeBound::inclusive(5)));
    }

    #[test]
    fn test_tighter_high_picks_smaller() {
        let a = RangeBound::inclusive(3);
        let b = RangeBound::exclusive(5);
        let combined = RangeBound::combine(Some(&a), Some(&b), BoundSide::High, false);
        assert_eq!(combined, Some(RangeBound::inclusive(3)));
    }

    #[test]
    fn test_equal_values_tighter_is_exclusive() {
        let a = RangeBound::inclusive(4);
        let b = RangeBound::exclusive(4);
        for side in [BoundSide::Low, BoundSide::High] {
            let combined = RangeBound::combine(Some(&a), Some(&b), side, false);
            assert_eq!(combined, Some(RangeBound::exclusive(4)));
        }
    }

    #[test]
    fn test_wider_keeps_loosest() {
        let a = RangeBound::exclusive(4);
        let b = RangeBound::inclusive(4);
        let c = RangeBound::inclusive(9);

        assert_eq!(
            RangeBound::combine(Some(&a), Some(&b), BoundSide::Low, true),
            Some(RangeBound::inclusive(4))
        );
        assert_eq!(
            RangeBound::combine(Some(&a), Some(&c), BoundSide::Low, true),
            Some(RangeBound::exclusive(4))
        );
        assert_eq!(
            RangeBound::combine(Some(&a), Some(&c), BoundSide::High, true),
            Some(RangeBound::inclusive(9))
        );
    }

    #[test]
    fn test_absent_bound() {
        let a = RangeBound::inclusive(1);
        assert_eq!(
            RangeBound::combine(Some(&a), None, BoundSide::Low, false),
            Some(a.clone())
        );
        assert_eq!(RangeBound::combine(None, Some(&a), BoundSide::High, true), None);
        assert_eq!(RangeBound::combine(None, None, BoundSide::Low, false), None);
    }

    #[test]
    fn test_is_empty() {
        let five_in = RangeBound::inclusive(5);
        let five_ex = RangeBound::exclusive(5);
        let six = RangeBound::inclusive(6);

        assert!(!is_empty(Some(&five_in), Some(&five_in)));
        assert!(is_empty(Some(&five_in), Some(&five_ex)));
        assert!(is_empty(Some(&five_ex), Some(&five_in)));
        assert!(is_empty(Some(&six), Some(&five_in)));
        assert!(!is_empty(Some(&five_in), Some(&six)));
        assert!(!is_empty(None, Some(&five_ex)));
    }

    #[test]
    fn test_admits() {
        let low = RangeBound::exclusive(5);
        assert!(!low.admits(&IndexKey::from_int(5), BoundSide::Low));
        assert!(low.admits(&IndexKey::from_int(6), BoundSide::Low));

        let high = RangeBound::inclusive(5);
        assert!(high.admits(&IndexKey::from_int(5), BoundSide::High));
        assert!(!high.admits(&IndexKey::from_int(6), BoundSide::High));
    }

    #[test]
    fn test_bound_ordering() {
        let in5 = RangeBound::inclusive(5);
        let ex5 = RangeBound::exclusive(5);
        assert_eq!(cmp_low(None, Some(&in5)), Ordering::Less);
        assert_eq!(cmp_low(Some(&in5), Some(&ex5)), Ordering::Less);
        assert_eq!(cmp_high(Some(&ex5), Some(&in5)), Ordering::Less);
        assert_eq!(cmp_high(None, Some(&in5)), Ordering::Greater);
    }
}
