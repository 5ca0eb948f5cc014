//! Per-attribute range constraints

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::index::IndexKey;

use super::bound::{self, BoundSide, RangeBound};

/// One attribute's constraint.
///
/// If `is_equality` is set, `low == high` and both are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeInfo {
    /// Dot-separated attribute path
    pub attribute: String,
    /// Lower bound, `None` for unbounded
    pub low: Option<RangeBound>,
    /// Upper bound, `None` for unbounded
    pub high: Option<RangeBound>,
    /// Whether this is a point constraint
    pub is_equality: bool,
}

impl RangeInfo {
    /// Creates an equality constraint `attribute == value`
    pub fn equality(attribute: impl Into<String>, value: impl Into<IndexKey>) -> Self {
        let value = value.into();
        Self {
            attribute: attribute.into(),
            low: Some(RangeBound::inclusive(value.clone())),
            high: Some(RangeBound::inclusive(value)),
            is_equality: true,
        }
    }

    /// Creates a range constraint, or `None` if the range is empty.
    ///
    /// A degenerate inclusive range is flagged as equality.
    pub fn range(
        attribute: impl Into<String>,
        low: Option<RangeBound>,
        high: Option<RangeBound>,
    ) -> Option<Self> {
        let info = Self::from_bounds(attribute.into(), low, high);
        if info.is_empty() {
            None
        } else {
            Some(info)
        }
    }

    /// Creates `attribute > value` or `attribute >= value`
    pub fn lower(attribute: impl Into<String>, value: impl Into<IndexKey>, inclusive: bool) -> Self {
        let bound = RangeBound {
            value: value.into(),
            inclusive,
        };
        Self::from_bounds(attribute.into(), Some(bound), None)
    }

    /// Creates `attribute < value` or `attribute <= value`
    pub fn upper(attribute: impl Into<String>, value: impl Into<IndexKey>, inclusive: bool) -> Self {
        let bound = RangeBound {
            value: value.into(),
            inclusive,
        };
        Self::from_bounds(attribute.into(), None, Some(bound))
    }

    /// Creates a constraint admitting every value
    pub fn unbounded(attribute: impl Into<String>) -> Self {
        Self::from_bounds(attribute.into(), None, None)
    }

    fn from_bounds(attribute: String, low: Option<RangeBound>, high: Option<RangeBound>) -> Self {
        let is_equality = match (&low, &high) {
            (Some(l), Some(h)) => l.inclusive && h.inclusive && l.value == h.value,
            _ => false,
        };
        Self {
            attribute,
            low,
            high,
            is_equality,
        }
    }

    /// True when no value satisfies this constraint
    pub fn is_empty(&self) -> bool {
        bound::is_empty(self.low.as_ref(), self.high.as_ref())
    }

    /// True when neither side is bounded
    pub fn is_unbounded(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }

    /// The point value of an equality constraint
    pub fn equality_value(&self) -> Option<&IndexKey> {
        if self.is_equality {
            self.low.as_ref().map(|b| &b.value)
        } else {
            None
        }
    }

    /// Whether `key` satisfies this constraint
    pub fn contains(&self, key: &IndexKey) -> bool {
        let low_ok = self
            .low
            .as_ref()
            .map_or(true, |b| b.admits(key, BoundSide::Low));
        let high_ok = self
            .high
            .as_ref()
            .map_or(true, |b| b.admits(key, BoundSide::High));
        low_ok && high_ok
    }

    /// Intersection of two constraints on the same attribute.
    ///
    /// The result may be empty; callers check `is_empty`.
    pub fn intersect_unchecked(&self, other: &RangeInfo) -> RangeInfo {
        let low = RangeBound::combine(self.low.as_ref(), other.low.as_ref(), BoundSide::Low, false);
        let high = RangeBound::combine(
            self.high.as_ref(),
            other.high.as_ref(),
            BoundSide::High,
            false,
        );
        Self::from_bounds(self.attribute.clone(), low, high)
    }

    /// Intersection of two constraints, `None` if empty
    pub fn intersect(&self, other: &RangeInfo) -> Option<RangeInfo> {
        let result = self.intersect_unchecked(other);
        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// Smallest constraint containing both
    pub fn hull(&self, other: &RangeInfo) -> RangeInfo {
        let low = RangeBound::combine(self.low.as_ref(), other.low.as_ref(), BoundSide::Low, true);
        let high = RangeBound::combine(
            self.high.as_ref(),
            other.high.as_ref(),
            BoundSide::High,
            true,
        );
        Self::from_bounds(self.attribute.clone(), low, high)
    }

    /// Whether the union of both constraints is a single contiguous range
    pub fn overlaps_or_touches(&self, other: &RangeInfo) -> bool {
        if self.intersect(other).is_some() {
            return true;
        }
        touches(self.high.as_ref(), other.low.as_ref()) || touches(other.high.as_ref(), self.low.as_ref())
    }

    /// Orders constraints by range start, then by range end
    pub fn cmp_bounds(&self, other: &RangeInfo) -> Ordering {
        bound::cmp_low(self.low.as_ref(), other.low.as_ref())
            .then_with(|| bound::cmp_high(self.high.as_ref(), other.high.as_ref()))
    }
}

fn touches(high: Option<&RangeBound>, low: Option<&RangeBound>) -> bool {
    match (high, low) {
        (Some(h), Some(l)) => h.value == l.value && (h.inclusive || l.inclusive),
        _ => false,
    }
}

impl fmt::Display for RangeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = self.equality_value() {
            return write!(f, "{} == {}", self.attribute, value.to_json());
        }
        if self.is_unbounded() {
            return write!(f, "{} unbounded", self.attribute);
        }

        let mut parts = Vec::with_capacity(2);
        if let Some(low) = &self.low {
            let op = if low.inclusive { ">=" } else { ">" };
            parts.push(format!("{} {} {}", self.attribute, op, low.value.to_json()));
        }
        if let Some(high) = &self.high {
            let op = if high.inclusive { "<=" } else { "<" };
            parts.push(format!("{} {} {}", self.attribute, op, high.value.to_json()));
        }
        write!(f, "{}", parts.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_flags() {
        let eq = RangeInfo::equality("x", 5);
        assert!(eq.is_equality);
        assert_eq!(eq.equality_value(), Some(&IndexKey::from_int(5)));

        let degenerate = RangeInfo::range(
            "x",
            Some(RangeBound::inclusive(5)),
            Some(RangeBound::inclusive(5)),
        )
        .unwrap();
        assert!(degenerate.is_equality);
    }

    #[test]
    fn test_half_open_point_is_empty() {
        assert!(RangeInfo::range(
            "x",
            Some(RangeBound::inclusive(5)),
            Some(RangeBound::exclusive(5)),
        )
        .is_none());

        let raw = RangeInfo {
            attribute: "x".to_string(),
            low: Some(RangeBound::inclusive(5)),
            high: Some(RangeBound::exclusive(5)),
            is_equality: false,
        };
        assert!(raw.is_empty());
    }

    #[test]
    fn test_contains() {
        let r = RangeInfo::range(
            "age",
            Some(RangeBound::exclusive(18)),
            Some(RangeBound::inclusive(30)),
        )
        .unwrap();
        assert!(!r.contains(&IndexKey::from_int(18)));
        assert!(r.contains(&IndexKey::from_int(19)));
        assert!(r.contains(&IndexKey::from_int(30)));
        assert!(!r.contains(&IndexKey::from_int(31)));
        assert!(!r.contains(&IndexKey::from_string("20")));
    }

    #[test]
    fn test_intersect_to_equality() {
        let a = RangeInfo::lower("x", 3, true);
        let b = RangeInfo::upper("x", 3, true);
        let both = a.intersect(&b).unwrap();
        assert!(both.is_equality);
    }

    #[test]
    fn test_intersect_disjoint() {
        let a = RangeInfo::equality("x", 1);
        let b = RangeInfo::lower("x", 1, false);
        assert!(a.intersect(&b).is_none());
        assert!(a.intersect_unchecked(&b).is_empty());
    }

    #[test]
    fn test_hull_and_touching() {
        let a = RangeInfo::range("x", Some(RangeBound::inclusive(1)), Some(RangeBound::inclusive(2)))
            .unwrap();
        let b = RangeInfo::range("x", Some(RangeBound::exclusive(2)), Some(RangeBound::inclusive(4)))
            .unwrap();
        assert!(a.overlaps_or_touches(&b));
        let hull = a.hull(&b);
        assert_eq!(hull.low, Some(RangeBound::inclusive(1)));
        assert_eq!(hull.high, Some(RangeBound::inclusive(4)));

        let c = RangeInfo::range("x", Some(RangeBound::exclusive(4)), None).unwrap();
        let d = RangeInfo::upper("x", 4, false);
        assert!(!c.overlaps_or_touches(&d));
    }

    #[test]
    fn test_display() {
        assert_eq!(RangeInfo::equality("name", "bob").to_string(), "name == \"bob\"");
        let r = RangeInfo::range("a", Some(RangeBound::exclusive(1)), Some(RangeBound::inclusive(3)))
            .unwrap();
        assert_eq!(r.to_string(), "a > 1 AND a <= 3");
    }
}
