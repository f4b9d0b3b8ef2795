// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scale-denominator ranges.
//!
//! Scales are expressed as the denominator `N` of a `1:N` map scale, so a
//! larger denominator means a smaller (more zoomed out) map.

/// An inclusive range of scale denominators for which a rule applies.
///
/// A bound of `0.0` means "unbounded" on that side. The default range has
/// both bounds at zero and matches every scale.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScaleRange {
    /// Smallest denominator (most zoomed in) at which the rule applies.
    pub min_denom: f64,
    /// Largest denominator (most zoomed out) at which the rule applies.
    pub max_denom: f64,
}

impl ScaleRange {
    /// A range that matches every scale.
    pub const UNBOUNDED: Self = Self {
        min_denom: 0.0,
        max_denom: 0.0,
    };

    /// Creates a range from its two bounds.
    #[must_use]
    pub const fn new(min_denom: f64, max_denom: f64) -> Self {
        Self {
            min_denom,
            max_denom,
        }
    }

    /// Returns whether at least one bound is set.
    #[must_use]
    pub fn depends_on_scale(&self) -> bool {
        self.min_denom != 0.0 || self.max_denom != 0.0
    }

    /// Returns whether the range applies at `scale`.
    ///
    /// A `scale` of `0.0` is the scale-independent sentinel and always
    /// matches.
    #[must_use]
    pub fn contains(&self, scale: f64) -> bool {
        if scale == 0.0 || !self.depends_on_scale() {
            return true;
        }
        if self.min_denom != 0.0 && scale < self.min_denom {
            return false;
        }
        if self.max_denom != 0.0 && scale > self.max_denom {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_matches_everything() {
        let range = ScaleRange::UNBOUNDED;
        assert!(!range.depends_on_scale());
        assert!(range.contains(0.0));
        assert!(range.contains(1.0));
        assert!(range.contains(1e9));
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = ScaleRange::new(1000.0, 5000.0);
        assert!(range.contains(1000.0));
        assert!(range.contains(2000.0));
        assert!(range.contains(5000.0));
        assert!(!range.contains(999.0));
        assert!(!range.contains(5001.0));
    }

    #[test]
    fn zero_scale_is_scale_independent() {
        let range = ScaleRange::new(1000.0, 5000.0);
        assert!(range.contains(0.0), "0 is the scale-independent sentinel");
    }

    #[test]
    fn single_bound_is_open_on_the_other_side() {
        let min_only = ScaleRange::new(1000.0, 0.0);
        assert!(min_only.contains(1e12));
        assert!(!min_only.contains(10.0));

        let max_only = ScaleRange::new(0.0, 5000.0);
        assert!(max_only.contains(1.0));
        assert!(!max_only.contains(5000.5));
    }
}
