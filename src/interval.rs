//! Closed sub-intervals of `[0, 1]`: the annotation lattice.
//!
//! An [`Interval`] is the truth value of one ground atom. Knowledge only ever
//! *narrows* an interval (the lattice meet), so reasoning is monotone within a
//! timestep. Each interval also remembers the bounds it held before the last
//! [`reset`](Interval::reset), which the `delta_bound` convergence mode
//! compares against, and a `static` flag that freezes it across timesteps.

use serde::{Deserialize, Serialize};

use crate::error::IntervalError;

/// Interval-typed result.
pub type IntervalResult<T> = std::result::Result<T, IntervalError>;

/// A closed interval `[lower, upper] ⊆ [0, 1]`.
///
/// Equality compares `(lower, upper)` only; the previous bounds and the static
/// flag are bookkeeping.
///
/// Serialized as a validated `[lower, upper]` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct Interval {
    lower: f64,
    upper: f64,
    prev_lower: f64,
    prev_upper: f64,
    is_static: bool,
}

impl Interval {
    /// The unconstrained interval `[0, 1]`.
    pub const UNKNOWN: Interval = Interval {
        lower: 0.0,
        upper: 1.0,
        prev_lower: 0.0,
        prev_upper: 1.0,
        is_static: false,
    };

    /// `[1, 1]`.
    pub const TRUE: Interval = Interval {
        lower: 1.0,
        upper: 1.0,
        prev_lower: 1.0,
        prev_upper: 1.0,
        is_static: false,
    };

    /// `[0, 0]`.
    pub const FALSE: Interval = Interval {
        lower: 0.0,
        upper: 0.0,
        prev_lower: 0.0,
        prev_upper: 0.0,
        is_static: false,
    };

    /// Construct `[lower, upper]`, validating `0 <= lower <= upper <= 1`.
    pub fn closed(lower: f64, upper: f64) -> IntervalResult<Self> {
        // NaN fails every comparison, so it is rejected here too.
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower > upper {
            return Err(IntervalError::InvalidInterval { lower, upper });
        }
        Ok(Self::unchecked(lower, upper))
    }

    /// Construct an interval from possibly out-of-range values, clamping both
    /// bounds into `[0, 1]` and ordering them.
    ///
    /// Annotation functions compute bounds arithmetically; this is how their
    /// output becomes a lattice element.
    pub fn clamped(lower: f64, upper: f64) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let (l, u) = (clamp(lower), clamp(upper));
        if l <= u {
            Self::unchecked(l, u)
        } else {
            Self::unchecked(u, l)
        }
    }

    pub(crate) const fn unchecked(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            prev_lower: lower,
            prev_upper: upper,
            is_static: false,
        }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn prev_lower(&self) -> f64 {
        self.prev_lower
    }

    pub fn prev_upper(&self) -> f64 {
        self.prev_upper
    }

    /// The bounds this interval held before the last reset.
    pub fn previous(&self) -> Interval {
        Self::unchecked(self.prev_lower, self.prev_upper)
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
    }

    /// Builder-style variant of [`set_static`](Self::set_static).
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Overwrite the current bounds, leaving `prev_*` and the static flag alone.
    pub fn set_bounds(&mut self, lower: f64, upper: f64) {
        self.lower = lower;
        self.upper = upper;
    }

    /// `true` for `[0, 1]`.
    pub fn is_unknown(&self) -> bool {
        self.lower == 0.0 && self.upper == 1.0
    }

    /// Save the current bounds as previous and return to `[0, 1]`.
    ///
    /// Static intervals are left untouched.
    pub fn reset(&mut self) {
        if self.is_static {
            return;
        }
        self.prev_lower = self.lower;
        self.prev_upper = self.upper;
        self.lower = 0.0;
        self.upper = 1.0;
    }

    /// Bound containment: `inner ⊆ self`.
    pub fn contains(&self, inner: &Interval) -> bool {
        self.lower <= inner.lower && inner.upper <= self.upper
    }

    /// `true` when the two intervals share no point, i.e. their meet is empty.
    pub fn is_disjoint(&self, other: &Interval) -> bool {
        self.lower > other.upper || other.lower > self.upper
    }

    /// The lattice meet `self ⊓ other`.
    ///
    /// When the meet is empty the result widens to a non-static `[0, 1]`.
    /// This never fails: callers that must distinguish a genuine `[0, 1]` from
    /// a widened empty meet check [`is_disjoint`](Self::is_disjoint) first.
    /// The result keeps `self`'s previous bounds.
    pub fn intersect(&self, other: &Interval) -> Interval {
        let lower = self.lower.max(other.lower);
        let upper = self.upper.min(other.upper);
        if lower > upper {
            return Interval {
                lower: 0.0,
                upper: 1.0,
                prev_lower: self.prev_lower,
                prev_upper: self.prev_upper,
                is_static: false,
            };
        }
        Interval {
            lower,
            upper,
            prev_lower: self.prev_lower,
            prev_upper: self.prev_upper,
            is_static: self.is_static,
        }
    }

    /// The bound an IPL partner must satisfy: `[1 - upper, 1 - lower]`.
    pub fn complement(&self) -> Interval {
        Self::unchecked(1.0 - self.upper, 1.0 - self.lower)
    }

    /// Largest absolute bound movement between `self` and `other`.
    pub fn max_distance(&self, other: &Interval) -> f64 {
        (self.lower - other.lower)
            .abs()
            .max((self.upper - other.upper).abs())
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.lower == other.lower && self.upper == other.upper
    }
}

impl TryFrom<(f64, f64)> for Interval {
    type Error = IntervalError;

    fn try_from((lower, upper): (f64, f64)) -> IntervalResult<Self> {
        Self::closed(lower, upper)
    }
}

impl From<Interval> for (f64, f64) {
    fn from(i: Interval) -> Self {
        (i.lower, i.upper)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(l: f64, u: f64) -> Interval {
        Interval::closed(l, u).unwrap()
    }

    #[test]
    fn closed_rejects_malformed_bounds() {
        assert!(Interval::closed(0.6, 0.4).is_err());
        assert!(Interval::closed(-0.1, 0.4).is_err());
        assert!(Interval::closed(0.1, 1.2).is_err());
        assert!(Interval::closed(f64::NAN, 1.0).is_err());
        assert!(Interval::closed(0.3, 0.3).is_ok());
    }

    #[test]
    fn intersect_is_idempotent() {
        for (l, u) in [(0.0, 1.0), (0.2, 0.7), (1.0, 1.0), (0.0, 0.0)] {
            let a = iv(l, u);
            assert_eq!(a.intersect(&a), a);
        }
    }

    #[test]
    fn intersect_is_commutative() {
        let pairs = [
            (iv(0.1, 0.6), iv(0.4, 0.9)),
            (iv(0.0, 1.0), iv(0.3, 0.3)),
            (iv(0.0, 0.2), iv(0.5, 1.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(a.intersect(&b), b.intersect(&a));
        }
    }

    #[test]
    fn empty_meet_widens_to_unknown_and_drops_static() {
        let a = iv(0.0, 0.2).with_static(true);
        let b = iv(0.5, 1.0);
        assert!(a.is_disjoint(&b));
        let m = a.intersect(&b);
        assert!(m.is_unknown());
        assert!(!m.is_static());
    }

    #[test]
    fn meet_narrows_both_bounds() {
        let m = iv(0.1, 0.6).intersect(&iv(0.4, 0.9));
        assert_eq!(m, iv(0.4, 0.6));
        assert!(m.lower() <= m.upper());
    }

    #[test]
    fn contains_is_bound_containment() {
        assert!(iv(0.0, 1.0).contains(&iv(0.3, 0.4)));
        assert!(iv(0.3, 0.4).contains(&iv(0.3, 0.4)));
        assert!(!iv(0.3, 0.4).contains(&iv(0.2, 0.4)));
    }

    #[test]
    fn equality_ignores_history_and_static() {
        let mut a = iv(0.2, 0.3).with_static(true);
        let b = iv(0.2, 0.3);
        assert_eq!(a, b);
        a.reset();
        assert_eq!(a, b, "static intervals survive reset");
    }

    #[test]
    fn reset_saves_previous_bounds() {
        let mut a = iv(0.1, 0.2);
        a.reset();
        assert!(a.is_unknown());
        assert_eq!(a.previous(), iv(0.1, 0.2));
    }

    #[test]
    fn complement_mirrors_bounds() {
        let c = iv(0.15, 0.2).complement();
        assert!((c.lower() - 0.8).abs() < 1e-12);
        assert!((c.upper() - 0.85).abs() < 1e-12);
    }

    #[test]
    fn clamped_orders_and_clamps() {
        assert_eq!(Interval::clamped(1.4, -0.2), iv(0.0, 1.0));
        assert_eq!(Interval::clamped(0.8, 0.3), iv(0.3, 0.8));
    }

    #[test]
    fn serde_uses_validated_pairs() {
        let json = serde_json::to_string(&iv(0.25, 0.5)).unwrap();
        assert_eq!(json, "[0.25,0.5]");
        let back: Interval = serde_json::from_str("[0.25,0.5]").unwrap();
        assert_eq!(back, iv(0.25, 0.5));
        assert!(serde_json::from_str::<Interval>("[0.9,0.1]").is_err());
    }

    #[test]
    fn display_format() {
        assert_eq!(iv(0.5, 1.0).to_string(), "[0.5,1]");
    }
}
