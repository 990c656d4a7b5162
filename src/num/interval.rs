//! The interval lattice (Â§3.3, Â§4.2): `[lb, ub]` over extended bounds, plus a
//! machine-integer flavor that renormalizes into a fixed-width range.

use core::cmp;

use super::{
    bound::Bound,
    machine_int::{
        MachineInt,
        Sign,
    },
};

/// `[lb, ub]` over unbounded (or rational-coded, via [`Bound`]) integers, or
/// bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Interval {
    /// No value satisfies the interval.
    Bottom,
    /// `lo <= hi`, both possibly infinite.
    Bounded {
        /// Lower bound.
        lo: Bound,
        /// Upper bound.
        hi: Bound,
    },
}

impl Interval {
    /// The bottom interval (no values).
    pub const fn bottom() -> Self {
        Self::Bottom
    }

    /// The top interval, `[-oo, +oo]`.
    pub const fn top() -> Self {
        Self::Bounded {
            lo: Bound::MinusInfinity,
            hi: Bound::PlusInfinity,
        }
    }

    /// `[n, n]`.
    pub const fn singleton(n: i128) -> Self {
        Self::Bounded {
            lo: Bound::Finite(n),
            hi: Bound::Finite(n),
        }
    }

    /// Construct `[lo, hi]`, collapsing to bottom if `lo > hi`.
    pub fn new(lo: Bound, hi: Bound) -> Self {
        if lo > hi {
            Self::Bottom
        } else {
            Self::Bounded { lo, hi }
        }
    }

    /// True iff this is the bottom interval.
    pub const fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    /// True iff this is `[-oo, +oo]`.
    pub fn is_top(&self) -> bool {
        matches!(
            self,
            Self::Bounded {
                lo: Bound::MinusInfinity,
                hi: Bound::PlusInfinity,
            }
        )
    }

    /// The lower bound, if not bottom.
    pub fn lo(&self) -> Option<Bound> {
        match self {
            Self::Bottom => None,
            Self::Bounded { lo, .. } => Some(*lo),
        }
    }

    /// The upper bound, if not bottom.
    pub fn hi(&self) -> Option<Bound> {
        match self {
            Self::Bottom => None,
            Self::Bounded { hi, .. } => Some(*hi),
        }
    }

    /// `lb <= n <= ub`.
    pub fn contains(&self, n: i128) -> bool {
        match self {
            Self::Bottom => false,
            Self::Bounded { lo, hi } => *lo <= Bound::Finite(n) && Bound::Finite(n) <= *hi,
        }
    }

    /// The exact singleton value, if this interval contains exactly one.
    pub fn as_singleton(&self) -> Option<i128> {
        match self {
            Self::Bounded {
                lo: Bound::Finite(a),
                hi: Bound::Finite(b),
            } if a == b => Some(*a),
            _ => None,
        }
    }

    /// `leq` for the lattice order: `self` describes no more values than
    /// `other`.
    pub fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) => true,
            (_, Self::Bottom) => false,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                l2 <= l1 && h1 <= h2
            }
        }
    }

    /// `[min(a,c), max(b,d)]`.
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => *x,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                Self::Bounded {
                    lo: l1.min(*l2),
                    hi: h1.max(*h2),
                }
            }
        }
    }

    /// Intersection; may produce bottom.
    pub fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                Self::new(l1.max(*l2), h1.min(*h2))
            }
        }
    }

    /// Standard interval widening: any bound that grew relative to `self`
    /// (the previous iterate) jumps straight to infinity.
    pub fn widen(&self, next: &Self) -> Self {
        match (self, next) {
            (Self::Bottom, x) => *x,
            (x, Self::Bottom) => *x,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                let lo = if l2 < l1 {
                    Bound::MinusInfinity
                } else {
                    *l1
                };
                let hi = if h2 > h1 {
                    Bound::PlusInfinity
                } else {
                    *h1
                };
                Self::Bounded { lo, hi }
            }
        }
    }

    /// Threshold widening: a grown bound snaps to the nearest supplied
    /// threshold that still covers it, instead of jumping to infinity,
    /// letting fixpoints converge on known constants (e.g. loop limits).
    pub fn widen_with_thresholds(&self, next: &Self, thresholds: &[i128]) -> Self {
        match (self, next) {
            (Self::Bottom, x) => *x,
            (x, Self::Bottom) => *x,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                let lo = if l2 < l1 {
                    Self::snap_lo(*l2, thresholds)
                } else {
                    *l1
                };
                let hi = if h2 > h1 {
                    Self::snap_hi(*h2, thresholds)
                } else {
                    *h1
                };
                Self::Bounded { lo, hi }
            }
        }
    }

    fn snap_lo(grown: Bound, thresholds: &[i128]) -> Bound {
        let Bound::Finite(v) = grown else {
            return Bound::MinusInfinity;
        };
        thresholds
            .iter()
            .copied()
            .filter(|t| *t <= v)
            .max()
            .map(Bound::Finite)
            .unwrap_or(Bound::MinusInfinity)
    }

    fn snap_hi(grown: Bound, thresholds: &[i128]) -> Bound {
        let Bound::Finite(v) = grown else {
            return Bound::PlusInfinity;
        };
        thresholds
            .iter()
            .copied()
            .filter(|t| *t >= v)
            .min()
            .map(Bound::Finite)
            .unwrap_or(Bound::PlusInfinity)
    }

    /// Narrowing: pull a widened infinite bound back in using the more
    /// precise operand, never growing a bound.
    pub fn narrow(&self, more_precise: &Self) -> Self {
        match (self, more_precise) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                let lo = if *l1 == Bound::MinusInfinity { *l2 } else { *l1 };
                let hi = if *h1 == Bound::PlusInfinity { *h2 } else { *h1 };
                Self::new(lo, hi)
            }
        }
    }

    /// `self + other`.
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                Self::Bounded {
                    lo: *l1 + *l2,
                    hi: *h1 + *h2,
                }
            }
        }
    }

    /// `-self`.
    pub fn neg(&self) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Bounded { lo, hi } => Self::Bounded {
                lo: -*hi,
                hi: -*lo,
            },
        }
    }

    /// `self - other`.
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// `self * other`, taking the extremum over the four corner products.
    pub fn mul(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                let corners = [*l1 * *l2, *l1 * *h2, *h1 * *l2, *h1 * *h2];
                let lo = corners.iter().copied().fold(corners[0], Bound::min);
                let hi = corners.iter().copied().fold(corners[0], Bound::max);
                Self::Bounded { lo, hi }
            }
        }
    }
}

/// An interval that lives within a fixed [`MachineInt`] bit-width/sign,
/// renormalizing to `[min_value, max_value]` of that type whenever an
/// operation would otherwise escape it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineIntInterval {
    bit_width: u32,
    sign: Sign,
    interval: Interval,
}

impl MachineIntInterval {
    /// The top element for this bit-width/sign: `[min_value, max_value]`.
    pub fn top(bit_width: u32, sign: Sign) -> Self {
        let lo = MachineInt::min_value(bit_width, sign).to_integer();
        let hi = MachineInt::max_value(bit_width, sign).to_integer();
        Self {
            bit_width,
            sign,
            interval: Interval::new(Bound::Finite(lo), Bound::Finite(hi)),
        }
    }

    /// The bottom element for this bit-width/sign.
    pub fn bottom(bit_width: u32, sign: Sign) -> Self {
        Self {
            bit_width,
            sign,
            interval: Interval::Bottom,
        }
    }

    /// A single concrete machine integer.
    pub fn from_machine_int(v: MachineInt) -> Self {
        Self {
            bit_width: v.bit_width(),
            sign: v.sign(),
            interval: Interval::singleton(v.to_integer()),
        }
    }

    /// Clamp an unbounded interval into this type's representable range,
    /// snapping any bound that escapes it to the type's min/max.
    pub fn renormalize(bit_width: u32, sign: Sign, raw: Interval) -> Self {
        let type_range = Self::top(bit_width, sign).interval;
        Self {
            bit_width,
            sign,
            interval: raw.meet(&type_range),
        }
    }

    /// The bit width this interval is scoped to.
    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// The signedness this interval is scoped to.
    pub fn sign(&self) -> Sign {
        self.sign
    }

    /// The underlying unbounded interval.
    pub fn as_interval(&self) -> Interval {
        self.interval
    }

    /// True iff bottom.
    pub fn is_bottom(&self) -> bool {
        self.interval.is_bottom()
    }

    fn assert_same_type(&self, other: &Self) {
        debug_assert_eq!(self.bit_width, other.bit_width);
        debug_assert_eq!(self.sign, other.sign);
    }

    /// Lattice join, renormalized into the shared type.
    pub fn join(&self, other: &Self) -> Self {
        self.assert_same_type(other);
        Self::renormalize(self.bit_width, self.sign, self.interval.join(&other.interval))
    }

    /// Lattice meet.
    pub fn meet(&self, other: &Self) -> Self {
        self.assert_same_type(other);
        Self {
            bit_width: self.bit_width,
            sign: self.sign,
            interval: self.interval.meet(&other.interval),
        }
    }

    /// `leq` for the lattice order.
    pub fn leq(&self, other: &Self) -> bool {
        self.assert_same_type(other);
        self.interval.leq(&other.interval)
    }

    /// Widening, renormalized so a widened bound never escapes the type's
    /// range.
    pub fn widen(&self, next: &Self) -> Self {
        self.assert_same_type(next);
        Self::renormalize(self.bit_width, self.sign, self.interval.widen(&next.interval))
    }
}

/// `gcd`-free min/max helper kept local to avoid pulling in `num-integer`
/// for two integers.
pub(crate) fn clamp_order(a: i128, b: i128) -> (i128, i128) {
    (cmp::min(a, b), cmp::max(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_takes_min_lo_max_hi() {
        let a = Interval::new(Bound::Finite(1), Bound::Finite(5));
        let b = Interval::new(Bound::Finite(-3), Bound::Finite(2));
        assert_eq!(
            a.join(&b),
            Interval::new(Bound::Finite(-3), Bound::Finite(5))
        );
    }

    #[test]
    fn meet_can_produce_bottom() {
        let a = Interval::new(Bound::Finite(1), Bound::Finite(2));
        let b = Interval::new(Bound::Finite(3), Bound::Finite(4));
        assert!(a.meet(&b).is_bottom());
    }

    #[test]
    fn widen_sends_growing_bound_to_infinity() {
        let a = Interval::new(Bound::Finite(0), Bound::Finite(1));
        let b = Interval::new(Bound::Finite(0), Bound::Finite(2));
        let widened = a.widen(&b);
        assert_eq!(widened.lo(), Some(Bound::Finite(0)));
        assert_eq!(widened.hi(), Some(Bound::PlusInfinity));
    }

    #[test]
    fn threshold_widening_snaps_instead_of_diverging() {
        let a = Interval::new(Bound::Finite(0), Bound::Finite(1));
        let b = Interval::new(Bound::Finite(0), Bound::Finite(2));
        let widened = a.widen_with_thresholds(&b, &[10, 100]);
        assert_eq!(widened.hi(), Some(Bound::Finite(10)));
    }

    #[test]
    fn narrow_pulls_infinite_bound_back_in() {
        let widened = Interval::new(Bound::Finite(0), Bound::PlusInfinity);
        let precise = Interval::new(Bound::Finite(0), Bound::Finite(7));
        assert_eq!(widened.narrow(&precise), precise);
    }

    #[test]
    fn machine_int_interval_renormalizes_to_type_range() {
        let huge = Interval::new(Bound::Finite(-1_000_000), Bound::Finite(1_000_000));
        let clamped = MachineIntInterval::renormalize(8, Sign::Signed, huge);
        assert_eq!(clamped.as_interval().lo(), Some(Bound::Finite(-128)));
        assert_eq!(clamped.as_interval().hi(), Some(Bound::Finite(127)));
    }

    #[test]
    fn bottom_is_absorbing_for_join() {
        let top = Interval::top();
        assert_eq!(Interval::bottom().join(&top), top);
    }

    #[quickcheck_macros::quickcheck]
    fn contains_matches_bounds(lo: i8, hi: i8, n: i8) -> bool {
        let (lo, hi) = clamp_order(lo as i128, hi as i128);
        let iv = Interval::new(Bound::Finite(lo), Bound::Finite(hi));
        iv.contains(n as i128) == (lo <= n as i128 && n as i128 <= hi)
    }
}
