//! The gauge lattice (Â§3.5, Â§4.3): affine expressions `c_0 + sum(c_i * k_i)`
//! over loop-counter variables, used to express invariants like
//! `0 <= i <= 2k` that a plain interval cannot. Operation shapes are grounded
//! on `core/test/unit/value/numeric/gauge.cpp` in the reference
//! implementation.

use im::HashMap;

use super::bound::Bound;

/// Opaque handle for a loop-counter variable. The engine hands out and
/// interprets these; this module only ever compares and maps over them.
pub type CounterId = u32;

/// `c_0 + sum(c_i * k_i)`, or one of the two infinities with no counter
/// terms.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaugeBound {
    constant: Bound,
    #[cfg_attr(feature = "serde", serde(skip))]
    coeffs: HashMap<CounterId, i128>,
}

impl GaugeBound {
    /// A bare constant (possibly infinite).
    pub fn constant(c: Bound) -> Self {
        Self {
            constant: c,
            coeffs: HashMap::new(),
        }
    }

    /// `c * k` for a single counter.
    pub fn counter_term(k: CounterId, c: i128) -> Self {
        let mut coeffs = HashMap::new();
        if c != 0 {
            coeffs.insert(k, c);
        }
        Self {
            constant: Bound::Finite(0),
            coeffs,
        }
    }

    fn is_infinite(&self) -> bool {
        !self.constant.is_finite()
    }

    fn coeff_of(&self, k: CounterId) -> i128 {
        self.coeffs.get(&k).copied().unwrap_or(0)
    }

    /// `self + other`.
    pub fn add(&self, other: &Self) -> Self {
        if self.is_infinite() || other.is_infinite() {
            return Self::constant(self.constant + other.constant);
        }
        let mut coeffs = self.coeffs.clone();
        for (k, c) in other.coeffs.iter() {
            let merged = coeffs.get(k).copied().unwrap_or(0) + c;
            if merged == 0 {
                coeffs.remove(k);
            } else {
                coeffs.insert(*k, merged);
            }
        }
        Self {
            constant: self.constant + other.constant,
            coeffs,
        }
    }

    /// `-self`.
    pub fn neg(&self) -> Self {
        self.scalar_mul(-1)
    }

    /// `c * self` for a finite scalar `c`.
    pub fn scalar_mul(&self, c: i128) -> Self {
        if c == 0 {
            return Self::constant(Bound::Finite(0));
        }
        let coeffs = self.coeffs.iter().map(|(k, v)| (*k, v * c)).collect();
        Self {
            constant: self.constant * Bound::Finite(c),
            coeffs,
        }
    }

    /// Substitute counter `k` by the interval `[lo, hi]`, folding its
    /// contribution into the constant term. Which endpoint is used depends
    /// on the coefficient's sign and on whether this is being evaluated as
    /// a lower or upper bound.
    fn coalesce_as(&self, k: CounterId, lo: Bound, hi: Bound, is_lower: bool) -> Self {
        let c = self.coeff_of(k);
        if c == 0 {
            return self.clone();
        }
        let endpoint = if (c > 0) == is_lower { lo } else { hi };
        let contribution = endpoint * Bound::Finite(c);
        let mut coeffs = self.coeffs.clone();
        coeffs.remove(&k);
        Self {
            constant: self.constant + contribution,
            coeffs,
        }
    }

    /// Rebind counter `k` under `k := k + step`: every occurrence of `k`
    /// now denotes the post-increment value, so the pre-increment bound is
    /// expressed by subtracting `coeff * step` from the constant.
    fn counter_incr_as(&self, k: CounterId, step: i128) -> Self {
        let c = self.coeff_of(k);
        if c == 0 {
            return self.clone();
        }
        Self {
            constant: self.constant - Bound::Finite(c * step),
            coeffs: self.coeffs.clone(),
        }
    }

    /// Interpolate this bound (the iterate before the increment) against
    /// `next` (the iterate after), rebasing around `initial_k`. Returns
    /// `None` when the two bounds disagree on counters other than `k`,
    /// signalling that the caller should fall back to interval widening.
    fn widening_interpol_as(&self, next: &Self, k: CounterId, initial_k: i128) -> Option<Self> {
        if self.is_infinite() || next.is_infinite() {
            return Some(Self::constant(self.constant.max(next.constant)));
        }
        for (other_k, other_c) in self.coeffs.iter() {
            if *other_k == k {
                continue;
            }
            if next.coeff_of(*other_k) != *other_c {
                return None;
            }
        }
        for (other_k, other_c) in next.coeffs.iter() {
            if *other_k == k {
                continue;
            }
            if self.coeff_of(*other_k) != *other_c {
                return None;
            }
        }
        let self_const = self.constant.as_finite()?;
        let next_const = next.constant.as_finite()?;
        let delta = next_const - self_const;
        let old_coeff = self.coeff_of(k);
        let new_coeff = old_coeff + delta;
        let new_const = self_const - delta * initial_k;

        let mut coeffs: HashMap<CounterId, i128> = self
            .coeffs
            .iter()
            .filter(|(other_k, _)| **other_k != k)
            .map(|(other_k, c)| (*other_k, *c))
            .collect();
        if new_coeff != 0 {
            coeffs.insert(k, new_coeff);
        }
        Some(Self {
            constant: Bound::Finite(new_const),
            coeffs,
        })
    }
}

/// `[lo, hi]` of [`GaugeBound`]s, or bottom/top.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Gauge {
    /// No value satisfies the gauge.
    Bottom,
    /// `lo <= hi`.
    Bounded {
        /// Lower bound.
        lo: GaugeBound,
        /// Upper bound.
        hi: GaugeBound,
    },
}

impl Gauge {
    /// `[-oo, +oo]`.
    pub fn top() -> Self {
        Self::Bounded {
            lo: GaugeBound::constant(Bound::MinusInfinity),
            hi: GaugeBound::constant(Bound::PlusInfinity),
        }
    }

    /// No value.
    pub fn bottom() -> Self {
        Self::Bottom
    }

    /// `[n, n]`.
    pub fn scalar(n: i128) -> Self {
        Self::Bounded {
            lo: GaugeBound::constant(Bound::Finite(n)),
            hi: GaugeBound::constant(Bound::Finite(n)),
        }
    }

    /// Construct from explicit bounds.
    pub fn new(lo: GaugeBound, hi: GaugeBound) -> Self {
        Self::Bounded { lo, hi }
    }

    /// True iff bottom.
    pub fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    /// True iff `[-oo, +oo]`.
    pub fn is_top(&self) -> bool {
        matches!(self, Self::Bounded { lo, hi }
            if lo.constant == Bound::MinusInfinity
                && lo.coeffs.is_empty()
                && hi.constant == Bound::PlusInfinity
                && hi.coeffs.is_empty())
    }

    /// `join` picks the minimum coefficient on the lower bound and the
    /// maximum on the upper bound, per counter.
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                Self::Bounded {
                    lo: merge_coeffs(l1, l2, i128::min, Bound::min),
                    hi: merge_coeffs(h1, h2, i128::max, Bound::max),
                }
            }
        }
    }

    /// Substitute counter `k` by the interval `[lo, hi]`, yielding a plain
    /// gauge (interval, if no other counters remain) in the remaining
    /// variables.
    pub fn coalesce(&self, k: CounterId, lo: Bound, hi: Bound) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Bounded {
                lo: self_lo,
                hi: self_hi,
            } => Self::Bounded {
                lo: self_lo.coalesce_as(k, lo, hi, true),
                hi: self_hi.coalesce_as(k, lo, hi, false),
            },
        }
    }

    /// Rebind counter `k` under `k := k + step`.
    pub fn counter_incr(&self, k: CounterId, step: i128) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Bounded { lo, hi } => Self::Bounded {
                lo: lo.counter_incr_as(k, step),
                hi: hi.counter_incr_as(k, step),
            },
        }
    }

    /// `self + other`, bound-wise.
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => Self::Bounded {
                lo: l1.add(l2),
                hi: h1.add(h2),
            },
        }
    }

    /// `-self`.
    pub fn neg(&self) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Bounded { lo, hi } => Self::Bounded {
                lo: hi.neg(),
                hi: lo.neg(),
            },
        }
    }

    /// `c * self` for a finite scalar `c`, swapping the bounds when `c` is
    /// negative.
    pub fn scalar_mul(&self, c: i128) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Bounded { lo, hi } => {
                if c >= 0 {
                    Self::Bounded {
                        lo: lo.scalar_mul(c),
                        hi: hi.scalar_mul(c),
                    }
                } else {
                    Self::Bounded {
                        lo: hi.scalar_mul(c),
                        hi: lo.scalar_mul(c),
                    }
                }
            }
        }
    }

    /// Interpolate an affine function of `k` passing through `self` (the
    /// previous iterate) and `next` (the new one), rebased so that `k =
    /// initial_k` recovers the value the loop had on entry. Falls back to
    /// plain interval widening on the constant parts when the two gauges
    /// cannot be reconciled into one affine function of `k` alone.
    pub fn widening_interpol(&self, next: &Self, k: CounterId, initial_k: i128) -> Self {
        match (self, next) {
            (Self::Bottom, Self::Bottom) => Self::Bottom,
            (Self::Bottom, x) => x.clone(),
            (x, Self::Bottom) => x.clone(),
            (Self::Bounded { lo: l1, hi: h1 }, Self::Bounded { lo: l2, hi: h2 }) => {
                let lo = l1
                    .widening_interpol_as(l2, k, initial_k)
                    .unwrap_or_else(|| GaugeBound::constant(l1.constant.min(l2.constant)));
                let hi = h1
                    .widening_interpol_as(h2, k, initial_k)
                    .unwrap_or_else(|| GaugeBound::constant(h1.constant.max(h2.constant)));
                Self::Bounded { lo, hi }
            }
        }
    }
}

fn merge_coeffs(
    a: &GaugeBound,
    b: &GaugeBound,
    combine: impl Fn(i128, i128) -> i128,
    combine_const: impl Fn(Bound, Bound) -> Bound,
) -> GaugeBound {
    if a.is_infinite() || b.is_infinite() {
        return GaugeBound::constant(combine_const(a.constant, b.constant));
    }
    let mut keys: im::HashSet<CounterId> = im::HashSet::new();
    for k in a.coeffs.keys() {
        keys.insert(*k);
    }
    for k in b.coeffs.keys() {
        keys.insert(*k);
    }
    let mut coeffs = HashMap::new();
    for k in keys.iter() {
        let merged = combine(a.coeff_of(*k), b.coeff_of(*k));
        if merged != 0 {
            coeffs.insert(*k, merged);
        }
    }
    GaugeBound {
        constant: combine_const(a.constant, b.constant),
        coeffs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: CounterId = 0;
    const Y: CounterId = 1;

    #[test]
    fn top_coalesce_is_top() {
        assert_eq!(
            Gauge::top().coalesce(X, Bound::Finite(0), Bound::PlusInfinity),
            Gauge::top()
        );
    }

    #[test]
    fn coalesce_positive_coefficient_uses_hi_on_upper_bound() {
        let g = Gauge::new(
            GaugeBound::constant(Bound::Finite(0)),
            GaugeBound::counter_term(X, 2),
        );
        let result = g.coalesce(X, Bound::Finite(0), Bound::PlusInfinity);
        assert_eq!(
            result,
            Gauge::new(
                GaugeBound::constant(Bound::Finite(0)),
                GaugeBound::constant(Bound::PlusInfinity)
            )
        );
    }

    #[test]
    fn coalesce_negative_coefficient_uses_hi_on_lower_bound() {
        let g = Gauge::new(
            GaugeBound::counter_term(X, -1),
            GaugeBound::constant(Bound::Finite(2)),
        );
        let result = g.coalesce(X, Bound::Finite(0), Bound::PlusInfinity);
        assert_eq!(
            result,
            Gauge::new(
                GaugeBound::constant(Bound::MinusInfinity),
                GaugeBound::constant(Bound::Finite(2))
            )
        );
    }

    #[test]
    fn coalesce_leaves_other_counters_symbolic() {
        let g = Gauge::new(
            GaugeBound::constant(Bound::Finite(0)),
            GaugeBound::counter_term(Y, 2),
        );
        let result = g.coalesce(X, Bound::Finite(0), Bound::PlusInfinity);
        assert_eq!(result, g);
    }

    #[test]
    fn counter_incr_shifts_constant_by_coefficient_times_step() {
        let g = Gauge::new(
            GaugeBound::constant(Bound::Finite(0)),
            GaugeBound::counter_term(X, 2),
        );
        let result = g.counter_incr(X, 1);
        let expected_hi = GaugeBound::constant(Bound::Finite(-2)).add(&GaugeBound::counter_term(X, 2));
        assert_eq!(
            result,
            Gauge::new(GaugeBound::constant(Bound::Finite(0)), expected_hi)
        );
    }

    #[test]
    fn widening_interpol_basic_linear_case() {
        // self = 0, next = 1, initial_k = 0 => 0 + 1*i = i
        let prev = Gauge::scalar(0);
        let next = Gauge::scalar(1);
        let result = prev.widening_interpol(&next, X, 0);
        let expected = Gauge::new(GaugeBound::counter_term(X, 1), GaugeBound::counter_term(X, 1));
        assert_eq!(result, expected);
    }

    #[test]
    fn widening_interpol_rebased_at_nonzero_initial_k() {
        // self = 0, next = 1, initial_k = 2 => -2 + i
        let prev = Gauge::scalar(0);
        let next = Gauge::scalar(1);
        let result = prev.widening_interpol(&next, X, 2);
        let expected_bound = GaugeBound::constant(Bound::Finite(-2)).add(&GaugeBound::counter_term(X, 1));
        assert_eq!(result, Gauge::new(expected_bound.clone(), expected_bound));
    }

    #[test]
    fn widening_interpol_preserves_unrelated_counter() {
        // self = 4*y, next = 1 + 4*y, k = x, initial_k = 0 => 4y + x
        let prev = Gauge::new(
            GaugeBound::counter_term(Y, 4),
            GaugeBound::counter_term(Y, 4),
        );
        let next = Gauge::new(
            GaugeBound::constant(Bound::Finite(1)).add(&GaugeBound::counter_term(Y, 4)),
            GaugeBound::constant(Bound::Finite(1)).add(&GaugeBound::counter_term(Y, 4)),
        );
        let result = prev.widening_interpol(&next, X, 0);
        let expected_bound = GaugeBound::counter_term(Y, 4).add(&GaugeBound::counter_term(X, 1));
        assert_eq!(result, Gauge::new(expected_bound.clone(), expected_bound));
    }

    #[test]
    fn bottom_widening_interpol_returns_other() {
        let result = Gauge::bottom().widening_interpol(&Gauge::scalar(1), X, 0);
        assert_eq!(result, Gauge::scalar(1));
    }

    #[test]
    fn add_sums_both_bounds() {
        let identity = Gauge::new(GaugeBound::counter_term(X, 1), GaugeBound::counter_term(X, 1));
        let result = identity.add(&Gauge::scalar(1));
        let expected = GaugeBound::constant(Bound::Finite(1)).add(&GaugeBound::counter_term(X, 1));
        assert_eq!(result, Gauge::new(expected.clone(), expected));
    }

    #[test]
    fn scalar_mul_by_negative_swaps_bounds() {
        let g = Gauge::new(GaugeBound::constant(Bound::Finite(0)), GaugeBound::constant(Bound::Finite(4)));
        let result = g.scalar_mul(-2);
        assert_eq!(
            result,
            Gauge::new(GaugeBound::constant(Bound::Finite(-8)), GaugeBound::constant(Bound::Finite(0)))
        );
    }

    #[test]
    fn neg_swaps_bounds() {
        let g = Gauge::new(GaugeBound::constant(Bound::Finite(0)), GaugeBound::constant(Bound::Finite(4)));
        assert_eq!(
            g.neg(),
            Gauge::new(GaugeBound::constant(Bound::Finite(-4)), GaugeBound::constant(Bound::Finite(0)))
        );
    }
}
