//! The nullity domain (Â§3.9, Â§4.5): `variable -> {Null, NonNull, top}`.

use im::HashMap;

use crate::{
    domain::lattice::AbstractDomain,
    ir::variable::VariableId,
};

/// A variable's nullity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullity {
    /// Definitely null.
    Null,
    /// Definitely non-null.
    NonNull,
    /// Unknown.
    Top,
}

impl Nullity {
    fn leq(self, other: Self) -> bool {
        other == Self::Top || self == other
    }

    fn join(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            Self::Top
        }
    }

    fn meet(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::Top, x) | (x, Self::Top) => Some(x),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }
}

/// `variable -> Nullity`, or bottom as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum NullityDomain {
    /// Infeasible.
    Bottom,
    /// Feasible; unmapped variables are implicitly top.
    Env(HashMap<VariableId, Nullity>),
}

impl NullityDomain {
    /// The nullity of `v`, top if unconstrained.
    pub fn get(&self, v: VariableId) -> Nullity {
        match self {
            Self::Bottom => Nullity::Top,
            Self::Env(map) => map.get(&v).copied().unwrap_or(Nullity::Top),
        }
    }

    fn with(&self, v: VariableId, n: Nullity) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Env(map) => {
                let mut map = map.clone();
                if n == Nullity::Top {
                    map.remove(&v);
                } else {
                    map.insert(v, n);
                }
                Self::Env(map)
            }
        }
    }

    /// `nullity_assert_null(v)`: refine `v` to `Null`, or bottom if
    /// infeasible.
    pub fn assert_null(&self, v: VariableId) -> Self {
        match self.get(v).meet(Nullity::Null) {
            Some(n) => self.with(v, n),
            None => Self::Bottom,
        }
    }

    /// `nullity_assert_non_null(v)`: refine `v` to `NonNull`, or bottom if
    /// infeasible.
    pub fn assert_non_null(&self, v: VariableId) -> Self {
        match self.get(v).meet(Nullity::NonNull) {
            Some(n) => self.with(v, n),
            None => Self::Bottom,
        }
    }

    /// Force `v`'s nullity directly (used when re-deriving it from an
    /// `AbsoluteZero` pointer's offset, Â§4.5).
    pub fn set(&self, v: VariableId, n: Nullity) -> Self {
        self.with(v, n)
    }

    /// `nullity_to_nullity(v)`, the checker-facing read-only query (Â§6).
    pub fn nullity_to_nullity(&self, v: VariableId) -> Nullity {
        self.get(v)
    }
}

impl AbstractDomain for NullityDomain {
    fn top() -> Self {
        Self::Env(HashMap::new())
    }

    fn bottom() -> Self {
        Self::Bottom
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) => true,
            (_, Self::Bottom) => false,
            (Self::Env(a), Self::Env(b)) => {
                b.iter().all(|(k, bv)| a.get(k).copied().unwrap_or(Nullity::Top).leq(*bv))
            }
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Env(a), Self::Env(b)) => {
                let mut out = HashMap::new();
                for (k, av) in a.iter() {
                    let bv = b.get(k).copied().unwrap_or(Nullity::Top);
                    let joined = av.join(bv);
                    if joined != Nullity::Top {
                        out.insert(*k, joined);
                    }
                }
                Self::Env(out)
            }
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Env(a), Self::Env(b)) => {
                let mut out = a.clone();
                for (k, bv) in b.iter() {
                    let av = out.get(k).copied().unwrap_or(Nullity::Top);
                    match av.meet(*bv) {
                        Some(Nullity::Top) => {
                            out.remove(k);
                        }
                        Some(n) => {
                            out.insert(*k, n);
                        }
                        None => return Self::Bottom,
                    }
                }
                Self::Env(out)
            }
        }
    }

    fn widen(&self, other: &Self) -> Self {
        // Flat per-variable domain: no infinite ascending chain, widening
        // is just join.
        self.join(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> VariableId {
        VariableId::from_raw(n)
    }

    #[test]
    fn assert_null_then_non_null_is_bottom() {
        let d = NullityDomain::top().assert_null(v(0));
        assert!(d.assert_non_null(v(0)).is_bottom());
    }

    #[test]
    fn absolute_zero_reflects_offset() {
        let d = NullityDomain::top().set(v(0), Nullity::Null);
        assert_eq!(d.nullity_to_nullity(v(0)), Nullity::Null);
    }

    #[test]
    fn lattice_laws_hold() {
        let samples = vec![
            NullityDomain::top(),
            NullityDomain::bottom(),
            NullityDomain::top().set(v(0), Nullity::Null),
            NullityDomain::top().set(v(0), Nullity::NonNull),
        ];
        crate::assert_lattice_laws!(NullityDomain, samples);
    }
}
