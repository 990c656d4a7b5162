//! The uninitialized domain (Â§3.9, Â§4.5): `variable -> {Initialized,
//! Uninitialized, top}`.

use im::HashMap;

use crate::{
    domain::lattice::AbstractDomain,
    ir::variable::VariableId,
};

/// A variable's initialization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Init {
    /// Definitely written before use.
    Initialized,
    /// Definitely never written.
    Uninitialized,
    /// Unknown.
    Top,
}

impl Init {
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

/// `variable -> Init`, or bottom as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum UninitDomain {
    /// Infeasible.
    Bottom,
    /// Feasible; unmapped variables are implicitly top.
    Env(HashMap<VariableId, Init>),
}

impl UninitDomain {
    /// The initialization state of `v`, top if unconstrained.
    pub fn get(&self, v: VariableId) -> Init {
        match self {
            Self::Bottom => Init::Top,
            Self::Env(map) => map.get(&v).copied().unwrap_or(Init::Top),
        }
    }

    fn with(&self, v: VariableId, i: Init) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Env(map) => {
                let mut map = map.clone();
                if i == Init::Top {
                    map.remove(&v);
                } else {
                    map.insert(v, i);
                }
                Self::Env(map)
            }
        }
    }

    /// Mark `v` as having been written.
    pub fn mark_initialized(&self, v: VariableId) -> Self {
        self.with(v, Init::Initialized)
    }

    /// Mark `v` as uninitialized (e.g. right after `Allocate`).
    pub fn mark_uninitialized(&self, v: VariableId) -> Self {
        self.with(v, Init::Uninitialized)
    }

    /// `uninit_assert_initialized(v)`: refine to `Initialized`, or bottom
    /// if the engine can prove `v` is read before being written.
    pub fn assert_initialized(&self, v: VariableId) -> Self {
        match self.get(v).meet(Init::Initialized) {
            Some(i) => self.with(v, i),
            None => Self::Bottom,
        }
    }

    /// `uninit_to_uninit(v)`, the checker-facing read-only query (Â§6).
    pub fn uninit_to_uninit(&self, v: VariableId) -> Init {
        self.get(v)
    }
}

impl AbstractDomain for UninitDomain {
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
                b.iter().all(|(k, bv)| a.get(k).copied().unwrap_or(Init::Top).leq(*bv))
            }
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Env(a), Self::Env(b)) => {
                let mut out = HashMap::new();
                for (k, av) in a.iter() {
                    let bv = b.get(k).copied().unwrap_or(Init::Top);
                    let joined = av.join(bv);
                    if joined != Init::Top {
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
                    let av = out.get(k).copied().unwrap_or(Init::Top);
                    match av.meet(*bv) {
                        Some(Init::Top) => {
                            out.remove(k);
                        }
                        Some(i) => {
                            out.insert(*k, i);
                        }
                        None => return Self::Bottom,
                    }
                }
                Self::Env(out)
            }
        }
    }

    fn widen(&self, other: &Self) -> Self {
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
    fn reading_before_write_is_bottom() {
        let d = UninitDomain::top().mark_uninitialized(v(0));
        assert!(d.assert_initialized(v(0)).is_bottom());
    }

    #[test]
    fn write_then_read_is_fine() {
        let d = UninitDomain::top()
            .mark_uninitialized(v(0))
            .mark_initialized(v(0));
        assert!(!d.assert_initialized(v(0)).is_bottom());
    }

    #[test]
    fn lattice_laws_hold() {
        let samples = vec![
            UninitDomain::top(),
            UninitDomain::bottom(),
            UninitDomain::top().mark_initialized(v(0)),
            UninitDomain::top().mark_uninitialized(v(0)),
        ];
        crate::assert_lattice_laws!(UninitDomain, samples);
    }
}
