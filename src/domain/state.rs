//! The composed abstract state (Â§3.9): a reduced product of every domain
//! component, plus the top-level `Invariant` triple of Â§4.7.

use crate::domain::{
    exception::ExceptionDomain,
    lattice::AbstractDomain,
    lifetime::LifetimeDomain,
    memory::MemoryDomain,
    nullity::NullityDomain,
    partitioning::Partitioning,
    pointer::PointerDomain,
    uninit::UninitDomain,
};
pub use crate::domain::numeric::NumericDomain;

/// The reduced product of all per-function domain components tracked at a
/// single program point, before exception-flow wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct UnderlyingState {
    /// Â§4.4.
    pub numeric: NumericDomain,
    /// Â§4.5.
    pub pointer: PointerDomain,
    /// Â§4.5.
    pub nullity: NullityDomain,
    /// Â§4.5.
    pub uninit: UninitDomain,
    /// Â§3.6, Â§3.9.
    pub lifetime: LifetimeDomain,
    /// Â§4.6.
    pub memory: MemoryDomain,
}

impl UnderlyingState {
    /// True iff any component being bottom makes the whole reduced product
    /// infeasible.
    fn is_bottom(&self) -> bool {
        self.numeric.is_bottom()
            || self.pointer.is_bottom()
            || self.nullity.is_bottom()
            || self.uninit.is_bottom()
            || self.lifetime.is_bottom()
            || self.memory.is_bottom()
    }

    /// `widen`, but with threshold-widening (Â§4.10 point 4) on the numeric
    /// component; every other component widens plainly since only the
    /// numeric domain's intervals have a useful notion of "syntactic
    /// constant" to snap to.
    pub fn widen_with_thresholds(&self, other: &Self, thresholds: &[i128]) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            numeric: self.numeric.widen_with_thresholds(&other.numeric, thresholds),
            pointer: self.pointer.widen(&other.pointer),
            nullity: self.nullity.widen(&other.nullity),
            uninit: self.uninit.widen(&other.uninit),
            lifetime: self.lifetime.widen(&other.lifetime),
            memory: self.memory.widen(&other.memory),
        }
    }
}

impl AbstractDomain for UnderlyingState {
    fn top() -> Self {
        Self {
            numeric: NumericDomain::top(),
            pointer: PointerDomain::top(),
            nullity: NullityDomain::top(),
            uninit: UninitDomain::top(),
            lifetime: LifetimeDomain::top(),
            memory: MemoryDomain::top(),
        }
    }

    fn bottom() -> Self {
        Self {
            numeric: NumericDomain::bottom(),
            pointer: PointerDomain::bottom(),
            nullity: NullityDomain::bottom(),
            uninit: UninitDomain::bottom(),
            lifetime: LifetimeDomain::bottom(),
            memory: MemoryDomain::bottom(),
        }
    }

    fn is_bottom(&self) -> bool {
        UnderlyingState::is_bottom(self)
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        self.numeric.leq(&other.numeric)
            && self.pointer.leq(&other.pointer)
            && self.nullity.leq(&other.nullity)
            && self.uninit.leq(&other.uninit)
            && self.lifetime.leq(&other.lifetime)
            && self.memory.leq(&other.memory)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            numeric: self.numeric.join(&other.numeric),
            pointer: self.pointer.join(&other.pointer),
            nullity: self.nullity.join(&other.nullity),
            uninit: self.uninit.join(&other.uninit),
            lifetime: self.lifetime.join(&other.lifetime),
            memory: self.memory.join(&other.memory),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        let merged = Self {
            numeric: self.numeric.meet(&other.numeric),
            pointer: self.pointer.meet(&other.pointer),
            nullity: self.nullity.meet(&other.nullity),
            uninit: self.uninit.meet(&other.uninit),
            lifetime: self.lifetime.meet(&other.lifetime),
            memory: self.memory.meet(&other.memory),
        };
        if merged.is_bottom() {
            Self::bottom()
        } else {
            merged
        }
    }

    fn widen(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            numeric: self.numeric.widen(&other.numeric),
            pointer: self.pointer.widen(&other.pointer),
            nullity: self.nullity.widen(&other.nullity),
            uninit: self.uninit.widen(&other.uninit),
            lifetime: self.lifetime.widen(&other.lifetime),
            memory: self.memory.widen(&other.memory),
        }
    }

    fn narrow(&self, other: &Self) -> Self {
        Self {
            numeric: self.numeric.narrow(&other.numeric),
            pointer: self.pointer.narrow(&other.pointer),
            nullity: self.nullity.narrow(&other.nullity),
            uninit: self.uninit.narrow(&other.uninit),
            lifetime: self.lifetime.narrow(&other.lifetime),
            memory: self.memory.narrow(&other.memory),
        }
    }
}

/// The partitioned underlying state (Â§5.6): zero or more disjoint
/// `UnderlyingState`s keyed by a designated variable's value.
pub type PartitionedState = Partitioning<UnderlyingState>;

/// The top-level invariant attached to each program point (Â§4.7): a triple
/// of partitioned underlying states for normal, caught, and propagated
/// control flow.
pub type Invariant = ExceptionDomain<PartitionedState>;

/// `Invariant` at function entry: `normal = top`, `caught = propagated =
/// bottom`.
pub fn entry_invariant() -> Invariant {
    Invariant::entry()
}

impl PartitionedState {
    /// `widen`, but with threshold-widening on each branch's underlying
    /// state (Â§4.10 point 4). Falls back to flattening, as
    /// [`Partitioning::widen`] does, when the two operands partition on
    /// different variables.
    pub fn widen_with_thresholds(&self, other: &Self, thresholds: &[i128]) -> Self {
        match (self, other) {
            (
                Self::Partitioned { var: v1, branches: b1 },
                Self::Partitioned { var: v2, branches: b2 },
            ) if v1 == v2 => {
                let mut out = im::HashMap::new();
                for (k, s1) in b1.iter() {
                    let s2 = b2.get(k).cloned().unwrap_or_else(UnderlyingState::bottom);
                    out.insert(*k, s1.widen_with_thresholds(&s2, thresholds));
                }
                Self::Partitioned { var: *v1, branches: out }
            }
            _ => Self::Flat(self.flatten().widen_with_thresholds(&other.flatten(), thresholds)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_state_is_not_bottom() {
        assert!(!UnderlyingState::top().is_bottom());
    }

    #[test]
    fn any_bottom_component_makes_state_bottom() {
        let mut state = UnderlyingState::top();
        state.numeric = NumericDomain::bottom();
        assert!(state.is_bottom());
    }

    #[test]
    fn entry_invariant_has_top_normal_flow() {
        let inv = entry_invariant();
        assert!(!inv.is_normal_flow_bottom());
        assert!(inv.caught.is_bottom());
        assert!(inv.propagated.is_bottom());
    }

    #[test]
    fn lattice_laws_hold_on_underlying_state() {
        let samples = vec![UnderlyingState::top(), UnderlyingState::bottom()];
        crate::assert_lattice_laws!(UnderlyingState, samples);
    }
}
