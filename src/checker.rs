//! The checker-facing interface (Â§6): read-only query primitives over a
//! computed [`Invariant`], plus the `Warning` callback the core uses for
//! its only externally visible side effect.

use crate::{
    domain::{
        lattice::AbstractDomain,
        nullity::Nullity,
        pointer::PointsToSet,
        state::{
            Invariant,
            UnderlyingState,
        },
        uninit::Init,
    },
    ir::{
        cfg::InstId,
        memloc::{
            Lifetime,
            MemoryLocation,
        },
        variable::VariableId,
    },
    num::Interval,
};

/// The kind of event a [`Warning`] is told about (Â§6: "ignored memory
/// write", "cast from integer to pointer", etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A write whose destination could not be resolved precisely enough to
    /// apply, so the affected memory was conservatively forgotten instead.
    IgnoredMemoryWrite,
    /// An `IntToPtr` cast manufactured a pointer to an address the engine
    /// has no prior knowledge of.
    IntToPtrCast,
    /// A load or store observed a location already marked deallocated.
    UseAfterFree,
    /// An unannotated external call was treated per
    /// [`crate::config::UnknownCallPolicy`].
    UnknownCall,
    /// `ikos.assert` found its condition definitely false.
    AssertionFailure,
    /// The fixpoint driver's budget was exhausted before convergence.
    BudgetExceeded,
}

/// The core's only externally visible side effect (Â§6): `warning(kind,
/// message, instruction, info)`. Implementations typically forward to the
/// checker's own diagnostic sink; the core never inspects what happens
/// after the call returns.
pub trait Warning {
    /// Report one diagnostic event.
    fn warning(&self, kind: WarningKind, message: &str, instruction: Option<InstId>, info: &[(&str, &str)]);
}

/// A [`Warning`] sink that emits structured [`tracing`] events, matching
/// the rest of the crate's ambient logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarning;

impl Warning for TracingWarning {
    fn warning(&self, kind: WarningKind, message: &str, instruction: Option<InstId>, info: &[(&str, &str)]) {
        tracing::warn!(?kind, %message, ?instruction, ?info, "analysis warning");
    }
}

/// A [`Warning`] sink that discards every event, for callers with no
/// diagnostic layer of their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWarning;

impl Warning for NullWarning {
    fn warning(&self, _kind: WarningKind, _message: &str, _instruction: Option<InstId>, _info: &[(&str, &str)]) {}
}

/// A read-only view over one program point's [`Invariant`], exposing the
/// query primitives of Â§6. Constructed from a [`crate::fixpoint::driver`]
/// result; never mutates the invariant it wraps.
pub struct Checker<'a> {
    invariant: &'a Invariant,
}

impl<'a> Checker<'a> {
    /// Wrap `invariant` for querying.
    pub fn new(invariant: &'a Invariant) -> Self {
        Self { invariant }
    }

    /// `is_normal_flow_bottom()`: `true` iff no feasible normal-flow path
    /// reaches this point.
    pub fn is_normal_flow_bottom(&self) -> bool {
        self.invariant.is_normal_flow_bottom()
    }

    fn flat(&self) -> UnderlyingState {
        self.invariant.normal.flatten()
    }

    /// `int_to_interval(v)`.
    pub fn int_to_interval(&self, v: VariableId) -> Interval {
        self.flat().numeric.int_to_interval(v)
    }

    /// `gauge_to_gauge(v)`: `v`'s affine-expression component, non-trivial
    /// only for a variable an `ikos.counter.init` call designated a loop
    /// counter.
    pub fn gauge_to_gauge(&self, v: VariableId) -> crate::num::Gauge {
        self.flat().numeric.gauge_to_gauge(v)
    }

    /// `pointer_to_points_to(p)`.
    pub fn pointer_to_points_to(&self, p: VariableId) -> PointsToSet {
        self.flat().pointer.pointer_to_points_to(p)
    }

    /// `pointer_offset_to_interval(p)`: the interval tracked, in the
    /// numeric domain, under `p`'s offset shadow variable; top if `p` isn't
    /// tracked as a pointer at all.
    pub fn pointer_offset_to_interval(&self, p: VariableId) -> Interval {
        let state = self.flat();
        match state.pointer.get(p) {
            Some(entry) => state.numeric.int_to_interval(entry.offset_shadow),
            None => Interval::top(),
        }
    }

    /// `nullity_to_nullity(p)`.
    pub fn nullity_to_nullity(&self, p: VariableId) -> Nullity {
        self.flat().nullity.nullity_to_nullity(p)
    }

    /// `uninit_to_uninit(v)`.
    pub fn uninit_to_uninit(&self, v: VariableId) -> Init {
        self.flat().uninit.uninit_to_uninit(v)
    }

    /// `lifetime(memloc)`.
    pub fn lifetime(&self, memloc: MemoryLocation) -> Lifetime {
        self.flat().lifetime.lifetime(memloc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::entry_invariant;

    fn v(n: u32) -> VariableId {
        VariableId::from_raw(n)
    }

    #[test]
    fn entry_invariant_has_unconstrained_queries() {
        let inv = entry_invariant();
        let checker = Checker::new(&inv);
        assert!(!checker.is_normal_flow_bottom());
        assert_eq!(checker.int_to_interval(v(0)), Interval::top());
        assert!(checker.gauge_to_gauge(v(0)).is_top());
        assert_eq!(checker.nullity_to_nullity(v(0)), Nullity::Top);
        assert_eq!(checker.uninit_to_uninit(v(0)), Init::Top);
    }

    #[test]
    fn bottom_invariant_reports_bottom_normal_flow() {
        let inv = Invariant::bottom();
        let checker = Checker::new(&inv);
        assert!(checker.is_normal_flow_bottom());
    }
}
