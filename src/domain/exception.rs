//! The exception domain (Â§4.7): a triple `(normal, caught, propagated)` of
//! underlying abstract states, generic over whatever that underlying state
//! type is (here, [`crate::domain::state::UnderlyingState`]).

use crate::domain::lattice::AbstractDomain;

/// `(normal, caught, propagated)`, each an instance of some underlying
/// domain `S`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionDomain<S> {
    /// Ordinary execution, no exception in flight.
    pub normal: S,
    /// An exception is currently being handled inside a catch.
    pub caught: S,
    /// An exception is in flight, looking for its handler.
    pub propagated: S,
}

impl<S: AbstractDomain> ExceptionDomain<S> {
    /// `normal = top`, `caught = propagated = bottom`: ordinary entry to a
    /// function.
    pub fn entry() -> Self {
        Self {
            normal: S::top(),
            caught: S::bottom(),
            propagated: S::bottom(),
        }
    }

    /// `true` iff every component is bottom.
    pub fn is_bottom(&self) -> bool {
        self.normal.is_bottom() && self.caught.is_bottom() && self.propagated.is_bottom()
    }

    /// `is_normal_flow_bottom()`, the checker-facing read-only query (Â§6).
    pub fn is_normal_flow_bottom(&self) -> bool {
        self.normal.is_bottom()
    }

    /// `throw_exception()`: `propagated := propagated join normal`;
    /// `normal := bottom`.
    pub fn throw_exception(&self) -> Self {
        Self {
            normal: S::bottom(),
            caught: self.caught.clone(),
            propagated: self.propagated.join(&self.normal),
        }
    }

    /// `enter_catch()`: `caught := caught join propagated`; `propagated :=
    /// bottom`. Called at a `LandingPad` instruction.
    pub fn enter_catch(&self) -> Self {
        Self {
            normal: self.normal.clone(),
            caught: self.caught.join(&self.propagated),
            propagated: S::bottom(),
        }
    }

    /// `resume_exception()`: `propagated := propagated join caught`;
    /// `caught := bottom`. Called at a `Resume` instruction.
    pub fn resume_exception(&self) -> Self {
        Self {
            normal: self.normal.clone(),
            caught: S::bottom(),
            propagated: self.propagated.join(&self.caught),
        }
    }

    /// `ignore_exceptions()`: `normal` unchanged, other components reset to
    /// bottom.
    pub fn ignore_exceptions(&self) -> Self {
        Self {
            normal: self.normal.clone(),
            caught: S::bottom(),
            propagated: S::bottom(),
        }
    }

    /// Models an unknown external call that might throw: the call may
    /// either return normally or propagate an exception, so both outcomes
    /// are kept live from the same post-call (havocked) state — unlike
    /// [`Self::throw_exception`], which models a definite `throw`. `havoc`
    /// is supplied by the caller since only the engine knows how to
    /// summarize "anything this call might have mutated".
    pub fn unknown_call_may_throw(&self, havoc: impl Fn(&S) -> S) -> Self {
        let havocked = havoc(&self.normal);
        Self {
            normal: havocked.clone(),
            caught: self.caught.clone(),
            propagated: self.propagated.join(&havocked),
        }
    }
}

impl<S: AbstractDomain> AbstractDomain for ExceptionDomain<S> {
    fn top() -> Self {
        Self {
            normal: S::top(),
            caught: S::top(),
            propagated: S::top(),
        }
    }

    fn bottom() -> Self {
        Self {
            normal: S::bottom(),
            caught: S::bottom(),
            propagated: S::bottom(),
        }
    }

    fn is_bottom(&self) -> bool {
        ExceptionDomain::is_bottom(self)
    }

    fn leq(&self, other: &Self) -> bool {
        self.normal.leq(&other.normal)
            && self.caught.leq(&other.caught)
            && self.propagated.leq(&other.propagated)
    }

    fn join(&self, other: &Self) -> Self {
        Self {
            normal: self.normal.join(&other.normal),
            caught: self.caught.join(&other.caught),
            propagated: self.propagated.join(&other.propagated),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self {
            normal: self.normal.meet(&other.normal),
            caught: self.caught.meet(&other.caught),
            propagated: self.propagated.meet(&other.propagated),
        }
    }

    fn widen(&self, other: &Self) -> Self {
        Self {
            normal: self.normal.widen(&other.normal),
            caught: self.caught.widen(&other.caught),
            propagated: self.propagated.widen(&other.propagated),
        }
    }

    fn narrow(&self, other: &Self) -> Self {
        Self {
            normal: self.normal.narrow(&other.normal),
            caught: self.caught.narrow(&other.caught),
            propagated: self.propagated.narrow(&other.propagated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::nullity::NullityDomain;

    #[test]
    fn throw_moves_normal_into_propagated() {
        let state = ExceptionDomain::<NullityDomain>::entry();
        let thrown = state.throw_exception();
        assert!(thrown.normal.is_bottom());
        assert!(!thrown.propagated.is_bottom());
    }

    #[test]
    fn enter_catch_then_resume_round_trips_through_caught() {
        let state = ExceptionDomain::<NullityDomain>::entry().throw_exception();
        let caught = state.enter_catch();
        assert!(caught.propagated.is_bottom());
        let resumed = caught.resume_exception();
        assert!(resumed.caught.is_bottom());
        assert!(!resumed.propagated.is_bottom());
    }

    #[test]
    fn ignore_exceptions_clears_caught_and_propagated() {
        let state = ExceptionDomain::<NullityDomain>::entry().throw_exception();
        let ignored = state.ignore_exceptions();
        assert!(ignored.caught.is_bottom());
        assert!(ignored.propagated.is_bottom());
        assert!(!ignored.normal.is_bottom());
    }
}
