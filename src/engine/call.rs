//! Call handling (§4.9) and the control instructions that interact with
//! the exception domain (`LandingPad`/`Resume`/`Unreachable`/`Return`).
//! These operate at the [`Invariant`] level, unlike [`super::transfer`]'s
//! per-instruction transfer functions, which only ever see a bare
//! [`UnderlyingState`].
//!
//! Interprocedural call-graph resolution (deciding which function a
//! `callee` scalar's points-to set names) is a front-end/driver concern
//! (§6); this module only needs the classification handed to it as a
//! [`CallTarget`].

use alloc::vec::Vec;

use crate::{
    config::{
        AnalysisConfig,
        UnknownCallPolicy,
    },
    domain::{
        exception::ExceptionDomain,
        lattice::AbstractDomain,
        memory::MemoryDomain,
        nullity::Nullity,
        numeric::NumericValue,
        pointer::PointsToSet,
        state::{
            Invariant,
            PartitionedState,
            UnderlyingState,
        },
    },
    engine::transfer::Engine,
    error::{
        AnalysisResult,
        AnalyzerBug,
        TypeError,
    },
    ir::{
        literal::Scalar,
        types::Ty,
        variable::VariableId,
    },
    num::{
        Bound,
        Congruence,
        Interval,
    },
};

/// A known callee's type signature (§4.9.1). The callee's own body is not
/// analyzed here — there is no interprocedural fixpoint in this core, only
/// the match-down/match-up boundary behavior — so this is all the engine
/// needs to know about it.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Formal parameter types, in order.
    pub param_tys: Vec<Ty>,
    /// The return type, absent for `void`.
    pub return_ty: Option<Ty>,
}

/// One of the bespoke intrinsics of §4.9.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    /// `memcpy(dst, src, size)`.
    Memcpy,
    /// `memset(dst, byte, size)`.
    Memset,
    /// `malloc(size)`.
    Malloc,
    /// `calloc(count, elem_size)`.
    Calloc,
    /// `realloc(ptr, new_size)`.
    Realloc,
    /// `free(ptr)`.
    Free,
    /// `operator new(size)`.
    New,
    /// `operator delete(ptr)`.
    Delete,
    /// `strlen(ptr)`.
    Strlen,
    /// `strcpy(dst, src)`.
    Strcpy,
    /// `__cxa_throw(exc, tinfo, dtor)`.
    Throw,
    /// `__cxa_begin_catch(exc)`.
    BeginCatch,
    /// `__cxa_end_catch()`.
    EndCatch,
    /// `ikos.assert(cond)`.
    IkosAssert,
    /// `ikos.assume(cond)`.
    IkosAssume,
    /// `ikos.counter.init(var)`.
    IkosCounterInit,
    /// `ikos.counter.incr(var)`.
    IkosCounterIncr,
    /// `ikos.forget_memory(ptr)`.
    IkosForgetMemory,
    /// `ikos.watch_memory(ptr)`.
    IkosWatchMemory,
    /// `ikos.partitioning.var(v)`: start partitioning the invariant on `v`.
    IkosPartitioningVar,
    /// `ikos.partitioning.join()`: collapse the partitioning back to flat.
    IkosPartitioningJoin,
}

/// What `callee` resolves to, for the purposes of §4.9's three cases.
/// Resolved by the caller (typically the fixpoint driver) against the AR
/// bundle's function table; the engine itself never walks a call graph.
#[derive(Debug, Clone)]
pub enum CallTarget {
    /// A function definition with a known signature.
    Known(FunctionSignature),
    /// One of the intrinsics of [`Intrinsic`].
    Intrinsic(Intrinsic),
    /// Nothing resolvable: an indirect call through an unresolved pointer,
    /// or a known-but-unannotated external function. `pure` marks the
    /// well-known side-effect-free libc subset (`strlen`, `rand`, `abs`,
    /// ...) that only havocs its result, never memory.
    Unknown {
        /// Whether this external function is annotated side-effect-free.
        pure: bool,
    },
}

impl<'ctx> Engine<'ctx> {
    fn scalar_ty(&self, scalar: &Scalar) -> Option<Ty> {
        match scalar {
            Scalar::MachineInt(mi) => Some(Ty::MachineInt {
                bit_width: mi.bit_width(),
                sign: mi.sign(),
            }),
            Scalar::MachineIntVar(v) | Scalar::PointerVar(v) | Scalar::FloatVar(v) => {
                self.ctx.variable_data(*v).map(|d| d.ty)
            }
            Scalar::Null => Some(Ty::opaque_pointer()),
            Scalar::FloatingPoint | Scalar::Undefined => None,
        }
    }

    /// `match_down`: implicit bitcast of each actual to its formal's type;
    /// a mismatched arity or a mismatched machine-integer sign is a type
    /// error (§4.9.1). The callee isn't analyzed here, so this has no
    /// effect on `state` beyond the check — the actual binding of formals
    /// happens inside the callee's own (unmodeled) fixpoint.
    fn match_down(&self, state: &UnderlyingState, param_tys: &[Ty], args: &[Scalar]) -> AnalysisResult<UnderlyingState> {
        if args.len() != param_tys.len() {
            return Err(TypeError::CallArityMismatch.into());
        }
        for (formal, actual) in param_tys.iter().zip(args.iter()) {
            if let (
                Ty::MachineInt { sign: formal_sign, .. },
                Some(Ty::MachineInt { sign: actual_sign, .. }),
            ) = (formal, self.scalar_ty(actual))
            {
                if *formal_sign != actual_sign {
                    return Err(TypeError::CallArgumentTypeMismatch.into());
                }
            }
        }
        Ok(state.clone())
    }

    /// `match_up`: bitcast the (unmodeled) return value into `lhs`,
    /// forgetting it and any aggregate backing it might have carried.
    fn match_up(&self, state: &UnderlyingState, lhs: Option<VariableId>, _return_ty: Option<&Ty>) -> UnderlyingState {
        match lhs {
            Some(v) => self.havoc_var(state, v),
            None => state.clone(),
        }
    }

    fn execute_known_call(
        &self,
        inv: &Invariant,
        lhs: Option<VariableId>,
        sig: &FunctionSignature,
        args: &[Scalar],
    ) -> AnalysisResult<Invariant> {
        let normal = inv.normal.try_map(|s| {
            let after_down = self.match_down(s, &sig.param_tys, args)?;
            Ok(self.match_up(&after_down, lhs, sig.return_ty.as_ref()))
        })?;
        Ok(Invariant {
            normal,
            caught: inv.caught.clone(),
            propagated: inv.propagated.clone(),
        })
    }

    /// Forget every cell reachable from `arg`'s points-to set — `Top`
    /// conservatively resets the whole cell map, since there is no
    /// enumerable set of locations to iterate.
    fn forget_arg_reachable(&self, state: &UnderlyingState, arg: &Scalar) -> MemoryDomain {
        match self.addrs_of(state, arg) {
            PointsToSet::Top => MemoryDomain::top(),
            PointsToSet::Set(locs) => {
                let mut memory = state.memory.clone();
                for loc in locs.iter() {
                    memory = memory.mem_forget_reachable(*loc, None);
                }
                memory
            }
        }
    }

    fn copy_bytes(&self, state: &UnderlyingState, dst: &Scalar, src: &Scalar, size: &Scalar) -> MemoryDomain {
        let exact = (|| {
            let dst_var = dst.as_variable()?;
            let src_var = src.as_variable()?;
            let n = self.numeric_of(state, size).interval.as_singleton()?;
            if n < 0 {
                return None;
            }
            let (dloc, doff) = self.concrete_cell(state, dst_var, n as u64)?;
            let (sloc, soff) = self.concrete_cell(state, src_var, n as u64)?;
            let strong = state
                .pointer
                .get(dst_var)
                .map(|e| e.addrs.as_singleton().is_some())
                .unwrap_or(false);
            let alloc_size = self.alloc_size(state, dst_var);
            Some(state.memory.mem_copy(dloc, doff, sloc, soff, n as u64, alloc_size, strong))
        })();
        exact.unwrap_or_else(|| self.forget_arg_reachable(state, dst))
    }

    /// `free(ptr)`/`delete ptr`/the deallocating half of `realloc`: marks
    /// `ptr`'s location deallocated and drops its cells. A non-singleton
    /// `addrs(ptr)` can't be soundly marked (it might name an object that
    /// wasn't actually freed), so it's conservatively left untouched —
    /// this loses precision for unresolved-pointer frees, never soundness.
    fn free_pointer(&self, state: &UnderlyingState, ptr: &Scalar) -> UnderlyingState {
        match self.addrs_of(state, ptr).as_singleton() {
            Some(loc) => UnderlyingState {
                lifetime: state.lifetime.mark_deallocated(loc),
                memory: state.memory.mem_forget_reachable(loc, None),
                ..state.clone()
            },
            None => state.clone(),
        }
    }

    fn execute_intrinsic_state(
        &self,
        state: &UnderlyingState,
        lhs: Option<VariableId>,
        intrinsic: Intrinsic,
        args: &[Scalar],
    ) -> AnalysisResult<UnderlyingState> {
        match intrinsic {
            Intrinsic::Malloc | Intrinsic::New => {
                let lhs = lhs.ok_or(AnalyzerBug::MissingCallResult)?;
                let size = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                Ok(self.allocate(
                    state,
                    lhs,
                    &Ty::MachineInt {
                        bit_width: 8,
                        sign: crate::num::Sign::Unsigned,
                    },
                    size,
                ))
            }
            Intrinsic::Calloc => {
                let lhs = lhs.ok_or(AnalyzerBug::MissingCallResult)?;
                let count = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                let elem_size = args.get(1).ok_or(AnalyzerBug::MissingCallArgument)?;
                let product = self.numeric_of(state, count).mul(&self.numeric_of(state, elem_size));
                let shadow = self.ctx.fresh_shadow(
                    Ty::MachineInt {
                        bit_width: 64,
                        sign: crate::num::Sign::Unsigned,
                    },
                    crate::ir::variable::ShadowKind::AllocationSize,
                );
                let with_product = UnderlyingState {
                    numeric: state.numeric.with(shadow, product),
                    ..state.clone()
                };
                let allocated = self.allocate(
                    &with_product,
                    lhs,
                    &Ty::MachineInt {
                        bit_width: 8,
                        sign: crate::num::Sign::Unsigned,
                    },
                    &Scalar::MachineIntVar(shadow),
                );
                let memory = match allocated.pointer.addrs(lhs).as_singleton() {
                    Some(loc) => allocated.memory.mem_zero_reachable(loc),
                    None => allocated.memory.clone(),
                };
                Ok(UnderlyingState { memory, ..allocated })
            }
            Intrinsic::Realloc => {
                let lhs = lhs.ok_or(AnalyzerBug::MissingCallResult)?;
                let ptr = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                let new_size = args.get(1).ok_or(AnalyzerBug::MissingCallArgument)?;
                let freed = self.free_pointer(state, ptr);
                Ok(self.allocate(
                    &freed,
                    lhs,
                    &Ty::MachineInt {
                        bit_width: 8,
                        sign: crate::num::Sign::Unsigned,
                    },
                    new_size,
                ))
            }
            Intrinsic::Free | Intrinsic::Delete => {
                let ptr = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                let freed = self.free_pointer(state, ptr);
                Ok(match lhs {
                    Some(v) => self.havoc_var(&freed, v),
                    None => freed,
                })
            }
            Intrinsic::Memcpy => {
                let dst = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                let src = args.get(1).ok_or(AnalyzerBug::MissingCallArgument)?;
                let size = args.get(2).ok_or(AnalyzerBug::MissingCallArgument)?;
                let memory = self.copy_bytes(state, dst, src, size);
                Ok(UnderlyingState { memory, ..state.clone() })
            }
            Intrinsic::Memset => {
                let dst = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                let byte = args.get(1).ok_or(AnalyzerBug::MissingCallArgument)?;
                let size = args.get(2).ok_or(AnalyzerBug::MissingCallArgument)?;
                let exact = (|| {
                    let dst_var = dst.as_variable()?;
                    let n = self.numeric_of(state, size).interval.as_singleton()?;
                    if n < 0 {
                        return None;
                    }
                    let (loc, off) = self.concrete_cell(state, dst_var, n as u64)?;
                    let strong = state
                        .pointer
                        .get(dst_var)
                        .map(|e| e.addrs.as_singleton().is_some())
                        .unwrap_or(false);
                    let alloc_size = self.alloc_size(state, dst_var);
                    Some(state.memory.mem_set(loc, off, byte.clone(), n as u64, alloc_size, strong))
                })();
                let memory = exact.unwrap_or_else(|| self.forget_arg_reachable(state, dst));
                Ok(UnderlyingState { memory, ..state.clone() })
            }
            Intrinsic::Strcpy => {
                // The copied extent isn't known without reading `src`'s
                // contents byte-by-byte, which this abstraction doesn't
                // do; conservatively forget the destination instead of
                // copying precisely.
                let dst = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                let memory = self.forget_arg_reachable(state, dst);
                Ok(UnderlyingState { memory, ..state.clone() })
            }
            Intrinsic::Strlen => {
                let lhs = lhs.ok_or(AnalyzerBug::MissingCallResult)?;
                let numeric = state.numeric.with(
                    lhs,
                    NumericValue {
                        interval: Interval::new(Bound::Finite(0), Bound::PlusInfinity),
                        congruence: Congruence::top(),
                        gauge: crate::num::Gauge::top(),
                    },
                );
                Ok(UnderlyingState {
                    numeric,
                    pointer: state.pointer.forget(lhs),
                    nullity: state.nullity.set(lhs, Nullity::Top),
                    uninit: state.uninit.mark_initialized(lhs),
                    ..state.clone()
                })
            }
            Intrinsic::BeginCatch => Ok(match lhs {
                Some(v) => self.havoc_var(state, v),
                None => state.clone(),
            }),
            Intrinsic::EndCatch => Ok(state.clone()),
            Intrinsic::IkosAssert | Intrinsic::IkosAssume => {
                let cond = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                match cond {
                    // A literal-false assertion/assumption makes this path
                    // infeasible. A variable-valued condition can't be
                    // refined further without re-deriving the predicate
                    // that produced it, so it's a sound no-op.
                    Scalar::MachineInt(mi) if mi.is_zero() => Ok(UnderlyingState::bottom()),
                    _ => Ok(state.clone()),
                }
            }
            Intrinsic::IkosCounterInit => {
                let var = args.first().and_then(Scalar::as_variable).ok_or(AnalyzerBug::MissingCallArgument)?;
                // `var`'s own raw id doubles as its `CounterId`: the gauge
                // domain only ever needs to tell counters apart, and a
                // variable is designated a counter at most once.
                Ok(UnderlyingState {
                    numeric: state.numeric.counter_init(var, var.raw()),
                    ..state.clone()
                })
            }
            Intrinsic::IkosCounterIncr => {
                let var = args.first().and_then(Scalar::as_variable).ok_or(AnalyzerBug::MissingCallArgument)?;
                let incremented = state.numeric.get(var).add(&NumericValue::singleton(1));
                Ok(UnderlyingState {
                    numeric: state.numeric.with(var, incremented),
                    ..state.clone()
                })
            }
            Intrinsic::IkosForgetMemory => {
                let ptr = args.first().ok_or(AnalyzerBug::MissingCallArgument)?;
                let memory = self.forget_arg_reachable(state, ptr);
                Ok(UnderlyingState { memory, ..state.clone() })
            }
            Intrinsic::IkosWatchMemory => {
                // Watching a memory region for later "has this changed"
                // queries belongs to the checker layer (§6); the core
                // itself has nowhere to attach such a watch, so this is a
                // sound no-op.
                let _ = args;
                Ok(state.clone())
            }
            Intrinsic::Throw | Intrinsic::IkosPartitioningVar | Intrinsic::IkosPartitioningJoin => {
                unreachable!("handled at the invariant level before reaching per-state dispatch")
            }
        }
    }

    fn execute_intrinsic(
        &self,
        inv: &Invariant,
        lhs: Option<VariableId>,
        intrinsic: Intrinsic,
        args: &[Scalar],
    ) -> AnalysisResult<Invariant> {
        match intrinsic {
            Intrinsic::IkosPartitioningVar => {
                let var = args
                    .first()
                    .and_then(Scalar::as_variable)
                    .ok_or(AnalyzerBug::MissingCallArgument)?;
                Ok(Invariant {
                    normal: inv.normal.partition_by(var),
                    caught: inv.caught.clone(),
                    propagated: inv.propagated.clone(),
                })
            }
            Intrinsic::IkosPartitioningJoin => Ok(Invariant {
                normal: inv.normal.collapse(),
                caught: inv.caught.clone(),
                propagated: inv.propagated.clone(),
            }),
            Intrinsic::Throw => {
                let havocked = inv.normal.map(|s| {
                    let mut s = s.clone();
                    for arg in args {
                        s = UnderlyingState {
                            memory: self.forget_arg_reachable(&s, arg),
                            ..s
                        };
                    }
                    s
                });
                let pre_throw = ExceptionDomain {
                    normal: havocked,
                    caught: inv.caught.clone(),
                    propagated: inv.propagated.clone(),
                };
                Ok(pre_throw.throw_exception())
            }
            _ => {
                let normal = inv.normal.try_map(|s| self.execute_intrinsic_state(s, lhs, intrinsic, args))?;
                Ok(Invariant {
                    normal,
                    caught: inv.caught.clone(),
                    propagated: inv.propagated.clone(),
                })
            }
        }
    }

    fn execute_unknown_call(
        &self,
        inv: &Invariant,
        lhs: Option<VariableId>,
        args: &[Scalar],
        pure: bool,
        config: &AnalysisConfig,
    ) -> Invariant {
        if pure {
            let normal = inv.normal.map(|s| match lhs {
                Some(v) => self.havoc_var(s, v),
                None => s.clone(),
            });
            return Invariant {
                normal,
                caught: inv.caught.clone(),
                propagated: inv.propagated.clone(),
            };
        }
        let havoc_one = |s: &UnderlyingState| -> UnderlyingState {
            let memory_havocked = match config.unknown_call_policy {
                UnknownCallPolicy::ForgetReachableFromArguments => {
                    let mut memory = s.memory.clone();
                    for arg in args {
                        memory = self.forget_arg_reachable(&UnderlyingState { memory, ..s.clone() }, arg);
                    }
                    UnderlyingState { memory, ..s.clone() }
                }
                UnknownCallPolicy::ForgetAllGlobals => UnderlyingState {
                    memory: MemoryDomain::top(),
                    ..s.clone()
                },
            };
            match lhs {
                Some(v) => self.havoc_var(&memory_havocked, v),
                None => memory_havocked,
            }
        };
        inv.unknown_call_may_throw(|partitioned: &PartitionedState| partitioned.map(&havoc_one))
    }

    /// Dispatch `Instruction::Call` (§4.9). `has_exception_edge` only
    /// matters to the driver (which successor block is live); the engine
    /// always computes both the normal and the propagated outcome and lets
    /// the driver pick which one a given edge carries forward.
    pub fn execute_call(
        &self,
        inv: &Invariant,
        lhs: Option<VariableId>,
        target: &CallTarget,
        args: &[Scalar],
        has_exception_edge: bool,
        config: &AnalysisConfig,
    ) -> AnalysisResult<Invariant> {
        let _ = has_exception_edge;
        match target {
            CallTarget::Known(sig) => self.execute_known_call(inv, lhs, sig, args),
            CallTarget::Intrinsic(intrinsic) => self.execute_intrinsic(inv, lhs, *intrinsic, args),
            CallTarget::Unknown { pure } => Ok(self.execute_unknown_call(inv, lhs, args, *pure, config)),
        }
    }

    /// `LandingPad(exc_var)`: `enter_catch()`, then the catch handler's
    /// body runs as ordinary normal flow, so the (imprecisely-tracked)
    /// exception value is bound into `exc_var` and merged into `normal`
    /// rather than left sitting in `caught`.
    pub fn landing_pad(&self, inv: &Invariant, exc_var: VariableId) -> Invariant {
        let after_catch = inv.enter_catch();
        let bound_caught = after_catch.caught.map(|s| self.havoc_var(s, exc_var));
        Invariant {
            normal: after_catch.normal.join(&bound_caught),
            caught: PartitionedState::bottom(),
            propagated: after_catch.propagated,
        }
    }

    /// `Resume(exc_var)`: `resume_exception()`, then block-terminating —
    /// no successor continues from the normal flow of this block.
    pub fn resume(&self, inv: &Invariant) -> Invariant {
        let resumed = inv.resume_exception();
        Invariant {
            normal: PartitionedState::bottom(),
            caught: resumed.caught,
            propagated: resumed.propagated,
        }
    }

    /// `Unreachable`/`Return`: block-terminating, no successor continues
    /// from the normal flow of this block.
    pub fn terminate_normal_flow(&self, inv: &Invariant) -> Invariant {
        Invariant {
            normal: PartitionedState::bottom(),
            caught: inv.caught.clone(),
            propagated: inv.propagated.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::AnalysisContext,
        domain::state::entry_invariant,
        ir::{
            memloc::CallingContext,
            types::DataLayout,
            variable::VariableId as Vid,
        },
        num::{
            MachineInt,
            Sign,
        },
    };

    fn v(n: u32) -> Vid {
        Vid::from_raw(n)
    }

    fn engine(ctx: &AnalysisContext) -> Engine<'_> {
        Engine::new(DataLayout::x86_64(), ctx, CallingContext(0))
    }

    #[test]
    fn malloc_then_store_then_free_then_store_is_use_after_free() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let config = AnalysisConfig::default();

        let inv = entry_invariant();
        let size = Scalar::MachineInt(MachineInt::new(40, 32, Sign::Unsigned));
        let after_malloc = eng
            .execute_call(
                &inv,
                Some(v(0)),
                &CallTarget::Intrinsic(Intrinsic::Malloc),
                core::slice::from_ref(&size),
                false,
                &config,
            )
            .unwrap();

        let state_after_malloc = after_malloc.normal.flatten();
        let one = Scalar::MachineInt(MachineInt::new(1, 32, Sign::Signed));
        let store_inst = crate::ir::instruction::Instruction::Store {
            ptr: v(0),
            value: one,
            size: 4,
            volatile: false,
        };
        let after_store = eng.step(&state_after_malloc, &store_inst);
        assert!(!after_store.is_bottom());

        let normal_after_store = Invariant {
            normal: PartitionedState::Flat(after_store),
            caught: after_malloc.caught,
            propagated: after_malloc.propagated,
        };
        let ptr = Scalar::PointerVar(v(0));
        let after_free = eng
            .execute_call(
                &normal_after_store,
                None,
                &CallTarget::Intrinsic(Intrinsic::Free),
                core::slice::from_ref(&ptr),
                false,
                &config,
            )
            .unwrap();

        let state_after_free = after_free.normal.flatten();
        let two = Scalar::MachineInt(MachineInt::new(2, 32, Sign::Signed));
        let second_store = crate::ir::instruction::Instruction::Store {
            ptr: v(0),
            value: two,
            size: 4,
            volatile: false,
        };
        let after_second_store = eng.step(&state_after_free, &second_store);
        assert!(after_second_store.is_bottom());
    }

    #[test]
    fn throw_then_landing_pad_then_resume_round_trips() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let config = AnalysisConfig::default();
        let inv = entry_invariant();

        let exc = Scalar::PointerVar(v(0));
        let thrown = eng
            .execute_call(
                &inv,
                None,
                &CallTarget::Intrinsic(Intrinsic::Throw),
                core::slice::from_ref(&exc),
                false,
                &config,
            )
            .unwrap();
        assert!(thrown.normal.is_bottom());
        assert!(!thrown.propagated.is_bottom());

        let caught = eng.landing_pad(&thrown, v(1));
        assert!(caught.propagated.is_bottom());
        assert!(!caught.normal.is_bottom());

        let resumed = eng.resume(&caught);
        assert!(resumed.normal.is_bottom());
    }

    #[test]
    fn unknown_call_may_throw_keeps_normal_and_propagated_live() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let config = AnalysisConfig::default();
        let inv = entry_invariant();

        let after = eng
            .execute_call(&inv, Some(v(0)), &CallTarget::Unknown { pure: false }, &[], false, &config)
            .unwrap();
        assert!(!after.normal.is_bottom());
        assert!(!after.propagated.is_bottom());
    }

    #[test]
    fn ikos_assert_false_is_bottom() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let config = AnalysisConfig::default();
        let inv = entry_invariant();

        let zero = Scalar::MachineInt(MachineInt::zero(32, Sign::Signed));
        let after = eng
            .execute_call(
                &inv,
                None,
                &CallTarget::Intrinsic(Intrinsic::IkosAssert),
                core::slice::from_ref(&zero),
                false,
                &config,
            )
            .unwrap();
        assert!(after.normal.is_bottom());
    }
}
