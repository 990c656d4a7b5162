//! Per-instruction transfer functions (§4.8): how one instruction rewrites
//! a single [`UnderlyingState`]. [`super::call`] covers the `Call`
//! instruction separately since it interacts with the exception domain.

use crate::{
    context::AnalysisContext,
    domain::{
        lattice::AbstractDomain,
        memory::CellKey,
        numeric::NumericValue,
        pointer::{
            PointerEntry,
            PointsToSet,
        },
        state::UnderlyingState,
        uninit::Init,
    },
    ir::{
        instruction::{
            BinaryOp,
            ComparisonOp,
            Instruction,
            UnaryOp,
        },
        literal::Scalar,
        memloc::{
            CallingContext,
            MemoryLocation,
        },
        types::{
            DataLayout,
            Ty,
        },
        variable::{
            ShadowKind,
            VariableId,
        },
    },
};

/// The abstract-semantic execution engine: a thin, stateless dispatcher
/// over the domain operations, parameterized by the data layout and the
/// context needed to synthesize fresh memory locations and shadow
/// variables. Monomorphized, not a trait object, per the "dynamic dispatch
/// on the abstract domain" redesign note.
pub struct Engine<'ctx> {
    /// Pointer width and vararg-passing convention.
    pub layout: DataLayout,
    /// The shared interner/id-factory.
    pub ctx: &'ctx AnalysisContext,
    /// Which calling context this function's dynamic allocations are
    /// attributed to (distinguishes the same call site reached through
    /// different stacks).
    pub calling_context: CallingContext,
}

impl<'ctx> Engine<'ctx> {
    /// Build an engine over the given layout/context for one calling
    /// context.
    pub fn new(layout: DataLayout, ctx: &'ctx AnalysisContext, calling_context: CallingContext) -> Self {
        Self {
            layout,
            ctx,
            calling_context,
        }
    }

    /// Forget every per-variable domain's knowledge of `v`. Shared by every
    /// transfer function that can only soundly summarize its result as
    /// "some initialized value of the declared type".
    pub(super) fn havoc_var(&self, state: &UnderlyingState, v: VariableId) -> UnderlyingState {
        UnderlyingState {
            numeric: state.numeric.int_forget(v),
            pointer: state.pointer.forget(v),
            nullity: state.nullity.set(v, crate::domain::nullity::Nullity::Top),
            uninit: state.uninit.mark_initialized(v),
            lifetime: state.lifetime.clone(),
            memory: state.memory.clone(),
        }
    }

    /// The machine-integer type of a scalar operand, if known: a
    /// [`Scalar::MachineInt`] literal carries its own bit-width/sign, and a
    /// [`Scalar::MachineIntVar`] carries it through the variable's interned
    /// declaration.
    fn operand_ty(&self, scalar: &Scalar) -> Option<Ty> {
        match scalar {
            Scalar::MachineInt(mi) => Some(Ty::MachineInt {
                bit_width: mi.bit_width(),
                sign: mi.sign(),
            }),
            Scalar::MachineIntVar(v) => self.ctx.variable_data(*v).map(|d| d.ty),
            _ => None,
        }
    }

    pub(super) fn numeric_of(&self, state: &UnderlyingState, scalar: &Scalar) -> NumericValue {
        match scalar {
            Scalar::MachineInt(mi) => NumericValue::singleton(mi.to_integer()),
            Scalar::MachineIntVar(v) => state.numeric.get(*v),
            Scalar::Undefined => NumericValue::bottom(),
            _ => NumericValue::top(),
        }
    }

    pub(super) fn addrs_of(&self, state: &UnderlyingState, scalar: &Scalar) -> PointsToSet {
        match scalar {
            Scalar::PointerVar(v) => state.pointer.addrs(*v),
            Scalar::Null => PointsToSet::singleton(MemoryLocation::AbsoluteZero),
            Scalar::Undefined => PointsToSet::empty(),
            _ => PointsToSet::Top,
        }
    }

    pub(super) fn nullity_of(&self, state: &UnderlyingState, scalar: &Scalar) -> crate::domain::nullity::Nullity {
        use crate::domain::nullity::Nullity;
        match scalar {
            Scalar::Null => Nullity::Null,
            Scalar::PointerVar(v) => state.nullity.get(*v),
            _ => Nullity::Top,
        }
    }

    pub(super) fn init_of(&self, state: &UnderlyingState, scalar: &Scalar) -> Init {
        match scalar {
            Scalar::Undefined => Init::Uninitialized,
            Scalar::MachineIntVar(v) | Scalar::FloatVar(v) | Scalar::PointerVar(v) => {
                state.uninit.get(*v)
            }
            _ => Init::Initialized,
        }
    }

    /// Bind `lhs` to the value of `rhs` across every tracked per-variable
    /// domain, discarding whatever `lhs` previously held.
    fn assign(&self, state: &UnderlyingState, lhs: VariableId, rhs: &Scalar) -> UnderlyingState {
        if rhs.is_undefined() {
            // Reading an explicitly undefined value is benign; only
            // consuming it elsewhere (e.g. as an operand) goes to bottom.
            // Assignment just propagates the Uninitialized mark.
            return UnderlyingState {
                numeric: state.numeric.int_forget(lhs),
                pointer: state.pointer.forget(lhs),
                nullity: state.nullity.set(lhs, crate::domain::nullity::Nullity::Top),
                uninit: state.uninit.mark_uninitialized(lhs),
                lifetime: state.lifetime.clone(),
                memory: state.memory.clone(),
            };
        }
        let mut numeric = state.numeric.with(lhs, self.numeric_of(state, rhs));
        let addrs = self.addrs_of(state, rhs);
        let pointer = if let Scalar::PointerVar(src) = rhs {
            match state.pointer.get(*src) {
                Some(entry) => state.pointer.set(lhs, entry.clone()),
                None => state.pointer.forget(lhs),
            }
        } else if matches!(rhs, Scalar::Null) {
            let shadow = self.ctx.fresh_shadow(
                Ty::MachineInt {
                    bit_width: self.layout.pointer_width_bytes * 8,
                    sign: crate::num::Sign::Unsigned,
                },
                ShadowKind::PointerOffset,
            );
            numeric = numeric.with(shadow, NumericValue::singleton(0));
            state.pointer.set(
                lhs,
                PointerEntry {
                    addrs,
                    offset_shadow: shadow,
                },
            )
        } else {
            state.pointer.forget(lhs)
        };
        let nullity = state.nullity.set(lhs, self.nullity_of(state, rhs));
        let uninit = state.uninit.mark_initialized(lhs);
        UnderlyingState {
            numeric,
            pointer,
            nullity,
            uninit,
            lifetime: state.lifetime.clone(),
            memory: state.memory.clone(),
        }
    }

    fn unary_op(
        &self,
        state: &UnderlyingState,
        op: UnaryOp,
        lhs: VariableId,
        operand: &Scalar,
        result_ty: &Ty,
    ) -> UnderlyingState {
        match op {
            UnaryOp::Trunc | UnaryOp::Ext | UnaryOp::SignCast | UnaryOp::Bitcast => {
                // All four preserve the mathematical value's abstraction at
                // the level these domains track; a sound, if imprecise,
                // model forgets precision rather than reason about masking.
                self.assign(state, lhs, operand)
            }
            UnaryOp::FpCast => UnderlyingState {
                numeric: state.numeric.int_forget(lhs),
                pointer: state.pointer.forget(lhs),
                nullity: state.nullity.set(lhs, crate::domain::nullity::Nullity::Top),
                uninit: state.uninit.mark_initialized(lhs),
                lifetime: state.lifetime.clone(),
                memory: state.memory.clone(),
            },
            UnaryOp::PtrToInt => {
                let numeric = state.numeric.int_forget(lhs);
                UnderlyingState {
                    numeric,
                    pointer: state.pointer.forget(lhs),
                    nullity: state.nullity.set(lhs, crate::domain::nullity::Nullity::Top),
                    uninit: state.uninit.mark_initialized(lhs),
                    lifetime: state.lifetime.clone(),
                    memory: state.memory.clone(),
                }
            }
            UnaryOp::IntToPtr => {
                let addrs = match operand {
                    Scalar::MachineInt(mi) if mi.to_integer() == 0 => {
                        PointsToSet::singleton(MemoryLocation::AbsoluteZero)
                    }
                    Scalar::MachineInt(mi) => {
                        PointsToSet::singleton(MemoryLocation::FixedAddress(mi.to_bits()))
                    }
                    _ => PointsToSet::Top,
                };
                let shadow = self.ctx.fresh_shadow(
                    Ty::MachineInt {
                        bit_width: self.layout.pointer_width_bytes * 8,
                        sign: crate::num::Sign::Unsigned,
                    },
                    ShadowKind::PointerOffset,
                );
                let _ = result_ty;
                UnderlyingState {
                    numeric: state.numeric.int_forget(lhs).with(shadow, NumericValue::singleton(0)),
                    pointer: state.pointer.set(
                        lhs,
                        PointerEntry {
                            addrs,
                            offset_shadow: shadow,
                        },
                    ),
                    nullity: state.nullity.set(
                        lhs,
                        if matches!(operand, Scalar::MachineInt(mi) if mi.to_integer() == 0) {
                            crate::domain::nullity::Nullity::Null
                        } else {
                            crate::domain::nullity::Nullity::Top
                        },
                    ),
                    uninit: state.uninit.mark_initialized(lhs),
                    lifetime: state.lifetime.clone(),
                    memory: state.memory.clone(),
                }
            }
        }
    }

    fn binary_op(
        &self,
        state: &UnderlyingState,
        op: BinaryOp,
        lhs: VariableId,
        left: &Scalar,
        right: &Scalar,
    ) -> UnderlyingState {
        let l = self.numeric_of(state, left);
        let r = self.numeric_of(state, right);
        let ty = self.operand_ty(left).or_else(|| self.operand_ty(right));
        let value = match ty {
            Some(ty) => l.int_binary_op(op, &r, ty),
            None => NumericValue::top(),
        };
        if value.is_bottom() {
            return UnderlyingState::bottom();
        }
        UnderlyingState {
            numeric: state.numeric.with(lhs, value),
            pointer: state.pointer.forget(lhs),
            nullity: state.nullity.set(lhs, crate::domain::nullity::Nullity::Top),
            uninit: state.uninit.mark_initialized(lhs),
            lifetime: state.lifetime.clone(),
            memory: state.memory.clone(),
        }
    }

    /// Refine `ptr`'s nullity (and, for a proven-null result, its `addrs`
    /// and offset) per a `pred`-on-null comparison; `None` if `pred` isn't
    /// an equality test (only `Eq`/`Ne` say anything about nullity).
    fn refine_pointer_vs_null(&self, state: &UnderlyingState, pred: ComparisonOp, ptr: VariableId) -> Option<UnderlyingState> {
        let nullity = match pred {
            ComparisonOp::Eq => state.nullity.assert_null(ptr),
            ComparisonOp::Ne => state.nullity.assert_non_null(ptr),
            _ => return None,
        };
        if nullity.is_bottom() {
            return Some(UnderlyingState::bottom());
        }
        if pred != ComparisonOp::Eq {
            return Some(UnderlyingState { nullity, ..state.clone() });
        }
        let Some(entry) = state.pointer.get(ptr) else {
            return Some(UnderlyingState { nullity, ..state.clone() });
        };
        let addrs = entry.addrs.refine(&PointsToSet::singleton(MemoryLocation::AbsoluteZero));
        let offset_shadow = entry.offset_shadow;
        let numeric = state.numeric.with(offset_shadow, NumericValue::singleton(0));
        let pointer = state.pointer.set(ptr, PointerEntry { addrs, offset_shadow });
        Some(UnderlyingState {
            numeric,
            pointer,
            nullity,
            ..state.clone()
        })
    }

    fn comparison(
        &self,
        state: &UnderlyingState,
        pred: ComparisonOp,
        lhs: VariableId,
        left: &Scalar,
        right: &Scalar,
    ) -> UnderlyingState {
        // The comparison's boolean *result* is havoc (§4.8 tracks
        // constraints via `int_add_constraint` at branches, not the value
        // of the comparison instruction itself). Pointer-vs-null
        // comparisons instead drive the nullity/pointer domains directly
        // (§4.8's Comparison row); a `PointerVar`'s own `VariableId` must
        // never reach `int_add_constraint` (only its `offset_shadow` lives
        // in the numeric domain), so the ordinary numeric path below only
        // looks at `as_int_variable`, not `as_variable`.
        let ptr_operand = match (left, right) {
            (Scalar::PointerVar(p), Scalar::Null) | (Scalar::Null, Scalar::PointerVar(p)) => Some(*p),
            _ => None,
        };
        let refined_state = if let Some(ptr) = ptr_operand {
            match self.refine_pointer_vs_null(state, pred, ptr) {
                Some(s) => s,
                None => state.clone(),
            }
        } else {
            let refined_numeric = match (left.as_int_variable(), right.as_int_variable()) {
                (Some(x), Some(y)) => state.numeric.int_add_constraint(pred, x, y),
                _ => state.numeric.clone(),
            };
            UnderlyingState {
                numeric: refined_numeric,
                ..state.clone()
            }
        };
        if refined_state.is_bottom() {
            return UnderlyingState::bottom();
        }
        UnderlyingState {
            numeric: refined_state.numeric.int_forget(lhs),
            pointer: refined_state.pointer.forget(lhs),
            nullity: refined_state.nullity.set(lhs, crate::domain::nullity::Nullity::Top),
            uninit: refined_state.uninit.mark_initialized(lhs),
            lifetime: refined_state.lifetime.clone(),
            memory: refined_state.memory.clone(),
        }
    }

    pub(super) fn allocate(&self, state: &UnderlyingState, lhs: VariableId, elem_ty: &Ty, count: &Scalar) -> UnderlyingState {
        let elem_size = elem_ty.size_bytes(&self.layout) as i128;
        let loc = MemoryLocation::DynAlloc(self.ctx.fresh_call_site_id(), self.calling_context);
        let shadow = self.ctx.fresh_shadow(
            Ty::MachineInt {
                bit_width: self.layout.pointer_width_bytes * 8,
                sign: crate::num::Sign::Unsigned,
            },
            ShadowKind::PointerOffset,
        );
        let count_value = self.numeric_of(state, count);
        let size_shadow = self.ctx.fresh_shadow(
            Ty::MachineInt {
                bit_width: 64,
                sign: crate::num::Sign::Unsigned,
            },
            ShadowKind::AllocationSize,
        );
        let size_value = count_value.mul(&NumericValue::singleton(elem_size));
        UnderlyingState {
            numeric: state
                .numeric
                .int_forget(lhs)
                .with(size_shadow, size_value)
                .with(shadow, NumericValue::singleton(0)),
            pointer: state.pointer.set(
                lhs,
                PointerEntry {
                    addrs: PointsToSet::singleton(loc),
                    offset_shadow: shadow,
                },
            ),
            nullity: state.nullity.set(lhs, crate::domain::nullity::Nullity::NonNull),
            uninit: state.uninit.mark_initialized(lhs),
            lifetime: state.lifetime.mark_allocated(loc),
            memory: state.memory.clone(),
        }
    }

    fn pointer_shift(
        &self,
        state: &UnderlyingState,
        lhs: VariableId,
        base: VariableId,
        offset_expr: &crate::ir::instruction::LinearExpr,
    ) -> UnderlyingState {
        let base_entry = state.pointer.get(base).cloned();
        let shadow = self.ctx.fresh_shadow(
            Ty::MachineInt {
                bit_width: self.layout.pointer_width_bytes * 8,
                sign: crate::num::Sign::Unsigned,
            },
            ShadowKind::PointerOffset,
        );
        let mut offset_value = NumericValue::singleton(offset_expr.constant);
        for (coeff, var) in offset_expr.terms.iter() {
            let term = state.numeric.get(*var).mul(&NumericValue::singleton(*coeff));
            offset_value = offset_value.add(&term);
        }
        let base_offset = base_entry
            .as_ref()
            .map(|e| state.numeric.get(e.offset_shadow))
            .unwrap_or_else(NumericValue::top);
        let new_offset = base_offset.add(&offset_value);
        let addrs = base_entry
            .as_ref()
            .map(|e| e.addrs.clone())
            .unwrap_or(PointsToSet::Top);
        UnderlyingState {
            numeric: state.numeric.int_forget(lhs).with(shadow, new_offset),
            pointer: state.pointer.set(
                lhs,
                PointerEntry {
                    addrs,
                    offset_shadow: shadow,
                },
            ),
            nullity: state.nullity.set(lhs, crate::domain::nullity::Nullity::Top),
            uninit: state.uninit.mark_initialized(lhs),
            lifetime: state.lifetime.clone(),
            memory: state.memory.clone(),
        }
    }

    pub(super) fn concrete_cell(&self, state: &UnderlyingState, ptr: VariableId, size: u64) -> Option<(MemoryLocation, i128)> {
        let entry = state.pointer.get(ptr)?;
        let loc = entry.addrs.as_singleton()?;
        let offset = state.numeric.get(entry.offset_shadow).interval.as_singleton()?;
        let _ = size;
        Some((loc, offset))
    }

    /// The live size of the allocation `ptr` points into, used for the
    /// §4.6 bounds check. Dynamic allocations don't yet round-trip their
    /// size shadow variable back through [`PointerEntry`], so this is
    /// conservatively unbounded; a real front-end binding would look it up
    /// via the `AllocationSize` shadow synthesized in
    /// [`Self::allocate`].
    pub(super) fn alloc_size(&self, _state: &UnderlyingState, _ptr: VariableId) -> i128 {
        i128::MAX / 2
    }

    fn load(&self, state: &UnderlyingState, lhs: VariableId, ptr: VariableId, size: u64, volatile: bool) -> UnderlyingState {
        let uninit = state.uninit.assert_initialized(ptr);
        if uninit.is_bottom() {
            return UnderlyingState::bottom();
        }
        let nullity = state.nullity.assert_non_null(ptr);
        if nullity.is_bottom() {
            return UnderlyingState::bottom();
        }
        let state = &UnderlyingState {
            nullity,
            ..state.clone()
        };
        if volatile {
            return UnderlyingState {
                numeric: state.numeric.int_forget(lhs),
                pointer: state.pointer.forget(lhs),
                nullity: state.nullity.set(lhs, crate::domain::nullity::Nullity::Top),
                uninit: uninit.mark_initialized(lhs),
                lifetime: state.lifetime.clone(),
                memory: state.memory.clone(),
            };
        }
        let cell = self.concrete_cell(state, ptr, size);
        if let Some((loc, _)) = cell {
            if state.lifetime.get(loc) == crate::ir::memloc::Lifetime::Deallocated {
                return UnderlyingState::bottom();
            }
        }
        let value = cell.and_then(|(loc, offset)| state.memory.mem_read(loc, offset, size));
        let numeric = match &value {
            Some(Scalar::MachineInt(mi)) => state.numeric.with(lhs, NumericValue::singleton(mi.to_integer())),
            _ => state.numeric.int_forget(lhs),
        };
        let pointer = match &value {
            Some(Scalar::PointerVar(src)) => match state.pointer.get(*src) {
                Some(entry) => state.pointer.set(lhs, entry.clone()),
                None => state.pointer.forget(lhs),
            },
            _ => state.pointer.forget(lhs),
        };
        UnderlyingState {
            numeric,
            pointer,
            nullity: state.nullity.set(lhs, crate::domain::nullity::Nullity::Top),
            uninit: uninit.mark_initialized(lhs),
            lifetime: state.lifetime.clone(),
            memory: state.memory.clone(),
        }
    }

    fn store(&self, state: &UnderlyingState, ptr: VariableId, value: &Scalar, size: u64, volatile: bool) -> UnderlyingState {
        let uninit = state.uninit.assert_initialized(ptr);
        if uninit.is_bottom() {
            return UnderlyingState::bottom();
        }
        let nullity = state.nullity.assert_non_null(ptr);
        if nullity.is_bottom() {
            return UnderlyingState::bottom();
        }
        if volatile {
            return UnderlyingState {
                uninit,
                nullity,
                ..state.clone()
            };
        }
        let value_scalar = match value {
            Scalar::MachineIntVar(_) | Scalar::PointerVar(_) | Scalar::MachineInt(_) | Scalar::Null => {
                value.clone()
            }
            _ => Scalar::Undefined,
        };
        let cell = self.concrete_cell(state, ptr, size);
        if let Some((loc, _)) = cell {
            if state.lifetime.get(loc) == crate::ir::memloc::Lifetime::Deallocated {
                return UnderlyingState::bottom();
            }
        }
        let memory = match cell {
            Some((loc, offset)) => {
                let strong = state.pointer.get(ptr).map(|e| e.addrs.as_singleton().is_some()).unwrap_or(false);
                let alloc_size = self.alloc_size(state, ptr);
                state.memory.mem_write(loc, offset, size, value_scalar, alloc_size, strong)
            }
            None => state.memory.clone(),
        };
        UnderlyingState {
            memory,
            uninit,
            nullity,
            ..state.clone()
        }
    }

    /// Dispatch one instruction's transfer function over a single
    /// underlying state. `Call` is handled separately by
    /// [`super::call::Engine::execute_call`] since it interacts with the
    /// exception domain.
    pub fn step(&self, state: &UnderlyingState, inst: &Instruction) -> UnderlyingState {
        if state.is_bottom() {
            return state.clone();
        }
        match inst {
            Instruction::Assignment { lhs, rhs } => self.assign(state, *lhs, rhs),
            Instruction::UnaryOp {
                op,
                lhs,
                operand,
                result_ty,
            } => self.unary_op(state, *op, *lhs, operand, result_ty),
            Instruction::BinaryOp { op, lhs, left, right } => self.binary_op(state, *op, *lhs, left, right),
            Instruction::Comparison { pred, lhs, left, right } => self.comparison(state, *pred, *lhs, left, right),
            Instruction::Allocate { lhs, elem_ty, count } => self.allocate(state, *lhs, elem_ty, count),
            Instruction::PointerShift { lhs, base, offset_expr } => {
                self.pointer_shift(state, *lhs, *base, offset_expr)
            }
            Instruction::Load {
                lhs,
                ptr,
                size,
                volatile,
            } => self.load(state, *lhs, *ptr, *size, *volatile),
            Instruction::Store {
                ptr,
                value,
                size,
                volatile,
            } => self.store(state, *ptr, value, *size, *volatile),
            Instruction::ExtractElement { lhs, vector, .. } => {
                let _ = vector;
                UnderlyingState {
                    numeric: state.numeric.int_forget(*lhs),
                    pointer: state.pointer.forget(*lhs),
                    nullity: state.nullity.set(*lhs, crate::domain::nullity::Nullity::Top),
                    uninit: state.uninit.mark_initialized(*lhs),
                    lifetime: state.lifetime.clone(),
                    memory: state.memory.clone(),
                }
            }
            Instruction::InsertElement { lhs, .. } => UnderlyingState {
                numeric: state.numeric.int_forget(*lhs),
                pointer: state.pointer.forget(*lhs),
                nullity: state.nullity.set(*lhs, crate::domain::nullity::Nullity::Top),
                uninit: state.uninit.mark_initialized(*lhs),
                lifetime: state.lifetime.clone(),
                memory: state.memory.clone(),
            },
            Instruction::ShuffleVector { lhs, .. } => UnderlyingState {
                numeric: state.numeric.int_forget(*lhs),
                pointer: state.pointer.forget(*lhs),
                nullity: state.nullity.set(*lhs, crate::domain::nullity::Nullity::Top),
                uninit: state.uninit.mark_initialized(*lhs),
                lifetime: state.lifetime.clone(),
                memory: state.memory.clone(),
            },
            // Handled at the invariant level by the driver, not here.
            Instruction::LandingPad { .. }
            | Instruction::Resume { .. }
            | Instruction::Unreachable
            | Instruction::Return { .. }
            | Instruction::Call { .. } => state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::variable::VariableId as Vid,
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
    fn assignment_binds_numeric_constant() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let state = UnderlyingState::top();
        let rhs = Scalar::MachineInt(MachineInt::new(7, 32, Sign::Signed));
        let after = eng.step(&state, &Instruction::Assignment { lhs: v(0), rhs });
        assert_eq!(after.numeric.int_to_interval(v(0)), crate::num::Interval::singleton(7));
    }

    #[test]
    fn add_no_wrap_overflow_is_bottom() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let state = UnderlyingState::top();
        let inst = Instruction::BinaryOp {
            op: BinaryOp::AddNoWrap,
            lhs: v(2),
            left: Scalar::MachineInt(MachineInt::new(255, 8, Sign::Unsigned)),
            right: Scalar::MachineInt(MachineInt::new(1, 8, Sign::Unsigned)),
        };
        let after = eng.step(&state, &inst);
        assert!(after.is_bottom());
    }

    #[test]
    fn division_by_zero_is_bottom() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let state = UnderlyingState::top();
        let inst = Instruction::BinaryOp {
            op: BinaryOp::Div,
            lhs: v(2),
            left: Scalar::MachineInt(MachineInt::new(10, 32, Sign::Signed)),
            right: Scalar::MachineInt(MachineInt::new(0, 32, Sign::Signed)),
        };
        let after = eng.step(&state, &inst);
        assert!(after.is_bottom());
    }

    #[test]
    fn exact_shift_on_literals() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let state = UnderlyingState::top();
        let inst = Instruction::BinaryOp {
            op: BinaryOp::Shl,
            lhs: v(2),
            left: Scalar::MachineInt(MachineInt::new(1, 32, Sign::Unsigned)),
            right: Scalar::MachineInt(MachineInt::new(4, 32, Sign::Unsigned)),
        };
        let after = eng.step(&state, &inst);
        assert_eq!(after.numeric.int_to_interval(v(2)), crate::num::Interval::singleton(16));
    }

    #[test]
    fn store_through_known_null_pointer_is_bottom() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let state = UnderlyingState {
            nullity: UnderlyingState::top().nullity.set(v(0), crate::domain::nullity::Nullity::Null),
            ..UnderlyingState::top()
        };
        let inst = Instruction::Store {
            ptr: v(0),
            value: Scalar::MachineInt(MachineInt::new(1, 32, Sign::Signed)),
            size: 4,
            volatile: false,
        };
        let after = eng.step(&state, &inst);
        assert!(after.is_bottom());
    }

    #[test]
    fn load_through_known_null_pointer_is_bottom() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let state = UnderlyingState {
            nullity: UnderlyingState::top().nullity.set(v(0), crate::domain::nullity::Nullity::Null),
            ..UnderlyingState::top()
        };
        let inst = Instruction::Load {
            lhs: v(1),
            ptr: v(0),
            size: 4,
            volatile: false,
        };
        let after = eng.step(&state, &inst);
        assert!(after.is_bottom());
    }

    #[test]
    fn comparison_with_null_narrows_nullity_on_eq_branch() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let state = UnderlyingState::top();
        let inst = Instruction::Comparison {
            pred: ComparisonOp::Eq,
            lhs: v(1),
            left: Scalar::PointerVar(v(0)),
            right: Scalar::Null,
        };
        let after = eng.step(&state, &inst);
        assert_eq!(after.nullity.get(v(0)), crate::domain::nullity::Nullity::Null);
    }

    #[test]
    fn comparison_ptr_eq_null_after_non_null_proof_is_bottom() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let inst = Instruction::Allocate {
            lhs: v(0),
            elem_ty: Ty::MachineInt {
                bit_width: 8,
                sign: Sign::Unsigned,
            },
            count: Scalar::MachineInt(MachineInt::new(4, 32, Sign::Unsigned)),
        };
        let state = eng.step(&UnderlyingState::top(), &inst);
        let inst = Instruction::Comparison {
            pred: ComparisonOp::Eq,
            lhs: v(1),
            left: Scalar::Null,
            right: Scalar::PointerVar(v(0)),
        };
        let after = eng.step(&state, &inst);
        assert!(after.is_bottom());
    }

    #[test]
    fn allocate_marks_non_null_and_allocated() {
        let ctx = AnalysisContext::new();
        let eng = engine(&ctx);
        let state = UnderlyingState::top();
        let inst = Instruction::Allocate {
            lhs: v(0),
            elem_ty: Ty::MachineInt {
                bit_width: 8,
                sign: Sign::Unsigned,
            },
            count: Scalar::MachineInt(MachineInt::new(16, 32, Sign::Unsigned)),
        };
        let after = eng.step(&state, &inst);
        assert_eq!(after.nullity.get(v(0)), crate::domain::nullity::Nullity::NonNull);
        let loc = after.pointer.addrs(v(0)).as_singleton().unwrap();
        assert_eq!(after.lifetime.get(loc), crate::ir::memloc::Lifetime::Allocated);
    }
}
