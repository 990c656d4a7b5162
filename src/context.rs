//! Lock-protected factories (§5): the variable interner and the id
//! factories for engine-synthesized memory locations, threaded explicitly
//! into every constructor that would otherwise reach for a global
//! singleton (§9's "global singletons" redesign note). Modeled on
//! `fuel-vm`'s own habit of carrying all mutable runtime state as struct
//! fields (`Interpreter<S, Ecal, Tx>`) rather than statics.

use alloc::vec::Vec;

use parking_lot::Mutex;

use crate::ir::{
    memloc::{
        AggregateId,
        CallSiteId,
    },
    types::Ty,
    variable::{
        ShadowKind,
        VariableData,
        VariableId,
    },
};

#[derive(Default)]
struct VariableInterner {
    data: Vec<VariableData>,
}

impl VariableInterner {
    fn intern(&mut self, data: VariableData) -> VariableId {
        let id = VariableId::from_raw(self.data.len() as u32);
        self.data.push(data);
        id
    }
}

/// Owns every interner/id-factory the analysis core needs. Read-mostly and
/// safe to share across the threads the fixpoint driver spawns to analyze
/// independent functions in parallel (§5); only the rare "intern a new
/// variable" or "synthesize a fresh memory location" path takes the lock.
#[derive(Default)]
pub struct AnalysisContext {
    variables: Mutex<VariableInterner>,
    next_aggregate_id: Mutex<u32>,
    next_call_site_id: Mutex<u32>,
}

impl AnalysisContext {
    /// A fresh, empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a new variable, returning its handle.
    pub fn intern_variable(&self, data: VariableData) -> VariableId {
        self.variables.lock().intern(data)
    }

    /// Look up a previously interned variable's data.
    pub fn variable_data(&self, id: VariableId) -> Option<VariableData> {
        self.variables.lock().data.get(id.raw() as usize).cloned()
    }

    /// Intern a fresh shadow variable of the given type and kind (e.g. a
    /// pointer's offset shadow, Â§4.5).
    pub fn fresh_shadow(&self, ty: Ty, kind: ShadowKind) -> VariableId {
        self.intern_variable(VariableData::shadow(ty, kind))
    }

    /// Allocate a fresh [`AggregateId`] for an engine-synthesized aggregate
    /// backing store (Â§4.8: an `Assignment` of an aggregate literal
    /// allocates one).
    pub fn fresh_aggregate_id(&self) -> AggregateId {
        let mut n = self.next_aggregate_id.lock();
        let id = AggregateId(*n);
        *n = n.wrapping_add(1);
        id
    }

    /// Allocate a fresh [`CallSiteId`] for a dynamic allocation site the
    /// engine discovers (`malloc`/`new`/...).
    pub fn fresh_call_site_id(&self) -> CallSiteId {
        let mut n = self.next_call_site_id.lock();
        let id = CallSiteId(*n);
        *n = n.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_variables_get_distinct_ids() {
        let ctx = AnalysisContext::new();
        let a = ctx.fresh_shadow(Ty::opaque_pointer(), ShadowKind::PointerOffset);
        let b = ctx.fresh_shadow(Ty::opaque_pointer(), ShadowKind::PointerOffset);
        assert_ne!(a, b);
    }

    #[test]
    fn variable_data_roundtrips() {
        let ctx = AnalysisContext::new();
        let ty = Ty::MachineInt {
            bit_width: 32,
            sign: crate::num::Sign::Signed,
        };
        let v = ctx.fresh_shadow(ty, ShadowKind::AllocationSize);
        assert_eq!(ctx.variable_data(v).unwrap().ty, ty);
    }

    #[test]
    fn aggregate_ids_are_distinct() {
        let ctx = AnalysisContext::new();
        assert_ne!(ctx.fresh_aggregate_id(), ctx.fresh_aggregate_id());
    }
}
