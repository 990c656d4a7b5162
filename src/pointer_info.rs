//! The *PointerInfo* oracle (Â§6: "toward the reduced-product layer"): an
//! optional, externally supplied flow-insensitive points-to analysis the
//! engine may consult to refine `addrs(p)` at a load or store. The engine
//! must remain sound even if every query answers top, so this is purely an
//! opportunistic precision aid, never a soundness dependency.

use crate::{
    domain::pointer::PointsToSet,
    ir::{
        cfg::InstId,
        variable::VariableId,
    },
};

/// A flow-insensitive points-to oracle, consulted via `pointer_refine`
/// (Â§4.5) at load/store sites.
pub trait PointerInfo {
    /// What `p` may point to, from whatever external analysis backs this
    /// oracle. Returning [`PointsToSet::Top`] is always a sound answer.
    fn points_to(&self, p: VariableId, at: InstId) -> PointsToSet;
}

/// A [`PointerInfo`] that never refines anything: every query answers top.
/// The engine's behavior with this oracle is identical to having none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPointerInfo;

impl PointerInfo for NoPointerInfo {
    fn points_to(&self, _p: VariableId, _at: InstId) -> PointsToSet {
        PointsToSet::Top
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::cfg::BlockId;

    #[test]
    fn no_pointer_info_always_answers_top() {
        let oracle = NoPointerInfo;
        let result = oracle.points_to(VariableId::from_raw(0), InstId(BlockId(0), 0));
        assert_eq!(result, PointsToSet::Top);
    }
}
