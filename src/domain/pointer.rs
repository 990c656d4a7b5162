//! The pointer domain (Â§4.5): `addrs(p)` (a points-to set) and the wiring
//! from a pointer variable to the shadow variable its offset is tracked
//! under. `null(p)`/`init(p)` live in [`crate::domain::nullity`] and
//! [`crate::domain::uninit`] respectively; this module only owns `addrs`.

use im::{
    HashMap,
    HashSet,
};

use crate::{
    domain::lattice::AbstractDomain,
    ir::{
        memloc::MemoryLocation,
        variable::VariableId,
    },
};

/// `P(MemoryLocation) union {top}`.
#[derive(Debug, Clone, PartialEq)]
pub enum PointsToSet {
    /// Unknown: may point anywhere.
    Top,
    /// A known, possibly empty, set of locations.
    Set(HashSet<MemoryLocation>),
}

impl PointsToSet {
    /// The empty set (points nowhere yet; distinct from top).
    pub fn empty() -> Self {
        Self::Set(HashSet::new())
    }

    /// A single location.
    pub fn singleton(m: MemoryLocation) -> Self {
        let mut s = HashSet::new();
        s.insert(m);
        Self::Set(s)
    }

    /// True iff this set contains `m` (or is top, conservatively).
    pub fn may_alias(&self, m: MemoryLocation) -> bool {
        match self {
            Self::Top => true,
            Self::Set(s) => s.contains(&m),
        }
    }

    /// True iff this is a singleton (the precise-cell fast path for
    /// `mem_write`'s strong-update decision).
    pub fn as_singleton(&self) -> Option<MemoryLocation> {
        match self {
            Self::Set(s) if s.len() == 1 => s.iter().next().copied(),
            _ => None,
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (Self::Set(a), Self::Set(b)) => Self::Set(a.clone().union(b.clone())),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Top, x) | (x, Self::Top) => x.clone(),
            (Self::Set(a), Self::Set(b)) => Self::Set(a.clone().intersection(b.clone())),
        }
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Self::Top) => true,
            (Self::Top, Self::Set(_)) => false,
            (Self::Set(a), Self::Set(b)) => a.is_subset(b),
        }
    }

    /// Intersect with an external points-to oracle's answer
    /// (`pointer_refine`, Â§4.5); sound even if the oracle answers top.
    pub fn refine(&self, external: &Self) -> Self {
        self.meet(external)
    }
}

/// `variable -> PointsToSet`, plus the shadow variable each pointer's
/// offset is tracked under in the numeric domain. `Bottom` as a whole
/// means the pointer-tracked part of the state is infeasible.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerDomain {
    /// Infeasible.
    Bottom,
    /// Feasible; unmapped variables implicitly point to top with no
    /// offset shadow registered.
    Env(HashMap<VariableId, PointerEntry>),
}

/// One pointer variable's tracked state.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEntry {
    /// What the pointer may point to.
    pub addrs: PointsToSet,
    /// The shadow variable the numeric domain tracks this pointer's byte
    /// offset under.
    pub offset_shadow: VariableId,
}

impl PointerDomain {
    /// The entry for `p`, if tracked.
    pub fn get(&self, p: VariableId) -> Option<&PointerEntry> {
        match self {
            Self::Bottom => None,
            Self::Env(map) => map.get(&p),
        }
    }

    fn with(&self, p: VariableId, entry: PointerEntry) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Env(map) => {
                let mut map = map.clone();
                map.insert(p, entry);
                Self::Env(map)
            }
        }
    }

    /// Bind `p` directly to `entry`, discarding any previous binding. Used
    /// by the engine for `Allocate`/`IntToPtr`/constant-`Null` assignment,
    /// where there is no "base" pointer to copy `addrs` from.
    pub fn set(&self, p: VariableId, entry: PointerEntry) -> Self {
        self.with(p, entry)
    }

    /// Remove any tracked binding for `p` (implicitly top afterwards).
    pub fn forget(&self, p: VariableId) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Env(map) => {
                let mut map = map.clone();
                map.remove(&p);
                Self::Env(map)
            }
        }
    }

    /// `pointer_assign(p, base, offset_shadow)`: `addrs(p) := addrs(base)`;
    /// the caller is responsible for having already computed
    /// `offset(p) := offset(base) + offset_expr` in the numeric domain
    /// under `offset_shadow` (Â§4.5).
    pub fn pointer_assign(&self, p: VariableId, base: VariableId, offset_shadow: VariableId) -> Self {
        let addrs = self
            .get(base)
            .map(|e| e.addrs.clone())
            .unwrap_or(PointsToSet::Top);
        self.with(
            p,
            PointerEntry {
                addrs,
                offset_shadow,
            },
        )
    }

    /// `pointer_refine(p, pts)`: intersect `addrs(p)` with an external
    /// points-to analysis result.
    pub fn pointer_refine(&self, p: VariableId, pts: &PointsToSet) -> Self {
        match self.get(p) {
            None => self.clone(),
            Some(entry) => {
                let refined = PointerEntry {
                    addrs: entry.addrs.refine(pts),
                    offset_shadow: entry.offset_shadow,
                };
                self.with(p, refined)
            }
        }
    }

    /// `addrs(p)`, top if `p` is untracked.
    pub fn addrs(&self, p: VariableId) -> PointsToSet {
        self.get(p).map(|e| e.addrs.clone()).unwrap_or(PointsToSet::Top)
    }

    /// `pointer_to_points_to(p)`, the checker-facing read-only query (Â§6).
    pub fn pointer_to_points_to(&self, p: VariableId) -> PointsToSet {
        self.addrs(p)
    }
}

impl AbstractDomain for PointerDomain {
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
            (Self::Env(a), Self::Env(b)) => b.iter().all(|(k, be)| match a.get(k) {
                Some(ae) => ae.addrs.leq(&be.addrs),
                None => be.addrs == PointsToSet::Top,
            }),
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Env(a), Self::Env(b)) => {
                let mut out = HashMap::new();
                for (k, ae) in a.iter() {
                    if let Some(be) = b.get(k) {
                        if ae.offset_shadow == be.offset_shadow {
                            out.insert(
                                *k,
                                PointerEntry {
                                    addrs: ae.addrs.join(&be.addrs),
                                    offset_shadow: ae.offset_shadow,
                                },
                            );
                        }
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
                for (k, be) in b.iter() {
                    let merged = match out.get(k) {
                        Some(ae) if ae.offset_shadow == be.offset_shadow => PointerEntry {
                            addrs: ae.addrs.meet(&be.addrs),
                            offset_shadow: ae.offset_shadow,
                        },
                        _ => be.clone(),
                    };
                    out.insert(*k, merged);
                }
                Self::Env(out)
            }
        }
    }

    fn widen(&self, other: &Self) -> Self {
        // Points-to sets in practice stabilize quickly (bounded by the
        // number of memory locations in the function); join is a sound and
        // terminating widening here.
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
    fn assign_copies_addrs_from_base() {
        let base_loc = MemoryLocation::FixedAddress(0x10);
        let d = PointerDomain::top().with(
            v(0),
            PointerEntry {
                addrs: PointsToSet::singleton(base_loc),
                offset_shadow: v(10),
            },
        );
        let d = d.pointer_assign(v(1), v(0), v(11));
        assert_eq!(d.addrs(v(1)), PointsToSet::singleton(base_loc));
    }

    #[test]
    fn refine_never_grows_addrs() {
        let loc_a = MemoryLocation::FixedAddress(0x10);
        let loc_b = MemoryLocation::FixedAddress(0x20);
        let d = PointerDomain::top().with(
            v(0),
            PointerEntry {
                addrs: {
                    let mut s = HashSet::new();
                    s.insert(loc_a);
                    s.insert(loc_b);
                    PointsToSet::Set(s)
                },
                offset_shadow: v(10),
            },
        );
        let d = d.pointer_refine(v(0), &PointsToSet::singleton(loc_a));
        assert_eq!(d.addrs(v(0)), PointsToSet::singleton(loc_a));
    }
}
