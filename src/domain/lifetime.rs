//! The lifetime domain (Â§3.6, Â§3.9): `memloc -> {Allocated, Deallocated,
//! top}`.

use im::HashMap;

use crate::{
    domain::lattice::AbstractDomain,
    ir::memloc::{
        Lifetime,
        MemoryLocation,
    },
};

fn leq(a: Lifetime, b: Lifetime) -> bool {
    b == Lifetime::Top || a == b
}

fn join(a: Lifetime, b: Lifetime) -> Lifetime {
    if a == b {
        a
    } else {
        Lifetime::Top
    }
}

fn meet(a: Lifetime, b: Lifetime) -> Option<Lifetime> {
    match (a, b) {
        (Lifetime::Top, x) | (x, Lifetime::Top) => Some(x),
        (a, b) if a == b => Some(a),
        _ => None,
    }
}

/// `memloc -> Lifetime`, or bottom as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum LifetimeDomain {
    /// Infeasible.
    Bottom,
    /// Feasible; unmapped locations are implicitly top.
    Env(HashMap<MemoryLocation, Lifetime>),
}

impl LifetimeDomain {
    /// The lifetime of `m`, top if unconstrained.
    pub fn get(&self, m: MemoryLocation) -> Lifetime {
        match self {
            Self::Bottom => Lifetime::Top,
            Self::Env(map) => map.get(&m).copied().unwrap_or(Lifetime::Top),
        }
    }

    fn with(&self, m: MemoryLocation, l: Lifetime) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Env(map) => {
                let mut map = map.clone();
                if l == Lifetime::Top {
                    map.remove(&m);
                } else {
                    map.insert(m, l);
                }
                Self::Env(map)
            }
        }
    }

    /// Mark `m` allocated (e.g. right after `Allocate`, `malloc`, `new`).
    pub fn mark_allocated(&self, m: MemoryLocation) -> Self {
        self.with(m, Lifetime::Allocated)
    }

    /// Mark `m` deallocated (`free`, `delete`). Accessing a deallocated
    /// location is a use-after-free; callers detect this by checking
    /// `get(m) == Deallocated` before the access, not through this domain
    /// alone.
    pub fn mark_deallocated(&self, m: MemoryLocation) -> Self {
        self.with(m, Lifetime::Deallocated)
    }

    /// `lifetime(memloc)`, the checker-facing read-only query (Â§6).
    pub fn lifetime(&self, m: MemoryLocation) -> Lifetime {
        self.get(m)
    }
}

impl AbstractDomain for LifetimeDomain {
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
                b.iter().all(|(k, bv)| leq(a.get(k).copied().unwrap_or(Lifetime::Top), *bv))
            }
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Env(a), Self::Env(b)) => {
                let mut out = HashMap::new();
                for (k, av) in a.iter() {
                    let bv = b.get(k).copied().unwrap_or(Lifetime::Top);
                    let joined = join(*av, bv);
                    if joined != Lifetime::Top {
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
                    let av = out.get(k).copied().unwrap_or(Lifetime::Top);
                    match meet(av, *bv) {
                        Some(Lifetime::Top) => {
                            out.remove(k);
                        }
                        Some(l) => {
                            out.insert(*k, l);
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

    fn m() -> MemoryLocation {
        MemoryLocation::FixedAddress(0x1000)
    }

    #[test]
    fn allocated_then_deallocated_tracks_last_write() {
        let d = LifetimeDomain::top().mark_allocated(m()).mark_deallocated(m());
        assert_eq!(d.lifetime(m()), Lifetime::Deallocated);
    }

    #[test]
    fn lattice_laws_hold() {
        let samples = vec![
            LifetimeDomain::top(),
            LifetimeDomain::bottom(),
            LifetimeDomain::top().mark_allocated(m()),
            LifetimeDomain::top().mark_deallocated(m()),
        ];
        crate::assert_lattice_laws!(LifetimeDomain, samples);
    }
}
