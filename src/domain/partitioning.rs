//! The partitioning mechanism (Â§4.10 point 6, Â§5.6): on-demand path
//! sensitivity by keeping several disjoint underlying states per program
//! point, keyed by the value of a user-designated variable.

use im::HashMap;

use crate::{
    domain::lattice::AbstractDomain,
    ir::variable::VariableId,
};

/// A partition key: the concrete value (or "other") a partitioned variable
/// takes on one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartitionKey {
    /// The partitioned variable equals this concrete value.
    Value(i128),
    /// Every value not otherwise enumerated.
    Other,
}

/// Either a single underlying state, or several states keyed by the value
/// of a designated partitioning variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Partitioning<S> {
    /// No partitioning in effect.
    Flat(S),
    /// Partitioned on `var`, one state per observed value.
    Partitioned {
        /// Which variable the partition keys are values of.
        var: VariableId,
        /// One underlying state per key.
        branches: HashMap<PartitionKey, S>,
    },
}

impl<S: AbstractDomain> Partitioning<S> {
    /// Start partitioning by `var`, seeding the single `Other` branch with
    /// the current flat state (`ikos.partitioning.var(v)`).
    pub fn partition_by(&self, var: VariableId) -> Self {
        match self {
            Self::Flat(s) => {
                let mut branches = HashMap::new();
                branches.insert(PartitionKey::Other, s.clone());
                Self::Partitioned {
                    var,
                    branches,
                }
            }
            already @ Self::Partitioned { .. } => already.clone(),
        }
    }

    /// Collapse back into a single flat state, joining every branch
    /// (`ikos.partitioning.join()`).
    pub fn collapse(&self) -> Self {
        match self {
            Self::Flat(s) => Self::Flat(s.clone()),
            Self::Partitioned { branches, .. } => {
                let joined = branches
                    .values()
                    .fold(S::bottom(), |acc, s| acc.join(s));
                Self::Flat(joined)
            }
        }
    }

    /// Split the `Other` branch off a concrete value discovered by a
    /// comparison against `var`, narrowing that branch's state with
    /// `refine`.
    pub fn split(&self, key: PartitionKey, refine: impl Fn(&S) -> S) -> Self {
        match self {
            Self::Flat(s) => Self::Flat(refine(s)),
            Self::Partitioned { var, branches } => {
                let mut branches = branches.clone();
                let base = branches
                    .get(&PartitionKey::Other)
                    .cloned()
                    .unwrap_or_else(S::bottom);
                let existing = branches.get(&key).cloned().unwrap_or_else(S::bottom);
                branches.insert(key, existing.join(&refine(&base)));
                Self::Partitioned {
                    var: *var,
                    branches,
                }
            }
        }
    }

    /// The state visible to a read-only query: the join over all branches.
    pub fn flatten(&self) -> S {
        match self {
            Self::Flat(s) => s.clone(),
            Self::Partitioned { branches, .. } => {
                branches.values().fold(S::bottom(), |acc, s| acc.join(s))
            }
        }
    }

    /// Apply a per-branch transfer function, keeping the partition shape
    /// intact. Used by the engine to run one instruction's semantics
    /// across every live branch independently.
    pub fn map(&self, f: impl Fn(&S) -> S) -> Self {
        match self {
            Self::Flat(s) => Self::Flat(f(s)),
            Self::Partitioned { var, branches } => Self::Partitioned {
                var: *var,
                branches: branches.iter().map(|(k, s)| (*k, f(s))).collect(),
            },
        }
    }

    /// Like [`Self::map`], but `f` may fail; the first error aborts the
    /// whole partition rather than leaving some branches transformed and
    /// others not (the engine's call-handling transfer functions can
    /// report an [`crate::error::AnalysisError`]).
    pub fn try_map<E>(&self, f: impl Fn(&S) -> Result<S, E>) -> Result<Self, E> {
        match self {
            Self::Flat(s) => Ok(Self::Flat(f(s)?)),
            Self::Partitioned { var, branches } => {
                let mut out = HashMap::new();
                for (k, s) in branches.iter() {
                    out.insert(*k, f(s)?);
                }
                Ok(Self::Partitioned { var: *var, branches: out })
            }
        }
    }
}

impl<S: AbstractDomain> AbstractDomain for Partitioning<S> {
    fn top() -> Self {
        Self::Flat(S::top())
    }

    fn bottom() -> Self {
        Self::Flat(S::bottom())
    }

    fn is_bottom(&self) -> bool {
        match self {
            Self::Flat(s) => s.is_bottom(),
            Self::Partitioned { branches, .. } => branches.values().all(|s| s.is_bottom()),
        }
    }

    fn leq(&self, other: &Self) -> bool {
        self.flatten().leq(&other.flatten())
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (
                Self::Partitioned { var: v1, branches: b1 },
                Self::Partitioned { var: v2, branches: b2 },
            ) if v1 == v2 => {
                let mut out = b1.clone();
                for (k, s2) in b2.iter() {
                    let merged = out.get(k).map(|s1| s1.join(s2)).unwrap_or_else(|| s2.clone());
                    out.insert(*k, merged);
                }
                Self::Partitioned {
                    var: *v1,
                    branches: out,
                }
            }
            _ => Self::Flat(self.flatten().join(&other.flatten())),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self::Flat(self.flatten().meet(&other.flatten()))
    }

    fn widen(&self, other: &Self) -> Self {
        match (self, other) {
            (
                Self::Partitioned { var: v1, branches: b1 },
                Self::Partitioned { var: v2, branches: b2 },
            ) if v1 == v2 => {
                let mut out = HashMap::new();
                for (k, s1) in b1.iter() {
                    let s2 = b2.get(k).cloned().unwrap_or_else(S::bottom);
                    out.insert(*k, s1.widen(&s2));
                }
                Self::Partitioned {
                    var: *v1,
                    branches: out,
                }
            }
            _ => Self::Flat(self.flatten().widen(&other.flatten())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::nullity::NullityDomain;

    fn v(n: u32) -> VariableId {
        VariableId::from_raw(n)
    }

    #[test]
    fn partition_then_collapse_rejoins_branches() {
        let flat: Partitioning<NullityDomain> = Partitioning::Flat(NullityDomain::top());
        let partitioned = flat.partition_by(v(0));
        let collapsed = partitioned.collapse();
        assert!(matches!(collapsed, Partitioning::Flat(_)));
    }
}
