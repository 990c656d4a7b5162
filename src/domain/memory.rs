//! The cell-based memory domain (Â§4.6): `(base, offset, size) -> scalar`.

use alloc::vec::Vec;

use im::HashMap;

use crate::{
    domain::lattice::AbstractDomain,
    ir::{
        literal::Scalar,
        memloc::MemoryLocation,
    },
};

/// A cell key: a concrete byte range within a memory location. Per Â§4.6,
/// offsets and sizes are concrete machine integers even though the set of
/// cells for a base may be empty, a singleton, or a small disjoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    /// The memory location this cell belongs to.
    pub base: MemoryLocation,
    /// Byte offset within `base`.
    pub offset: i128,
    /// Size in bytes of this cell.
    pub size: u64,
}

impl CellKey {
    /// A new cell key.
    pub fn new(base: MemoryLocation, offset: i128, size: u64) -> Self {
        Self { base, offset, size }
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.base == other.base
            && self.offset < other.offset + other.size as i128
            && other.offset < self.offset + self.size as i128
    }

    /// `0 <= offset && offset + size <= alloc_size`, the Â§4.6 invariant a
    /// write must satisfy or the state goes to bottom.
    pub fn within_bounds(&self, alloc_size: i128) -> bool {
        self.offset >= 0 && self.offset + self.size as i128 <= alloc_size
    }
}

/// `CellKey -> Scalar`, or bottom as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryDomain {
    /// Infeasible (e.g. a write proved to violate the bounds invariant).
    Bottom,
    /// Feasible; unmapped cells are implicitly top (unknown contents).
    Cells(HashMap<CellKey, Scalar>),
}

impl MemoryDomain {
    /// `mem_read`: the join of every cell overlapping `(base, offset,
    /// size)`. Returns `None` (meaning top) when no single concrete cell
    /// covers the whole access precisely, per Â§4.6's "falls back to
    /// summarizing a region" note.
    pub fn mem_read(&self, base: MemoryLocation, offset: i128, size: u64) -> Option<Scalar> {
        let Self::Cells(cells) = self else {
            return None;
        };
        let key = CellKey::new(base, offset, size);
        let mut exact = None;
        for (k, v) in cells.iter() {
            if *k == key {
                exact = Some(v.clone());
            } else if k.overlaps(&key) {
                return None;
            }
        }
        exact
    }

    /// `mem_write`: strong update when `(base, offset, size)` is a
    /// precise, currently-unique cell (the caller establishes that from
    /// `addrs(ptr)` being a singleton); weak update (join with any prior
    /// value) otherwise. Goes to bottom if the write violates the bounds
    /// invariant.
    pub fn mem_write(
        &self,
        base: MemoryLocation,
        offset: i128,
        size: u64,
        value: Scalar,
        alloc_size: i128,
        strong: bool,
    ) -> Self {
        let key = CellKey::new(base, offset, size);
        if !key.within_bounds(alloc_size) {
            return Self::Bottom;
        }
        match self {
            Self::Bottom => Self::Bottom,
            Self::Cells(cells) => {
                let mut cells = cells.clone();
                // Any cell overlapping but not identical becomes
                // unknown (top, i.e. removed) since its exact contents can
                // no longer be named precisely.
                let overlapping: Vec<CellKey> = cells
                    .keys()
                    .filter(|k| **k != key && k.overlaps(&key))
                    .copied()
                    .collect();
                for k in overlapping {
                    cells.remove(&k);
                }
                let new_value = if strong {
                    value
                } else {
                    match cells.get(&key) {
                        Some(prior) if *prior == value => value,
                        Some(_) => return Self::top_preserving(cells, key),
                        None => value,
                    }
                };
                cells.insert(key, new_value);
                Self::Cells(cells)
            }
        }
    }

    fn top_preserving(mut cells: HashMap<CellKey, Scalar>, key: CellKey) -> Self {
        cells.remove(&key);
        Self::Cells(cells)
    }

    /// `mem_copy(dst, src, size)`: read then write under a single offset
    /// expression.
    pub fn mem_copy(
        &self,
        dst: MemoryLocation,
        dst_offset: i128,
        src: MemoryLocation,
        src_offset: i128,
        size: u64,
        dst_alloc_size: i128,
        strong: bool,
    ) -> Self {
        match self.mem_read(src, src_offset, size) {
            Some(v) => self.mem_write(dst, dst_offset, size, v, dst_alloc_size, strong),
            None => self.mem_forget_range(dst, dst_offset, size),
        }
    }

    /// `mem_set(dst, byte, size)`: write the same byte-wide value across
    /// `size` bytes.
    pub fn mem_set(
        &self,
        dst: MemoryLocation,
        dst_offset: i128,
        byte: Scalar,
        size: u64,
        dst_alloc_size: i128,
        strong: bool,
    ) -> Self {
        self.mem_write(dst, dst_offset, size, byte, dst_alloc_size, strong)
    }

    /// `mem_zero_reachable(ptr)`: replace every cell at `base` by a zero
    /// scalar.
    pub fn mem_zero_reachable(&self, base: MemoryLocation) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Cells(cells) => {
                let mut cells = cells.clone();
                let keys: Vec<CellKey> =
                    cells.keys().filter(|k| k.base == base).copied().collect();
                for k in keys {
                    cells.insert(k, Scalar::MachineInt(crate::num::MachineInt::zero(8, crate::num::Sign::Unsigned)));
                }
                Self::Cells(cells)
            }
        }
    }

    /// `mem_uninitialize_reachable(ptr)`: forget every cell at `base`
    /// (the uninitialized domain, not this one, records the Uninit mark
    /// proper; here we just drop the now-stale contents).
    pub fn mem_uninitialize_reachable(&self, base: MemoryLocation) -> Self {
        self.mem_forget_base(base)
    }

    /// `mem_forget_reachable(ptr, size?)`: remove cells (over-approximate
    /// to top).
    pub fn mem_forget_reachable(&self, base: MemoryLocation, range: Option<(i128, u64)>) -> Self {
        match range {
            Some((offset, size)) => self.mem_forget_range(base, offset, size),
            None => self.mem_forget_base(base),
        }
    }

    fn mem_forget_range(&self, base: MemoryLocation, offset: i128, size: u64) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Cells(cells) => {
                let key = CellKey::new(base, offset, size);
                let mut cells = cells.clone();
                let overlapping: Vec<CellKey> =
                    cells.keys().filter(|k| k.overlaps(&key)).copied().collect();
                for k in overlapping {
                    cells.remove(&k);
                }
                Self::Cells(cells)
            }
        }
    }

    fn mem_forget_base(&self, base: MemoryLocation) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Cells(cells) => {
                let mut cells = cells.clone();
                let keys: Vec<CellKey> =
                    cells.keys().filter(|k| k.base == base).copied().collect();
                for k in keys {
                    cells.remove(&k);
                }
                Self::Cells(cells)
            }
        }
    }

    /// `mem_abstract_reachable(ptr, size?)`: keep lifetimes (handled by
    /// [`crate::domain::lifetime`]) but forget values, identical to
    /// [`Self::mem_forget_reachable`] at this domain's level.
    pub fn mem_abstract_reachable(&self, base: MemoryLocation, range: Option<(i128, u64)>) -> Self {
        self.mem_forget_reachable(base, range)
    }
}

impl AbstractDomain for MemoryDomain {
    fn top() -> Self {
        Self::Cells(HashMap::new())
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
            (Self::Cells(a), Self::Cells(b)) => {
                b.iter().all(|(k, v)| a.get(k) == Some(v))
            }
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Cells(a), Self::Cells(b)) => {
                let mut out = HashMap::new();
                for (k, av) in a.iter() {
                    if let Some(bv) = b.get(k) {
                        if av == bv {
                            out.insert(*k, av.clone());
                        }
                    }
                }
                Self::Cells(out)
            }
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Cells(a), Self::Cells(b)) => {
                let mut out = a.clone();
                for (k, bv) in b.iter() {
                    match out.get(k) {
                        Some(av) if av != bv => return Self::Bottom,
                        _ => {
                            out.insert(*k, bv.clone());
                        }
                    }
                }
                Self::Cells(out)
            }
        }
    }

    fn widen(&self, other: &Self) -> Self {
        // The cell set for a single function is bounded by its static
        // allocation sites, so join already terminates.
        self.join(other)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::{
        MachineInt,
        Sign,
    };

    fn m() -> MemoryLocation {
        MemoryLocation::FixedAddress(0x10)
    }

    fn scalar(n: i128) -> Scalar {
        Scalar::MachineInt(MachineInt::new(n, 32, Sign::Signed))
    }

    #[test]
    fn strong_write_then_read_roundtrips() {
        let d = MemoryDomain::top().mem_write(m(), 0, 4, scalar(7), 16, true);
        assert_eq!(d.mem_read(m(), 0, 4), Some(scalar(7)));
    }

    #[test]
    fn out_of_bounds_write_is_bottom() {
        let d = MemoryDomain::top().mem_write(m(), 20, 4, scalar(7), 16, true);
        assert!(d.is_bottom());
    }

    #[test]
    fn weak_write_with_differing_value_drops_precision() {
        let d = MemoryDomain::top().mem_write(m(), 0, 4, scalar(1), 16, true);
        let d = d.mem_write(m(), 0, 4, scalar(2), 16, false);
        assert_eq!(d.mem_read(m(), 0, 4), None);
    }

    #[test]
    fn forget_reachable_drops_all_cells_at_base() {
        let d = MemoryDomain::top().mem_write(m(), 0, 4, scalar(1), 16, true);
        let d = d.mem_forget_reachable(m(), None);
        assert_eq!(d.mem_read(m(), 0, 4), None);
    }
}
