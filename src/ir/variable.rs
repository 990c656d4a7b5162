//! Variables (Â§3.7): typed, named handles the numeric/pointer/nullity/
//! uninit/lifetime domains key their maps by.

use core::fmt;

use crate::ir::types::Ty;

/// An interned variable handle. Cheap to copy, compared by identity;
/// [`crate::context::AnalysisContext`] owns the mapping back to
/// [`VariableData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableId(pub(crate) u32);

impl VariableId {
    /// Construct from a raw index. Only [`crate::context::AnalysisContext`]
    /// should call this; exposed `pub(crate)` for its interner.
    pub(crate) fn from_raw(idx: u32) -> Self {
        Self(idx)
    }

    /// The raw interning index, useful as a map key in contexts that cannot
    /// depend on [`VariableId`]'s `Hash` impl (e.g. cross-crate FFI).
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%v{}", self.0)
    }
}

/// What introduced a variable, kept for diagnostics and for the engine's
/// shadow-variable bookkeeping (Â§3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableOrigin {
    /// A user-visible variable from the AR source.
    Source,
    /// An SSA temporary introduced by the front-end.
    SsaTemporary,
    /// A shadow variable synthesized by the engine itself: parameter
    /// passing, pointer offsets, allocation sizes, partitioning tokens.
    Shadow(ShadowKind),
}

/// The specific reason the engine synthesized a shadow variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowKind {
    /// Tracks the byte offset of a pointer variable.
    PointerOffset,
    /// Tracks the allocated size of a memory location.
    AllocationSize,
    /// Holds a vararg/parameter-passing shadow cell.
    ParameterPassing,
    /// The counter variable a partitioning element is keyed by.
    PartitioningToken,
}

/// The interned data behind a [`VariableId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableData {
    /// Declared type, classifying this variable for dispatch.
    pub ty: Ty,
    /// Where this variable came from.
    pub origin: VariableOrigin,
}

impl VariableData {
    /// Construct variable data for a user-visible source variable.
    pub fn source(ty: Ty) -> Self {
        Self {
            ty,
            origin: VariableOrigin::Source,
        }
    }

    /// Construct variable data for an engine-synthesized shadow variable.
    pub fn shadow(ty: Ty, kind: ShadowKind) -> Self {
        Self {
            ty,
            origin: VariableOrigin::Shadow(kind),
        }
    }
}
