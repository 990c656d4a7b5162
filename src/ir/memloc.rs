//! Memory locations (Â§3.6): abstract object identities, the keys of the
//! points-to set, the cell map, and the lifetime map.

use core::fmt;

use crate::ir::variable::VariableId;

/// A call-site identifier, paired with a calling-context token to
/// distinguish allocations made at the same source location under
/// different call stacks (used by [`MemoryLocation::DynAlloc`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteId(pub u32);

/// An opaque calling-context token. The front-end/driver assigns these;
/// the core only ever compares them for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallingContext(pub u32);

/// A synthetic identifier for an engine-introduced aggregate backing store
/// (Â§4.8: `Assignment` of an aggregate allocates one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateId(pub u32);

/// The kind of a vararg shadow area (Â§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaArgKind {
    /// x86_64 `reg_save_area`.
    RegSaveArea,
    /// x86_64 `overflow_arg_area`.
    OverflowArgArea,
    /// i386/i686 single stack vararg area.
    StackArea,
}

/// An abstract object identity (Â§3.6). All variants are pairwise disjoint:
/// no two distinct `MemoryLocation` values ever alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// A local (stack) variable's storage.
    Local(VariableId),
    /// A global variable's storage.
    Global(VariableId),
    /// A function's code, addressed by taking its address.
    FunctionPointer(VariableId),
    /// Dynamically allocated storage (`malloc`, `new`, ...), distinguished
    /// by call site and calling context.
    DynAlloc(CallSiteId, CallingContext),
    /// A hard-coded numeric address (e.g. from an `IntToPtr` cast of a
    /// constant).
    FixedAddress(u64),
    /// An engine-synthesized aggregate backing store.
    Aggregate(AggregateId),
    /// A vararg shadow area.
    VaArg(VaArgKind),
    /// The `errno` thread-local cell libc intrinsics write through.
    LibcErrno,
    /// The location at address zero, whose aliasing with `Null` is handled
    /// specially (Â§4.5).
    AbsoluteZero,
}

impl MemoryLocation {
    /// `true` for [`MemoryLocation::AbsoluteZero`], the one location whose
    /// nullity is re-derived from its offset rather than tracked
    /// independently (Â§4.5).
    pub fn is_absolute_zero(&self) -> bool {
        matches!(self, Self::AbsoluteZero)
    }
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(v) => write!(f, "local({v})"),
            Self::Global(v) => write!(f, "global({v})"),
            Self::FunctionPointer(v) => write!(f, "fnptr({v})"),
            Self::DynAlloc(site, ctx) => write!(f, "dynalloc(#{}, ctx={})", site.0, ctx.0),
            Self::FixedAddress(addr) => write!(f, "fixed(0x{addr:x})"),
            Self::Aggregate(id) => write!(f, "aggregate(#{})", id.0),
            Self::VaArg(kind) => write!(f, "vaarg({kind:?})"),
            Self::LibcErrno => write!(f, "errno"),
            Self::AbsoluteZero => write!(f, "absolute_zero"),
        }
    }
}

/// A memory location's lifetime state (Â§3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Currently allocated (live).
    Allocated,
    /// Has been deallocated; any further access is a use-after-free.
    Deallocated,
    /// Unknown (top): no claim either way.
    Top,
}
