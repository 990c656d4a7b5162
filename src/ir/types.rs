//! Typed data layout (Â§6, "toward the front-end"): the front-end hands the
//! core typed functions, variables and constants over this type system.

use alloc::boxed::Box;

use crate::num::Sign;

/// The type of an AR value. Classifies every [`crate::ir::variable::Variable`]
/// into exactly one of these buckets, which the engine's transfer functions
/// dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ty {
    /// A fixed-width integer, signed or unsigned.
    MachineInt {
        /// Bit width, `1..=64`.
        bit_width: u32,
        /// Signedness.
        sign: Sign,
    },
    /// A floating-point value. The engine never tracks its value precisely
    /// (Â§4.8: "havoc for FP"), only whether it is initialized.
    FloatingPoint {
        /// Bit width, typically 32 or 64.
        bit_width: u32,
    },
    /// A pointer to another typed value.
    Pointer {
        /// The pointee type, if statically known (opaque/void pointers have
        /// none).
        pointee: Option<Box<Ty>>,
    },
    /// A fixed-size aggregate (struct, array, or vector register).
    Aggregate {
        /// Total size in bytes, as laid out by the front-end.
        size_bytes: u64,
        /// Required alignment in bytes.
        align_bytes: u64,
    },
}

impl Ty {
    /// A plain opaque pointer (`void*`-like).
    pub fn opaque_pointer() -> Self {
        Self::Pointer { pointee: None }
    }

    /// `true` for [`Ty::MachineInt`] and [`Ty::Pointer`], the two kinds the
    /// numeric/pointer domains track precisely.
    pub fn is_scalar_tracked(&self) -> bool {
        matches!(self, Self::MachineInt { .. } | Self::Pointer { .. })
    }

    /// Byte size of this type under `layout`, used to compute `Allocate`
    /// sizes and cell offsets.
    pub fn size_bytes(&self, layout: &DataLayout) -> u64 {
        match self {
            Self::MachineInt { bit_width, .. } => (*bit_width as u64).div_ceil(8),
            Self::FloatingPoint { bit_width } => (*bit_width as u64).div_ceil(8),
            Self::Pointer { .. } => layout.pointer_width_bytes as u64,
            Self::Aggregate { size_bytes, .. } => *size_bytes,
        }
    }
}

/// The data layout a front-end bundle carries: pointer width and per-type
/// alignment, as required by Â§6's front-end interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLayout {
    /// Pointer width in bytes (4 for i386/i686, 8 for x86_64).
    pub pointer_width_bytes: u32,
    /// Target architecture, which selects the vararg-passing scheme of
    /// Â§4.9.
    pub target: TargetArch,
}

impl DataLayout {
    /// The x86_64 System V layout: 8-byte pointers, `reg_save_area` vararg
    /// scheme.
    pub fn x86_64() -> Self {
        Self {
            pointer_width_bytes: 8,
            target: TargetArch::X86_64,
        }
    }

    /// The i386/i686 layout: 4-byte pointers, single stack vararg area.
    pub fn i386() -> Self {
        Self {
            pointer_width_bytes: 4,
            target: TargetArch::I386,
        }
    }
}

/// Target architecture, selecting the vararg-passing convention of Â§4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArch {
    /// `reg_save_area` / `overflow_arg_area` scheme.
    X86_64,
    /// Single stack area scheme.
    I386,
}
