//! Abstract domains (Â§3.9, Â§4.4-Â§4.7): the lattice components the engine
//! composes into the per-program-point invariant.

pub mod exception;
pub mod lattice;
pub mod lifetime;
pub mod memory;
pub mod nullity;
pub mod numeric;
pub mod partitioning;
pub mod pointer;
pub mod state;
pub mod uninit;

pub use exception::ExceptionDomain;
pub use lattice::AbstractDomain;
pub use lifetime::LifetimeDomain;
pub use memory::{
    CellKey,
    MemoryDomain,
};
pub use nullity::{
    Nullity,
    NullityDomain,
};
pub use numeric::{
    NumericDomain,
    NumericValue,
};
pub use partitioning::{
    PartitionKey,
    Partitioning,
};
pub use pointer::{
    PointerDomain,
    PointerEntry,
    PointsToSet,
};
pub use state::{
    entry_invariant,
    Invariant,
    PartitionedState,
    UnderlyingState,
};
pub use uninit::{
    Init,
    UninitDomain,
};
