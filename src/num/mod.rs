//! Numeric abstractions: machine-integer algebra and the lattices built on
//! top of it (bounds, intervals, congruences, gauges). Pure, allocation-light
//! math with no notion of an AR variable or program point; [`crate::domain`]
//! wires these into maps keyed by variable.

pub mod bound;
pub mod congruence;
pub mod gauge;
pub mod interval;
pub mod machine_int;

pub use bound::Bound;
pub use congruence::Congruence;
pub use gauge::{
    CounterId,
    Gauge,
    GaugeBound,
};
pub use interval::{
    Interval,
    MachineIntInterval,
};
pub use machine_int::{
    MachineInt,
    MachineIntError,
    Sign,
};
