//! The abstract-semantic execution engine (§4.8-4.9): transfer functions
//! from one [`crate::ir::instruction::Instruction`] to the next, plus call
//! handling and the exception-control instructions that operate above a
//! bare [`crate::domain::state::UnderlyingState`].

pub mod call;
pub mod transfer;

pub use call::{
    CallTarget,
    FunctionSignature,
    Intrinsic,
};
pub use transfer::Engine;
