//! Abstract-interpretation core for a typed SSA intermediate representation:
//! a reduced product of numeric, pointer, nullity, uninitialized-value, and
//! lifetime domains, run to a fixpoint over a function's control-flow graph
//! in weak topological order, with exceptions, calls, and on-demand
//! partitioning layered on top.
//!
//! The core is a library, not a driver program: it consumes an AR bundle
//! built by a front-end ([`ir`]), computes invariants ([`fixpoint`]), and
//! exposes them for a checker layer to query ([`checker`]). It has no file
//! format, wire protocol, or CLI of its own.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

#[doc(hidden)]
pub extern crate alloc;

extern crate core;

pub mod checker;
pub mod config;
pub mod context;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fixpoint;
pub mod ir;
pub mod num;
pub mod pointer_info;

/// Common imports for embedding this crate: the composed state types, the
/// engine, the fixpoint driver, and the checker-facing query API.
pub mod prelude {
    #[doc(no_inline)]
    pub use crate::{
        checker::{
            Checker,
            NullWarning,
            TracingWarning,
            Warning,
            WarningKind,
        },
        config::{
            AnalysisConfig,
            UnknownCallPolicy,
        },
        context::AnalysisContext,
        domain::{
            lattice::AbstractDomain,
            state::{
                entry_invariant,
                Invariant,
                PartitionedState,
                UnderlyingState,
            },
        },
        engine::{
            CallTarget,
            Engine,
            FunctionSignature,
            Intrinsic,
        },
        error::{
            AnalysisError,
            AnalysisResult,
            AnalyzerBug,
            TypeError,
        },
        fixpoint::{
            AlwaysUnknown,
            Budget,
            CallResolver,
            Driver,
            StepBudget,
            Unbounded,
        },
        ir::{
            Block,
            BlockId,
            Cfg,
            CfgBuilder,
            Function,
            Instruction,
        },
        pointer_info::{
            NoPointerInfo,
            PointerInfo,
        },
    };
}
