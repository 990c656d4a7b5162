//! Analyzer-facing errors (§7): a three-way split mirroring the teacher's
//! `RuntimeError`/`InterpreterError` distinction. `Bottom` is not a variant
//! here — it is an ordinary lattice value
//! ([`crate::domain::lattice::AbstractDomain::bottom`]), not a failure; only
//! the two cases where the engine cannot even compute a sound abstract
//! transformer are represented as errors.

use core::fmt;

use crate::ir::variable::VariableId;

/// An invariant the engine itself depends on was violated: malformed AR, a
/// front-end contract broken, or a fixpoint that failed to converge. Never
/// attributable to the analyzed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum AnalyzerBug {
    /// A [`crate::ir::cfg::Cfg`] was built with no blocks.
    #[cfg_attr(feature = "std", error("CFG has no entry block"))]
    EmptyCfg,
    /// A [`VariableId`] was used that the context never interned.
    #[cfg_attr(feature = "std", error("variable {0} referenced before being interned"))]
    UnknownVariable(VariableId),
    /// The fixpoint driver exhausted its configured iteration budget
    /// without reaching a stable invariant (§5's budget hook).
    #[cfg_attr(feature = "std", error("fixpoint did not converge within the configured iteration budget"))]
    FixpointBudgetExceeded,
    /// An `Invoke`-style call carries an exception edge but the CFG has no
    /// designated exception-resume block.
    #[cfg_attr(feature = "std", error("call has an exception edge but the CFG has no exception-resume block"))]
    MissingExceptionResumeBlock,
    /// An intrinsic that produces a value (`malloc`, `strlen`, ...) was
    /// called with no destination variable.
    #[cfg_attr(feature = "std", error("intrinsic requires a destination variable but none was given"))]
    MissingCallResult,
    /// A call-handling intrinsic was invoked with fewer arguments than it
    /// requires.
    #[cfg_attr(feature = "std", error("intrinsic called with too few arguments"))]
    MissingCallArgument,
}

#[cfg(not(feature = "std"))]
impl fmt::Display for AnalyzerBug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCfg => write!(f, "CFG has no entry block"),
            Self::UnknownVariable(v) => write!(f, "variable {v} referenced before being interned"),
            Self::FixpointBudgetExceeded => {
                write!(f, "fixpoint did not converge within the configured iteration budget")
            }
            Self::MissingExceptionResumeBlock => {
                write!(f, "call has an exception edge but the CFG has no exception-resume block")
            }
            Self::MissingCallResult => {
                write!(f, "intrinsic requires a destination variable but none was given")
            }
            Self::MissingCallArgument => write!(f, "intrinsic called with too few arguments"),
        }
    }
}

/// The AR is not well-typed at the point the engine is analyzing: an
/// operand's tracked type doesn't match what the instruction requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum TypeError {
    /// A scalar operand wasn't the kind of reference the instruction needed
    /// (e.g. a pointer instruction given a float-typed operand).
    #[cfg_attr(feature = "std", error("operand is not of the expected kind"))]
    OperandKindMismatch,
    /// Two operands of a binary/comparison instruction have machine-integer
    /// types of different bit width or sign.
    #[cfg_attr(feature = "std", error("binary operands have mismatched machine-integer types"))]
    BinaryOperandTypeMismatch,
    /// A call site passed a different number of arguments than the known
    /// callee's signature declares.
    #[cfg_attr(feature = "std", error("call site arity does not match the callee's signature"))]
    CallArityMismatch,
    /// A call site's actual argument has a different sign than the
    /// matching formal parameter (Â§4.9.1's match-down check).
    #[cfg_attr(feature = "std", error("call argument sign does not match the formal parameter"))]
    CallArgumentTypeMismatch,
}

#[cfg(not(feature = "std"))]
impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperandKindMismatch => write!(f, "operand is not of the expected kind"),
            Self::BinaryOperandTypeMismatch => {
                write!(f, "binary operands have mismatched machine-integer types")
            }
            Self::CallArityMismatch => write!(f, "call site arity does not match the callee's signature"),
            Self::CallArgumentTypeMismatch => {
                write!(f, "call argument sign does not match the formal parameter")
            }
        }
    }
}

/// The top-level fatal error type every core entry point's `Result` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum AnalysisError {
    /// See [`AnalyzerBug`].
    #[display(fmt = "analyzer bug: {_0}")]
    AnalyzerBug(AnalyzerBug),
    /// See [`TypeError`].
    #[display(fmt = "type error: {_0}")]
    TypeError(TypeError),
}

impl From<AnalyzerBug> for AnalysisError {
    fn from(e: AnalyzerBug) -> Self {
        Self::AnalyzerBug(e)
    }
}

impl From<TypeError> for AnalysisError {
    fn from(e: TypeError) -> Self {
        Self::TypeError(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AnalysisError {}

/// Shorthand for the `Result` every fallible core entry point returns.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
