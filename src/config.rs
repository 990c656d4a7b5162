//! Analysis configuration: the fixpoint driver's tunables, grounded on the
//! teacher's `InterpreterParams` (a plain data struct with a `Default` impl,
//! constructed directly by the embedding caller — there is no config-file
//! parsing here, that remains out of scope).

/// The unknown-call policy of Â§4.9.3: what an unannotated external call is
/// assumed to do to memory it didn't obviously touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownCallPolicy {
    /// Forget (havoc) every memory location reachable from the call's
    /// pointer-typed arguments, but leave everything else untouched.
    ForgetReachableFromArguments,
    /// Forget every global variable's memory in addition to
    /// argument-reachable memory. More conservative, used when the target
    /// binary is known to use unmodeled globals (e.g. no visibility into a
    /// vendored library).
    ForgetAllGlobals,
}

impl Default for UnknownCallPolicy {
    fn default() -> Self {
        Self::ForgetReachableFromArguments
    }
}

/// Tunables for [`crate::fixpoint::driver::Driver`] (Â§4.10, Â§5). Constructed
/// directly by the embedding caller; there is no text-format parser for
/// this struct, matching `spec.md`'s explicit exclusion of a CLI/config-file
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Number of fixpoint iterations at a loop head before widening kicks
    /// in, rather than plain join (Â§4.10).
    pub widening_delay: u32,
    /// Number of narrowing iterations to run after the ascending sequence
    /// stabilizes (Â§4.10).
    pub narrowing_iterations: u32,
    /// Whether threshold-widening (widening to the nearest syntactic
    /// constant above/below, rather than straight to infinity) is enabled.
    pub threshold_widening: bool,
    /// Maximum nesting depth [`crate::domain::partitioning`] is allowed to
    /// reach before the driver forces a collapse, bounding state blowup.
    pub max_partitioning_depth: u32,
    /// What an unannotated external call is assumed to do (Â§4.9.3).
    pub unknown_call_policy: UnknownCallPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            widening_delay: 1,
            narrowing_iterations: 2,
            threshold_widening: true,
            max_partitioning_depth: 2,
            unknown_call_policy: UnknownCallPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_threshold_widening() {
        assert!(AnalysisConfig::default().threshold_widening);
    }
}
