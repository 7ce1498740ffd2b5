//! Evaluation limits.

use ember_stack::{DEFAULT_MAX_DEPTH, DEFAULT_RED_ZONE};

/// Limits applied to every evaluation of a runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvalConfig {
    /// Nested script-level calls allowed before the evaluation aborts.
    pub max_call_depth: usize,
    /// Iterations a single loop may run; zero means unlimited.
    pub max_loop_iterations: usize,
    /// Native stack, in bytes, that must remain before recursing further.
    pub stack_red_zone: usize,
    /// Wall-clock budget per top-level evaluation, measured by the host clock.
    pub time_budget_ms: Option<u64>,
}

impl EvalConfig {
    pub const DEFAULT_LOOP_ITERATIONS: usize = 8192;
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_call_depth: DEFAULT_MAX_DEPTH,
            max_loop_iterations: Self::DEFAULT_LOOP_ITERATIONS,
            stack_red_zone: DEFAULT_RED_ZONE,
            time_budget_ms: None,
        }
    }
}
