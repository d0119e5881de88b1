//! Configuration options for pools and sandboxes.

use std::time::Duration;

use crate::parser::DEFAULT_MAX_DEPTH;

/// Invocation-scoped resource budgets.
///
/// Both budgets are counted per invocation and reset when an evaluator is
/// reused.
///
/// # Example
///
/// ```
/// use quill_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions {
///     max_iterations: 1_000,
///     ..ExecutionOptions::default()
/// };
/// assert_eq!(options.max_calls, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Maximum number of `while` body executions, shared by every loop in
    /// the program.
    ///
    /// Default: 100
    pub max_iterations: usize,

    /// Maximum number of calls to each protected function. A capability's
    /// own limit takes precedence.
    ///
    /// Default: 3
    pub max_calls: usize,

    /// Maximum nesting depth accepted by the parser. Operator chains count
    /// one level per operator. Evaluation recurses once per level, so large
    /// values need a correspondingly large thread stack.
    ///
    /// Default: 64
    pub max_depth: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_calls: 3,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Options for [`crate::pool::Pool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Number of evaluator instances, i.e. the maximum number of invocations
    /// in flight.
    ///
    /// Default: 10
    pub size: usize,

    pub execution: ExecutionOptions,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: 10,
            execution: ExecutionOptions::default(),
        }
    }
}

/// Options for [`crate::api::Sandbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOptions {
    pub pool: PoolOptions,

    /// Wall-clock limit for one invocation, measured from the moment the
    /// caller starts waiting for an instance.
    ///
    /// Default: 5 seconds
    pub timeout: Duration,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            pool: PoolOptions::default(),
            timeout: Duration::from_secs(5),
        }
    }
}
