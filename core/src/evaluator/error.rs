//! Runtime evaluation errors.
//!
//! # Error Categories
//!
//! - **Protection errors**: an invocation-scoped resource budget was exceeded
//!   (loop iterations, protected calls). Hosts react to these uniformly, e.g.
//!   by retracting side effects already produced by the invocation.
//!
//! - **Capability errors**: a protected host function ran and failed.
//!
//! - **Runtime errors**: everything else (undefined names, bad indices,
//!   division by zero), propagated as-is from the failing operation.

use thiserror::Error;

use crate::host::CapabilityError;

/// Evaluation error. Any error aborts the whole program.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Protection(#[from] ProtectionError),

    #[error("capability '{capability}' failed: {source}")]
    Capability {
        capability: String,
        #[source]
        source: CapabilityError,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Resource budget exceeded. Carries the limit that was configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtectionError {
    /// Too many `while` body executions in one invocation, across all loops.
    #[error("loop protection: more than {limit} loop iterations")]
    Loop { limit: usize },

    /// Too many calls to one protected function in one invocation.
    #[error("call protection: '{function}' called more than {limit} times")]
    Call { function: String, limit: usize },
}

impl ProtectionError {
    pub fn limit(&self) -> usize {
        match self {
            ProtectionError::Loop { limit } | ProtectionError::Call { limit, .. } => *limit,
        }
    }
}

/// Unclassified execution failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("name '{name}' is not defined")]
    UndefinedVariable { name: String },

    #[error("{type_name} has no attribute '{attribute}'")]
    AttributeNotFound {
        type_name: &'static str,
        attribute: String,
    },

    #[error("cannot set attribute '{attribute}' on {type_name}")]
    AttributeAssignment {
        type_name: &'static str,
        attribute: String,
    },

    #[error("index {index} out of bounds (length: {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("key '{key}' not found")]
    KeyNotFound { key: String },

    #[error("{type_name} is not subscriptable")]
    NotSubscriptable { type_name: &'static str },

    #[error("{container} indices must be {expected}, not {found}")]
    InvalidIndex {
        container: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unsupported operand types for {op}: {left} and {right}")]
    UnsupportedOperand {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {op}")]
    Overflow { op: &'static str },

    #[error("value too large: size {size} exceeds the limit of {limit}")]
    ValueTooLarge { size: usize, limit: usize },

    #[error("{type_name} is not callable")]
    NotCallable { type_name: &'static str },

    #[error("cannot assign to {target}")]
    InvalidAssignmentTarget { target: String },

    #[error("{function}(): {message}")]
    InvalidArgument { function: String, message: String },

    #[error("{function}() missing required argument '{parameter}'")]
    MissingArgument { function: String, parameter: String },

    #[error("capability '{name}' is not registered with this pool")]
    UnknownCapability { name: String },
}

impl ExecutionError {
    pub fn is_protection(&self) -> bool {
        matches!(self, ExecutionError::Protection(_))
    }

    pub fn protection(&self) -> Option<&ProtectionError> {
        match self {
            ExecutionError::Protection(e) => Some(e),
            _ => None,
        }
    }
}
