//! Tree-walking evaluator for Quill programs.
//!
//! The evaluator walks the AST produced by [`crate::parser`] against a
//! per-invocation [`Scope`] and enforces the protection budgets from
//! [`crate::api::ExecutionOptions`].
//!
//! ## Design Principles
//!
//! - **Never panic**: malformed or adversarial scripts end in an error
//! - **Bounded**: loops and protected calls are budgeted per invocation
//! - **Suspends only at capabilities**: pure evaluation never awaits anything
//!   but a protected host function's future
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use quill_core::api::ExecutionOptions;
//! use quill_core::evaluator::{Evaluator, bind_capabilities};
//! use quill_core::host::Capability;
//! use quill_core::{parser, scope::Scope, values::Value};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let capabilities: Arc<[Capability<()>]> = Arc::from(Vec::new());
//! let base = Arc::new(bind_capabilities(Scope::new(), &capabilities));
//! let mut evaluator = Evaluator::new(base, capabilities, ExecutionOptions::default());
//!
//! let program = parser::parse("x = 1 + 2 * 3").unwrap();
//! evaluator.run(&Arc::new(()), &program).await.unwrap();
//! assert_eq!(evaluator.scope().get("x"), Some(&Value::Int(7)));
//! # });
//! ```

mod error;
mod eval;
pub(crate) mod operators;

#[cfg(test)]
mod eval_test;

pub use error::{ExecutionError, ProtectionError, RuntimeError};
pub use eval::Evaluator;

use crate::host::Capability;
use crate::scope::Scope;
use crate::values::{CapabilityRef, Value};

/// Bind every capability into `scope` under its name, so scripts can call it
/// like any other function.
pub fn bind_capabilities<C: Send + Sync + 'static>(
    mut scope: Scope,
    capabilities: &[Capability<C>],
) -> Scope {
    for (index, capability) in capabilities.iter().enumerate() {
        scope.set(
            capability.name(),
            Value::Capability(CapabilityRef {
                index,
                name: capability.shared_name(),
            }),
        );
    }
    scope
}

