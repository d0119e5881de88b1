//! Public API for running Quill scripts.
//!
//! A [`Sandbox`] is what a host normally talks to. It owns a bounded
//! [`Pool`](crate::pool::Pool) of evaluators and, for each submitted script,
//! strips chat code fences, parses, runs under a wall-clock limit, and asks
//! the host [`Context`](crate::host::Context) to compensate when the script
//! trips a protection budget.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use quill_core::api::{Sandbox, SandboxOptions};
//! use quill_core::values::Value;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let sandbox: Sandbox<()> = Sandbox::with_stdlib(vec![], SandboxOptions::default());
//! let value = sandbox.run(Arc::new(()), "```\nsum([1, 2, 3])\n```").await.unwrap();
//! assert_eq!(value, Value::Int(6));
//! # });
//! ```

pub mod error;
pub mod options;
pub mod sandbox;

pub use error::{Diagnostic, Error, Severity};
pub use options::{ExecutionOptions, PoolOptions, SandboxOptions};
pub use sandbox::{Sandbox, strip_code_fence};
