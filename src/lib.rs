//! Quill - a tiny sandboxed scripting language for chat bots
//!
//! # Overview
//!
//! Quill runs short scripts submitted by untrusted users (typically pasted
//! into a chat message) against a fixed set of host functions. Scripts can
//! branch, loop, index containers, and call host-provided *capabilities*,
//! but every invocation is held to hard budgets:
//!
//! - at most 100 `while` iterations per invocation (shared by all loops)
//! - at most 3 calls to each capability per invocation
//! - a wall-clock timeout (5 seconds by default)
//!
//! When a protection budget trips, the host's [`Context`] gets a chance to
//! compensate, e.g. delete the messages the script already sent.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use quill::{Capability, CapabilityError, Context, Ledger, Sandbox, SandboxOptions, Value};
//!
//! #[derive(Default)]
//! struct Chat {
//!     sent: Ledger<String>,
//! }
//!
//! impl Context for Chat {}
//!
//! let say = Capability::new("say", |ctx: Arc<Chat>, args| async move {
//!     ctx.sent.record(args.str_arg(0, "message")?.to_string());
//!     Ok::<_, CapabilityError>(Value::None)
//! });
//! let sandbox = Sandbox::with_stdlib(vec![say], SandboxOptions::default());
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let chat = Arc::new(Chat::default());
//! let source = "```\nn = random.randint(1, 6)\nsay(\"rolled \" + str(n))\nn\n```";
//! let rolled = sandbox.run(Arc::clone(&chat), source).await.unwrap();
//! assert!((1..=6).contains(&rolled.as_int().unwrap()));
//! assert_eq!(chat.sent.len(), 1);
//! # });
//! ```
//!
//! # Errors
//!
//! Every failure is an [`Error`]. Parse errors carry diagnostics that
//! [`render_error`] prints with source snippets; everything else renders as
//! a single line.

mod error_renderer;

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

// Re-export public API from quill_core
pub use quill_core::api::{
    Diagnostic, Error, ExecutionOptions, PoolOptions, Sandbox, SandboxOptions, Severity,
    strip_code_fence,
};

// Re-export the host binding layer and values
pub use quill_core::host::{
    CONTEXT_PARAMETER, Capability, CapabilityError, CapabilityFuture, Context, Ledger,
};
pub use quill_core::pool::{Pool, PooledEvaluator};
pub use quill_core::scope::{Scope, ScopeBuilder};
pub use quill_core::values::{self, Arguments, NativeFunction, Record, Value};

// Re-export errors
pub use quill_core::evaluator::{ExecutionError, ProtectionError, RuntimeError};
pub use quill_core::parser::{ParseError, ParseErrorKind};

pub use quill_core::{ast, parser, stdlib};
