//! Core of the Quill scripting language.
//!
//! Source text flows through [`parser::parse`] into an [`ast::Program`], which a
//! [`pool::Pool`] of reusable [`evaluator::Evaluator`] instances runs against an
//! immutable base [`scope::Scope`] and a list of host [`host::Capability`]s.

pub mod api;
pub mod ast;
pub mod evaluator;
pub mod host;
pub mod parser;
pub mod pool;
pub mod scope;
pub mod stdlib;
pub mod values;
