//! Name bindings for a script invocation.
//!
//! A pool owns one immutable base [`Scope`] built with a [`ScopeBuilder`]
//! (standard library plus capability bindings). Every invocation starts from
//! a fresh clone of it, so assignments never leak between invocations.

use hashbrown::HashMap;

use crate::values::{Arguments, NativeFunction, Value};
use crate::evaluator::RuntimeError;

/// A mapping from names to values, exclusively owned by one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    bindings: HashMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.bindings.get_mut(name)
    }

    /// Bind `name`, replacing any previous binding.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Overlay `bindings` on top of this scope.
    pub fn extend<I, K>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (name, value) in bindings {
            self.set(name, value);
        }
    }
}

/// Builder for the base scope shared by every evaluator of a pool.
///
/// # Example
///
/// ```
/// use quill_core::scope::ScopeBuilder;
/// use quill_core::values::Value;
///
/// let mut builder = ScopeBuilder::new();
/// builder.register("answer", Value::Int(42));
/// builder.register_function("double", |args| Ok(Value::Int(args.int_arg(0, "n")? * 2)));
/// let scope = builder.build();
/// assert_eq!(scope.get("answer"), Some(&Value::Int(42)));
/// ```
#[derive(Debug, Default)]
pub struct ScopeBuilder {
    scope: Scope,
}

impl ScopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global value (constant, function, or record of functions).
    pub fn register(&mut self, name: &str, value: Value) -> &mut Self {
        self.scope.set(name, value);
        self
    }

    /// Register a native function under `name`.
    pub fn register_function<F>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: Fn(&Arguments) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.register(name, Value::Function(NativeFunction::new(name, func)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scope.contains(name)
    }

    pub fn build(self) -> Scope {
        self.scope
    }
}
