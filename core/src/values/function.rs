//! Callable values and the argument bundle passed to them.
//!
//! Library functions are synchronous [`NativeFunction`]s. Protected host
//! functions live in [`crate::host`] and receive the same [`Arguments`].

use core::fmt;
use std::sync::Arc;

use super::value::Value;
use crate::evaluator::RuntimeError;

/// Signature of a native library function.
pub type NativeFn = dyn Fn(&Arguments) -> Result<Value, RuntimeError> + Send + Sync;

/// Wrapper for a native Rust closure, callable from scripts.
///
/// Cloning shares the closure; equality is identity.
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &Arguments) -> Result<Value, RuntimeError> {
        (self.func)(args)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Evaluated call arguments: positional values in order, then keyword values
/// in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    function: Arc<str>,
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new(
        function: impl Into<Arc<str>>,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Self {
        Self {
            function: function.into(),
            positional,
            keywords,
        }
    }

    /// Name of the function being called, for error messages.
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    pub fn positional(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn positionals(&self) -> &[Value] {
        &self.positional
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(keyword, _)| keyword == name)
            .map(|(_, value)| value)
    }

    pub fn keywords(&self) -> &[(String, Value)] {
        &self.keywords
    }

    /// Positional argument `index`, or the keyword argument `parameter`.
    pub fn required(&self, index: usize, parameter: &str) -> Result<&Value, RuntimeError> {
        self.positional(index)
            .or_else(|| self.keyword(parameter))
            .ok_or_else(|| RuntimeError::MissingArgument {
                function: self.function.to_string(),
                parameter: parameter.to_string(),
            })
    }

    pub fn str_arg(&self, index: usize, parameter: &str) -> Result<&str, RuntimeError> {
        let value = self.required(index, parameter)?;
        value
            .as_str()
            .ok_or_else(|| self.invalid(parameter, "str", value))
    }

    pub fn int_arg(&self, index: usize, parameter: &str) -> Result<i64, RuntimeError> {
        let value = self.required(index, parameter)?;
        value
            .as_int()
            .ok_or_else(|| self.invalid(parameter, "int", value))
    }

    /// Fail unless exactly `count` positional arguments were passed.
    pub fn expect_len(&self, count: usize) -> Result<(), RuntimeError> {
        if self.positional.len() == count {
            Ok(())
        } else {
            Err(RuntimeError::InvalidArgument {
                function: self.function.to_string(),
                message: format!(
                    "expected {} argument(s), got {}",
                    count,
                    self.positional.len()
                ),
            })
        }
    }

    pub fn into_parts(self) -> (Vec<Value>, Vec<(String, Value)>) {
        (self.positional, self.keywords)
    }

    fn invalid(&self, parameter: &str, expected: &str, found: &Value) -> RuntimeError {
        RuntimeError::InvalidArgument {
            function: self.function.to_string(),
            message: format!(
                "'{}' must be {}, got {}",
                parameter,
                expected,
                found.type_name()
            ),
        }
    }
}
