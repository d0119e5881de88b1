//! Quill Standard Library
//!
//! The base bindings every script sees:
//! - Constants: `true`, `false`, `none`
//! - Conversions and containers: `int`, `float`, `str`, `list`, `dict`,
//!   `len`, `range`
//! - Math: `abs`, `round`, `max`, `min`, `sum`
//! - Random: the `random` record (`random.random()`, `random.randint(a, b)`,
//!   `random.choice(items)`)
//!
//! All of these are plain synchronous functions; none of them is subject to
//! call protection.

use crate::scope::ScopeBuilder;
use crate::values::Value;

pub mod builtins;
pub mod math;
pub mod random;

pub use builtins::MAX_RANGE_LEN;
pub use random::build_random_package;

/// Register the whole standard library in `builder`.
///
/// # Example
///
/// ```
/// use quill_core::scope::ScopeBuilder;
/// use quill_core::stdlib;
///
/// let mut builder = ScopeBuilder::new();
/// stdlib::register(&mut builder);
/// assert!(builder.contains("len"));
/// assert!(builder.contains("random"));
/// ```
pub fn register(builder: &mut ScopeBuilder) {
    builder
        .register("true", Value::Bool(true))
        .register("false", Value::Bool(false))
        .register("none", Value::None);
    builtins::register(builder);
    math::register(builder);
    builder.register("random", build_random_package());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_stdlib() {
        let mut builder = ScopeBuilder::new();
        register(&mut builder);
        let scope = builder.build();

        for name in [
            "true", "false", "none", "int", "float", "str", "list", "dict", "len", "range", "abs",
            "round", "max", "min", "sum", "random",
        ] {
            assert!(scope.contains(name), "missing {}", name);
        }
        assert_eq!(scope.get("true"), Some(&Value::Bool(true)));
        assert!(matches!(scope.get("len"), Some(Value::Function(_))));
    }
}
