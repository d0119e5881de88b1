//! Random Package
//!
//! A `random` record exposing `random()`, `randint(a, b)` and
//! `choice(items)`, backed by the thread-local generator from `rand`.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::evaluator::RuntimeError;
use crate::values::{Arguments, NativeFunction, Record, Value};

pub fn build_random_package() -> Value {
    Value::Record(
        Record::new()
            .with_field("random", NativeFunction::new("random", random))
            .with_field("randint", NativeFunction::new("randint", randint))
            .with_field("choice", NativeFunction::new("choice", choice)),
    )
}

/// Float in `[0, 1)`.
fn random(args: &Arguments) -> Result<Value, RuntimeError> {
    args.expect_len(0)?;
    Ok(Value::Float(rand::thread_rng().r#gen::<f64>()))
}

/// Integer in `[a, b]`, both ends inclusive.
fn randint(args: &Arguments) -> Result<Value, RuntimeError> {
    let low = args.int_arg(0, "a")?;
    let high = args.int_arg(1, "b")?;
    if low > high {
        return Err(RuntimeError::InvalidArgument {
            function: args.function().to_string(),
            message: format!("empty range ({}, {})", low, high),
        });
    }
    Ok(Value::Int(rand::thread_rng().gen_range(low..=high)))
}

fn choice(args: &Arguments) -> Result<Value, RuntimeError> {
    let items = match args.required(0, "items")? {
        Value::Array(items) => items,
        other => {
            return Err(RuntimeError::InvalidArgument {
                function: args.function().to_string(),
                message: format!("expected an array, got {}", other.type_name()),
            });
        }
    };
    items
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| RuntimeError::InvalidArgument {
            function: args.function().to_string(),
            message: "cannot choose from an empty array".to_string(),
        })
}
