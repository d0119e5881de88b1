//! Numeric helpers: `abs`, `round`, `max`, `min`, `sum`.

use core::cmp::Ordering;

use crate::ast::BinaryOp;
use crate::evaluator::{RuntimeError, operators};
use crate::scope::ScopeBuilder;
use crate::values::{Arguments, Value};

pub(super) fn register(builder: &mut ScopeBuilder) {
    builder
        .register_function("abs", abs)
        .register_function("round", round)
        .register_function("max", max)
        .register_function("min", min)
        .register_function("sum", sum);
}

fn number_expected(args: &Arguments, value: &Value) -> RuntimeError {
    RuntimeError::InvalidArgument {
        function: args.function().to_string(),
        message: format!("expected a number, got {}", value.type_name()),
    }
}

fn abs(args: &Arguments) -> Result<Value, RuntimeError> {
    args.expect_len(1)?;
    match args.required(0, "x")? {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow { op: "abs" }),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(number_expected(args, other)),
    }
}

/// `round(x)` rounds half to even and returns an int; `round(x, ndigits)`
/// returns a float.
fn round(args: &Arguments) -> Result<Value, RuntimeError> {
    let x = args.required(0, "x")?;
    let ndigits = match args.positional(1).or_else(|| args.keyword("ndigits")) {
        None | Some(Value::None) => None,
        Some(_) => Some(args.int_arg(1, "ndigits")?),
    };

    match (x, ndigits) {
        (Value::Int(n), _) => Ok(Value::Int(*n)),
        (Value::Float(f), None) => {
            let rounded = f.round_ties_even();
            if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                Ok(Value::Int(rounded as i64))
            } else {
                Err(RuntimeError::Overflow { op: "round" })
            }
        }
        (Value::Float(f), Some(digits)) => {
            let digits = i32::try_from(digits.clamp(-308, 308)).unwrap_or(0);
            let scale = 10f64.powi(digits);
            Ok(Value::Float((f * scale).round_ties_even() / scale))
        }
        (other, _) => Err(number_expected(args, other)),
    }
}

/// Items to reduce over: a single array argument, or all positional
/// arguments.
fn items(args: &Arguments) -> Result<&[Value], RuntimeError> {
    let items = match args.positionals() {
        [Value::Array(items)] => items.as_slice(),
        [_] | [] => {
            return Err(RuntimeError::InvalidArgument {
                function: args.function().to_string(),
                message: "expected an array or at least two arguments".to_string(),
            });
        }
        all => all,
    };
    if items.is_empty() {
        return Err(RuntimeError::InvalidArgument {
            function: args.function().to_string(),
            message: "empty sequence".to_string(),
        });
    }
    Ok(items)
}

fn extreme(args: &Arguments, keep: Ordering) -> Result<Value, RuntimeError> {
    let items = items(args)?;
    let mut best = &items[0];
    for item in &items[1..] {
        if operators::compare(BinaryOp::Lt, item, best)? == keep {
            best = item;
        }
    }
    Ok(best.clone())
}

fn max(args: &Arguments) -> Result<Value, RuntimeError> {
    extreme(args, Ordering::Greater)
}

fn min(args: &Arguments) -> Result<Value, RuntimeError> {
    extreme(args, Ordering::Less)
}

/// `sum(array, start=0)`.
fn sum(args: &Arguments) -> Result<Value, RuntimeError> {
    let items = match args.required(0, "iterable")? {
        Value::Array(items) => items,
        other => return Err(number_expected(args, other)),
    };
    let start = args
        .positional(1)
        .or_else(|| args.keyword("start"))
        .cloned()
        .unwrap_or(Value::Int(0));
    items
        .iter()
        .try_fold(start, |total, item| operators::binary(BinaryOp::Add, &total, item))
}
