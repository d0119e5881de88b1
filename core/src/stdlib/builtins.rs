//! Conversions and container helpers: `int`, `float`, `str`, `list`,
//! `dict`, `len`, `range`.

use crate::evaluator::RuntimeError;
use crate::scope::ScopeBuilder;
use crate::values::{Arguments, Record, Value};

/// Upper bound on the number of items `range` may produce.
pub const MAX_RANGE_LEN: usize = 10_000;

pub(super) fn register(builder: &mut ScopeBuilder) {
    builder
        .register_function("int", to_int)
        .register_function("float", to_float)
        .register_function("str", to_str)
        .register_function("list", to_list)
        .register_function("dict", to_dict)
        .register_function("len", len)
        .register_function("range", range);
}

fn invalid(args: &Arguments, message: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidArgument {
        function: args.function().to_string(),
        message: message.into(),
    }
}

fn to_int(args: &Arguments) -> Result<Value, RuntimeError> {
    let value = match args.positional(0) {
        None => return Ok(Value::Int(0)),
        Some(value) => value,
    };
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(x) => {
            // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
            if x.is_finite() && *x >= i64::MIN as f64 && *x < i64::MAX as f64 {
                Ok(Value::Int(x.trunc() as i64))
            } else {
                Err(invalid(args, format!("cannot convert {} to int", x)))
            }
        }
        Value::Str(s) => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| invalid(args, format!("invalid literal for int: '{}'", s))),
        other => Err(invalid(
            args,
            format!("cannot convert {} to int", other.type_name()),
        )),
    }
}

fn to_float(args: &Arguments) -> Result<Value, RuntimeError> {
    let value = match args.positional(0) {
        None => return Ok(Value::Float(0.0)),
        Some(value) => value,
    };
    match value {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| invalid(args, format!("invalid literal for float: '{}'", s))),
        other => Err(invalid(
            args,
            format!("cannot convert {} to float", other.type_name()),
        )),
    }
}

fn to_str(args: &Arguments) -> Result<Value, RuntimeError> {
    Ok(Value::Str(
        args.positional(0)
            .map(|value| value.to_string())
            .unwrap_or_default(),
    ))
}

fn to_list(args: &Arguments) -> Result<Value, RuntimeError> {
    let items = match args.positional(0) {
        None | Some(Value::None) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Str(s)) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
        Some(Value::Record(record)) => record.keys().map(Value::from).collect(),
        Some(other) => {
            return Err(invalid(
                args,
                format!("{} is not iterable", other.type_name()),
            ));
        }
    };
    Ok(Value::Array(items))
}

/// `dict(record?, **fields)`: a record built from keyword arguments,
/// optionally starting from a copy of an existing record.
fn to_dict(args: &Arguments) -> Result<Value, RuntimeError> {
    let mut record = match args.positional(0) {
        None => Record::new(),
        Some(Value::Record(record)) => record.clone(),
        Some(other) => {
            return Err(invalid(
                args,
                format!("cannot build a record from {}", other.type_name()),
            ));
        }
    };
    for (name, value) in args.keywords() {
        record.set(name.as_str(), value.clone());
    }
    Ok(Value::Record(record))
}

fn len(args: &Arguments) -> Result<Value, RuntimeError> {
    args.expect_len(1)?;
    let value = args.required(0, "obj")?;
    let len = match value {
        Value::Str(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Record(record) => record.len(),
        other => {
            return Err(invalid(
                args,
                format!("{} has no length", other.type_name()),
            ));
        }
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| RuntimeError::Overflow { op: "len" })
}

/// `range(stop)`, `range(start, stop)` or `range(start, stop, step)`.
fn range(args: &Arguments) -> Result<Value, RuntimeError> {
    let (start, stop, step) = match args.len() {
        1 => (0, args.int_arg(0, "stop")?, 1),
        2 => (args.int_arg(0, "start")?, args.int_arg(1, "stop")?, 1),
        3 => (
            args.int_arg(0, "start")?,
            args.int_arg(1, "stop")?,
            args.int_arg(2, "step")?,
        ),
        n => {
            return Err(invalid(
                args,
                format!("expected 1 to 3 arguments, got {}", n),
            ));
        }
    };
    if step == 0 {
        return Err(invalid(args, "step must not be zero"));
    }

    let span = if step > 0 {
        i128::from(stop) - i128::from(start)
    } else {
        i128::from(start) - i128::from(stop)
    };
    let step_size = i128::from(step).abs();
    let count = if span <= 0 {
        0
    } else {
        (span + step_size - 1) / step_size
    };
    if count > MAX_RANGE_LEN as i128 {
        return Err(invalid(
            args,
            format!("range of {} items exceeds the limit of {}", count, MAX_RANGE_LEN),
        ));
    }

    let items = (0..count)
        .map(|i| Value::Int((i128::from(start) + i * i128::from(step)) as i64))
        .collect();
    Ok(Value::Array(items))
}
