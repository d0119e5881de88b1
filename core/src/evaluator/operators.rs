//! Binary operators, indexing and attribute lookup.

use core::cmp::Ordering;

use crate::ast::BinaryOp;
use crate::evaluator::RuntimeError;
use crate::values::{MAX_VALUE_SIZE, Value};

/// Apply a binary operator to two evaluated operands.
pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(op, left, right)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, left, right)
        }
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_binary_int(op, *a, *b),
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            check_size(1 + a.len() + b.len())?;
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::Str(joined))
        }
        (Value::Array(a), Value::Array(b)) if op == BinaryOp::Add => {
            check_size(left.size() + right.size() - 1)?;
            let mut joined = Vec::with_capacity(a.len() + b.len());
            joined.extend(a.iter().cloned());
            joined.extend(b.iter().cloned());
            Ok(Value::Array(joined))
        }
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => eval_binary_float(op, a, b),
            _ => Err(unsupported(op, left, right)),
        },
    }
}

/// Fails once a value would outgrow [`MAX_VALUE_SIZE`]. Checked before
/// concatenating and whenever a value is stored.
pub(crate) fn check_size(size: usize) -> Result<(), RuntimeError> {
    if size > MAX_VALUE_SIZE {
        return Err(RuntimeError::ValueTooLarge {
            size,
            limit: MAX_VALUE_SIZE,
        });
    }
    Ok(())
}

/// Integer arithmetic. Overflow is an error; `/` is true division and
/// always yields a float.
fn eval_binary_int(op: BinaryOp, left: i64, right: i64) -> Result<Value, RuntimeError> {
    let checked = match op {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Sub => left.checked_sub(right),
        BinaryOp::Mul => left.checked_mul(right),
        BinaryOp::Div => return eval_binary_float(op, left as f64, right as f64),
        _ => None,
    };
    checked
        .map(Value::Int)
        .ok_or(RuntimeError::Overflow { op: op.sign() })
}

fn eval_binary_float(op: BinaryOp, left: f64, right: f64) -> Result<Value, RuntimeError> {
    let result = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => {
            if right == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            left / right
        }
        _ => {
            return Err(RuntimeError::UnsupportedOperand {
                op: op.sign(),
                left: "float",
                right: "float",
            });
        }
    };
    Ok(Value::Float(result))
}

pub(crate) fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Ordering, RuntimeError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    // NaN compares as unsupported rather than silently false.
    ordering.ok_or_else(|| unsupported(op, left, right))
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::UnsupportedOperand {
        op: op.sign(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Subscript a value: arrays and strings by integer (negative counts from
/// the end), records by string key.
pub(super) fn index(container: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match container {
        Value::Array(items) => {
            let position = position(index, items.len(), "array")?;
            Ok(items[position].clone())
        }
        Value::Str(s) => {
            let count = s.chars().count();
            let position = position(index, count, "str")?;
            Ok(s.chars()
                .nth(position)
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or(Value::None))
        }
        Value::Record(record) => {
            let key = index.as_str().ok_or(RuntimeError::InvalidIndex {
                container: "record",
                expected: "str",
                found: index.type_name(),
            })?;
            record
                .get(key)
                .cloned()
                .ok_or_else(|| RuntimeError::KeyNotFound {
                    key: key.to_string(),
                })
        }
        other => Err(RuntimeError::NotSubscriptable {
            type_name: other.type_name(),
        }),
    }
}

fn position(index: &Value, len: usize, container: &'static str) -> Result<usize, RuntimeError> {
    let raw = index.as_int().ok_or(RuntimeError::InvalidIndex {
        container,
        expected: "int",
        found: index.type_name(),
    })?;
    let resolved = if raw < 0 {
        i64::try_from(len).ok().and_then(|len| raw.checked_add(len))
    } else {
        Some(raw)
    };
    resolved
        .and_then(|i| usize::try_from(i).ok())
        .filter(|i| *i < len)
        .ok_or(RuntimeError::IndexOutOfBounds { index: raw, len })
}

/// Look up one attribute segment.
pub(super) fn attribute<'v>(value: &'v Value, name: &str) -> Result<&'v Value, RuntimeError> {
    let found = match value {
        Value::Record(record) => record.get(name),
        _ => None,
    };
    found.ok_or_else(|| RuntimeError::AttributeNotFound {
        type_name: value.type_name(),
        attribute: name.to_string(),
    })
}
