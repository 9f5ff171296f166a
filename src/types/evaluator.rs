//! Expression evaluation
//!
//! Evaluates a compiled expression against one row. NULL propagates through
//! arithmetic, concatenation, comparison, and simple-CASE bases; `IS NULL`
//! is the only operator that maps NULL to a non-NULL result.

use super::expression::Expression;
use super::value::Value;
use crate::error::{Error, Result};
use crate::functions;
use crate::parsing::ast::Pos;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Evaluates `expr` against `row` and returns the resulting value.
pub fn evaluate(expr: &Expression, row: &[Value]) -> Result<Value> {
    use Expression::*;
    match expr {
        Literal(v) => Ok(v.clone()),
        Column(i) | Variable(i) => row
            .get(*i)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("row has no column {}", i))),

        Add(l, r, pos) => arithmetic(ArithOp::Add, l, r, row, *pos),
        Subtract(l, r, pos) => arithmetic(ArithOp::Subtract, l, r, row, *pos),
        Multiply(l, r, pos) => arithmetic(ArithOp::Multiply, l, r, row, *pos),
        Divide(l, r, pos) => arithmetic(ArithOp::Divide, l, r, row, *pos),
        Negate(operand, pos) => match evaluate(operand, row)? {
            Value::Null => Ok(Value::Null),
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| Error::Evaluation("integer overflow".into())),
            Value::Id(v) => i64::try_from(v)
                .ok()
                .and_then(i64::checked_neg)
                .map(Value::Int)
                .ok_or_else(|| Error::Evaluation("integer overflow".into())),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            v => Err(type_mismatch("numeric expression", &v, *pos)),
        },

        Equal(l, r, pos) => comparison(l, r, row, *pos, |o| o == Ordering::Equal),
        NotEqual(l, r, pos) => comparison(l, r, row, *pos, |o| o != Ordering::Equal),
        LessThan(l, r, pos) => comparison(l, r, row, *pos, |o| o == Ordering::Less),
        LessThanOrEqual(l, r, pos) => comparison(l, r, row, *pos, |o| o != Ordering::Greater),
        GreaterThan(l, r, pos) => comparison(l, r, row, *pos, |o| o == Ordering::Greater),
        GreaterThanOrEqual(l, r, pos) => comparison(l, r, row, *pos, |o| o != Ordering::Less),

        And(l, r) => match (to_bool(evaluate(l, row)?)?, to_bool(evaluate(r, row)?)?) {
            (Some(false), _) | (_, Some(false)) => Ok(Value::Bool(false)),
            (Some(true), Some(true)) => Ok(Value::Bool(true)),
            _ => Ok(Value::Null),
        },
        Or(l, r) => match (to_bool(evaluate(l, row)?)?, to_bool(evaluate(r, row)?)?) {
            (Some(true), _) | (_, Some(true)) => Ok(Value::Bool(true)),
            (Some(false), Some(false)) => Ok(Value::Bool(false)),
            _ => Ok(Value::Null),
        },
        Not(operand, pos) => match evaluate(operand, row)? {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(!b)),
            v => Err(type_mismatch("BOOL", &v, *pos)),
        },

        Concat(l, r, pos) => {
            let lv = evaluate(l, row)?;
            let rv = evaluate(r, row)?;
            match (lv, rv) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(Error::StringExpressionExpected { pos: *pos }),
            }
        }

        IsNull { operand, negated } => {
            let is_null = evaluate(operand, row)?.is_null();
            Ok(Value::Bool(is_null != *negated))
        }

        Case {
            operand,
            whens,
            else_expr,
        } => {
            match operand {
                Some(base) => {
                    let base = evaluate(base, row)?;
                    if base.is_null() {
                        return Ok(Value::Null);
                    }
                    for (when, then) in whens {
                        let candidate = evaluate(when, row)?;
                        if !candidate.is_null() && unified_cmp(&base, &candidate) == Some(Ordering::Equal) {
                            return Ok(evaluate(then, row)?);
                        }
                    }
                }
                None => {
                    for (when, then) in whens {
                        if matches!(evaluate(when, row)?, Value::Bool(true)) {
                            return Ok(evaluate(then, row)?);
                        }
                    }
                }
            }
            match else_expr {
                Some(e) => evaluate(e, row),
                None => Ok(Value::Null),
            }
        }

        Function { name, args, pos } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, row)?);
            }
            functions::dispatch(name, &values, *pos)
        }
    }
}

#[derive(Clone, Copy)]
enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

fn arithmetic(
    op: ArithOp,
    l: &Expression,
    r: &Expression,
    row: &[Value],
    pos: Pos,
) -> Result<Value> {
    let lv = evaluate(l, row)?;
    let rv = evaluate(r, row)?;
    if lv.is_null() || rv.is_null() {
        return Ok(Value::Null);
    }
    // Pure integer operands stay in i64; any decimal operand promotes both
    // sides and the result is rescaled to the larger operand scale.
    let decimal = matches!(lv, Value::Decimal(_)) || matches!(rv, Value::Decimal(_));
    if !decimal {
        let (a, b) = match (lv.as_i64(), rv.as_i64()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                let bad = if lv.as_i64().is_none() { &lv } else { &rv };
                return Err(type_mismatch("numeric expression", bad, pos));
            }
        };
        let out = match op {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Subtract => a.checked_sub(b),
            ArithOp::Multiply => a.checked_mul(b),
            ArithOp::Divide => {
                if b == 0 {
                    return Err(Error::Evaluation("division by zero".into()));
                }
                a.checked_div(b)
            }
        };
        return out
            .map(Value::Int)
            .ok_or_else(|| Error::Evaluation("integer overflow".into()));
    }

    let (a, b) = match (lv.as_decimal(), rv.as_decimal()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            let bad = if lv.as_decimal().is_none() { &lv } else { &rv };
            return Err(type_mismatch("numeric expression", bad, pos));
        }
    };
    let scale = a.scale().max(b.scale());
    let mut out = match op {
        ArithOp::Add => a
            .checked_add(b)
            .ok_or_else(|| Error::Evaluation("decimal overflow".into()))?,
        ArithOp::Subtract => a
            .checked_sub(b)
            .ok_or_else(|| Error::Evaluation("decimal overflow".into()))?,
        ArithOp::Multiply => a
            .checked_mul(b)
            .ok_or_else(|| Error::Evaluation("decimal overflow".into()))?,
        ArithOp::Divide => {
            if b == Decimal::ZERO {
                return Err(Error::Evaluation("division by zero".into()));
            }
            a.checked_div(b)
                .ok_or_else(|| Error::Evaluation("decimal overflow".into()))?
        }
    };
    out.rescale(scale);
    Ok(Value::Decimal(out))
}

fn comparison(
    l: &Expression,
    r: &Expression,
    row: &[Value],
    pos: Pos,
    test: impl Fn(Ordering) -> bool,
) -> Result<Value> {
    let lv = evaluate(l, row)?;
    let rv = evaluate(r, row)?;
    if lv.is_null() || rv.is_null() {
        return Ok(Value::Null);
    }
    match unified_cmp(&lv, &rv) {
        Some(ord) => Ok(Value::Bool(test(ord))),
        None => {
            let expected = lv
                .data_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "NULL".into());
            Err(type_mismatch(&expected, &rv, pos))
        }
    }
}

/// Compares two non-null values, unifying ID/INT/DECIMAL. Returns `None` for
/// incomparable type pairs.
fn unified_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        (Value::IdSet(x), Value::IdSet(y)) => Some(x.cmp(y)),
        (Value::StringSet(x), Value::StringSet(y)) => Some(x.cmp(y)),
        _ => match (a.as_decimal(), b.as_decimal()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => None,
        },
    }
}

/// Boolean view with NULL as `None`. Non-boolean values are an error.
fn to_bool(v: Value) -> Result<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        v => Err(Error::Evaluation(format!(
            "boolean expression expected, got {}",
            v
        ))),
    }
}

fn type_mismatch(expected: &str, found: &Value, pos: Pos) -> Error {
    Error::TypeMismatch {
        expected: expected.into(),
        found: found
            .data_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "NULL".into()),
        pos,
    }
}
