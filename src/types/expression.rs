//! Compiled scalar expressions
//!
//! The planner lowers parsed expressions into this form: column references are
//! resolved to ordinals against the operator's input schema at compile time,
//! so evaluation never does name lookup. Variants that can raise typed
//! evaluation errors carry the source position of the offending token.

use super::data_type::DataType;
use super::schema::Schema;
use super::value::Value;
use crate::error::{Error, Result};
use crate::functions;
use crate::parsing::ast::Pos;
use std::fmt;

/// A compiled expression, evaluated against one row at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A constant value.
    Literal(Value),
    /// A column ordinal into the input row.
    Column(usize),
    /// A positional reference (`@N`) into a bulk-insert source record.
    Variable(usize),

    /// a + b
    Add(Box<Expression>, Box<Expression>, Pos),
    /// a - b
    Subtract(Box<Expression>, Box<Expression>, Pos),
    /// a * b
    Multiply(Box<Expression>, Box<Expression>, Pos),
    /// a / b
    Divide(Box<Expression>, Box<Expression>, Pos),
    /// -a
    Negate(Box<Expression>, Pos),

    /// a = b
    Equal(Box<Expression>, Box<Expression>, Pos),
    /// a != b
    NotEqual(Box<Expression>, Box<Expression>, Pos),
    /// a < b
    LessThan(Box<Expression>, Box<Expression>, Pos),
    /// a <= b
    LessThanOrEqual(Box<Expression>, Box<Expression>, Pos),
    /// a > b
    GreaterThan(Box<Expression>, Box<Expression>, Pos),
    /// a >= b
    GreaterThanOrEqual(Box<Expression>, Box<Expression>, Pos),

    /// a AND b
    And(Box<Expression>, Box<Expression>),
    /// a OR b
    Or(Box<Expression>, Box<Expression>),
    /// NOT a
    Not(Box<Expression>, Pos),

    /// a || b (string concatenation)
    Concat(Box<Expression>, Box<Expression>, Pos),

    /// a IS [NOT] NULL
    IsNull {
        operand: Box<Expression>,
        negated: bool,
    },

    /// CASE expression; `operand` present for the "simple" form.
    Case {
        operand: Option<Box<Expression>>,
        whens: Vec<(Expression, Expression)>,
        else_expr: Option<Box<Expression>>,
    },

    /// Built-in function call.
    Function {
        name: String,
        args: Vec<Expression>,
        pos: Pos,
    },
}

impl Expression {
    /// Static result type against the given input schema. `None` means the
    /// expression is the untyped NULL literal.
    pub fn static_type(&self, schema: &Schema) -> Result<Option<DataType>> {
        use Expression::*;
        match self {
            Literal(Value::Null) => Ok(None),
            Literal(v) => Ok(v.data_type()),
            Column(i) | Variable(i) => Ok(schema
                .columns()
                .get(*i)
                .map(|c| c.data_type)
                .or(Some(DataType::String))),

            Add(l, r, pos) | Subtract(l, r, pos) | Multiply(l, r, pos) | Divide(l, r, pos) => {
                let lt = l.static_type(schema)?;
                let rt = r.static_type(schema)?;
                match (lt, rt) {
                    (None, t) | (t, None) => Ok(t),
                    (Some(lt), Some(rt)) => lt
                        .unify_arithmetic(rt)
                        .map(Some)
                        .ok_or(Error::TypeMismatch {
                            expected: "numeric expression".into(),
                            found: if lt.is_numeric() { rt } else { lt }.to_string(),
                            pos: *pos,
                        }),
                }
            }
            Negate(operand, pos) => match operand.static_type(schema)? {
                None => Ok(None),
                Some(t) if t.is_numeric() => Ok(Some(match t {
                    DataType::Id => DataType::Int,
                    other => other,
                })),
                Some(t) => Err(Error::TypeMismatch {
                    expected: "numeric expression".into(),
                    found: t.to_string(),
                    pos: *pos,
                }),
            },

            Equal(..) | NotEqual(..) | LessThan(..) | LessThanOrEqual(..) | GreaterThan(..)
            | GreaterThanOrEqual(..) | And(..) | Or(..) | Not(..) | IsNull { .. } => {
                Ok(Some(DataType::Bool))
            }

            Concat(l, r, pos) => {
                for side in [l, r] {
                    match side.static_type(schema)? {
                        None | Some(DataType::String) => {}
                        Some(_) => {
                            return Err(Error::StringExpressionExpected { pos: *pos });
                        }
                    }
                }
                Ok(Some(DataType::String))
            }

            Case {
                whens, else_expr, ..
            } => {
                if let Some((_, then)) = whens.first() {
                    if let Some(t) = then.static_type(schema)? {
                        return Ok(Some(t));
                    }
                }
                match else_expr {
                    Some(e) => e.static_type(schema),
                    None => Ok(None),
                }
            }

            Function { name, args, pos } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(arg.static_type(schema)?);
                }
                functions::validate(name, &arg_types, *pos).map(Some)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Expression::*;
        match self {
            Literal(v) => write!(f, "{}", v),
            Column(i) => write!(f, "#{}", i),
            Variable(i) => write!(f, "@{}", i),
            Add(l, r, _) => write!(f, "({} + {})", l, r),
            Subtract(l, r, _) => write!(f, "({} - {})", l, r),
            Multiply(l, r, _) => write!(f, "({} * {})", l, r),
            Divide(l, r, _) => write!(f, "({} / {})", l, r),
            Negate(e, _) => write!(f, "(-{})", e),
            Equal(l, r, _) => write!(f, "({} = {})", l, r),
            NotEqual(l, r, _) => write!(f, "({} != {})", l, r),
            LessThan(l, r, _) => write!(f, "({} < {})", l, r),
            LessThanOrEqual(l, r, _) => write!(f, "({} <= {})", l, r),
            GreaterThan(l, r, _) => write!(f, "({} > {})", l, r),
            GreaterThanOrEqual(l, r, _) => write!(f, "({} >= {})", l, r),
            And(l, r) => write!(f, "({} AND {})", l, r),
            Or(l, r) => write!(f, "({} OR {})", l, r),
            Not(e, _) => write!(f, "(NOT {})", e),
            Concat(l, r, _) => write!(f, "({} || {})", l, r),
            IsNull { operand, negated } => {
                if *negated {
                    write!(f, "({} IS NOT NULL)", operand)
                } else {
                    write!(f, "({} IS NULL)", operand)
                }
            }
            Case { .. } => write!(f, "CASE"),
            Function { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
