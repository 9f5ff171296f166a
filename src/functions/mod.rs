//! Built-in scalar functions
//!
//! One file per function. Functions register themselves in a process-wide
//! table keyed by lowercase name; the planner validates argument counts and
//! types at compile time and the evaluator dispatches by name at runtime.

mod char_length;
mod lower;
mod reverse;
mod substring;
mod upper;

use crate::error::{Error, Result};
use crate::parsing::ast::Pos;
use crate::types::data_type::DataType;
use crate::types::value::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// A built-in scalar function.
pub trait ScalarFunction: Send + Sync {
    fn name(&self) -> &'static str;

    /// Minimum number of arguments.
    fn min_args(&self) -> usize;

    /// Maximum number of arguments; equals `min_args` unless the function has
    /// optional trailing parameters.
    fn max_args(&self) -> usize {
        self.min_args()
    }

    /// Compile-time return type given argument types (`None` for the untyped
    /// NULL literal). Argument counts are checked before this is called.
    fn return_type(&self, args: &[Option<DataType>], pos: Pos) -> Result<DataType>;

    /// Evaluates the function. Argument counts are checked before this is
    /// called; a NULL argument yields NULL.
    fn call(&self, args: &[Value], pos: Pos) -> Result<Value>;
}

static REGISTRY: LazyLock<BTreeMap<&'static str, Box<dyn ScalarFunction>>> =
    LazyLock::new(|| {
        let functions: Vec<Box<dyn ScalarFunction>> = vec![
            Box::new(char_length::CharLength),
            Box::new(lower::Lower),
            Box::new(reverse::Reverse),
            Box::new(substring::Substring),
            Box::new(upper::Upper),
        ];
        functions.into_iter().map(|f| (f.name(), f)).collect()
    });

fn lookup(name: &str, pos: Pos) -> Result<&'static dyn ScalarFunction> {
    REGISTRY
        .get(name.to_ascii_lowercase().as_str())
        .map(|f| f.as_ref())
        .ok_or_else(|| Error::UnknownFunction {
            name: name.into(),
            pos,
        })
}

fn check_arity(f: &dyn ScalarFunction, name: &str, actual: usize, pos: Pos) -> Result<()> {
    if actual < f.min_args() || actual > f.max_args() {
        return Err(Error::ParamCountMismatch {
            name: name.to_ascii_lowercase(),
            formal: f.max_args(),
            actual,
            pos,
        });
    }
    Ok(())
}

/// Compile-time validation: existence, arity, and argument types.
pub fn validate(name: &str, arg_types: &[Option<DataType>], pos: Pos) -> Result<DataType> {
    let f = lookup(name, pos)?;
    check_arity(f, name, arg_types.len(), pos)?;
    f.return_type(arg_types, pos)
}

/// Runtime dispatch by name.
pub fn dispatch(name: &str, args: &[Value], pos: Pos) -> Result<Value> {
    let f = lookup(name, pos)?;
    check_arity(f, name, args.len(), pos)?;
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    f.call(args, pos)
}

/// Checks that a compile-time argument type is STRING (or untyped NULL).
fn expect_string_arg(t: Option<DataType>, pos: Pos) -> Result<()> {
    match t {
        None | Some(DataType::String) => Ok(()),
        Some(_) => Err(Error::StringExpressionExpected { pos }),
    }
}

/// Checks that a compile-time argument type is integral (or untyped NULL).
fn expect_int_arg(t: Option<DataType>, pos: Pos) -> Result<()> {
    match t {
        None | Some(DataType::Int) | Some(DataType::Id) => Ok(()),
        Some(t) => Err(Error::TypeMismatch {
            expected: "INT".into(),
            found: t.to_string(),
            pos,
        }),
    }
}

/// Runtime view of a string argument.
fn string_arg(v: &Value, pos: Pos) -> Result<&str> {
    match v {
        Value::String(s) => Ok(s),
        _ => Err(Error::StringExpressionExpected { pos }),
    }
}

/// Runtime view of an integer argument.
fn int_arg(v: &Value, pos: Pos) -> Result<i64> {
    v.as_i64().ok_or_else(|| Error::TypeMismatch {
        expected: "INT".into(),
        found: v
            .data_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "NULL".into()),
        pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_function_is_positioned() {
        let err = validate("frobnicate", &[], Pos::new(1, 8)).unwrap_err();
        assert_eq!(err.to_string(), "[1:8] unknown function 'frobnicate'");
    }

    #[test]
    fn arity_error_matches_engine_wording() {
        let err = validate(
            "upper",
            &[Some(DataType::String), Some(DataType::String)],
            Pos::new(1, 8),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[1:8] 'upper': count of formal parameters (1) does not match count of actual parameters (2)"
        );
    }

    #[test]
    fn dispatch_is_case_insensitive() {
        let out = dispatch("UPPER", &[Value::String("abc".into())], Pos::default()).unwrap();
        assert_eq!(out, Value::String("ABC".into()));
    }

    #[test]
    fn null_argument_yields_null() {
        let out = dispatch("reverse", &[Value::Null], Pos::default()).unwrap();
        assert_eq!(out, Value::Null);
    }
}
