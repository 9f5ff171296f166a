use super::{expect_string_arg, string_arg, ScalarFunction};
use crate::error::Result;
use crate::parsing::ast::Pos;
use crate::types::data_type::DataType;
use crate::types::value::Value;

/// `lower(string)` lowercases a string.
pub struct Lower;

impl ScalarFunction for Lower {
    fn name(&self) -> &'static str {
        "lower"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn return_type(&self, args: &[Option<DataType>], pos: Pos) -> Result<DataType> {
        expect_string_arg(args[0], pos)?;
        Ok(DataType::String)
    }

    fn call(&self, args: &[Value], pos: Pos) -> Result<Value> {
        let s = string_arg(&args[0], pos)?;
        Ok(Value::String(s.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases() {
        let out = Lower.call(&[Value::String("HeLLo".into())], Pos::default()).unwrap();
        assert_eq!(out, Value::String("hello".into()));
    }
}
