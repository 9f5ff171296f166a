use super::{expect_string_arg, string_arg, ScalarFunction};
use crate::error::Result;
use crate::parsing::ast::Pos;
use crate::types::data_type::DataType;
use crate::types::value::Value;

/// `upper(string)` uppercases a string.
pub struct Upper;

impl ScalarFunction for Upper {
    fn name(&self) -> &'static str {
        "upper"
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
        Ok(Value::String(s.to_uppercase()))
    }
}
