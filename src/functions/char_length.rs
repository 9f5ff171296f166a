use super::{expect_string_arg, string_arg, ScalarFunction};
use crate::error::Result;
use crate::parsing::ast::Pos;
use crate::types::data_type::DataType;
use crate::types::value::Value;

/// `char_length(string)` counts characters, not bytes.
pub struct CharLength;

impl ScalarFunction for CharLength {
    fn name(&self) -> &'static str {
        "char_length"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn return_type(&self, args: &[Option<DataType>], pos: Pos) -> Result<DataType> {
        expect_string_arg(args[0], pos)?;
        Ok(DataType::Int)
    }

    fn call(&self, args: &[Value], pos: Pos) -> Result<Value> {
        let s = string_arg(&args[0], pos)?;
        Ok(Value::Int(s.chars().count() as i64))
    }
}
