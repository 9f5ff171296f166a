use super::{expect_int_arg, expect_string_arg, int_arg, string_arg, ScalarFunction};
use crate::error::Result;
use crate::parsing::ast::Pos;
use crate::types::data_type::DataType;
use crate::types::value::Value;

/// `substring(string, start[, length])` extracts a character window.
///
/// `start` is zero-based and the window `[start, start + length)` is clamped
/// to the string bounds, so out-of-range arguments never fail: a negative
/// start extends the window leftwards past the origin and an oversized length
/// is cut at the end of the string.
pub struct Substring;

impl ScalarFunction for Substring {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> usize {
        3
    }

    fn return_type(&self, args: &[Option<DataType>], pos: Pos) -> Result<DataType> {
        expect_string_arg(args[0], pos)?;
        for arg in &args[1..] {
            expect_int_arg(*arg, pos)?;
        }
        Ok(DataType::String)
    }

    fn call(&self, args: &[Value], pos: Pos) -> Result<Value> {
        let s = string_arg(&args[0], pos)?;
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len() as i64;

        let start = int_arg(&args[1], pos)?;
        let end = match args.get(2) {
            Some(length) => start.saturating_add(int_arg(length, pos)?),
            None => len,
        };

        let start = start.clamp(0, len) as usize;
        let end = end.clamp(0, len) as usize;
        if start >= end {
            return Ok(Value::String(String::new()));
        }
        Ok(Value::String(chars[start..end].iter().collect()))
    }
}
