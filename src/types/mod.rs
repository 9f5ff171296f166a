//! Core value, type, and expression machinery shared by planning and
//! execution.

pub mod context;
pub mod data_type;
pub mod evaluator;
pub mod expression;
pub mod schema;
pub mod value;

pub use context::ExecutionContext;
pub use data_type::DataType;
pub use expression::Expression;
pub use schema::{Column, Schema, ID_COLUMN};
pub use value::{Row, Value};
