//! Error types for the SQL planning and execution engine
//!
//! Errors that originate from a located AST node render as `[line:col] message`;
//! engine-level errors pass through unlocated, with the storage engine's message
//! verbatim.

use crate::parsing::ast::Pos;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Resolution errors
    #[error("[{pos}] table '{name}' not found")]
    TableNotFound { name: String, pos: Pos },

    #[error("[{pos}] column '{name}' not found")]
    ColumnNotFound { name: String, pos: Pos },

    #[error("[{pos}] ambiguous column reference '{name}'")]
    AmbiguousColumn { name: String, pos: Pos },

    // DDL compilation errors
    #[error("[{pos}] duplicate column '{name}'")]
    DuplicateColumn { name: String, pos: Pos },

    #[error("[{pos}] _id column must be specified")]
    IdColumnRequired { pos: Pos },

    #[error("[{pos}] '{first}' constraint conflicts with '{second}'")]
    ConflictingConstraint {
        first: &'static str,
        second: &'static str,
        pos: Pos,
    },

    #[error("[{pos}] invalid constraint '{constraint}' for type '{data_type}'")]
    InvalidConstraint {
        constraint: &'static str,
        data_type: String,
        pos: Pos,
    },

    #[error("[{pos}] rename column is not supported")]
    RenameColumnUnsupported { pos: Pos },

    #[error("[{pos}] unknown type '{name}'")]
    UnknownType { name: String, pos: Pos },

    #[error("[{pos}] invalid timeunit '{unit}'")]
    InvalidTimeUnit { unit: String, pos: Pos },

    #[error("[{pos}] invalid time quantum '{quantum}'")]
    InvalidTimeQuantum { quantum: String, pos: Pos },

    #[error("[{pos}] invalid duration '{value}'")]
    InvalidDuration { value: String, pos: Pos },

    // Type errors
    #[error("[{pos}] type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        pos: Pos,
    },

    #[error("[{pos}] string expression expected")]
    StringExpressionExpected { pos: Pos },

    #[error("[{pos}] unknown function '{name}'")]
    UnknownFunction { name: String, pos: Pos },

    #[error(
        "[{pos}] '{name}': count of formal parameters ({formal}) does not match count of actual parameters ({actual})"
    )]
    ParamCountMismatch {
        name: String,
        formal: usize,
        actual: usize,
        pos: Pos,
    },

    // Bulk insert validation errors
    #[error("[{pos}] insert column list must have '_id' column specified")]
    InsertIdColumnRequired { pos: Pos },

    #[error("[{pos}] insert column list must have at least one non '_id' column specified")]
    InsertNonIdColumnRequired { pos: Pos },

    #[error("[{pos}] mismatch in the count of expressions and target columns")]
    InsertCountMismatch { pos: Pos },

    #[error("[{pos}] invalid format specifier '{spec}'")]
    InvalidFormatSpecifier { spec: String, pos: Pos },

    #[error("[{pos}] format specifier expected")]
    FormatSpecifierExpected { pos: Pos },

    #[error("[{pos}] invalid input specifier '{spec}'")]
    InvalidInputSpecifier { spec: String, pos: Pos },

    #[error("[{pos}] input specifier expected")]
    InputSpecifierExpected { pos: Pos },

    #[error("[{pos}] invalid batch size '{size}'")]
    InvalidBatchSize { size: i64, pos: Pos },

    // Bulk insert runtime errors
    #[error("unable to read datasource '{datasource}': {reason}")]
    DatasourceUnreadable { datasource: String, reason: String },

    #[error("value '{value}' cannot be converted to type '{target}'")]
    ValueConversion { value: String, target: String },

    #[error("map index {0} out of range")]
    MapIndexOutOfRange(usize),

    #[error("unknown key {0}")]
    UnknownKey(String),

    #[error("{ingested} rows ingested before failure: {source}")]
    BulkPartialFailure {
        ingested: u64,
        #[source]
        source: Box<Error>,
    },

    // Evaluation errors
    #[error("evaluation error: {0}")]
    Evaluation(String),

    // Storage engine errors pass through verbatim
    #[error("{0}")]
    Engine(String),

    #[error("execution cancelled")]
    Cancelled,

    // System errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Pass-through constructor for storage engine errors.
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::Engine(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positioned_errors_render_line_col_prefix() {
        let err = Error::TableNotFound {
            name: "foo".into(),
            pos: Pos::new(1, 19),
        };
        assert_eq!(err.to_string(), "[1:19] table 'foo' not found");

        let err = Error::ConflictingConstraint {
            first: "CACHETYPE",
            second: "TIMEQUANTUM",
            pos: Pos::new(1, 60),
        };
        assert_eq!(
            err.to_string(),
            "[1:60] 'CACHETYPE' constraint conflicts with 'TIMEQUANTUM'"
        );
    }

    #[test]
    fn engine_errors_are_verbatim() {
        let err = Error::engine("index already exists");
        assert_eq!(err.to_string(), "index already exists");
    }

    #[test]
    fn datasource_errors_carry_no_source_chain() {
        use std::error::Error as _;
        let err = Error::DatasourceUnreadable {
            datasource: "f.csv".into(),
            reason: "file 'f.csv' does not exist".into(),
        };
        assert_eq!(
            err.to_string(),
            "unable to read datasource 'f.csv': file 'f.csv' does not exist"
        );
        assert!(err.source().is_none());

        // BulkPartialFailure is the one variant that chains.
        let err = Error::BulkPartialFailure {
            ingested: 3,
            source: Box::new(Error::engine("write failed")),
        };
        assert_eq!(err.source().unwrap().to_string(), "write failed");
    }
}
