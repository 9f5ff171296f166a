//! SQL planning and execution for the Lumen analytical database
//!
//! This crate is the SQL front end over a bitmap-index storage engine:
//! - Compiles parsed statements into a closed tree of plan operators
//! - Streams query results through lazy pull iterators
//! - Translates DDL into engine index/field specifications
//! - Ingests CSV and NDJSON datasources through BULK INSERT
//!
//! Statements come in as [`parsing::ast::Statement`] values, compile with
//! [`planning::compile`], and run with [`execution::execute`] against any
//! [`engine::Engine`] implementation.

pub mod engine;
pub mod error;
pub mod execution;
pub mod functions;
pub mod parsing;
pub mod planning;
pub mod types;

pub use engine::{Engine, MemoryEngine};
pub use error::{Error, Result};
pub use execution::{execute, Rows, StatementResult};
pub use planning::{compile, Plan};
pub use types::{DataType, ExecutionContext, Row, Schema, Value};
