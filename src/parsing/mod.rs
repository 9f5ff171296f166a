//! Parsed statement trees
//!
//! The SQL lexer/parser is an external collaborator; it hands the planner the
//! statement tree defined in [`ast`], with source positions on every identifier
//! so compilation errors can be located.

pub mod ast;
