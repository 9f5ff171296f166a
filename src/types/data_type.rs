//! Scalar type descriptors
//!
//! The display forms (`ID`, `INT`, `DECIMAL(2)`, ...) are used verbatim in
//! conversion error messages and in the system catalog's `type` column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Unsigned row identifier.
    Id,
    /// 64-bit signed integer.
    Int,
    Bool,
    String,
    /// Fixed-point decimal with the given scale.
    Decimal(u32),
    Timestamp,
    /// Set of row identifiers.
    IdSet,
    /// Set of string keys.
    StringSet,
}

impl DataType {
    /// True for types that unify under numeric arithmetic/comparison.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Id | DataType::Int | DataType::Decimal(_))
    }

    /// Result type of arithmetic between two numeric types: INT unless a
    /// decimal is involved, in which case DECIMAL at the larger scale.
    /// ID behaves as INT for arithmetic.
    pub fn unify_arithmetic(self, other: DataType) -> Option<DataType> {
        use DataType::*;
        match (self, other) {
            (Decimal(a), Decimal(b)) => Some(Decimal(a.max(b))),
            (Decimal(s), Id | Int) | (Id | Int, Decimal(s)) => Some(Decimal(s)),
            (Id | Int, Id | Int) => Some(Int),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Id => write!(f, "ID"),
            DataType::Int => write!(f, "INT"),
            DataType::Bool => write!(f, "BOOL"),
            DataType::String => write!(f, "STRING"),
            DataType::Decimal(scale) => write!(f, "DECIMAL({})", scale),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::IdSet => write!(f, "IDSET"),
            DataType::StringSet => write!(f, "STRINGSET"),
        }
    }
}
