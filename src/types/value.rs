//! SQL values
//!
//! A tagged union over every scalar the engine produces. Rows carry no type
//! tags of their own; values are late-bound to the schema's declared types.

use super::data_type::DataType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

/// A row of values, one per schema column.
pub type Row = Vec<Value>;

/// A SQL value.
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Id(u64),
    Int(i64),
    Bool(bool),
    String(String),
    /// Decimal values always carry an explicit scale.
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
    IdSet(Vec<u64>),
    StringSet(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The runtime type of this value, if it has one (NULL does not).
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Id(_) => Some(DataType::Id),
            Value::Int(_) => Some(DataType::Int),
            Value::Bool(_) => Some(DataType::Bool),
            Value::String(_) => Some(DataType::String),
            Value::Decimal(d) => Some(DataType::Decimal(d.scale())),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::IdSet(_) => Some(DataType::IdSet),
            Value::StringSet(_) => Some(DataType::StringSet),
        }
    }

    /// Numeric view for arithmetic/comparison unification. ID widens to INT.
    pub(crate) fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Id(v) => Some(Decimal::from(*v)),
            Value::Int(v) => Some(Decimal::from(*v)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Id(v) => i64::try_from(*v).ok(),
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Id(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::IdSet(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::StringSet(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}'", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Id(v) => write!(f, "Id({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::String(s) => write!(f, "String({})", s),
            Value::Decimal(d) => write!(f, "Decimal({})", d),
            Value::Timestamp(ts) => write!(f, "Timestamp({})", ts.to_rfc3339()),
            Value::IdSet(vs) => write!(f, "IdSet({:?})", vs),
            Value::StringSet(vs) => write!(f, "StringSet({:?})", vs),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Id(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::String(s) => s.hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::Timestamp(ts) => ts.hash(state),
            Value::IdSet(vs) => vs.hash(state),
            Value::StringSet(vs) => vs.hash(state),
        }
    }
}

impl Eq for Value {}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,

            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::IdSet(a), Value::IdSet(b)) => a.cmp(b),
            (Value::StringSet(a), Value::StringSet(b)) => a.cmp(b),

            // Numeric values unify; Decimal comparison rescales internally.
            (a, b) => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => x.cmp(&y),
                // Differing non-comparable types sort by discriminant to keep
                // the ordering total.
                _ => discriminant_rank(a).cmp(&discriminant_rank(b)),
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn discriminant_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Id(_) => 1,
        Value::Int(_) => 2,
        Value::Bool(_) => 3,
        Value::String(_) => 4,
        Value::Decimal(_) => 5,
        Value::Timestamp(_) => 6,
        Value::IdSet(_) => 7,
        Value::StringSet(_) => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn numeric_values_unify_for_comparison() {
        assert_eq!(Value::Id(3).cmp(&Value::Int(3)), Ordering::Equal);
        assert_eq!(
            Value::Int(2).cmp(&Value::Decimal(Decimal::new(250, 2))),
            Ordering::Less
        );
        // 10.30 == 10.3 after rescaling
        assert_eq!(
            Value::Decimal(Decimal::new(1030, 2)).cmp(&Value::Decimal(Decimal::new(103, 1))),
            Ordering::Equal
        );
    }

    #[test]
    fn nulls_sort_first() {
        let mut vals = vec![Value::Int(1), Value::Null, Value::Int(0)];
        vals.sort();
        assert_eq!(vals[0], Value::Null);
    }
}
