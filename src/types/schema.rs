//! Relation schemas
//!
//! A relation is an ordered list of named, typed columns. Column identity for
//! resolution is `(relation, name)`; the relation part is empty for computed
//! columns. The `_id` column, when present, is always first and its type (ID
//! vs STRING) decides whether the table is keyed.

use super::data_type::DataType;
use crate::error::{Error, Result};
use crate::parsing::ast::Pos;
use serde::{Deserialize, Serialize};

/// The implicit primary identifier column.
pub const ID_COLUMN: &str = "_id";

/// A column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Owning relation name or alias; empty for computed columns.
    pub relation: String,
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(
        relation: impl Into<String>,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Column {
            relation: relation.into(),
            name: name.into(),
            data_type,
        }
    }
}

/// An ordered column list describing an operator's output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema(pub Vec<Column>);

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Schema(columns)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.0
    }

    /// Resolves a column reference by `(qualifier?, name)`.
    ///
    /// Qualifiers match the relation name case-sensitively. Unqualified
    /// references must be unambiguous across all in-scope relations.
    pub fn resolve(&self, qualifier: Option<&str>, name: &str, pos: Pos) -> Result<usize> {
        let mut found: Option<usize> = None;
        for (i, col) in self.0.iter().enumerate() {
            if col.name != name {
                continue;
            }
            if let Some(q) = qualifier {
                if col.relation != q {
                    continue;
                }
            }
            if found.is_some() {
                return Err(Error::AmbiguousColumn {
                    name: name.into(),
                    pos,
                });
            }
            found = Some(i);
        }
        found.ok_or_else(|| Error::ColumnNotFound {
            name: name.into(),
            pos,
        })
    }

    /// Checks the `(relation, name)` uniqueness invariant for non-empty
    /// relation names.
    pub fn validate(&self) -> Result<()> {
        for (i, a) in self.0.iter().enumerate() {
            if a.relation.is_empty() {
                continue;
            }
            for b in &self.0[i + 1..] {
                if a.relation == b.relation && a.name == b.name {
                    return Err(Error::Internal(format!(
                        "duplicate column '{}.{}' in schema",
                        a.relation, a.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("t", ID_COLUMN, DataType::Id),
            Column::new("t", "a", DataType::Int),
            Column::new("u", "a", DataType::Int),
            Column::new("u", "b", DataType::String),
        ])
    }

    #[test]
    fn qualified_resolution() {
        let s = schema();
        assert_eq!(s.resolve(Some("t"), "a", Pos::default()).unwrap(), 1);
        assert_eq!(s.resolve(Some("u"), "a", Pos::default()).unwrap(), 2);
    }

    #[test]
    fn unqualified_must_be_unambiguous() {
        let s = schema();
        assert_eq!(s.resolve(None, "b", Pos::default()).unwrap(), 3);
        assert!(matches!(
            s.resolve(None, "a", Pos::new(1, 8)),
            Err(Error::AmbiguousColumn { .. })
        ));
        assert!(matches!(
            s.resolve(None, "zzz", Pos::new(1, 8)),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn duplicate_detection_skips_computed_columns() {
        let s = Schema::new(vec![
            Column::new("", "", DataType::Int),
            Column::new("", "", DataType::Int),
        ]);
        assert!(s.validate().is_ok());

        let s = Schema::new(vec![
            Column::new("t", "a", DataType::Int),
            Column::new("t", "a", DataType::Int),
        ]);
        assert!(s.validate().is_err());
    }
}
