//! Plan operators
//!
//! A compiled statement is a tree of `Operator` values. The enum is closed:
//! every operator the engine can execute has a variant here, and execution
//! dispatches on it exhaustively. Relation operators expose their output
//! schema and children; `describe` renders the tree as a serializable plan
//! for EXPLAIN-style output.

use crate::engine::{ClusterInfo, IndexInfo};
use crate::error::{Error, Result};
use crate::types::expression::Expression;
use crate::types::schema::{Column, Schema, ID_COLUMN};
use crate::types::data_type::DataType;
use serde::Serialize;

/// A compiled, executable statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub root: Operator,
    /// Non-fatal planner diagnostics, in the order they were raised.
    pub warnings: Vec<String>,
}

/// Sort direction for one ORDER BY key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

/// One compiled ORDER BY key: an expression over the output row plus a
/// direction. Plain column keys compile to `Expression::Column`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub key: Expression,
    pub direction: Direction,
}

/// A system catalog relation, with engine metadata snapshotted at plan time
/// so the result set is stable for the life of the plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Catalog {
    Tables { snapshot: Vec<IndexInfo> },
    Columns { table: String, snapshot: IndexInfo },
    ClusterInfo { snapshot: ClusterInfo },
}

impl Catalog {
    pub fn relation_name(&self) -> &'static str {
        match self {
            Catalog::Tables { .. } => "sys_tables",
            Catalog::Columns { .. } => "sys_columns",
            Catalog::ClusterInfo { .. } => "sys_cluster_info",
        }
    }

    pub fn schema(&self) -> Schema {
        let columns: &[(&str, DataType)] = match self {
            Catalog::Tables { .. } => &[
                (ID_COLUMN, DataType::String),
                ("name", DataType::String),
                ("owner", DataType::String),
                ("updated_by", DataType::String),
                ("created_at", DataType::Timestamp),
                ("updated_at", DataType::Timestamp),
                ("keys", DataType::Bool),
                ("description", DataType::String),
            ],
            Catalog::Columns { .. } => &[
                (ID_COLUMN, DataType::String),
                ("name", DataType::String),
                ("type", DataType::String),
                ("internal_type", DataType::String),
                ("created_at", DataType::Timestamp),
                ("keys", DataType::Bool),
                ("cache_type", DataType::String),
                ("cache_size", DataType::Int),
                ("scale", DataType::Int),
                ("min", DataType::Decimal(0)),
                ("max", DataType::Decimal(0)),
                ("timeunit", DataType::String),
                ("epoch", DataType::Int),
                ("timequantum", DataType::String),
                ("ttl", DataType::String),
            ],
            Catalog::ClusterInfo { .. } => &[
                ("name", DataType::String),
                ("platform", DataType::String),
                ("platform_version", DataType::String),
                ("db_version", DataType::String),
                ("state", DataType::String),
                ("node_count", DataType::Int),
                ("shard_width", DataType::Int),
                ("replica_count", DataType::Int),
            ],
        };
        Schema::new(
            columns
                .iter()
                .map(|(name, data_type)| Column::new(self.relation_name(), *name, *data_type))
                .collect(),
        )
    }
}

/// A plan-tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Produces exactly one empty row; source for FROM-less SELECT.
    SingleRow,
    /// Full scan of a stored table in `_id` order.
    TableScan { table: String, schema: Schema },
    /// Scan over a system catalog snapshot.
    CatalogScan { catalog: Catalog },
    /// Drops rows whose predicate is not TRUE (NULL filters out).
    Filter {
        source: Box<Operator>,
        predicate: Expression,
    },
    /// Computes one output value per expression.
    Project {
        source: Box<Operator>,
        expressions: Vec<Expression>,
        schema: Schema,
    },
    /// Materializing sort; NULLs first ascending, last descending.
    OrderBy {
        source: Box<Operator>,
        keys: Vec<SortKey>,
    },
    /// Drops duplicate rows, keeping first occurrence order.
    Distinct { source: Box<Operator> },
    /// Passes through at most `n` rows, preserving upstream order.
    Top { source: Box<Operator>, n: u64 },

    CreateTable { info: IndexInfo },
    AlterTable { table: String, action: AlterOp },
    DropTable { table: String },
    /// Upsert of literal rows; values are evaluated then converted to the
    /// target column types.
    Insert {
        table: String,
        columns: Vec<String>,
        column_types: Vec<DataType>,
        rows: Vec<Vec<Expression>>,
    },
    BulkInsert { table: String, bulk: BulkPlan },
}

/// A compiled ALTER TABLE action.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterOp {
    AddColumn(crate::engine::FieldSchema),
    DropColumn(String),
}

/// Source-field locator for one bulk map entry.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkSource {
    /// CSV record ordinal.
    Ordinal(usize),
    /// NDJSON top-level key (from a `$.key` path).
    Key(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BulkFormat {
    Csv,
    Ndjson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BulkInput {
    File,
    Stream,
}

/// A compiled BULK INSERT: where the data comes from, how each source field
/// maps into typed values, and how those become target-column rows.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkPlan {
    pub columns: Vec<String>,
    pub column_types: Vec<DataType>,
    /// One entry per source field: locator plus declared scalar type.
    pub map: Vec<(BulkSource, DataType)>,
    /// When present, one expression per target column over `@N` variables;
    /// otherwise map entries pass through positionally.
    pub transforms: Option<Vec<Expression>>,
    pub source: String,
    pub format: BulkFormat,
    pub input: BulkInput,
    pub batch_size: usize,
    pub rows_limit: Option<u64>,
    pub header_row: bool,
}

impl Operator {
    /// Output schema. Empty for statements that return no rows.
    pub fn schema(&self) -> Schema {
        match self {
            Operator::SingleRow => Schema::default(),
            Operator::TableScan { schema, .. } => schema.clone(),
            Operator::CatalogScan { catalog } => catalog.schema(),
            Operator::Filter { source, .. }
            | Operator::OrderBy { source, .. }
            | Operator::Distinct { source }
            | Operator::Top { source, .. } => source.schema(),
            Operator::Project { schema, .. } => schema.clone(),
            Operator::CreateTable { .. }
            | Operator::AlterTable { .. }
            | Operator::DropTable { .. }
            | Operator::Insert { .. }
            | Operator::BulkInsert { .. } => Schema::default(),
        }
    }

    pub fn children(&self) -> Vec<&Operator> {
        match self {
            Operator::Filter { source, .. }
            | Operator::Project { source, .. }
            | Operator::OrderBy { source, .. }
            | Operator::Distinct { source }
            | Operator::Top { source, .. } => vec![source],
            _ => vec![],
        }
    }

    /// Rebuilds this operator with new children, preserving parameters.
    pub fn with_children(&self, mut children: Vec<Operator>) -> Result<Operator> {
        let expected = self.children().len();
        if children.len() != expected {
            return Err(Error::Internal(format!(
                "operator expects {} children, got {}",
                expected,
                children.len()
            )));
        }
        let mut take = || Box::new(children.remove(0));
        Ok(match self {
            Operator::Filter { predicate, .. } => Operator::Filter {
                source: take(),
                predicate: predicate.clone(),
            },
            Operator::Project {
                expressions,
                schema,
                ..
            } => Operator::Project {
                source: take(),
                expressions: expressions.clone(),
                schema: schema.clone(),
            },
            Operator::OrderBy { keys, .. } => Operator::OrderBy {
                source: take(),
                keys: keys.clone(),
            },
            Operator::Distinct { .. } => Operator::Distinct { source: take() },
            Operator::Top { n, .. } => Operator::Top {
                source: take(),
                n: *n,
            },
            leaf => leaf.clone(),
        })
    }

    /// Serializable plan description, one variant per operator.
    pub fn describe(&self) -> OperatorPlan {
        match self {
            Operator::SingleRow => OperatorPlan::SingleRow,
            Operator::TableScan { table, schema } => OperatorPlan::TableScan {
                table: table.clone(),
                columns: schema.columns().iter().map(|c| c.name.clone()).collect(),
            },
            Operator::CatalogScan { catalog } => OperatorPlan::CatalogScan {
                relation: catalog.relation_name().into(),
            },
            Operator::Filter { source, predicate } => OperatorPlan::Filter {
                predicate: predicate.to_string(),
                input: Box::new(source.describe()),
            },
            Operator::Project {
                source,
                expressions,
                schema,
            } => OperatorPlan::Project {
                columns: schema
                    .columns()
                    .iter()
                    .zip(expressions)
                    .map(|(col, expr)| format!("{}: {}", col.name, expr))
                    .collect(),
                input: Box::new(source.describe()),
            },
            Operator::OrderBy { source, keys } => OperatorPlan::OrderBy {
                keys: keys
                    .iter()
                    .map(|k| {
                        let dir = match k.direction {
                            Direction::Ascending => "asc",
                            Direction::Descending => "desc",
                        };
                        format!("{} {}", k.key, dir)
                    })
                    .collect(),
                input: Box::new(source.describe()),
            },
            Operator::Distinct { source } => OperatorPlan::Distinct {
                input: Box::new(source.describe()),
            },
            Operator::Top { source, n } => OperatorPlan::Top {
                n: *n,
                input: Box::new(source.describe()),
            },
            Operator::CreateTable { info } => OperatorPlan::CreateTable {
                table: info.name.clone(),
            },
            Operator::AlterTable { table, action } => OperatorPlan::AlterTable {
                table: table.clone(),
                action: match action {
                    AlterOp::AddColumn(field) => format!("add column '{}'", field.name),
                    AlterOp::DropColumn(name) => format!("drop column '{}'", name),
                },
            },
            Operator::DropTable { table } => OperatorPlan::DropTable {
                table: table.clone(),
            },
            Operator::Insert { table, rows, .. } => OperatorPlan::Insert {
                table: table.clone(),
                rows: rows.len(),
            },
            Operator::BulkInsert { table, bulk } => OperatorPlan::BulkInsert {
                table: table.clone(),
                source: bulk.source.clone(),
                format: bulk.format,
                input: bulk.input,
            },
        }
    }
}

/// Serializable plan tree, the output of [`Operator::describe`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperatorPlan {
    SingleRow,
    TableScan {
        table: String,
        columns: Vec<String>,
    },
    CatalogScan {
        relation: String,
    },
    Filter {
        predicate: String,
        input: Box<OperatorPlan>,
    },
    Project {
        columns: Vec<String>,
        input: Box<OperatorPlan>,
    },
    OrderBy {
        keys: Vec<String>,
        input: Box<OperatorPlan>,
    },
    Distinct {
        input: Box<OperatorPlan>,
    },
    Top {
        n: u64,
        input: Box<OperatorPlan>,
    },
    CreateTable {
        table: String,
    },
    AlterTable {
        table: String,
        action: String,
    },
    DropTable {
        table: String,
    },
    Insert {
        table: String,
        rows: usize,
    },
    BulkInsert {
        table: String,
        source: String,
        format: BulkFormat,
        input: BulkInput,
    },
}
