//! Plan execution
//!
//! `execute` dispatches a compiled plan against an engine. Query plans come
//! back as a lazy row iterator; DDL and insert plans run to completion and
//! report counts.

pub mod bulk;
pub mod catalog;
pub mod ddl;
pub mod insert;
pub mod query;

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::planning::{Operator, Plan};
use crate::types::context::ExecutionContext;
use crate::types::data_type::DataType;
use crate::types::schema::Schema;
use crate::types::value::{Row, Value};
use rust_decimal::Decimal;

/// A stream of result rows. Exhaustion is terminal and idempotent; an error
/// item is terminal.
pub type Rows<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// The outcome of executing one statement.
pub enum StatementResult<'a> {
    Query { schema: Schema, rows: Rows<'a> },
    CreateTable,
    AlterTable,
    DropTable,
    Insert { count: u64 },
    BulkInsert { count: u64 },
}

/// Executes a compiled plan.
pub fn execute<'a>(
    plan: &'a Plan,
    engine: &'a dyn Engine,
    ctx: &ExecutionContext,
) -> Result<StatementResult<'a>> {
    ctx.check()?;
    match &plan.root {
        op @ (Operator::SingleRow
        | Operator::TableScan { .. }
        | Operator::CatalogScan { .. }
        | Operator::Filter { .. }
        | Operator::Project { .. }
        | Operator::OrderBy { .. }
        | Operator::Distinct { .. }
        | Operator::Top { .. }) => Ok(StatementResult::Query {
            schema: op.schema(),
            rows: query::rows(op, engine, ctx.clone())?,
        }),
        Operator::CreateTable { info } => {
            ddl::create_table(engine, info)?;
            Ok(StatementResult::CreateTable)
        }
        Operator::AlterTable { table, action } => {
            ddl::alter_table(engine, table, action)?;
            Ok(StatementResult::AlterTable)
        }
        Operator::DropTable { table } => {
            ddl::drop_table(engine, table)?;
            Ok(StatementResult::DropTable)
        }
        Operator::Insert {
            table,
            columns,
            column_types,
            rows,
        } => Ok(StatementResult::Insert {
            count: insert::execute(engine, table, columns, column_types, rows)?,
        }),
        Operator::BulkInsert { table, bulk } => Ok(StatementResult::BulkInsert {
            count: bulk::execute(engine, table, bulk, ctx)?,
        }),
    }
}

/// Converts a value to a target column type. NULL converts to anything;
/// everything else either already matches, widens numerically, or fails.
pub(crate) fn convert(value: Value, target: DataType) -> Result<Value> {
    let fail = |value: &Value| Error::ValueConversion {
        value: raw_text(value),
        target: target.to_string(),
    };
    Ok(match (value, target) {
        (Value::Null, _) => Value::Null,

        (v @ Value::Id(_), DataType::Id) => v,
        (Value::Int(n), DataType::Id) => {
            u64::try_from(n).map(Value::Id).map_err(|_| fail(&Value::Int(n)))?
        }
        (Value::String(s), DataType::Id) => {
            s.parse().map(Value::Id).map_err(|_| fail(&Value::String(s.clone())))?
        }

        (v @ Value::Int(_), DataType::Int) => v,
        (Value::Id(n), DataType::Int) => {
            i64::try_from(n).map(Value::Int).map_err(|_| fail(&Value::Id(n)))?
        }
        (Value::String(s), DataType::Int) => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| fail(&Value::String(s.clone())))?,

        (Value::Decimal(mut d), DataType::Decimal(scale)) => {
            d.rescale(scale);
            Value::Decimal(d)
        }
        (Value::Int(n), DataType::Decimal(scale)) => {
            let mut d = Decimal::from(n);
            d.rescale(scale);
            Value::Decimal(d)
        }
        (Value::String(s), DataType::Decimal(scale)) => {
            let mut d: Decimal = s
                .trim()
                .parse()
                .map_err(|_| fail(&Value::String(s.clone())))?;
            d.rescale(scale);
            Value::Decimal(d)
        }

        (v @ Value::Bool(_), DataType::Bool) => v,
        (Value::Int(0), DataType::Bool) => Value::Bool(false),
        (Value::Int(1), DataType::Bool) => Value::Bool(true),
        (Value::String(s), DataType::Bool) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => return Err(fail(&Value::String(s.clone()))),
        },

        (v @ Value::Timestamp(_), DataType::Timestamp) => v,
        (Value::String(s), DataType::Timestamp) => s
            .trim()
            .parse::<chrono::DateTime<chrono::Utc>>()
            .map(Value::Timestamp)
            .map_err(|_| fail(&Value::String(s.clone())))?,
        (Value::Int(n), DataType::Timestamp) => chrono::DateTime::from_timestamp(n, 0)
            .map(Value::Timestamp)
            .ok_or_else(|| fail(&Value::Int(n)))?,

        (v @ Value::String(_), DataType::String) => v,
        (v @ Value::IdSet(_), DataType::IdSet) => v,
        (v @ Value::StringSet(_), DataType::StringSet) => v,

        (v, _) => return Err(fail(&v)),
    })
}

/// Unquoted rendering for conversion error messages.
pub(crate) fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
