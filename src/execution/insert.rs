//! INSERT ... VALUES execution
//!
//! Evaluates each row's expressions, converts them to the target column
//! types, and writes the batch in one engine call.

use super::convert;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::types::data_type::DataType;
use crate::types::evaluator::evaluate;
use crate::types::expression::Expression;
use crate::types::schema::ID_COLUMN;
use crate::types::value::{Row, Value};
use tracing::debug;

pub fn execute(
    engine: &dyn Engine,
    table: &str,
    columns: &[String],
    column_types: &[DataType],
    rows: &[Vec<Expression>],
) -> Result<u64> {
    let (id_position, field_columns) = split_id(columns)?;

    let mut out = Vec::with_capacity(rows.len());
    for exprs in rows {
        let mut values = Vec::with_capacity(exprs.len());
        for (expr, target) in exprs.iter().zip(column_types) {
            values.push(convert(evaluate(expr, &[])?, *target)?);
        }
        out.push(reorder_id_first(values, id_position));
    }

    let count = out.len() as u64;
    engine.insert(table, &field_columns, out)?;
    debug!(table, count, "inserted rows");
    Ok(count)
}

/// Splits a target column list into the `_id` position and the remaining
/// field names in order.
pub(crate) fn split_id(columns: &[String]) -> Result<(usize, Vec<String>)> {
    let id_position = columns
        .iter()
        .position(|c| c == ID_COLUMN)
        .ok_or_else(|| Error::Internal("target columns missing _id".into()))?;
    let field_columns = columns
        .iter()
        .filter(|c| *c != ID_COLUMN)
        .cloned()
        .collect();
    Ok((id_position, field_columns))
}

/// Rearranges one produced row into engine layout: `_id` first, then the
/// field values in target-column order.
pub(crate) fn reorder_id_first(mut values: Vec<Value>, id_position: usize) -> Row {
    let id = values.remove(id_position);
    let mut row = Vec::with_capacity(values.len() + 1);
    row.push(id);
    row.extend(values);
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorders_id_to_front() {
        let columns = vec!["a".to_string(), ID_COLUMN.to_string(), "b".to_string()];
        let (id_position, fields) = split_id(&columns).unwrap();
        assert_eq!(id_position, 1);
        assert_eq!(fields, vec!["a".to_string(), "b".to_string()]);

        let row = reorder_id_first(
            vec![Value::Int(10), Value::Id(1), Value::Int(20)],
            id_position,
        );
        assert_eq!(row, vec![Value::Id(1), Value::Int(10), Value::Int(20)]);
    }
}
