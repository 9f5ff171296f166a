//! BULK INSERT execution
//!
//! Streams records from a CSV or NDJSON datasource, converts each through
//! the compiled map (and transforms, when present), and writes batches as
//! they fill. Flushed batches stay committed if a later record or flush
//! fails.

use super::{convert, insert};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::planning::operator::{BulkFormat, BulkInput, BulkPlan, BulkSource};
use crate::types::context::ExecutionContext;
use crate::types::data_type::DataType;
use crate::types::evaluator::evaluate;
use crate::types::value::{Row, Value};
use rust_decimal::Decimal;
use std::io::{BufRead, BufReader, Cursor, Read};
use tracing::debug;

pub fn execute(
    engine: &dyn Engine,
    table: &str,
    bulk: &BulkPlan,
    ctx: &ExecutionContext,
) -> Result<u64> {
    let reader = open_source(bulk)?;
    let records = open_records(bulk, reader);
    let (id_position, field_columns) = insert::split_id(&bulk.columns)?;

    let mut ingested: u64 = 0;
    let mut produced: u64 = 0;
    let mut batch: Vec<Row> = Vec::with_capacity(bulk.batch_size);

    for record in records {
        ctx.check()?;
        let source_values = record?;

        let values = match &bulk.transforms {
            Some(exprs) => exprs
                .iter()
                .zip(&bulk.column_types)
                .map(|(expr, target)| convert(evaluate(expr, &source_values)?, *target))
                .collect::<Result<Vec<_>>>()?,
            None => source_values
                .into_iter()
                .zip(&bulk.column_types)
                .map(|(value, target)| convert(value, *target))
                .collect::<Result<Vec<_>>>()?,
        };
        batch.push(insert::reorder_id_first(values, id_position));
        produced += 1;

        if batch.len() >= bulk.batch_size {
            ctx.check()?;
            flush(engine, table, &field_columns, &mut batch, &mut ingested)?;
        }
        if bulk.rows_limit.is_some_and(|limit| produced >= limit) {
            break;
        }
    }

    if !batch.is_empty() {
        ctx.check()?;
        flush(engine, table, &field_columns, &mut batch, &mut ingested)?;
    }
    debug!(table, ingested, "bulk insert complete");
    Ok(ingested)
}

fn flush(
    engine: &dyn Engine,
    table: &str,
    field_columns: &[String],
    batch: &mut Vec<Row>,
    ingested: &mut u64,
) -> Result<()> {
    let rows = std::mem::take(batch);
    let count = rows.len() as u64;
    engine
        .insert(table, field_columns, rows)
        .map_err(|e| Error::BulkPartialFailure {
            ingested: *ingested,
            source: Box::new(e),
        })?;
    *ingested += count;
    debug!(table, count, total = *ingested, "flushed batch");
    Ok(())
}

fn open_source(bulk: &BulkPlan) -> Result<Box<dyn Read>> {
    match bulk.input {
        BulkInput::File => {
            let file = std::fs::File::open(&bulk.source).map_err(|e| {
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("file '{}' does not exist", bulk.source)
                } else {
                    e.to_string()
                };
                Error::DatasourceUnreadable {
                    datasource: bulk.source.clone(),
                    reason,
                }
            })?;
            Ok(Box::new(file))
        }
        BulkInput::Stream => Ok(Box::new(Cursor::new(bulk.source.clone().into_bytes()))),
    }
}

/// Decoded source records: one `Vec<Value>` per record, in map-entry order
/// and converted to the map's declared types.
fn open_records<'a>(
    bulk: &'a BulkPlan,
    reader: Box<dyn Read>,
) -> Box<dyn Iterator<Item = Result<Vec<Value>>> + 'a> {
    match bulk.format {
        BulkFormat::Csv => {
            let rdr = csv::ReaderBuilder::new()
                .has_headers(bulk.header_row)
                .flexible(true)
                .from_reader(reader);
            Box::new(rdr.into_records().map(move |record| {
                let record = record.map_err(|e| Error::DatasourceUnreadable {
                    datasource: bulk.source.clone(),
                    reason: e.to_string(),
                })?;
                bulk.map
                    .iter()
                    .map(|(source, target)| match source {
                        BulkSource::Ordinal(n) => {
                            let text =
                                record.get(*n).ok_or(Error::MapIndexOutOfRange(*n))?;
                            decode_text(text, *target)
                        }
                        BulkSource::Key(key) => Err(Error::UnknownKey(key.clone())),
                    })
                    .collect()
            }))
        }
        BulkFormat::Ndjson => {
            let lines = BufReader::new(reader).lines();
            Box::new(
                lines
                    .filter(|line| match line {
                        Ok(text) => !text.trim().is_empty(),
                        Err(_) => true,
                    })
                    .map(move |line| {
                        let line = line.map_err(|e| Error::DatasourceUnreadable {
                            datasource: bulk.source.clone(),
                            reason: e.to_string(),
                        })?;
                        let record: serde_json::Value =
                            serde_json::from_str(&line).map_err(|e| {
                                Error::DatasourceUnreadable {
                                    datasource: bulk.source.clone(),
                                    reason: e.to_string(),
                                }
                            })?;
                        let object =
                            record
                                .as_object()
                                .ok_or_else(|| Error::DatasourceUnreadable {
                                    datasource: bulk.source.clone(),
                                    reason: "record is not a JSON object".into(),
                                })?;
                        bulk.map
                            .iter()
                            .map(|(source, target)| match source {
                                BulkSource::Key(key) => {
                                    let value = object
                                        .get(key)
                                        .ok_or_else(|| Error::UnknownKey(key.clone()))?;
                                    decode_json(value, *target)
                                }
                                BulkSource::Ordinal(n) => Err(Error::MapIndexOutOfRange(*n)),
                            })
                            .collect()
                    }),
            )
        }
    }
}

/// A CSV field converted to its declared map type. Empty fields are NULL,
/// except for `id` targets: a row identifier must not be NULL.
fn decode_text(text: &str, target: DataType) -> Result<Value> {
    if text.is_empty() {
        if target == DataType::Id {
            return Err(Error::ValueConversion {
                value: String::new(),
                target: target.to_string(),
            });
        }
        return Ok(Value::Null);
    }
    convert(Value::String(text.to_string()), target)
}

/// A JSON value converted to its declared map type.
fn decode_json(value: &serde_json::Value, target: DataType) -> Result<Value> {
    let fail = || Error::ValueConversion {
        value: value.to_string(),
        target: target.to_string(),
    };
    let intermediate = match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(v) => Value::Int(v),
            None => n
                .to_string()
                .parse::<Decimal>()
                .map(Value::Decimal)
                .map_err(|_| fail())?,
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => match target {
            DataType::IdSet => Value::IdSet(
                items
                    .iter()
                    .map(|v| v.as_u64().ok_or_else(fail))
                    .collect::<Result<_>>()?,
            ),
            DataType::StringSet => Value::StringSet(
                items
                    .iter()
                    .map(|v| v.as_str().map(String::from).ok_or_else(fail))
                    .collect::<Result<_>>()?,
            ),
            _ => return Err(fail()),
        },
        serde_json::Value::Object(_) => return Err(fail()),
    };
    convert(intermediate, target).map_err(|_| fail())
}
