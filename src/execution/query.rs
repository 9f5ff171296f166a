//! Query operator execution
//!
//! Builds a lazy iterator pipeline for a relational operator tree. Nothing
//! touches the engine until the first row is pulled. OrderBy and Distinct's
//! seen-set are the only materialization points; everything else streams.

use super::Rows;
use crate::engine::Engine;
use crate::error::Result;
use crate::planning::operator::{Catalog, Operator, SortKey};
use crate::planning::Direction;
use crate::types::context::ExecutionContext;
use crate::types::evaluator::evaluate;
use crate::types::value::{Row, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::iter;

/// Opens a row iterator over a relational operator tree.
pub fn rows<'a>(
    op: &'a Operator,
    engine: &'a dyn Engine,
    ctx: ExecutionContext,
) -> Result<Rows<'a>> {
    Ok(Box::new(Terminal {
        inner: build(op, engine, ctx)?,
        done: false,
    }))
}

/// Makes exhaustion and errors terminal: after `None` or an `Err` item, every
/// subsequent `next` returns `None`.
struct Terminal<'a> {
    inner: Rows<'a>,
    done: bool,
}

impl Iterator for Terminal<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next() {
            Some(Ok(row)) => Some(Ok(row)),
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

fn build<'a>(op: &'a Operator, engine: &'a dyn Engine, ctx: ExecutionContext) -> Result<Rows<'a>> {
    Ok(match op {
        Operator::SingleRow => Box::new(iter::once(Ok(Row::new()))),

        Operator::TableScan { table, .. } => {
            // The scan snapshot is taken at first pull, not at open.
            let mut pending: Option<std::vec::IntoIter<Row>> = None;
            Box::new(iter::from_fn(move || {
                if let Err(e) = ctx.check() {
                    return Some(Err(e));
                }
                if pending.is_none() {
                    match engine.scan(table) {
                        Ok(rows) => pending = Some(rows.into_iter()),
                        Err(e) => return Some(Err(e)),
                    }
                }
                pending.as_mut().and_then(|it| it.next()).map(Ok)
            }))
        }

        Operator::CatalogScan { catalog } => catalog_rows(catalog),

        Operator::Filter { source, predicate } => {
            let inner = build(source, engine, ctx)?;
            Box::new(inner.filter_map(move |item| match item {
                Ok(row) => match evaluate(predicate, &row) {
                    // NULL predicates filter the row out, same as FALSE.
                    Ok(Value::Bool(true)) => Some(Ok(row)),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                },
                Err(e) => Some(Err(e)),
            }))
        }

        Operator::Project {
            source,
            expressions,
            ..
        } => {
            let inner = build(source, engine, ctx)?;
            Box::new(inner.map(move |item| {
                let row = item?;
                expressions
                    .iter()
                    .map(|expr| evaluate(expr, &row))
                    .collect()
            }))
        }

        Operator::OrderBy { source, keys } => {
            let inner = build(source, engine, ctx)?;
            sort_rows(inner, keys)
        }

        Operator::Distinct { source } => {
            let inner = build(source, engine, ctx)?;
            let mut seen: HashSet<Row> = HashSet::new();
            Box::new(inner.filter_map(move |item| match item {
                Ok(row) => seen.insert(row.clone()).then_some(Ok(row)),
                Err(e) => Some(Err(e)),
            }))
        }

        Operator::Top { source, n } => {
            let inner = build(source, engine, ctx)?;
            Box::new(inner.take(*n as usize))
        }

        other => {
            return Err(crate::error::Error::Internal(format!(
                "operator {:?} does not produce rows",
                other.describe()
            )));
        }
    })
}

fn catalog_rows<'a>(catalog: &'a Catalog) -> Rows<'a> {
    let mut pending: Option<std::vec::IntoIter<Row>> = None;
    Box::new(iter::from_fn(move || {
        if pending.is_none() {
            pending = Some(super::catalog::rows(catalog).into_iter());
        }
        pending.as_mut().and_then(|it| it.next()).map(Ok)
    }))
}

/// Materializes the source and yields it sorted. Key expressions are
/// evaluated once per row as the buffer fills; a source or key error
/// surfaces instead of any rows.
fn sort_rows<'a>(source: Rows<'a>, keys: &'a [SortKey]) -> Rows<'a> {
    let mut source = Some(source);
    let mut sorted: std::vec::IntoIter<Row> = Vec::new().into_iter();
    Box::new(iter::from_fn(move || {
        if let Some(rows) = source.take() {
            let mut buffer: Vec<(Row, Row)> = Vec::new();
            for row in rows {
                let entry = row.and_then(|row| {
                    let key_values = keys
                        .iter()
                        .map(|key| evaluate(&key.key, &row))
                        .collect::<Result<Row>>()?;
                    Ok((key_values, row))
                });
                match entry {
                    Ok(entry) => buffer.push(entry),
                    Err(e) => return Some(Err(e)),
                }
            }
            buffer.sort_by(|(a, _), (b, _)| compare_keys(a, b, keys));
            sorted = buffer
                .into_iter()
                .map(|(_, row)| row)
                .collect::<Vec<_>>()
                .into_iter();
        }
        sorted.next().map(Ok)
    }))
}

/// Key-wise comparison of evaluated key tuples. `Value`'s ordering puts NULLs
/// first, so reversing for descending keys lands them last.
fn compare_keys(a: &[Value], b: &[Value], keys: &[SortKey]) -> Ordering {
    for (i, key) in keys.iter().enumerate() {
        let ord = a[i].cmp(&b[i]);
        let ord = match key.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::operator::SortKey;
    use crate::types::expression::Expression;

    fn keyed(rows: Vec<Row>, keys: &[SortKey]) -> Vec<Row> {
        let source: Rows = Box::new(rows.into_iter().map(Ok));
        sort_rows(source, keys).map(|r| r.unwrap()).collect()
    }

    #[test]
    fn descending_sort_puts_nulls_last() {
        let keys = [SortKey {
            key: Expression::Column(0),
            direction: Direction::Descending,
        }];
        let out = keyed(
            vec![vec![Value::Null], vec![Value::Int(2)], vec![Value::Int(9)]],
            &keys,
        );
        assert_eq!(
            out,
            vec![vec![Value::Int(9)], vec![Value::Int(2)], vec![Value::Null]]
        );
    }

    #[test]
    fn ascending_sort_puts_nulls_first() {
        let keys = [SortKey {
            key: Expression::Column(0),
            direction: Direction::Ascending,
        }];
        let out = keyed(vec![vec![Value::Int(2)], vec![Value::Null]], &keys);
        assert_eq!(out, vec![vec![Value::Null], vec![Value::Int(2)]]);
    }

    #[test]
    fn terminal_iterator_stops_after_error() {
        let items: Vec<Result<Row>> = vec![
            Ok(vec![Value::Int(1)]),
            Err(crate::error::Error::Cancelled),
            Ok(vec![Value::Int(2)]),
        ];
        let mut it = Terminal {
            inner: Box::new(items.into_iter()),
            done: false,
        };
        assert!(matches!(it.next(), Some(Ok(_))));
        assert!(matches!(it.next(), Some(Err(_))));
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }
}
