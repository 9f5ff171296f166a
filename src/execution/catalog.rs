//! System catalog row production
//!
//! Renders engine metadata snapshots as rows. Timestamps are stored by the
//! engine as nanoseconds; catalogs surface them as TIMESTAMP values.

use crate::engine::{FieldSchema, IndexInfo};
use crate::planning::operator::Catalog;
use crate::types::value::{Row, Value};
use chrono::DateTime;

/// Produces the full row set for a catalog snapshot.
pub fn rows(catalog: &Catalog) -> Vec<Row> {
    match catalog {
        Catalog::Tables { snapshot } => snapshot.iter().map(table_row).collect(),
        Catalog::Columns { snapshot, .. } => column_rows(snapshot),
        Catalog::ClusterInfo { snapshot } => vec![vec![
            Value::String(snapshot.name.clone()),
            Value::String(snapshot.platform.clone()),
            Value::String(snapshot.platform_version.clone()),
            Value::String(snapshot.db_version.clone()),
            Value::String(snapshot.state.clone()),
            Value::Int(snapshot.node_count),
            Value::Int(snapshot.shard_width),
            Value::Int(snapshot.replica_count),
        ]],
    }
}

fn table_row(info: &IndexInfo) -> Row {
    vec![
        Value::String(info.name.clone()),
        Value::String(info.name.clone()),
        Value::String(info.owner.clone()),
        Value::String(info.updated_by.clone()),
        timestamp(info.created_at),
        timestamp(info.updated_at),
        Value::Bool(info.keys),
        Value::String(info.description.clone()),
    ]
}

fn column_rows(info: &IndexInfo) -> Vec<Row> {
    let mut out = Vec::with_capacity(info.fields.len() + 1);

    // `_id` leads, typed by the index's keyed-ness.
    let id_type = if info.keys { "string" } else { "id" };
    out.push(vec![
        Value::String("_id".into()),
        Value::String("_id".into()),
        Value::String(id_type.into()),
        Value::String(id_type.into()),
        timestamp(info.created_at),
        Value::Bool(info.keys),
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
    ]);

    for field in &info.fields {
        out.push(field_row(field));
    }
    out
}

fn field_row(field: &FieldSchema) -> Row {
    let opts = &field.options;
    vec![
        Value::String(field.name.clone()),
        Value::String(field.name.clone()),
        Value::String(field.data_type.to_string().to_lowercase()),
        Value::String(opts.kind.as_str().into()),
        timestamp(field.created_at),
        Value::Bool(opts.keys),
        opts.cache_type
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Value::Int(opts.cache_size as i64),
        Value::Int(opts.scale as i64),
        opts.min.map(Value::Decimal).unwrap_or(Value::Null),
        opts.max.map(Value::Decimal).unwrap_or(Value::Null),
        opts.time_unit
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Value::Int(opts.base),
        opts.time_quantum
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
        if opts.time_quantum.is_some() {
            Value::String(format!("{}s", opts.ttl_seconds))
        } else {
            Value::Null
        },
    ]
}

fn timestamp(ns: i64) -> Value {
    Value::Timestamp(DateTime::from_timestamp_nanos(ns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ClusterInfo, FieldKind, FieldOptions};
    use crate::planning::operator::Catalog;
    use crate::types::data_type::DataType;

    #[test]
    fn tables_rows_match_catalog_schema_width() {
        let catalog = Catalog::Tables {
            snapshot: vec![IndexInfo {
                name: "t".into(),
                keys: true,
                owner: String::new(),
                updated_by: String::new(),
                description: String::new(),
                created_at: 0,
                updated_at: 0,
                fields: vec![],
            }],
        };
        let rows = rows(&catalog);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), catalog.schema().len());
        assert_eq!(rows[0][6], Value::Bool(true));
    }

    #[test]
    fn columns_rows_lead_with_id() {
        let info = IndexInfo {
            name: "t".into(),
            keys: false,
            owner: String::new(),
            updated_by: String::new(),
            description: String::new(),
            created_at: 0,
            updated_at: 0,
            fields: vec![FieldSchema {
                name: "tags".into(),
                data_type: DataType::StringSet,
                options: FieldOptions {
                    kind: FieldKind::Time,
                    keys: true,
                    time_quantum: Some("YMD".into()),
                    ttl_seconds: 3600,
                    ..FieldOptions::default()
                },
                created_at: 0,
            }],
        };
        let catalog = Catalog::Columns {
            table: "t".into(),
            snapshot: info,
        };
        let rows = rows(&catalog);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::String("_id".into()));
        assert_eq!(rows[1][2], Value::String("stringset".into()));
        assert_eq!(rows[1][3], Value::String("time".into()));
        assert_eq!(rows[1][13], Value::String("YMD".into()));
        assert_eq!(rows[1][14], Value::String("3600s".into()));
        for row in &rows {
            assert_eq!(row.len(), catalog.schema().len());
        }
    }

    #[test]
    fn cluster_info_is_one_row() {
        let catalog = Catalog::ClusterInfo {
            snapshot: ClusterInfo {
                name: "cluster0".into(),
                platform: "linux".into(),
                platform_version: String::new(),
                db_version: "0.1.0".into(),
                state: "NORMAL".into(),
                node_count: 1,
                shard_width: 1 << 20,
                replica_count: 1,
            },
        };
        let rows = rows(&catalog);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][4], Value::String("NORMAL".into()));
    }
}
