//! In-memory storage engine
//!
//! Keeps every index in a `BTreeMap` keyed by `_id` so scans come back in id
//! order. Suitable for tests and single-node embedding; the SQL layer never
//! assumes more than the `Engine` contract.

use super::{now_ns, ClusterInfo, Engine, FieldSchema, IndexInfo};
use crate::error::{Error, Result};
use crate::types::value::{Row, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

struct Index {
    info: IndexInfo,
    /// Rows keyed by `_id`; values follow `info.fields` order.
    rows: BTreeMap<Value, Row>,
}

/// A process-local [`Engine`].
#[derive(Default)]
pub struct MemoryEngine {
    indexes: RwLock<HashMap<String, Index>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for MemoryEngine {
    fn create_index(&self, info: IndexInfo) -> Result<()> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(&info.name) {
            return Err(Error::engine(format!(
                "creating index: index '{}' already exists",
                info.name
            )));
        }
        indexes.insert(
            info.name.clone(),
            Index {
                info,
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn drop_index(&self, name: &str) -> Result<()> {
        let mut indexes = self.indexes.write();
        if indexes.remove(name).is_none() {
            return Err(Error::engine(format!("index '{}' not found", name)));
        }
        Ok(())
    }

    fn create_field(&self, index: &str, field: FieldSchema) -> Result<()> {
        let mut indexes = self.indexes.write();
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| Error::engine(format!("index '{}' not found", index)))?;
        if idx.info.field(&field.name).is_some() {
            return Err(Error::engine(format!(
                "creating field: field '{}' already exists",
                field.name
            )));
        }
        idx.info.fields.push(field);
        idx.info.updated_at = now_ns();
        // Existing rows widen with a NULL in the new field position.
        for row in idx.rows.values_mut() {
            row.push(Value::Null);
        }
        Ok(())
    }

    fn drop_field(&self, index: &str, field: &str) -> Result<()> {
        let mut indexes = self.indexes.write();
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| Error::engine(format!("index '{}' not found", index)))?;
        let position = idx
            .info
            .fields
            .iter()
            .position(|f| f.name == field)
            .ok_or_else(|| Error::engine(format!("field '{}' not found", field)))?;
        idx.info.fields.remove(position);
        idx.info.updated_at = now_ns();
        // Row layout is _id followed by fields, so the value sits one right
        // of the field position.
        for row in idx.rows.values_mut() {
            row.remove(position + 1);
        }
        Ok(())
    }

    fn index_info(&self, name: &str) -> Result<Option<IndexInfo>> {
        Ok(self.indexes.read().get(name).map(|i| i.info.clone()))
    }

    fn indexes(&self) -> Result<Vec<IndexInfo>> {
        let mut infos: Vec<IndexInfo> = self
            .indexes
            .read()
            .values()
            .map(|i| i.info.clone())
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    fn cluster_info(&self) -> Result<ClusterInfo> {
        Ok(ClusterInfo {
            name: "cluster0".into(),
            platform: std::env::consts::OS.into(),
            platform_version: String::new(),
            db_version: env!("CARGO_PKG_VERSION").into(),
            state: "NORMAL".into(),
            node_count: 1,
            shard_width: 1 << 20,
            replica_count: 1,
        })
    }

    fn scan(&self, index: &str) -> Result<Vec<Row>> {
        let indexes = self.indexes.read();
        let idx = indexes
            .get(index)
            .ok_or_else(|| Error::engine(format!("index '{}' not found", index)))?;
        Ok(idx.rows.values().cloned().collect())
    }

    fn insert(&self, index: &str, columns: &[String], rows: Vec<Row>) -> Result<()> {
        let mut indexes = self.indexes.write();
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| Error::engine(format!("index '{}' not found", index)))?;

        // Map each incoming column to its position in the stored row.
        let mut targets = Vec::with_capacity(columns.len());
        for name in columns {
            let position = idx
                .info
                .fields
                .iter()
                .position(|f| &f.name == name)
                .ok_or_else(|| Error::engine(format!("field '{}' not found", name)))?;
            targets.push(position + 1);
        }

        let width = idx.info.fields.len() + 1;
        for incoming in rows {
            let mut parts = incoming.into_iter();
            let id = parts
                .next()
                .ok_or_else(|| Error::engine("insert row missing _id"))?;
            let stored = idx.rows.entry(id.clone()).or_insert_with(|| {
                let mut fresh = vec![Value::Null; width];
                fresh[0] = id;
                fresh
            });
            for (target, value) in targets.iter().zip(parts) {
                stored[*target] = value;
            }
        }
        idx.info.updated_at = now_ns();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FieldKind, FieldOptions};
    use crate::types::data_type::DataType;

    fn test_index(name: &str) -> IndexInfo {
        IndexInfo {
            name: name.into(),
            keys: false,
            owner: String::new(),
            updated_by: String::new(),
            description: String::new(),
            created_at: now_ns(),
            updated_at: now_ns(),
            fields: vec![FieldSchema {
                name: "a".into(),
                data_type: DataType::Int,
                options: FieldOptions {
                    kind: FieldKind::Int,
                    ..FieldOptions::default()
                },
                created_at: now_ns(),
            }],
        }
    }

    #[test]
    fn create_is_exclusive() {
        let engine = MemoryEngine::new();
        engine.create_index(test_index("t")).unwrap();
        let err = engine.create_index(test_index("t")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "creating index: index 't' already exists"
        );
    }

    #[test]
    fn insert_upserts_by_id_and_scans_in_id_order() {
        let engine = MemoryEngine::new();
        engine.create_index(test_index("t")).unwrap();
        let cols = vec!["a".to_string()];
        engine
            .insert(
                "t",
                &cols,
                vec![
                    vec![Value::Id(2), Value::Int(20)],
                    vec![Value::Id(1), Value::Int(10)],
                ],
            )
            .unwrap();
        engine
            .insert("t", &cols, vec![vec![Value::Id(2), Value::Int(25)]])
            .unwrap();

        let rows = engine.scan("t").unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::Id(1), Value::Int(10)],
                vec![Value::Id(2), Value::Int(25)],
            ]
        );
    }

    #[test]
    fn add_and_drop_field_keep_rows_aligned() {
        let engine = MemoryEngine::new();
        engine.create_index(test_index("t")).unwrap();
        engine
            .insert(
                "t",
                &["a".to_string()],
                vec![vec![Value::Id(1), Value::Int(10)]],
            )
            .unwrap();

        engine
            .create_field(
                "t",
                FieldSchema {
                    name: "b".into(),
                    data_type: DataType::String,
                    options: FieldOptions::default(),
                    created_at: now_ns(),
                },
            )
            .unwrap();
        assert_eq!(
            engine.scan("t").unwrap(),
            vec![vec![Value::Id(1), Value::Int(10), Value::Null]]
        );

        engine.drop_field("t", "a").unwrap();
        assert_eq!(
            engine.scan("t").unwrap(),
            vec![vec![Value::Id(1), Value::Null]]
        );
    }
}
