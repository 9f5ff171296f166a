//! Storage engine interface
//!
//! The planner compiles DDL into index/field specifications and the executor
//! drives them through this trait. Engine errors surface to SQL clients with
//! the engine's message verbatim, without a source position.

mod memory;

pub use memory::MemoryEngine;

/// Current wall-clock time in nanoseconds since the Unix epoch, the engine's
/// metadata timestamp unit.
pub(crate) fn now_ns() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

use crate::error::Result;
use crate::types::data_type::DataType;
use crate::types::value::Row;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Storage-level field kind. This is what the catalog reports as a column's
/// `internal_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Single-valued keyed or unkeyed field.
    Mutex,
    /// Multi-valued field.
    Set,
    /// Multi-valued field with per-view time quantums.
    Time,
    Int,
    Decimal,
    Timestamp,
    Bool,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Mutex => "mutex",
            FieldKind::Set => "set",
            FieldKind::Time => "time",
            FieldKind::Int => "int",
            FieldKind::Decimal => "decimal",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Bool => "bool",
        }
    }
}

/// Storage options for one field, produced by DDL compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    pub kind: FieldKind,
    /// Whether values are string keys rather than integer ids.
    pub keys: bool,
    /// Offset subtracted before range encoding (int and timestamp fields).
    pub base: i64,
    /// Decimal scale; zero for non-decimal fields.
    pub scale: u32,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub cache_type: Option<String>,
    pub cache_size: u32,
    /// Timestamp granularity: "s", "ms", "us", or "ns".
    pub time_unit: Option<String>,
    pub time_quantum: Option<String>,
    /// View retention in seconds; zero means views are kept forever.
    pub ttl_seconds: i64,
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions {
            kind: FieldKind::Mutex,
            keys: false,
            base: 0,
            scale: 0,
            min: None,
            max: None,
            cache_type: None,
            cache_size: 0,
            time_unit: None,
            time_quantum: None,
            ttl_seconds: 0,
        }
    }
}

/// One field of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    /// SQL-visible type of the field.
    pub data_type: DataType,
    pub options: FieldOptions,
    /// Creation time, nanoseconds since the Unix epoch.
    pub created_at: i64,
}

/// Metadata for one index (the storage name for a table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    /// Whether `_id` is a string key rather than an unsigned integer.
    pub keys: bool,
    pub owner: String,
    pub updated_by: String,
    pub description: String,
    /// Nanoseconds since the Unix epoch.
    pub created_at: i64,
    pub updated_at: i64,
    pub fields: Vec<FieldSchema>,
}

impl IndexInfo {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Cluster-wide deployment facts reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    pub platform: String,
    pub platform_version: String,
    pub db_version: String,
    pub state: String,
    pub node_count: i64,
    pub shard_width: i64,
    pub replica_count: i64,
}

/// The storage engine the SQL layer plans against and executes on.
///
/// Rows are ordered by `_id` ascending; `insert` upserts by `_id`, merging
/// the given columns into any existing row.
pub trait Engine: Send + Sync {
    fn create_index(&self, info: IndexInfo) -> Result<()>;
    fn drop_index(&self, name: &str) -> Result<()>;
    fn create_field(&self, index: &str, field: FieldSchema) -> Result<()>;
    fn drop_field(&self, index: &str, field: &str) -> Result<()>;

    /// Index metadata, or `None` if the index does not exist.
    fn index_info(&self, name: &str) -> Result<Option<IndexInfo>>;
    /// All indexes, sorted by name.
    fn indexes(&self) -> Result<Vec<IndexInfo>>;
    fn cluster_info(&self) -> Result<ClusterInfo>;

    /// Full scan in `_id` order. Row layout follows the index's field order,
    /// with `_id` first.
    fn scan(&self, index: &str) -> Result<Vec<Row>>;

    /// Upserts rows by `_id`. `columns` names the target fields for the row
    /// values after the leading `_id`.
    fn insert(&self, index: &str, columns: &[String], rows: Vec<Row>) -> Result<()>;
}
