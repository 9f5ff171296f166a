//! DDL compilation
//!
//! Translates CREATE/ALTER TABLE column definitions into engine field
//! specifications. Pure validation and translation; nothing here touches
//! storage, so a failed compile leaves the engine untouched.

use crate::engine::{FieldKind, FieldOptions, FieldSchema, IndexInfo};
use crate::error::{Error, Result};
use crate::parsing::ast::{
    CacheTypeName, ColumnDef, ConstraintKind, CreateTableStatement, TypeName,
};
use crate::types::data_type::DataType;
use crate::types::schema::ID_COLUMN;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Unix seconds of 0001-01-01T00:00:01Z, the smallest storable timestamp.
const MIN_TIMESTAMP_UNIX: i64 = -62135596799;
/// Unix seconds of 9999-12-31T23:59:59Z, the largest storable timestamp.
const MAX_TIMESTAMP_UNIX: i64 = 253402300799;

/// Default cache size for keyed and cached fields.
const DEFAULT_CACHE_SIZE: u32 = 50000;

/// Compiles CREATE TABLE into an index specification.
///
/// Validation order: duplicate columns, then the `_id` requirement, then
/// per-column constraint checks.
pub fn compile_create_table(stmt: &CreateTableStatement) -> Result<IndexInfo> {
    for (i, col) in stmt.columns.iter().enumerate() {
        if stmt.columns[..i].iter().any(|c| c.name.name == col.name.name) {
            return Err(Error::DuplicateColumn {
                name: col.name.name.clone(),
                pos: col.name.pos,
            });
        }
    }

    let id_col = stmt
        .columns
        .iter()
        .find(|c| c.name.name == ID_COLUMN)
        .ok_or(Error::IdColumnRequired { pos: stmt.pos })?;
    let keys = match id_col.type_name.name.as_str() {
        "id" => false,
        "string" => true,
        other => {
            return Err(Error::TypeMismatch {
                expected: "ID or STRING".into(),
                found: other.to_uppercase(),
                pos: id_col.type_name.pos,
            });
        }
    };

    let mut fields = Vec::new();
    for col in &stmt.columns {
        if col.name.name == ID_COLUMN {
            continue;
        }
        fields.push(compile_field(col)?);
    }

    let now = crate::engine::now_ns();
    Ok(IndexInfo {
        name: stmt.name.name.clone(),
        keys,
        owner: String::new(),
        updated_by: String::new(),
        description: String::new(),
        created_at: now,
        updated_at: now,
        fields,
    })
}

/// Compiles one column definition into a field specification. Also used for
/// ALTER TABLE ADD COLUMN.
pub fn compile_field(col: &ColumnDef) -> Result<FieldSchema> {
    let data_type = data_type_of(&col.type_name)?;
    let constraints = Constraints::gather(col, data_type)?;
    let options = match data_type {
        DataType::Int => int_options(&constraints),
        DataType::Bool => FieldOptions {
            kind: FieldKind::Bool,
            ..FieldOptions::default()
        },
        DataType::Decimal(scale) => decimal_options(scale),
        DataType::Timestamp => timestamp_options(&constraints)?,
        DataType::Id => keyed_options(FieldKind::Mutex, false, &constraints),
        DataType::String => keyed_options(FieldKind::Mutex, true, &constraints),
        DataType::IdSet => set_options(false, &constraints)?,
        DataType::StringSet => set_options(true, &constraints)?,
    };
    Ok(FieldSchema {
        name: col.name.name.clone(),
        data_type,
        options,
        created_at: crate::engine::now_ns(),
    })
}

/// Maps a written type name to its scalar type.
pub fn data_type_of(type_name: &TypeName) -> Result<DataType> {
    match type_name.name.as_str() {
        "id" => Ok(DataType::Id),
        "int" => Ok(DataType::Int),
        "bool" => Ok(DataType::Bool),
        "string" => Ok(DataType::String),
        "decimal" => Ok(DataType::Decimal(type_name.scale.unwrap_or(0))),
        "timestamp" => Ok(DataType::Timestamp),
        "idset" => Ok(DataType::IdSet),
        "stringset" => Ok(DataType::StringSet),
        other => Err(Error::UnknownType {
            name: other.into(),
            pos: type_name.pos,
        }),
    }
}

/// Constraints gathered off a column definition, validated for the column's
/// type and for cross-constraint conflicts.
#[derive(Default)]
struct Constraints {
    min: Option<i64>,
    max: Option<i64>,
    cache: Option<(CacheTypeName, Option<u32>)>,
    time_quantum: Option<(String, Option<String>)>,
    time_unit: Option<String>,
    epoch: Option<String>,
    ttl_seconds: i64,
}

impl Constraints {
    fn gather(col: &ColumnDef, data_type: DataType) -> Result<Self> {
        let mut out = Constraints::default();
        let mut min_max_pos = None;
        for constraint in &col.constraints {
            let pos = constraint.pos;
            match &constraint.kind {
                ConstraintKind::Min(v) => {
                    require(data_type == DataType::Int, "MIN", data_type, pos)?;
                    out.min = Some(*v);
                    min_max_pos = Some(pos);
                }
                ConstraintKind::Max(v) => {
                    require(data_type == DataType::Int, "MAX", data_type, pos)?;
                    out.max = Some(*v);
                    min_max_pos = Some(pos);
                }
                ConstraintKind::CacheType { cache, size } => {
                    require(
                        matches!(
                            data_type,
                            DataType::Id
                                | DataType::String
                                | DataType::IdSet
                                | DataType::StringSet
                        ),
                        "CACHETYPE",
                        data_type,
                        pos,
                    )?;
                    if out.time_quantum.is_some() {
                        return Err(Error::ConflictingConstraint {
                            first: "CACHETYPE",
                            second: "TIMEQUANTUM",
                            pos,
                        });
                    }
                    out.cache = Some((*cache, *size));
                }
                ConstraintKind::TimeQuantum { quantum, ttl } => {
                    require(
                        matches!(data_type, DataType::IdSet | DataType::StringSet),
                        "TIMEQUANTUM",
                        data_type,
                        pos,
                    )?;
                    if out.cache.is_some() {
                        return Err(Error::ConflictingConstraint {
                            first: "CACHETYPE",
                            second: "TIMEQUANTUM",
                            pos,
                        });
                    }
                    validate_time_quantum(quantum, pos)?;
                    if let Some(ttl) = ttl {
                        out.ttl_seconds = parse_duration_seconds(ttl, pos)?;
                    }
                    out.time_quantum = Some((quantum.clone(), ttl.clone()));
                }
                ConstraintKind::TimeUnit(unit) => {
                    require(data_type == DataType::Timestamp, "TIMEUNIT", data_type, pos)?;
                    validate_time_unit(unit, pos)?;
                    out.time_unit = Some(unit.clone());
                }
                ConstraintKind::Epoch(ts) => {
                    require(data_type == DataType::Timestamp, "EPOCH", data_type, pos)?;
                    out.epoch = Some(ts.clone());
                }
            }
        }
        if let (Some(min), Some(max)) = (out.min, out.max) {
            if min > max {
                return Err(Error::ConflictingConstraint {
                    first: "MIN",
                    second: "MAX",
                    pos: min_max_pos.unwrap_or_default(),
                });
            }
        }
        Ok(out)
    }
}

fn require(
    ok: bool,
    constraint: &'static str,
    data_type: DataType,
    pos: crate::parsing::ast::Pos,
) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidConstraint {
            constraint,
            data_type: data_type.to_string(),
            pos,
        })
    }
}

fn int_options(constraints: &Constraints) -> FieldOptions {
    let min = constraints.min.unwrap_or(i64::MIN);
    let max = constraints.max.unwrap_or(i64::MAX);
    FieldOptions {
        kind: FieldKind::Int,
        base: min,
        min: Some(Decimal::from(min)),
        max: Some(Decimal::from(max)),
        ..FieldOptions::default()
    }
}

fn decimal_options(scale: u32) -> FieldOptions {
    FieldOptions {
        kind: FieldKind::Decimal,
        scale,
        min: Some(Decimal::new(i64::MIN, scale)),
        max: Some(Decimal::new(i64::MAX, scale)),
        ..FieldOptions::default()
    }
}

fn timestamp_options(constraints: &Constraints) -> Result<FieldOptions> {
    let unit = constraints.time_unit.clone().unwrap_or_else(|| "s".into());
    let epoch_unix = match &constraints.epoch {
        Some(text) => {
            let parsed: DateTime<Utc> =
                text.parse().map_err(|_| Error::ValueConversion {
                    value: text.clone(),
                    target: "TIMESTAMP".into(),
                })?;
            parsed.timestamp()
        }
        None => 0,
    };
    let mult = unit_multiplier(&unit);
    // Bounds are expressed relative to the epoch in the field's unit; the
    // i128 math avoids overflow at nanosecond granularity.
    let min = (MIN_TIMESTAMP_UNIX as i128 - epoch_unix as i128) * mult;
    let max = (MAX_TIMESTAMP_UNIX as i128 - epoch_unix as i128) * mult;
    Ok(FieldOptions {
        kind: FieldKind::Timestamp,
        base: (epoch_unix as i128 * mult).clamp(i64::MIN as i128, i64::MAX as i128) as i64,
        min: Some(Decimal::from_i128_with_scale(min, 0)),
        max: Some(Decimal::from_i128_with_scale(max, 0)),
        time_unit: Some(unit),
        ..FieldOptions::default()
    })
}

fn keyed_options(kind: FieldKind, keys: bool, constraints: &Constraints) -> FieldOptions {
    let (cache, size) = constraints
        .cache
        .unwrap_or((CacheTypeName::Ranked, None));
    FieldOptions {
        kind,
        keys,
        cache_type: Some(cache_name(cache).into()),
        cache_size: size.unwrap_or(DEFAULT_CACHE_SIZE),
        ..FieldOptions::default()
    }
}

fn set_options(keys: bool, constraints: &Constraints) -> Result<FieldOptions> {
    if let Some((quantum, ttl)) = &constraints.time_quantum {
        return Ok(FieldOptions {
            kind: FieldKind::Time,
            keys,
            time_quantum: Some(quantum.clone()),
            ttl_seconds: if ttl.is_some() { constraints.ttl_seconds } else { 0 },
            ..FieldOptions::default()
        });
    }
    Ok(keyed_options(FieldKind::Set, keys, constraints))
}

fn cache_name(cache: CacheTypeName) -> &'static str {
    match cache {
        CacheTypeName::Ranked => "ranked",
        CacheTypeName::Lru => "lru",
    }
}

fn unit_multiplier(unit: &str) -> i128 {
    match unit {
        "s" => 1,
        "ms" => 1_000,
        "us" => 1_000_000,
        "ns" => 1_000_000_000,
        _ => 1,
    }
}

fn validate_time_unit(unit: &str, pos: crate::parsing::ast::Pos) -> Result<()> {
    match unit {
        "s" | "ms" | "us" | "ns" => Ok(()),
        _ => Err(Error::InvalidTimeUnit {
            unit: unit.into(),
            pos,
        }),
    }
}

/// Time quantums are a contiguous run of granularities from the set YMDH,
/// largest first: "Y", "YM", "MD", "YMDH", ...
fn validate_time_quantum(quantum: &str, pos: crate::parsing::ast::Pos) -> Result<()> {
    const ORDER: &str = "YMDH";
    let err = || Error::InvalidTimeQuantum {
        quantum: quantum.into(),
        pos,
    };
    if quantum.is_empty() || quantum.len() > 4 {
        return Err(err());
    }
    let Some(start) = ORDER.find(quantum.chars().next().unwrap_or(' ')) else {
        return Err(err());
    };
    if !ORDER[start..].starts_with(quantum) {
        return Err(err());
    }
    Ok(())
}

/// Parses a duration like "300s", "30m", "24h" or "1h30m" into seconds.
fn parse_duration_seconds(value: &str, pos: crate::parsing::ast::Pos) -> Result<i64> {
    let err = || Error::InvalidDuration {
        value: value.into(),
        pos,
    };
    if value == "0" {
        return Ok(0);
    }
    let mut total: i64 = 0;
    let mut rest = value;
    if rest.is_empty() {
        return Err(err());
    }
    while !rest.is_empty() {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return Err(err());
        }
        let amount: i64 = rest[..digits].parse().map_err(|_| err())?;
        rest = &rest[digits..];
        let unit_len = rest
            .chars()
            .take_while(|c| !c.is_ascii_digit())
            .count();
        let seconds = match &rest[..unit_len] {
            "h" => 3600,
            "m" => 60,
            "s" => 1,
            _ => return Err(err()),
        };
        total = total
            .checked_add(amount.checked_mul(seconds).ok_or_else(err)?)
            .ok_or_else(err)?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ast::{ColumnConstraint, Ident, Pos};

    fn col(name: &str, type_name: TypeName, constraints: Vec<ConstraintKind>) -> ColumnDef {
        ColumnDef {
            name: Ident::new(name, Pos::default()),
            type_name,
            constraints: constraints
                .into_iter()
                .map(|kind| ColumnConstraint {
                    kind,
                    pos: Pos::new(1, 60),
                })
                .collect(),
        }
    }

    fn create(columns: Vec<ColumnDef>) -> CreateTableStatement {
        CreateTableStatement {
            name: Ident::new("t", Pos::new(1, 14)),
            columns,
            pos: Pos::new(1, 1),
        }
    }

    fn id_col() -> ColumnDef {
        col("_id", TypeName::new("id", Pos::default()), vec![])
    }

    #[test]
    fn id_column_is_required() {
        let stmt = create(vec![col("a", TypeName::new("int", Pos::default()), vec![])]);
        assert_eq!(
            compile_create_table(&stmt).unwrap_err().to_string(),
            "[1:1] _id column must be specified"
        );
    }

    #[test]
    fn duplicate_columns_rejected() {
        let stmt = create(vec![
            id_col(),
            col("a", TypeName::new("int", Pos::default()), vec![]),
            col("a", TypeName::new("bool", Pos::default()), vec![]),
        ]);
        assert!(matches!(
            compile_create_table(&stmt),
            Err(Error::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn string_id_makes_keyed_index() {
        let stmt = create(vec![col("_id", TypeName::new("string", Pos::default()), vec![])]);
        assert!(compile_create_table(&stmt).unwrap().keys);

        let stmt = create(vec![id_col()]);
        assert!(!compile_create_table(&stmt).unwrap().keys);
    }

    #[test]
    fn int_field_gets_base_and_bounds() {
        let field = compile_field(&col(
            "a",
            TypeName::new("int", Pos::default()),
            vec![ConstraintKind::Min(0), ConstraintKind::Max(1000)],
        ))
        .unwrap();
        assert_eq!(field.options.kind, FieldKind::Int);
        assert_eq!(field.options.base, 0);
        assert_eq!(field.options.min, Some(Decimal::from(0)));
        assert_eq!(field.options.max, Some(Decimal::from(1000)));

        let field =
            compile_field(&col("a", TypeName::new("int", Pos::default()), vec![])).unwrap();
        assert_eq!(field.options.min, Some(Decimal::from(i64::MIN)));
        assert_eq!(field.options.max, Some(Decimal::from(i64::MAX)));
    }

    #[test]
    fn decimal_field_bounds_carry_scale() {
        let field =
            compile_field(&col("a", TypeName::decimal(2, Pos::default()), vec![])).unwrap();
        assert_eq!(field.data_type, DataType::Decimal(2));
        assert_eq!(field.options.scale, 2);
        assert_eq!(field.options.min, Some(Decimal::new(i64::MIN, 2)));
        assert_eq!(field.options.max, Some(Decimal::new(i64::MAX, 2)));
    }

    #[test]
    fn timestamp_defaults_to_seconds_at_unix_epoch() {
        let field =
            compile_field(&col("a", TypeName::new("timestamp", Pos::default()), vec![])).unwrap();
        assert_eq!(field.options.kind, FieldKind::Timestamp);
        assert_eq!(field.options.base, 0);
        assert_eq!(field.options.time_unit.as_deref(), Some("s"));
        assert_eq!(
            field.options.min,
            Some(Decimal::from(MIN_TIMESTAMP_UNIX))
        );
        assert_eq!(
            field.options.max,
            Some(Decimal::from(MAX_TIMESTAMP_UNIX))
        );
    }

    #[test]
    fn timestamp_epoch_shifts_bounds_in_unit() {
        let field = compile_field(&col(
            "a",
            TypeName::new("timestamp", Pos::default()),
            vec![
                ConstraintKind::TimeUnit("ms".into()),
                ConstraintKind::Epoch("1970-01-02T00:00:00Z".into()),
            ],
        ))
        .unwrap();
        let epoch = 86400i128;
        assert_eq!(field.options.base, (epoch * 1000) as i64);
        assert_eq!(
            field.options.min,
            Some(Decimal::from_i128_with_scale(
                (MIN_TIMESTAMP_UNIX as i128 - epoch) * 1000,
                0
            ))
        );
    }

    #[test]
    fn string_field_defaults_to_ranked_cache() {
        let field =
            compile_field(&col("a", TypeName::new("string", Pos::default()), vec![])).unwrap();
        assert_eq!(field.options.kind, FieldKind::Mutex);
        assert!(field.options.keys);
        assert_eq!(field.options.cache_type.as_deref(), Some("ranked"));
        assert_eq!(field.options.cache_size, DEFAULT_CACHE_SIZE);
    }

    #[test]
    fn stringset_with_quantum_is_a_time_field() {
        let field = compile_field(&col(
            "a",
            TypeName::new("stringset", Pos::default()),
            vec![ConstraintKind::TimeQuantum {
                quantum: "YMD".into(),
                ttl: Some("24h".into()),
            }],
        ))
        .unwrap();
        assert_eq!(field.options.kind, FieldKind::Time);
        assert_eq!(field.options.time_quantum.as_deref(), Some("YMD"));
        assert_eq!(field.options.ttl_seconds, 86400);
        assert!(field.options.cache_type.is_none());
    }

    #[test]
    fn cachetype_and_timequantum_conflict_in_either_order() {
        for kinds in [
            vec![
                ConstraintKind::CacheType {
                    cache: CacheTypeName::Ranked,
                    size: None,
                },
                ConstraintKind::TimeQuantum {
                    quantum: "YMD".into(),
                    ttl: None,
                },
            ],
            vec![
                ConstraintKind::TimeQuantum {
                    quantum: "YMD".into(),
                    ttl: None,
                },
                ConstraintKind::CacheType {
                    cache: CacheTypeName::Ranked,
                    size: None,
                },
            ],
        ] {
            let err = compile_field(&col("a", TypeName::new("stringset", Pos::default()), kinds))
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "[1:60] 'CACHETYPE' constraint conflicts with 'TIMEQUANTUM'"
            );
        }
    }

    #[test]
    fn constraints_must_match_the_type() {
        let err = compile_field(&col(
            "a",
            TypeName::new("string", Pos::default()),
            vec![ConstraintKind::Min(0)],
        ))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[1:60] invalid constraint 'MIN' for type 'STRING'"
        );
    }

    #[test]
    fn quantum_and_duration_validation() {
        assert!(validate_time_quantum("YMDH", Pos::default()).is_ok());
        assert!(validate_time_quantum("MD", Pos::default()).is_ok());
        assert!(validate_time_quantum("YD", Pos::default()).is_err());
        assert!(validate_time_quantum("X", Pos::default()).is_err());

        assert_eq!(parse_duration_seconds("1h30m", Pos::default()).unwrap(), 5400);
        assert_eq!(parse_duration_seconds("300s", Pos::default()).unwrap(), 300);
        assert!(parse_duration_seconds("1d", Pos::default()).is_err());
    }
}
