//! Statement compilation
//!
//! Compiles a parsed statement into a [`Plan`]. All name resolution, static
//! typing, and DDL validation happens here; execution only sees resolved
//! ordinals and engine-ready specifications. Catalog relations snapshot
//! engine metadata at compile time.

use super::ddl;
use super::operator::{
    AlterOp, BulkFormat, BulkInput, BulkPlan, BulkSource, Catalog, Direction, Operator, Plan,
    SortKey,
};
use crate::engine::{Engine, IndexInfo};
use crate::error::{Error, Result};
use crate::parsing::ast::{
    BinaryOp, BulkInsertStatement, Expr, Ident, InsertStatement, Literal, OrderByTerm, Pos,
    SelectItem, SelectStatement, Statement, UnaryOp,
};
use crate::types::data_type::DataType;
use crate::types::expression::Expression;
use crate::types::schema::{Column, Schema, ID_COLUMN};
use crate::types::value::Value;
use tracing::debug;

/// Compiles a statement against the engine's current metadata.
pub fn compile(stmt: &Statement, engine: &dyn Engine) -> Result<Plan> {
    let mut planner = Planner {
        engine,
        warnings: Vec::new(),
    };
    let root = planner.compile_statement(stmt)?;
    debug!(plan = ?root.describe(), "compiled statement");
    Ok(Plan {
        root,
        warnings: planner.warnings,
    })
}

struct Planner<'a> {
    engine: &'a dyn Engine,
    warnings: Vec<String>,
}

/// What column and variable references may bind to in an expression.
enum Scope<'a> {
    /// Ordinary row context: columns resolve against a schema, `@N` is invalid.
    Row(&'a Schema),
    /// Bulk transform context: `@N` binds to one of `arity` map entries,
    /// column references are invalid.
    Variables { arity: usize },
}

impl<'a> Planner<'a> {
    fn compile_statement(&mut self, stmt: &Statement) -> Result<Operator> {
        match stmt {
            Statement::Select(select) => self.compile_select(select),
            Statement::Insert(insert) => self.compile_insert(insert),
            Statement::BulkInsert(bulk) => self.compile_bulk_insert(bulk),
            Statement::CreateTable(create) => Ok(Operator::CreateTable {
                info: ddl::compile_create_table(create)?,
            }),
            Statement::AlterTable(alter) => {
                let info = self.lookup_table(&alter.table)?;
                let action = match &alter.action {
                    crate::parsing::ast::AlterAction::AddColumn(col) => {
                        if col.name.name == ID_COLUMN || info.field(&col.name.name).is_some() {
                            return Err(Error::DuplicateColumn {
                                name: col.name.name.clone(),
                                pos: col.name.pos,
                            });
                        }
                        AlterOp::AddColumn(ddl::compile_field(col)?)
                    }
                    crate::parsing::ast::AlterAction::DropColumn(name) => {
                        if info.field(&name.name).is_none() {
                            return Err(Error::ColumnNotFound {
                                name: name.name.clone(),
                                pos: name.pos,
                            });
                        }
                        AlterOp::DropColumn(name.name.clone())
                    }
                    crate::parsing::ast::AlterAction::RenameColumn { .. } => {
                        return Err(Error::RenameColumnUnsupported { pos: alter.pos });
                    }
                };
                Ok(Operator::AlterTable {
                    table: alter.table.name.clone(),
                    action,
                })
            }
            Statement::DropTable(drop) => {
                self.lookup_table(&drop.table)?;
                Ok(Operator::DropTable {
                    table: drop.table.name.clone(),
                })
            }
            Statement::ShowTables { .. } => Ok(Operator::CatalogScan {
                catalog: Catalog::Tables {
                    snapshot: self.engine.indexes()?,
                },
            }),
            Statement::ShowColumns { table } => {
                let snapshot = self.lookup_table(table)?;
                Ok(Operator::CatalogScan {
                    catalog: Catalog::Columns {
                        table: table.name.clone(),
                        snapshot,
                    },
                })
            }
        }
    }

    fn lookup_table(&self, ident: &Ident) -> Result<IndexInfo> {
        self.engine
            .index_info(&ident.name)?
            .ok_or_else(|| Error::TableNotFound {
                name: ident.name.clone(),
                pos: ident.pos,
            })
    }

    fn compile_select(&mut self, select: &SelectStatement) -> Result<Operator> {
        let mut op = match &select.from {
            None => Operator::SingleRow,
            Some(table_ref) => {
                let relation = table_ref
                    .alias
                    .as_ref()
                    .unwrap_or(&table_ref.table)
                    .name
                    .clone();
                match table_ref.table.name.as_str() {
                    "sys_tables" => Operator::CatalogScan {
                        catalog: Catalog::Tables {
                            snapshot: self.engine.indexes()?,
                        },
                    },
                    "sys_cluster_info" => Operator::CatalogScan {
                        catalog: Catalog::ClusterInfo {
                            snapshot: self.engine.cluster_info()?,
                        },
                    },
                    _ => {
                        let info = self.lookup_table(&table_ref.table)?;
                        Operator::TableScan {
                            table: table_ref.table.name.clone(),
                            schema: table_schema(&info, &relation),
                        }
                    }
                }
            }
        };

        if let Some(filter) = &select.filter {
            let schema = op.schema();
            let predicate = compile_expr(filter, &Scope::Row(&schema))?;
            match predicate.static_type(&schema)? {
                None | Some(DataType::Bool) => {}
                Some(t) => {
                    return Err(Error::TypeMismatch {
                        expected: "BOOL".into(),
                        found: t.to_string(),
                        pos: filter.pos(),
                    });
                }
            }
            op = Operator::Filter {
                source: Box::new(op),
                predicate,
            };
        }

        op = self.compile_projection(op, &select.items)?;

        if select.distinct {
            op = Operator::Distinct {
                source: Box::new(op),
            };
        }

        if !select.order_by.is_empty() {
            let keys = compile_order_by(&select.order_by, &op.schema())?;
            op = Operator::OrderBy {
                source: Box::new(op),
                keys,
            };
        }

        if let Some(top) = &select.top {
            if top.deprecated_topn {
                self.warnings
                    .push("TOPN is deprecated, use TOP".to_string());
            }
            op = Operator::Top {
                source: Box::new(op),
                n: top.n,
            };
        }

        Ok(op)
    }

    fn compile_projection(&mut self, source: Operator, items: &[SelectItem]) -> Result<Operator> {
        let input = source.schema();
        let mut expressions = Vec::new();
        let mut columns = Vec::new();

        for item in items {
            match item {
                SelectItem::Star { pos } => {
                    if input.is_empty() {
                        return Err(Error::ColumnNotFound {
                            name: "*".into(),
                            pos: *pos,
                        });
                    }
                    for (i, col) in input.columns().iter().enumerate() {
                        expressions.push(Expression::Column(i));
                        columns.push(col.clone());
                    }
                }
                SelectItem::QualifiedStar { relation } => {
                    let mut any = false;
                    for (i, col) in input.columns().iter().enumerate() {
                        if col.relation == relation.name {
                            expressions.push(Expression::Column(i));
                            columns.push(col.clone());
                            any = true;
                        }
                    }
                    if !any {
                        return Err(Error::TableNotFound {
                            name: relation.name.clone(),
                            pos: relation.pos,
                        });
                    }
                }
                SelectItem::Expr { expr, alias } => {
                    let compiled = compile_expr(expr, &Scope::Row(&input))?;
                    let data_type = compiled
                        .static_type(&input)?
                        .unwrap_or(DataType::String);
                    let column = match (&compiled, alias) {
                        (_, Some(alias)) => Column::new("", alias.name.clone(), data_type),
                        (Expression::Column(i), None) => input.columns()[*i].clone(),
                        (_, None) => Column::new("", column_label(expr), data_type),
                    };
                    expressions.push(compiled);
                    columns.push(column);
                }
            }
        }

        let schema = Schema::new(columns);
        schema.validate()?;
        Ok(Operator::Project {
            source: Box::new(source),
            expressions,
            schema,
        })
    }

    fn compile_insert(&mut self, insert: &InsertStatement) -> Result<Operator> {
        let info = self.lookup_table(&insert.table)?;
        let (columns, column_types) =
            resolve_target_columns(&info, insert.columns.as_deref(), insert.pos)?;

        let mut rows = Vec::with_capacity(insert.rows.len());
        let empty = Schema::default();
        for row in &insert.rows {
            if row.len() != columns.len() {
                return Err(Error::InsertCountMismatch { pos: insert.pos });
            }
            let mut compiled = Vec::with_capacity(row.len());
            for expr in row {
                let e = compile_expr(expr, &Scope::Row(&empty))?;
                e.static_type(&empty)?;
                compiled.push(e);
            }
            rows.push(compiled);
        }

        Ok(Operator::Insert {
            table: insert.table.name.clone(),
            columns,
            column_types,
            rows,
        })
    }

    fn compile_bulk_insert(&mut self, bulk: &BulkInsertStatement) -> Result<Operator> {
        let info = self.lookup_table(&bulk.table)?;
        let (columns, column_types) =
            resolve_target_columns(&info, bulk.columns.as_deref(), bulk.pos)?;

        let format = match &bulk.format {
            Some((spec, pos)) => match spec.as_str() {
                "CSV" => BulkFormat::Csv,
                "NDJSON" => BulkFormat::Ndjson,
                _ => {
                    return Err(Error::InvalidFormatSpecifier {
                        spec: spec.clone(),
                        pos: *pos,
                    });
                }
            },
            None => {
                return Err(Error::FormatSpecifierExpected { pos: bulk.pos });
            }
        };
        let input = match &bulk.input {
            Some((spec, pos)) => match spec.as_str() {
                "FILE" => BulkInput::File,
                "STREAM" => BulkInput::Stream,
                _ => {
                    return Err(Error::InvalidInputSpecifier {
                        spec: spec.clone(),
                        pos: *pos,
                    });
                }
            },
            None => {
                return Err(Error::InputSpecifierExpected { pos: bulk.pos });
            }
        };

        let batch_size = match bulk.batch_size {
            Some((size, pos)) => {
                if size <= 0 {
                    return Err(Error::InvalidBatchSize { size, pos });
                }
                size as usize
            }
            None => 1000,
        };
        let rows_limit = bulk
            .rows_limit
            .and_then(|(limit, _)| (limit > 0).then_some(limit as u64));

        let mut map = Vec::with_capacity(bulk.map.len());
        for entry in &bulk.map {
            let source = match &entry.source {
                crate::parsing::ast::BulkMapSource::Ordinal(n) => BulkSource::Ordinal(*n),
                crate::parsing::ast::BulkMapSource::JsonPath(path) => {
                    BulkSource::Key(json_path_key(path, entry.pos)?)
                }
            };
            map.push((source, ddl::data_type_of(&entry.type_name)?));
        }

        let transforms = match &bulk.transforms {
            Some(exprs) => {
                if exprs.len() != columns.len() {
                    return Err(Error::InsertCountMismatch { pos: bulk.pos });
                }
                let scope = Scope::Variables { arity: map.len() };
                let mut compiled = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    compiled.push(compile_expr(expr, &scope)?);
                }
                Some(compiled)
            }
            None => {
                if map.len() != columns.len() {
                    return Err(Error::InsertCountMismatch { pos: bulk.pos });
                }
                None
            }
        };

        Ok(Operator::BulkInsert {
            table: bulk.table.name.clone(),
            bulk: BulkPlan {
                columns,
                column_types,
                map,
                transforms,
                source: bulk.source.clone(),
                format,
                input,
                batch_size,
                rows_limit,
                header_row: bulk.header_row,
            },
        })
    }
}

/// The SQL schema of a stored table: `_id` first, typed by keyed-ness, then
/// the engine fields in declaration order.
pub fn table_schema(info: &IndexInfo, relation: &str) -> Schema {
    let mut columns = Vec::with_capacity(info.fields.len() + 1);
    let id_type = if info.keys {
        DataType::String
    } else {
        DataType::Id
    };
    columns.push(Column::new(relation, ID_COLUMN, id_type));
    for field in &info.fields {
        columns.push(Column::new(relation, field.name.clone(), field.data_type));
    }
    Schema::new(columns)
}

/// Validates an INSERT/BULK INSERT target column list and resolves the target
/// types. `None` means the table's physical column order.
fn resolve_target_columns(
    info: &IndexInfo,
    idents: Option<&[Ident]>,
    stmt_pos: Pos,
) -> Result<(Vec<String>, Vec<DataType>)> {
    let schema = table_schema(info, &info.name);
    let Some(idents) = idents else {
        let names = schema.columns().iter().map(|c| c.name.clone()).collect();
        let types = schema.columns().iter().map(|c| c.data_type).collect();
        return Ok((names, types));
    };

    let mut names: Vec<String> = Vec::with_capacity(idents.len());
    let mut types = Vec::with_capacity(idents.len());
    for ident in idents {
        if names.iter().any(|n| n == &ident.name) {
            return Err(Error::DuplicateColumn {
                name: ident.name.clone(),
                pos: ident.pos,
            });
        }
        let i = schema.resolve(None, &ident.name, ident.pos)?;
        names.push(ident.name.clone());
        types.push(schema.columns()[i].data_type);
    }
    if !names.iter().any(|n| n == ID_COLUMN) {
        return Err(Error::InsertIdColumnRequired { pos: stmt_pos });
    }
    if names.iter().all(|n| n == ID_COLUMN) {
        return Err(Error::InsertNonIdColumnRequired { pos: stmt_pos });
    }
    Ok((names, types))
}

/// Extracts the key from a `$.key` NDJSON path.
fn json_path_key(path: &str, pos: Pos) -> Result<String> {
    path.strip_prefix("$.")
        .filter(|key| !key.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::InvalidFormatSpecifier {
            spec: path.into(),
            pos,
        })
}

fn compile_order_by(terms: &[OrderByTerm], schema: &Schema) -> Result<Vec<SortKey>> {
    let mut keys = Vec::with_capacity(terms.len());
    for term in terms {
        // Keys resolve against the projected output, so aliases are in scope.
        let key = compile_expr(&term.expr, &Scope::Row(schema))?;
        key.static_type(schema)?;
        keys.push(SortKey {
            key,
            direction: if term.desc {
                Direction::Descending
            } else {
                Direction::Ascending
            },
        });
    }
    Ok(keys)
}

/// Display label for an unaliased computed output column.
fn column_label(expr: &Expr) -> String {
    match expr {
        Expr::Column { name, .. } => name.name.clone(),
        Expr::Call { name, .. } => name.name.to_ascii_lowercase(),
        Expr::Literal { value, .. } => match value {
            Literal::Null => "NULL".into(),
            Literal::Int(v) => v.to_string(),
            Literal::Decimal(d) => d.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::String(s) => format!("'{}'", s),
            Literal::Timestamp(ts) => ts.to_rfc3339(),
        },
        Expr::Case { .. } => "case".into(),
        _ => "expr".into(),
    }
}

fn compile_expr(expr: &Expr, scope: &Scope) -> Result<Expression> {
    match expr {
        Expr::Literal { value, .. } => Ok(Expression::Literal(literal_value(value))),
        Expr::Column { qualifier, name } => match scope {
            Scope::Row(schema) => {
                let i = schema.resolve(
                    qualifier.as_ref().map(|q| q.name.as_str()),
                    &name.name,
                    name.pos,
                )?;
                Ok(Expression::Column(i))
            }
            Scope::Variables { .. } => Err(Error::ColumnNotFound {
                name: name.name.clone(),
                pos: name.pos,
            }),
        },
        Expr::Variable { index, pos } => match scope {
            Scope::Variables { arity } => {
                if *index >= *arity {
                    return Err(Error::MapIndexOutOfRange(*index));
                }
                Ok(Expression::Variable(*index))
            }
            Scope::Row(_) => Err(Error::ColumnNotFound {
                name: format!("@{}", index),
                pos: *pos,
            }),
        },
        Expr::Binary { op, lhs, rhs, pos } => {
            let l = Box::new(compile_expr(lhs, scope)?);
            let r = Box::new(compile_expr(rhs, scope)?);
            Ok(match op {
                BinaryOp::Add => Expression::Add(l, r, *pos),
                BinaryOp::Subtract => Expression::Subtract(l, r, *pos),
                BinaryOp::Multiply => Expression::Multiply(l, r, *pos),
                BinaryOp::Divide => Expression::Divide(l, r, *pos),
                BinaryOp::Eq => Expression::Equal(l, r, *pos),
                BinaryOp::NotEq => Expression::NotEqual(l, r, *pos),
                BinaryOp::Lt => Expression::LessThan(l, r, *pos),
                BinaryOp::LtEq => Expression::LessThanOrEqual(l, r, *pos),
                BinaryOp::Gt => Expression::GreaterThan(l, r, *pos),
                BinaryOp::GtEq => Expression::GreaterThanOrEqual(l, r, *pos),
                BinaryOp::And => Expression::And(l, r),
                BinaryOp::Or => Expression::Or(l, r),
                BinaryOp::Concat => Expression::Concat(l, r, *pos),
            })
        }
        Expr::Unary { op, operand, pos } => {
            let operand = Box::new(compile_expr(operand, scope)?);
            Ok(match op {
                UnaryOp::Negate => Expression::Negate(operand, *pos),
                UnaryOp::Not => Expression::Not(operand, *pos),
            })
        }
        Expr::IsNull {
            operand, negated, ..
        } => Ok(Expression::IsNull {
            operand: Box::new(compile_expr(operand, scope)?),
            negated: *negated,
        }),
        Expr::Case {
            operand,
            whens,
            else_expr,
            ..
        } => {
            let operand = operand
                .as_ref()
                .map(|e| compile_expr(e, scope).map(Box::new))
                .transpose()?;
            let whens = whens
                .iter()
                .map(|(when, then)| {
                    Ok((compile_expr(when, scope)?, compile_expr(then, scope)?))
                })
                .collect::<Result<Vec<_>>>()?;
            let else_expr = else_expr
                .as_ref()
                .map(|e| compile_expr(e, scope).map(Box::new))
                .transpose()?;
            Ok(Expression::Case {
                operand,
                whens,
                else_expr,
            })
        }
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| compile_expr(arg, scope))
                .collect::<Result<Vec<_>>>()?;
            Ok(Expression::Function {
                name: name.name.clone(),
                args,
                pos: name.pos,
            })
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Int(v) => Value::Int(*v),
        Literal::Decimal(d) => Value::Decimal(*d),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Timestamp(ts) => Value::Timestamp(*ts),
    }
}
