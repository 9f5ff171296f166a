//! Common test utilities for SQL integration tests
#![allow(dead_code)]

use lumen_sql::parsing::ast::{
    AlterAction, AlterTableStatement, BinaryOp, BulkInsertStatement, BulkMapEntry, BulkMapSource,
    CacheTypeName, ColumnConstraint, ColumnDef, ConstraintKind, CreateTableStatement,
    DropTableStatement, Expr, Ident, InsertStatement, Literal, OrderByTerm, Pos, SelectItem,
    SelectStatement, Statement, TableRef, TopClause, TypeName,
};
use lumen_sql::{
    compile, execute, Error, ExecutionContext, MemoryEngine, Row, Schema, StatementResult,
};

/// Test context owning an in-memory engine.
pub struct TestContext {
    pub engine: MemoryEngine,
    pub ctx: ExecutionContext,
}

/// What running one statement produced.
pub enum Outcome {
    Rows { schema: Schema, rows: Vec<Row> },
    Count(u64),
    Done,
}

pub fn setup_test() -> TestContext {
    TestContext::new()
}

impl TestContext {
    pub fn new() -> Self {
        TestContext {
            engine: MemoryEngine::new(),
            ctx: ExecutionContext::new(),
        }
    }

    /// Compiles and executes one statement, collecting any result rows.
    pub fn try_run(&self, stmt: &Statement) -> Result<Outcome, Error> {
        let plan = compile(stmt, &self.engine)?;
        // The result iterator borrows the plan, so collect before it drops.
        let outcome = match execute(&plan, &self.engine, &self.ctx)? {
            StatementResult::Query { schema, rows } => {
                let rows = rows.collect::<Result<Vec<_>, _>>()?;
                Outcome::Rows { schema, rows }
            }
            StatementResult::Insert { count } | StatementResult::BulkInsert { count } => {
                Outcome::Count(count)
            }
            _ => Outcome::Done,
        };
        Ok(outcome)
    }

    /// Executes a statement, panicking on error.
    pub fn exec(&self, stmt: &Statement) {
        if let Err(err) = self.try_run(stmt) {
            panic!("statement failed: {err}");
        }
    }

    /// Executes a query statement and returns its rows.
    pub fn query(&self, stmt: &Statement) -> Vec<Row> {
        self.query_with_schema(stmt).1
    }

    pub fn query_with_schema(&self, stmt: &Statement) -> (Schema, Vec<Row>) {
        match self.try_run(stmt) {
            Ok(Outcome::Rows { schema, rows }) => (schema, rows),
            Ok(_) => panic!("statement produced no rows"),
            Err(err) => panic!("query failed: {err}"),
        }
    }

    /// Executes an insert statement and returns the row count.
    pub fn count(&self, stmt: &Statement) -> u64 {
        match self.try_run(stmt) {
            Ok(Outcome::Count(count)) => count,
            Ok(_) => panic!("statement produced no count"),
            Err(err) => panic!("insert failed: {err}"),
        }
    }

    /// Executes a statement expecting failure.
    pub fn expect_error(&self, stmt: &Statement) -> Error {
        match self.try_run(stmt) {
            Err(err) => err,
            Ok(_) => panic!("statement unexpectedly succeeded"),
        }
    }

    /// Compiles a statement and returns the planner warnings.
    pub fn warnings(&self, stmt: &Statement) -> Vec<String> {
        compile(stmt, &self.engine)
            .expect("compile failed")
            .warnings
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent table setup for test fixtures.
pub struct TableBuilder<'a> {
    ctx: &'a TestContext,
    name: String,
}

impl<'a> TableBuilder<'a> {
    pub fn new(ctx: &'a TestContext, name: &str) -> Self {
        TableBuilder {
            ctx,
            name: name.into(),
        }
    }

    pub fn create(self, columns: Vec<ColumnDef>) -> Self {
        self.ctx.exec(&create_table(&self.name, columns));
        self
    }

    pub fn insert(self, columns: &[&str], rows: Vec<Vec<Expr>>) -> Self {
        self.ctx.exec(&insert_into(&self.name, Some(columns), rows));
        self
    }
}

// --- position/identifier helpers ---

pub fn p() -> Pos {
    Pos::default()
}

pub fn at(line: u32, column: u32) -> Pos {
    Pos::new(line, column)
}

pub fn ident(name: &str) -> Ident {
    Ident::new(name, p())
}

pub fn ident_at(name: &str, pos: Pos) -> Ident {
    Ident::new(name, pos)
}

// --- expression builders ---

pub fn col(name: &str) -> Expr {
    Expr::Column {
        qualifier: None,
        name: ident(name),
    }
}

pub fn col_at(name: &str, pos: Pos) -> Expr {
    Expr::Column {
        qualifier: None,
        name: ident_at(name, pos),
    }
}

pub fn qcol(qualifier: &str, name: &str) -> Expr {
    Expr::Column {
        qualifier: Some(ident(qualifier)),
        name: ident(name),
    }
}

pub fn int(value: i64) -> Expr {
    Expr::Literal {
        value: Literal::Int(value),
        pos: p(),
    }
}

pub fn dec(text: &str) -> Expr {
    Expr::Literal {
        value: Literal::Decimal(text.parse().expect("bad decimal literal")),
        pos: p(),
    }
}

pub fn string(value: &str) -> Expr {
    Expr::Literal {
        value: Literal::String(value.into()),
        pos: p(),
    }
}

pub fn boolean(value: bool) -> Expr {
    Expr::Literal {
        value: Literal::Bool(value),
        pos: p(),
    }
}

pub fn null() -> Expr {
    Expr::Literal {
        value: Literal::Null,
        pos: p(),
    }
}

pub fn timestamp(text: &str) -> Expr {
    Expr::Literal {
        value: Literal::Timestamp(text.parse().expect("bad timestamp literal")),
        pos: p(),
    }
}

pub fn var(index: usize) -> Expr {
    Expr::Variable { index, pos: p() }
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        pos: p(),
    }
}

pub fn binary_at(op: BinaryOp, lhs: Expr, rhs: Expr, pos: Pos) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        pos,
    }
}

pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        name: ident(name),
        args,
    }
}

pub fn call_at(name: &str, pos: Pos, args: Vec<Expr>) -> Expr {
    Expr::Call {
        name: ident_at(name, pos),
        args,
    }
}

pub fn is_null(operand: Expr) -> Expr {
    Expr::IsNull {
        operand: Box::new(operand),
        negated: false,
        pos: p(),
    }
}

// --- SELECT builder ---

pub fn item(expr: Expr) -> SelectItem {
    SelectItem::Expr { expr, alias: None }
}

pub fn aliased(expr: Expr, alias: &str) -> SelectItem {
    SelectItem::Expr {
        expr,
        alias: Some(ident(alias)),
    }
}

pub fn star() -> SelectItem {
    SelectItem::Star { pos: p() }
}

pub struct Select(SelectStatement);

impl Select {
    pub fn items(items: Vec<SelectItem>) -> Self {
        Select(SelectStatement {
            items,
            ..SelectStatement::default()
        })
    }

    pub fn from(mut self, table: &str) -> Self {
        self.0.from = Some(TableRef {
            table: ident(table),
            alias: None,
        });
        self
    }

    pub fn from_at(mut self, table: &str, pos: Pos) -> Self {
        self.0.from = Some(TableRef {
            table: ident_at(table, pos),
            alias: None,
        });
        self
    }

    pub fn from_aliased(mut self, table: &str, alias: &str) -> Self {
        self.0.from = Some(TableRef {
            table: ident(table),
            alias: Some(ident(alias)),
        });
        self
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.0.filter = Some(predicate);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.0.distinct = true;
        self
    }

    pub fn order_by(self, column: &str, desc: bool) -> Self {
        self.order_by_expr(col(column), desc)
    }

    pub fn order_by_expr(mut self, expr: Expr, desc: bool) -> Self {
        self.0.order_by.push(OrderByTerm { expr, desc });
        self
    }

    pub fn top(mut self, n: u64) -> Self {
        self.0.top = Some(TopClause {
            n,
            deprecated_topn: false,
            pos: p(),
        });
        self
    }

    pub fn topn(mut self, n: u64) -> Self {
        self.0.top = Some(TopClause {
            n,
            deprecated_topn: true,
            pos: p(),
        });
        self
    }

    pub fn stmt(self) -> Statement {
        Statement::Select(self.0)
    }
}

// --- DDL builders ---

pub fn column(name: &str, type_name: &str) -> ColumnDef {
    ColumnDef {
        name: ident(name),
        type_name: TypeName::new(type_name, p()),
        constraints: vec![],
    }
}

pub fn decimal_column(name: &str, scale: u32) -> ColumnDef {
    ColumnDef {
        name: ident(name),
        type_name: TypeName::decimal(scale, p()),
        constraints: vec![],
    }
}

pub fn constrained(mut column: ColumnDef, kind: ConstraintKind) -> ColumnDef {
    column.constraints.push(ColumnConstraint { kind, pos: p() });
    column
}

pub fn constrained_at(mut column: ColumnDef, kind: ConstraintKind, pos: Pos) -> ColumnDef {
    column.constraints.push(ColumnConstraint { kind, pos });
    column
}

pub fn cachetype_ranked() -> ConstraintKind {
    ConstraintKind::CacheType {
        cache: CacheTypeName::Ranked,
        size: None,
    }
}

pub fn timequantum(quantum: &str, ttl: Option<&str>) -> ConstraintKind {
    ConstraintKind::TimeQuantum {
        quantum: quantum.into(),
        ttl: ttl.map(String::from),
    }
}

pub fn create_table(name: &str, columns: Vec<ColumnDef>) -> Statement {
    Statement::CreateTable(CreateTableStatement {
        name: ident(name),
        columns,
        pos: p(),
    })
}

pub fn create_table_at(name: &str, columns: Vec<ColumnDef>, pos: Pos) -> Statement {
    Statement::CreateTable(CreateTableStatement {
        name: ident(name),
        columns,
        pos,
    })
}

pub fn alter_table(table: &str, action: AlterAction) -> Statement {
    Statement::AlterTable(AlterTableStatement {
        table: ident(table),
        action,
        pos: p(),
    })
}

pub fn drop_table(table: &str) -> Statement {
    Statement::DropTable(DropTableStatement {
        table: ident(table),
        pos: p(),
    })
}

/// A plain `_id ID, a INT, b STRING` table, the workhorse fixture.
pub fn simple_table(name: &str) -> Statement {
    create_table(
        name,
        vec![column("_id", "id"), column("a", "int"), column("b", "string")],
    )
}

// --- INSERT / BULK INSERT builders ---

pub fn insert_into(table: &str, columns: Option<&[&str]>, rows: Vec<Vec<Expr>>) -> Statement {
    Statement::Insert(InsertStatement {
        table: ident(table),
        columns: columns.map(|cols| cols.iter().map(|c| ident(c)).collect()),
        rows,
        pos: p(),
    })
}

pub struct Bulk(BulkInsertStatement);

impl Bulk {
    pub fn into_table(table: &str) -> Self {
        Bulk(BulkInsertStatement {
            table: ident(table),
            columns: None,
            map: vec![],
            transforms: None,
            source: String::new(),
            source_pos: p(),
            format: None,
            input: None,
            batch_size: None,
            rows_limit: None,
            header_row: false,
            pos: p(),
        })
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.0.columns = Some(columns.iter().map(|c| ident(c)).collect());
        self
    }

    pub fn map_ordinal(mut self, ordinal: usize, type_name: &str) -> Self {
        self.0.map.push(BulkMapEntry {
            source: BulkMapSource::Ordinal(ordinal),
            type_name: named_type(type_name),
            pos: p(),
        });
        self
    }

    pub fn map_path(mut self, path: &str, type_name: &str) -> Self {
        self.0.map.push(BulkMapEntry {
            source: BulkMapSource::JsonPath(path.into()),
            type_name: named_type(type_name),
            pos: p(),
        });
        self
    }

    pub fn transform(mut self, expr: Expr) -> Self {
        self.0.transforms.get_or_insert_with(Vec::new).push(expr);
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.0.source = source.into();
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.0.format = Some((format.into(), p()));
        self
    }

    pub fn input(mut self, input: &str) -> Self {
        self.0.input = Some((input.into(), p()));
        self
    }

    pub fn batch_size(mut self, size: i64) -> Self {
        self.0.batch_size = Some((size, p()));
        self
    }

    pub fn rows_limit(mut self, limit: i64) -> Self {
        self.0.rows_limit = Some((limit, p()));
        self
    }

    pub fn header_row(mut self) -> Self {
        self.0.header_row = true;
        self
    }

    pub fn stmt(self) -> Statement {
        Statement::BulkInsert(self.0)
    }
}

fn named_type(type_name: &str) -> TypeName {
    match type_name.strip_prefix("decimal(") {
        Some(rest) => {
            let scale = rest
                .strip_suffix(')')
                .and_then(|s| s.parse().ok())
                .expect("bad decimal type");
            TypeName::decimal(scale, p())
        }
        None => TypeName::new(type_name, p()),
    }
}
