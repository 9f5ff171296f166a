//! Statement tree consumed by the planner
//!
//! Produced by the out-of-scope SQL parser. Every identifier and literal carries
//! a [`Pos`] so the planner can report `[line:col]` errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A source position (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(line: u32, column: u32) -> Self {
        Pos { line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A positioned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Ident {
            name: name.into(),
            pos,
        }
    }
}

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    BulkInsert(BulkInsertStatement),
    CreateTable(CreateTableStatement),
    AlterTable(AlterTableStatement),
    DropTable(DropTableStatement),
    ShowTables { pos: Pos },
    ShowColumns { table: Ident },
}

/// SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// TOP(n) / TOPN(n) clause.
    pub top: Option<TopClause>,
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<TableRef>,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderByTerm>,
}

/// TOP(n) limits output; TOPN(n) is the deprecated spelling of the same thing.
#[derive(Debug, Clone, PartialEq)]
pub struct TopClause {
    pub n: u64,
    pub deprecated_topn: bool,
    pub pos: Pos,
}

/// One entry in the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Star { pos: Pos },
    /// `relation.*`
    QualifiedStar { relation: Ident },
    /// An expression, optionally aliased.
    Expr { expr: Expr, alias: Option<Ident> },
}

/// A table reference in FROM, optionally aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub table: Ident,
    pub alias: Option<Ident>,
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByTerm {
    pub expr: Expr,
    pub desc: bool,
}

/// A scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal { value: Literal, pos: Pos },
    /// A column reference, optionally qualified by relation name or alias.
    Column {
        qualifier: Option<Ident>,
        name: Ident,
    },
    /// `@N` positional reference into a bulk-insert source record.
    Variable { index: usize, pos: Pos },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Pos,
    },
    /// Unary operation.
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        pos: Pos,
    },
    /// `expr IS [NOT] NULL`
    IsNull {
        operand: Box<Expr>,
        negated: bool,
        pos: Pos,
    },
    /// CASE expression; `operand` present for the "simple" form.
    Case {
        operand: Option<Box<Expr>>,
        whens: Vec<(Expr, Expr)>,
        else_expr: Option<Box<Expr>>,
        pos: Pos,
    },
    /// Function call.
    Call { name: Ident, args: Vec<Expr> },
}

impl Expr {
    /// The source position of this expression's head token.
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Literal { pos, .. }
            | Expr::Variable { pos, .. }
            | Expr::Binary { pos, .. }
            | Expr::Unary { pos, .. }
            | Expr::IsNull { pos, .. }
            | Expr::Case { pos, .. } => *pos,
            Expr::Column { qualifier, name } => {
                qualifier.as_ref().map(|q| q.pos).unwrap_or(name.pos)
            }
            Expr::Call { name, .. } => name.pos,
        }
    }
}

/// A literal value as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Int(i64),
    /// Decimal literal with its written scale, e.g. `12.34`.
    Decimal(rust_decimal::Decimal),
    Bool(bool),
    String(String),
    /// Timestamp literal, e.g. `'2022-02-22T22:22:22Z'`.
    Timestamp(chrono::DateTime<chrono::Utc>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Concat,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// INSERT INTO ... VALUES statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: Ident,
    /// Target columns; None means the table's full physical column order.
    pub columns: Option<Vec<Ident>>,
    pub rows: Vec<Vec<Expr>>,
    pub pos: Pos,
}

/// BULK INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkInsertStatement {
    pub table: Ident,
    /// Target columns; None means the table's full physical column order.
    pub columns: Option<Vec<Ident>>,
    /// Source-field map entries, one per target column.
    pub map: Vec<BulkMapEntry>,
    /// Optional transform expressions, referencing source fields as `@N`.
    pub transforms: Option<Vec<Expr>>,
    /// Data source: a file path or an inline byte stream, per `input`.
    pub source: String,
    pub source_pos: Pos,
    /// FORMAT 'CSV' | 'NDJSON' (required).
    pub format: Option<(String, Pos)>,
    /// INPUT 'FILE' | 'STREAM' (required).
    pub input: Option<(String, Pos)>,
    pub batch_size: Option<(i64, Pos)>,
    pub rows_limit: Option<(i64, Pos)>,
    pub header_row: bool,
    pub pos: Pos,
}

/// One `MAP` entry: where the value comes from and the scalar type to convert to.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkMapEntry {
    pub source: BulkMapSource,
    pub type_name: TypeName,
    pub pos: Pos,
}

/// Source-field locator for a bulk map entry.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkMapSource {
    /// CSV field index.
    Ordinal(usize),
    /// NDJSON path, e.g. `$.a`.
    JsonPath(String),
}

/// CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub name: Ident,
    pub columns: Vec<ColumnDef>,
    pub pos: Pos,
}

/// ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableStatement {
    pub table: Ident,
    pub action: AlterAction,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    DropColumn(Ident),
    /// Recognized statement shape; compilation rejects it as unsupported.
    RenameColumn { from: Ident, to: Ident },
}

/// DROP TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    pub table: Ident,
    pub pos: Pos,
}

/// A column definition in CREATE/ALTER TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: Ident,
    pub type_name: TypeName,
    pub constraints: Vec<ColumnConstraint>,
}

/// A SQL type name as written, e.g. `decimal(2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub name: String,
    /// Scale for `decimal(n)`.
    pub scale: Option<u32>,
    pub pos: Pos,
}

impl TypeName {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        TypeName {
            name: name.into(),
            scale: None,
            pos,
        }
    }

    pub fn decimal(scale: u32, pos: Pos) -> Self {
        TypeName {
            name: "decimal".into(),
            scale: Some(scale),
            pos,
        }
    }
}

/// A per-column constraint in CREATE/ALTER TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConstraint {
    pub kind: ConstraintKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// `min N` (INT).
    Min(i64),
    /// `max N` (INT).
    Max(i64),
    /// `cachetype ranked|lru [size N]` (STRING/ID/STRINGSET/IDSET).
    CacheType {
        cache: CacheTypeName,
        size: Option<u32>,
    },
    /// `timequantum 'Q' [ttl 'D']` (STRINGSET/IDSET).
    TimeQuantum { quantum: String, ttl: Option<String> },
    /// `timeunit 'U'` (TIMESTAMP).
    TimeUnit(String),
    /// `epoch 'TS'` (TIMESTAMP).
    Epoch(String),
}

/// Cache type names accepted by CACHETYPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTypeName {
    Ranked,
    Lru,
}
