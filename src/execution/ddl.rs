//! DDL execution
//!
//! Drives compiled DDL against the engine. Engine errors pass through to the
//! client verbatim.

use crate::engine::{Engine, IndexInfo};
use crate::error::Result;
use crate::planning::operator::AlterOp;
use tracing::debug;

pub fn create_table(engine: &dyn Engine, info: &IndexInfo) -> Result<()> {
    debug!(table = %info.name, fields = info.fields.len(), "creating table");
    engine.create_index(info.clone())
}

pub fn alter_table(engine: &dyn Engine, table: &str, action: &AlterOp) -> Result<()> {
    match action {
        AlterOp::AddColumn(field) => {
            debug!(table, column = %field.name, "adding column");
            engine.create_field(table, field.clone())
        }
        AlterOp::DropColumn(name) => {
            debug!(table, column = %name, "dropping column");
            engine.drop_field(table, name)
        }
    }
}

pub fn drop_table(engine: &dyn Engine, table: &str) -> Result<()> {
    debug!(table, "dropping table");
    engine.drop_index(table)
}
