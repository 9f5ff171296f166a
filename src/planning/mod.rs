//! Statement planning: compilation of parsed statements into operator trees.

pub mod ddl;
pub mod operator;
pub mod planner;

pub use operator::{
    AlterOp, BulkFormat, BulkInput, BulkPlan, BulkSource, Catalog, Direction, Operator,
    OperatorPlan, Plan, SortKey,
};
pub use planner::compile;
