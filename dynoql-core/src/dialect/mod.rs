/// SQL-like dialect: statement recognition, `WITH` options, DML preprocessing
/// and the conventional INSERT rewrite.

pub mod options;
pub mod dml;
pub mod statement;
pub mod grammar;
pub mod transform;

pub use options::{OptValues, Options};
pub use statement::{
    AlterGsi, AlterTable, CreateGsi, CreateTable, DescribeIndex, DescribeTable, Dml, DmlKind,
    DropGsi, DropTable, ExecMode, Statement, StatementKind,
};
pub use grammar::parse;
pub use transform::transform_insert_to_partiql;
