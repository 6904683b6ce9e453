pub mod builder;
pub use builder::{ColumnDef, ColumnType, ConditionCompiler, QueryBuilder};

mod column_builder;
pub use column_builder::ColumnSchemaBuilder;

pub mod dialect;
pub use dialect::{Dialect, Flavor};
