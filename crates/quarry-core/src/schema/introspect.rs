use super::TableSchema;
use crate::{async_trait, Driver, Result};

use indexmap::IndexMap;
use std::fmt::Debug;

/// Reads table metadata from a live database.
///
/// Implemented once per database engine. Table names passed in are raw
/// names: any `{{%name}}` template has already been resolved.
#[async_trait]
pub trait Introspect: Debug + Send + Sync + 'static {
    /// Names of the tables in `schema`, or in the default schema.
    async fn table_names(&self, driver: &dyn Driver, schema: Option<&str>) -> Result<Vec<String>>;

    /// Metadata of `name`, or `None` when the table does not exist.
    async fn table_schema(&self, driver: &dyn Driver, name: &str) -> Result<Option<TableSchema>>;

    /// Unique indexes of `table`, keyed by index name.
    async fn unique_indexes(
        &self,
        driver: &dyn Driver,
        table: &TableSchema,
    ) -> Result<IndexMap<String, Vec<String>>>;

    /// The `CREATE TABLE` statement of `name`, as reported by the database.
    async fn create_table_sql(&self, driver: &dyn Driver, name: &str) -> Result<String>;
}
