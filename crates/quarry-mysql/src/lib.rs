mod columns;
mod constraints;

use quarry_core::{
    async_trait,
    driver::ResultMode,
    schema::{Introspect, TableSchema},
    stmt::{Params, Row, Value},
    Driver, Error, Result,
};
use quarry_sql::Dialect;

use indexmap::IndexMap;

/// Reads table metadata from a MySQL (or MariaDB) server.
///
/// Column metadata comes from `SHOW FULL COLUMNS`; foreign keys and unique
/// indexes are parsed out of `SHOW CREATE TABLE`.
#[derive(Debug, Clone)]
pub struct MySQL {
    dialect: Dialect,
}

impl MySQL {
    pub fn new() -> MySQL {
        MySQL {
            dialect: Dialect::mysql(),
        }
    }

    async fn query(&self, driver: &dyn Driver, sql: &str, mode: ResultMode) -> Result<Vec<Row>> {
        tracing::debug!(sql, "introspecting");

        match driver.execute(sql, &Params::new(), mode).await {
            Ok(response) => response.into_rows(),
            Err(err) => Err(Error::sql_execution(sql, err)),
        }
    }

    async fn load_table_schema(&self, driver: &dyn Driver, name: &str) -> Result<TableSchema> {
        let mut table = resolve_table_name(name);
        let quoted = self.dialect.quote_table_name(&table.full_name);

        let rows = self
            .query(driver, &format!("SHOW FULL COLUMNS FROM {quoted}"), ResultMode::All)
            .await?;

        for row in &rows {
            let column = columns::load_column_schema(row)?;
            if column.auto_increment {
                table.sequence_name = Some(String::new());
            }
            table.push_column(column);
        }

        let create_table = self.create_table_sql(driver, &table.full_name).await?;
        table.foreign_keys = constraints::foreign_keys(&create_table);

        Ok(table)
    }
}

impl Default for MySQL {
    fn default() -> Self {
        MySQL::new()
    }
}

#[async_trait]
impl Introspect for MySQL {
    async fn table_names(&self, driver: &dyn Driver, schema: Option<&str>) -> Result<Vec<String>> {
        let sql = match schema {
            Some(schema) => format!("SHOW FULL TABLES FROM {}", self.dialect.quote_table_name(schema)),
            None => "SHOW FULL TABLES".to_string(),
        };

        let rows = self.query(driver, &sql, ResultMode::Column).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_values().next() {
                Some(Value::String(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    async fn table_schema(&self, driver: &dyn Driver, name: &str) -> Result<Option<TableSchema>> {
        match self.load_table_schema(driver, name).await {
            Ok(table) => Ok(Some(table)),
            Err(err) if err.is_sql_execution() => {
                tracing::warn!(table = name, error = %err, "table metadata unavailable");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn unique_indexes(
        &self,
        driver: &dyn Driver,
        table: &TableSchema,
    ) -> Result<IndexMap<String, Vec<String>>> {
        let sql = self.create_table_sql(driver, &table.full_name).await?;
        Ok(constraints::unique_indexes(&sql))
    }

    async fn create_table_sql(&self, driver: &dyn Driver, name: &str) -> Result<String> {
        let sql = format!("SHOW CREATE TABLE {}", self.dialect.quote_table_name(name));
        let rows = self.query(driver, &sql, ResultMode::One).await?;

        let Some(row) = rows.into_iter().next() else {
            return Err(Error::sql_execution(
                sql,
                quarry_core::err!("no result for table `{name}`"),
            ));
        };

        // Columns are `Table` and `Create Table`.
        let create = row
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("create table"))
            .map(|(_, value)| value)
            .or_else(|| row.get_index(1).map(|(_, value)| value));

        match create {
            Some(Value::String(create)) => Ok(create.clone()),
            _ => Err(Error::sql_execution(
                sql,
                quarry_core::err!("unexpected result shape for table `{name}`"),
            )),
        }
    }
}

/// Split `schema.table` (quotes allowed) into its parts.
fn resolve_table_name(name: &str) -> TableSchema {
    let name = name.replace('`', "");

    match name.split_once('.') {
        Some((schema, table)) => TableSchema::new(table).with_schema_name(schema),
        None => TableSchema::new(name),
    }
}
