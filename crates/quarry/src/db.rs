mod builder;
pub use builder::Builder;

use crate::{schema::Schema, ActiveQuery, Command, ModelDef, Record, Related};

use quarry_core::{
    stmt::{Condition, Expression, Operand, Params, Query, Value},
    Driver, Error, Result,
};
use quarry_sql::{Dialect, Flavor, QueryBuilder};

use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// Shared state between all `Db` clones.
pub(crate) struct Shared {
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) builder: QueryBuilder,
    pub(crate) schema: Schema,
    pub(crate) models: IndexMap<String, Arc<ModelDef>>,
    pub(crate) log_params: bool,
}

/// A database handle: driver, dialect, schema cache and model registry.
///
/// Cloning is cheap; every clone shares the same schema cache.
#[derive(Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn query_builder(&self) -> &QueryBuilder {
        &self.shared.builder
    }

    pub fn dialect(&self) -> &Dialect {
        self.shared.builder.dialect()
    }

    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        &*self.shared.driver
    }

    pub(crate) fn log_params(&self) -> bool {
        self.shared.log_params
    }

    /// The registered model named `name`.
    pub fn model(&self, name: &str) -> Result<Arc<ModelDef>> {
        self.shared.models.get(name).cloned().ok_or_else(|| {
            Error::invalid_configuration(format!("model `{name}` is not registered"))
        })
    }

    pub fn create_command(&self, sql: impl AsRef<str>) -> Command {
        Command::new(self.clone(), sql.as_ref(), Params::new())
    }

    /// Compile `query` into a command.
    pub fn query_command(&self, query: &Query) -> Result<Command> {
        let (sql, params) = self.shared.builder.build(query)?;
        Ok(Command::new(self.clone(), &sql, params))
    }

    /// Start a query for records of `model`.
    pub fn find(&self, model: &str) -> Result<ActiveQuery> {
        Ok(ActiveQuery::new(self.clone(), self.model(model)?))
    }

    /// Load relation `name` of `record`, unless it is already populated.
    /// The result is cached in the record.
    pub async fn load_relation(&self, record: &Record, name: &str) -> Result<Related> {
        if let Some(related) = record.related(name) {
            return Ok(related);
        }

        let related = ActiveQuery::for_relation(self, record.model(), name)?
            .with_primary(record.clone())
            .find_for()
            .await?;

        record.populate_relation(name, related.clone());
        Ok(related)
    }

    /// Insert one row; returns the id the database generated, if any.
    pub async fn insert<K, V>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Option<Value>>
    where
        K: AsRef<str>,
        V: Into<Operand>,
    {
        let mut params = Params::new();
        let sql = self.shared.builder.insert(table, columns, &mut params)?;
        let response = Command::new(self.clone(), &sql, params)
            .execute_response()
            .await?;
        Ok(response.last_insert_id().cloned())
    }

    pub async fn batch_insert<C: AsRef<str>>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = C>,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<u64> {
        let mut params = Params::new();
        let sql = self
            .shared
            .builder
            .batch_insert(table, columns, rows, &mut params)?;
        if sql.is_empty() {
            return Ok(0);
        }
        Command::new(self.clone(), &sql, params).execute().await
    }

    pub async fn update<K, V>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = (K, V)>,
        condition: Option<Condition>,
    ) -> Result<u64>
    where
        K: AsRef<str>,
        V: Into<Operand>,
    {
        let mut params = Params::new();
        let sql = self
            .shared
            .builder
            .update(table, columns, condition.as_ref(), &mut params)?;
        Command::new(self.clone(), &sql, params).execute().await
    }

    pub async fn delete(&self, table: &str, condition: Option<Condition>) -> Result<u64> {
        let mut params = Params::new();
        let sql = self
            .shared
            .builder
            .delete(table, condition.as_ref(), &mut params)?;
        Command::new(self.clone(), &sql, params).execute().await
    }

    /// Rename a column. On MySQL the current definition is read from
    /// `SHOW CREATE TABLE` first; if that fails the definition is omitted.
    pub async fn rename_column(&self, table: &str, old_name: &str, new_name: &str) -> Result<()> {
        let create_table_sql = match self.dialect().flavor() {
            Flavor::Mysql => match self.schema().create_table_sql(table).await {
                Ok(sql) => Some(sql),
                Err(err) => {
                    tracing::warn!(table, error = %err, "could not read the table definition");
                    None
                }
            },
            _ => None,
        };

        let sql = self.shared.builder.rename_column(
            table,
            old_name,
            new_name,
            create_table_sql.as_deref(),
        )?;
        self.create_command(sql).execute().await?;
        self.schema().refresh_table_schema(table);
        Ok(())
    }

    /// Reset the sequence of `table` so the next generated key is `value`,
    /// or the current maximum primary key plus one.
    pub async fn reset_sequence(&self, table: &str, value: Option<u64>) -> Result<()> {
        let schema = self.schema().require(table).await?;

        if schema.sequence_name.is_none() {
            return Err(Error::invalid_configuration(format!(
                "there is no sequence associated with table `{}`",
                schema.full_name
            )));
        }

        let value = match (value, schema.primary_key.first()) {
            (Some(value), _) => value,
            (None, None) => 1,
            (None, Some(key)) => {
                let max = Query::new()
                    .select([Expression::new(format!(
                        "MAX({})",
                        self.dialect().quote_column_name(key)
                    ))])
                    .from([schema.full_name.as_str()]);
                let max = self.query_command(&max)?.query_scalar().await?;
                max.and_then(|max| max.as_i64()).unwrap_or(0).max(0) as u64 + 1
            }
        };

        let sql = self.shared.builder.reset_sequence(&schema, value)?;
        self.create_command(sql).execute().await?;
        Ok(())
    }

    pub async fn check_integrity(
        &self,
        check: bool,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<()> {
        let sql = self.shared.builder.check_integrity(check, schema, table)?;
        self.create_command(sql).execute().await?;
        Ok(())
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("driver", &self.shared.driver)
            .field("flavor", &self.dialect().flavor())
            .field("models", &self.shared.models.keys().collect::<Vec<_>>())
            .finish()
    }
}
