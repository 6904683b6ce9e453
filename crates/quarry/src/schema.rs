//! Table metadata, cached per database handle.

pub use quarry_core::schema::{
    AbstractType, ColumnDefault, ColumnSchema, ForeignKey, HostType, Introspect, TableSchema,
};

use quarry_core::{Driver, Error, Result};
use quarry_sql::Dialect;

use indexmap::IndexMap;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

/// Lazily loaded table metadata.
///
/// Lookups go through the configured [`Introspect`] implementation and the
/// results are cached by raw table name. Concurrent loads of the same table
/// may both hit the database; the last one to finish wins. A failed
/// introspection query yields `None` and is not cached.
#[derive(Debug)]
pub struct Schema {
    driver: Arc<dyn Driver>,
    introspector: Option<Box<dyn Introspect>>,
    dialect: Dialect,
    cache_enabled: bool,
    tables: RwLock<HashMap<String, Arc<TableSchema>>>,
    table_names: RwLock<HashMap<String, Vec<String>>>,
}

impl Schema {
    pub(crate) fn new(
        driver: Arc<dyn Driver>,
        introspector: Option<Box<dyn Introspect>>,
        dialect: Dialect,
        cache_enabled: bool,
    ) -> Schema {
        Schema {
            driver,
            introspector,
            dialect,
            cache_enabled,
            tables: RwLock::default(),
            table_names: RwLock::default(),
        }
    }

    /// Metadata of `name`, or `None` if the table does not exist or could
    /// not be introspected. `name` may be a `{{%template}}`.
    pub async fn table_schema(&self, name: &str, refresh: bool) -> Result<Option<Arc<TableSchema>>> {
        let raw = self.dialect.raw_table_name(name);

        if self.cache_enabled && !refresh {
            let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(table) = tables.get(&raw) {
                tracing::debug!(table = %raw, "table schema cache hit");
                return Ok(Some(table.clone()));
            }
        }

        tracing::debug!(table = %raw, "loading table schema");
        let loaded = match self.introspector()?.table_schema(&*self.driver, &raw).await {
            Ok(loaded) => loaded.map(Arc::new),
            Err(err) if err.is_sql_execution() => {
                tracing::warn!(table = %raw, error = %err, "table introspection failed");
                None
            }
            Err(err) => return Err(err),
        };

        if let Some(table) = &loaded {
            self.tables
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(raw, table.clone());
        }

        Ok(loaded)
    }

    /// Metadata of every table in `schema`, or in the default schema.
    /// Tables that fail to load are skipped.
    pub async fn table_schemas(
        &self,
        schema: Option<&str>,
        refresh: bool,
    ) -> Result<Vec<Arc<TableSchema>>> {
        let mut tables = vec![];

        for name in self.table_names(schema, refresh).await? {
            let name = match schema {
                Some(schema) => format!("{schema}.{name}"),
                None => name,
            };
            if let Some(table) = self.table_schema(&name, refresh).await? {
                tables.push(table);
            }
        }

        Ok(tables)
    }

    pub async fn table_names(&self, schema: Option<&str>, refresh: bool) -> Result<Vec<String>> {
        let key = schema.unwrap_or_default().to_string();

        if self.cache_enabled && !refresh {
            let names = self
                .table_names
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(names) = names.get(&key) {
                return Ok(names.clone());
            }
        }

        let names = self
            .introspector()?
            .table_names(&*self.driver, schema)
            .await?;

        self.table_names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, names.clone());

        Ok(names)
    }

    /// Drop every cached table schema and table name list.
    pub fn refresh(&self) {
        tracing::debug!("refreshing schema cache");
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.table_names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn refresh_table_schema(&self, name: &str) {
        let raw = self.dialect.raw_table_name(name);
        tracing::debug!(table = %raw, "refreshing table schema");
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&raw);
    }

    /// Primary key columns of `table`. Fails if the table does not exist.
    pub async fn primary_key_of(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.require(table).await?.primary_key.clone())
    }

    pub async fn column_schema(&self, table: &str, column: &str) -> Result<Option<ColumnSchema>> {
        Ok(self
            .table_schema(table, false)
            .await?
            .and_then(|table| table.column(column).cloned()))
    }

    pub async fn unique_indexes(&self, table: &str) -> Result<IndexMap<String, Vec<String>>> {
        let table = self.require(table).await?;
        self.introspector()?
            .unique_indexes(&*self.driver, &table)
            .await
    }

    /// The database's own `CREATE TABLE` text for `table`.
    pub async fn create_table_sql(&self, table: &str) -> Result<String> {
        let raw = self.dialect.raw_table_name(table);
        self.introspector()?
            .create_table_sql(&*self.driver, &raw)
            .await
    }

    pub fn quote_value(&self, value: &str) -> String {
        self.dialect.quote_value(value)
    }

    pub fn quote_table_name(&self, name: &str) -> String {
        self.dialect.quote_table_name(name)
    }

    pub fn quote_column_name(&self, name: &str) -> String {
        self.dialect.quote_column_name(name)
    }

    pub fn quote_simple_table_name(&self, name: &str) -> String {
        self.dialect.quote_simple_table_name(name)
    }

    pub fn quote_simple_column_name(&self, name: &str) -> String {
        self.dialect.quote_simple_column_name(name)
    }

    pub fn raw_table_name(&self, name: &str) -> String {
        self.dialect.raw_table_name(name)
    }

    pub(crate) async fn require(&self, table: &str) -> Result<Arc<TableSchema>> {
        self.table_schema(table, false).await?.ok_or_else(|| {
            Error::invalid_configuration(format!("table `{table}` does not exist"))
        })
    }

    fn introspector(&self) -> Result<&dyn Introspect> {
        self.introspector.as_deref().ok_or_else(|| {
            Error::invalid_configuration(
                "no introspector configured; set one with `Builder::introspector`",
            )
        })
    }
}
