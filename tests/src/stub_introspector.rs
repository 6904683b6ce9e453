use async_trait::async_trait;
use indexmap::IndexMap;
use quarry::{
    err,
    schema::{Introspect, TableSchema},
    Driver, Error, Result,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

/// Serves table metadata from memory and counts lookups.
#[derive(Debug, Clone, Default)]
pub struct StubIntrospector {
    tables: Arc<Mutex<IndexMap<String, TableSchema>>>,
    lookups: Arc<AtomicUsize>,

    /// Lookups of these tables fail like a broken introspection query.
    failing: Arc<Mutex<Vec<String>>>,
}

impl StubIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, table: TableSchema) -> &Self {
        self.tables
            .lock()
            .unwrap()
            .insert(table.full_name.clone(), table);
        self
    }

    pub fn failing(&self, name: &str) -> &Self {
        self.failing.lock().unwrap().push(name.to_string());
        self
    }

    /// Number of `table_schema` calls so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Introspect for StubIntrospector {
    async fn table_names(&self, _driver: &dyn Driver, _schema: Option<&str>) -> Result<Vec<String>> {
        Ok(self.tables.lock().unwrap().keys().cloned().collect())
    }

    async fn table_schema(&self, _driver: &dyn Driver, name: &str) -> Result<Option<TableSchema>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().iter().any(|failing| failing == name) {
            let sql = format!("SHOW FULL COLUMNS FROM `{name}`");
            return Err(Error::sql_execution(sql, err!("table is locked")));
        }

        Ok(self.tables.lock().unwrap().get(name).cloned())
    }

    async fn unique_indexes(
        &self,
        _driver: &dyn Driver,
        _table: &TableSchema,
    ) -> Result<IndexMap<String, Vec<String>>> {
        Ok(IndexMap::new())
    }

    async fn create_table_sql(&self, _driver: &dyn Driver, name: &str) -> Result<String> {
        Err(err!("no definition for `{name}`"))
    }
}
