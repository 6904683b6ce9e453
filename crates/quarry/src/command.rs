use crate::Db;

use quarry_core::{
    driver::{ResultMode, Response},
    stmt::{normalize_param_name, Params, Row, Value},
    Error, Result,
};

/// A SQL statement bound to a database handle.
///
/// `{{table}}` and `[[column]]` templates are expanded when the command is
/// created, so [`Command::sql`] returns the text the driver receives.
#[derive(Debug, Clone)]
pub struct Command {
    db: Db,
    sql: String,
    params: Params,
}

impl Command {
    pub(crate) fn new(db: Db, sql: &str, params: Params) -> Command {
        let sql = db.dialect().quote_sql(sql);
        Command { db, sql, params }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn bind_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Command {
        self.params
            .insert(normalize_param_name(name.into()), value.into());
        self
    }

    pub fn bind_values<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Command
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in values {
            self.params
                .insert(normalize_param_name(name.into()), value.into());
        }
        self
    }

    /// The SQL with every placeholder replaced by its quoted value. Only
    /// meant for display; never execute the result.
    pub fn raw_sql(&self) -> String {
        let dialect = self.db.dialect();
        let mut names = self.params.keys().collect::<Vec<_>>();
        // `:qp1` must not be replaced inside `:qp10`
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));

        let mut sql = self.sql.clone();
        for name in names {
            let literal = match &self.params[name] {
                Value::Null => "NULL".to_string(),
                Value::Bool(v) => (*v as u8).to_string(),
                Value::I64(v) => v.to_string(),
                Value::U64(v) => v.to_string(),
                Value::F64(v) => v.to_string(),
                value => dialect.quote_value(&value.to_key()),
            };
            sql = sql.replace(name.as_str(), &literal);
        }
        sql
    }

    pub async fn query_all(&self) -> Result<Vec<Row>> {
        self.run(ResultMode::All).await?.into_rows()
    }

    pub async fn query_one(&self) -> Result<Option<Row>> {
        let rows = self.run(ResultMode::One).await?.into_rows()?;
        Ok(rows.into_iter().next())
    }

    /// First column of the first row. `None` when there are no rows.
    pub async fn query_scalar(&self) -> Result<Option<Value>> {
        let rows = self.run(ResultMode::Scalar).await?.into_rows()?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.into_values().next().unwrap_or(Value::Null)))
    }

    pub async fn query_column(&self) -> Result<Vec<Value>> {
        let rows = self.run(ResultMode::Column).await?.into_rows()?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_values().next())
            .collect())
    }

    /// Run a statement that produces no rows; returns the affected row count.
    pub async fn execute(&self) -> Result<u64> {
        self.run(ResultMode::Execute).await?.into_count()
    }

    /// Run a write statement and return the full driver response, which
    /// carries the last insert id.
    pub async fn execute_response(&self) -> Result<Response> {
        self.run(ResultMode::Execute).await
    }

    async fn run(&self, mode: ResultMode) -> Result<Response> {
        if self.sql.trim().is_empty() {
            return Err(Error::invalid_condition(
                "cannot execute an empty SQL statement",
            ));
        }

        tracing::debug!(sql = %self.sql, ?mode, "executing statement");
        if self.db.log_params() {
            tracing::trace!(params = ?self.params, "statement params");
        }

        self.db
            .driver()
            .execute(&self.sql, &self.params, mode)
            .await
            .map_err(|err| Error::sql_execution(self.sql.clone(), err))
    }
}
