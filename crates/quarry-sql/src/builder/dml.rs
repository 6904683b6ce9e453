use super::{merge_params, ConditionCompiler, QueryBuilder};
use crate::Flavor;

use quarry_core::{
    stmt::{Condition, Operand, Params, Value},
    Error, Result,
};

impl QueryBuilder {
    /// `INSERT INTO table (columns) VALUES (...)`.
    pub fn insert<K, V>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = (K, V)>,
        params: &mut Params,
    ) -> Result<String>
    where
        K: AsRef<str>,
        V: Into<Operand>,
    {
        let dialect = self.dialect();
        let mut names = vec![];
        let mut values = vec![];

        for (name, value) in columns {
            names.push(dialect.quote_column_name(name.as_ref()));
            values.push(self.assignment_value(value.into(), params)?);
        }

        let table = dialect.quote_table_name(table);

        Ok(match (names.is_empty(), dialect.flavor()) {
            (true, Flavor::Mysql) => format!("INSERT INTO {table} () VALUES ()"),
            (true, _) => format!("INSERT INTO {table} DEFAULT VALUES"),
            (false, _) => format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                names.join(", "),
                values.join(", ")
            ),
        })
    }

    /// Multi-row insert with literal values. Returns an empty string when
    /// there are no rows.
    ///
    /// Strings are quoted inline; binary values are bound as parameters.
    pub fn batch_insert<C: AsRef<str>>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = C>,
        rows: impl IntoIterator<Item = Vec<Value>>,
        params: &mut Params,
    ) -> Result<String> {
        let dialect = self.dialect();
        let mut values = vec![];

        for row in rows {
            let row = row
                .into_iter()
                .map(|value| self.literal(value, params))
                .collect::<Result<Vec<_>>>()?;
            values.push(format!("({})", row.join(", ")));
        }

        if values.is_empty() {
            return Ok(String::new());
        }

        let columns = columns
            .into_iter()
            .map(|column| dialect.quote_column_name(column.as_ref()))
            .collect::<Vec<_>>();

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            dialect.quote_table_name(table),
            columns.join(", "),
            values.join(", ")
        ))
    }

    /// `UPDATE table SET ... [WHERE ...]`.
    pub fn update<K, V>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = (K, V)>,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> Result<String>
    where
        K: AsRef<str>,
        V: Into<Operand>,
    {
        let dialect = self.dialect();
        let mut lines = vec![];

        for (name, value) in columns {
            let value = self.assignment_value(value.into(), params)?;
            lines.push(format!("{}={value}", dialect.quote_column_name(name.as_ref())));
        }

        if lines.is_empty() {
            return Err(Error::invalid_condition(format!(
                "update of `{table}` has no columns to set"
            )));
        }

        let sql = format!(
            "UPDATE {} SET {}",
            dialect.quote_table_name(table),
            lines.join(", ")
        );
        self.append_where(sql, condition, params)
    }

    /// `DELETE FROM table [WHERE ...]`.
    pub fn delete(
        &self,
        table: &str,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> Result<String> {
        let sql = format!("DELETE FROM {}", self.dialect().quote_table_name(table));
        self.append_where(sql, condition, params)
    }

    fn append_where(
        &self,
        sql: String,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> Result<String> {
        let where_ = self.build_where(condition, params)?;
        Ok(if where_.is_empty() {
            sql
        } else {
            format!("{sql} {where_}")
        })
    }

    fn assignment_value(&self, operand: Operand, params: &mut Params) -> Result<String> {
        match operand {
            Operand::Value(value @ (Value::List(_) | Value::Record(_))) => {
                Err(Error::type_conversion(value, "column value"))
            }
            Operand::Value(value) => Ok(ConditionCompiler::bind(params, value)),
            Operand::Expression(expr) => {
                Ok(merge_params(params, &expr.sql, &expr.params))
            }
            Operand::Query(query) => Ok(format!("({})", self.build_with_params(&query, params)?)),
            Operand::Condition(_) => Err(Error::invalid_condition(
                "a condition cannot be assigned to a column",
            )),
        }
    }

    fn literal(&self, value: Value, params: &mut Params) -> Result<String> {
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(v) => (v as u8).to_string(),
            Value::I64(v) => v.to_string(),
            Value::U64(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::String(s) => self.dialect().quote_value(&s),
            value @ Value::Bytes(_) => ConditionCompiler::bind(params, value),
            value @ (Value::List(_) | Value::Record(_)) => {
                return Err(Error::type_conversion(value, "SQL literal"))
            }
        })
    }
}
