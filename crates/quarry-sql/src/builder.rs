mod condition;
pub use condition::{ConditionCompiler, PARAM_PREFIX};

mod ddl;
pub use ddl::{ColumnDef, ColumnType};

mod dml;

use crate::Dialect;

use quarry_core::{
    stmt::{
        Column, Condition, Direction, Join, OrderBy, Params, Query, SelectItem, TableRef,
        TableSource, Union,
    },
    Result,
};
use regex::{Captures, Regex};
use std::{collections::HashMap, sync::LazyLock};

/// A named placeholder such as `:qp0` or `:id` inside an SQL fragment.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":?\w+").unwrap());

/// `name AS alias` or `name alias` in a select list.
static COLUMN_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(?i:\s+as\s+|\s+)([\w\-_\.]+)$").unwrap());

/// `table AS alias` or `table alias` in a `FROM` or `JOIN`.
static TABLE_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(?i:\s+as|)\s+([^ ]+)$").unwrap());

/// Compiles queries, DML and DDL into SQL text and bindings.
///
/// One builder serves every dialect: everything that differs between
/// engines is delegated to its [`Dialect`]. Building never mutates the
/// query, so the same query may be built any number of times.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> QueryBuilder {
        QueryBuilder { dialect }
    }

    pub fn mysql() -> QueryBuilder {
        QueryBuilder::new(Dialect::mysql())
    }

    pub fn postgresql() -> QueryBuilder {
        QueryBuilder::new(Dialect::postgresql())
    }

    pub fn sqlite() -> QueryBuilder {
        QueryBuilder::new(Dialect::sqlite())
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Build a `SELECT` statement and the bindings it references.
    pub fn build(&self, query: &Query) -> Result<(String, Params)> {
        let mut params = Params::new();
        let sql = self.build_with_params(query, &mut params)?;
        Ok((sql, params))
    }

    /// Build a query into an existing set of bindings. Used for
    /// sub-queries so that placeholder numbering continues across the
    /// whole statement.
    pub fn build_with_params(&self, query: &Query, params: &mut Params) -> Result<String> {
        for (name, value) in &query.params {
            params.insert(name.clone(), value.clone());
        }

        let clauses = [
            self.build_select(query, params)?,
            self.build_from(&query.from, params)?,
            self.build_join(&query.joins, params)?,
            self.build_where(query.where_.as_ref(), params)?,
            self.build_group_by(&query.group_by, params)?,
            self.build_having(query.having.as_ref(), params)?,
        ];

        let mut sql = clauses
            .into_iter()
            .filter(|clause| !clause.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let union = self.build_union(&query.unions, params)?;
        if !union.is_empty() {
            sql = format!("({sql}) {union}");
        }

        let order_by = self.build_order_by(&query.order_by, params)?;
        if !order_by.is_empty() {
            sql.push(' ');
            sql.push_str(&order_by);
        }

        let limit = self.dialect.build_limit(query.limit, query.offset);
        if !limit.is_empty() {
            sql.push(' ');
            sql.push_str(&limit);
        }

        Ok(sql)
    }

    /// Compile a condition on its own.
    pub fn build_condition(&self, condition: &Condition, params: &mut Params) -> Result<String> {
        ConditionCompiler::new(self).compile(condition, params)
    }

    fn build_select(&self, query: &Query, params: &mut Params) -> Result<String> {
        let mut sql = String::from(if query.distinct {
            "SELECT DISTINCT"
        } else {
            "SELECT"
        });

        if let Some(option) = &query.select_option {
            sql.push(' ');
            sql.push_str(option);
        }

        if query.select.is_empty() {
            sql.push_str(" *");
            return Ok(sql);
        }

        let columns = query
            .select
            .iter()
            .map(|item| self.build_select_item(item, params))
            .collect::<Result<Vec<_>>>()?;

        sql.push(' ');
        sql.push_str(&columns.join(", "));
        Ok(sql)
    }

    fn build_select_item(&self, item: &SelectItem, params: &mut Params) -> Result<String> {
        let dialect = &self.dialect;

        let column = match (&item.column, &item.alias) {
            (Column::Name(name), None) if !name.contains('(') => {
                return Ok(match COLUMN_ALIAS.captures(name) {
                    Some(caps) => format!(
                        "{} AS {}",
                        dialect.quote_column_name(&caps[1]),
                        dialect.quote_column_name(&caps[2])
                    ),
                    None => dialect.quote_column_name(name),
                });
            }
            (column, _) => self.build_column(column, params)?,
        };

        Ok(match &item.alias {
            Some(alias) => format!("{column} AS {}", dialect.quote_column_name(alias)),
            None => column,
        })
    }

    /// A column reference outside the select list: quoted name, verbatim
    /// expression or parenthesized sub-query.
    fn build_column(&self, column: &Column, params: &mut Params) -> Result<String> {
        Ok(match column {
            Column::Name(name) => self.dialect.quote_column_name(name),
            Column::Expression(expr) => {
                merge_params(params, &expr.sql, &expr.params)
            }
            Column::Query(query) => format!("({})", self.build_with_params(query, params)?),
        })
    }

    fn build_from(&self, tables: &[TableRef], params: &mut Params) -> Result<String> {
        if tables.is_empty() {
            return Ok(String::new());
        }

        let tables = tables
            .iter()
            .map(|table| self.build_table_ref(table, params))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!("FROM {}", tables.join(", ")))
    }

    fn build_table_ref(&self, table: &TableRef, params: &mut Params) -> Result<String> {
        let dialect = &self.dialect;

        let source = match &table.source {
            TableSource::Table(name) if table.alias.is_none() && !name.contains('(') => {
                return Ok(match TABLE_ALIAS.captures(name) {
                    Some(caps) => format!(
                        "{} {}",
                        dialect.quote_table_name(&caps[1]),
                        dialect.quote_table_name(&caps[2])
                    ),
                    None => dialect.quote_table_name(name),
                });
            }
            TableSource::Table(name) => dialect.quote_table_name(name),
            TableSource::Query(query) => format!("({})", self.build_with_params(query, params)?),
            TableSource::Expression(expr) => {
                merge_params(params, &expr.sql, &expr.params)
            }
        };

        Ok(match &table.alias {
            Some(alias) => format!("{source} {}", dialect.quote_table_name(alias)),
            None => source,
        })
    }

    fn build_join(&self, joins: &[Join], params: &mut Params) -> Result<String> {
        let mut parts = Vec::with_capacity(joins.len());

        for join in joins {
            let mut sql = format!("{} {}", join.kind, self.build_table_ref(&join.table, params)?);

            if let Some(on) = &join.on {
                let on = self.build_condition(on, params)?;
                if !on.is_empty() {
                    sql.push_str(" ON ");
                    sql.push_str(&on);
                }
            }

            parts.push(sql);
        }

        Ok(parts.join(" "))
    }

    pub(crate) fn build_where(
        &self,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> Result<String> {
        self.build_prefixed("WHERE", condition, params)
    }

    fn build_having(&self, condition: Option<&Condition>, params: &mut Params) -> Result<String> {
        self.build_prefixed("HAVING", condition, params)
    }

    fn build_prefixed(
        &self,
        keyword: &str,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> Result<String> {
        let Some(condition) = condition else {
            return Ok(String::new());
        };

        let sql = self.build_condition(condition, params)?;
        Ok(if sql.is_empty() {
            sql
        } else {
            format!("{keyword} {sql}")
        })
    }

    fn build_group_by(&self, columns: &[Column], params: &mut Params) -> Result<String> {
        if columns.is_empty() {
            return Ok(String::new());
        }

        let columns = columns
            .iter()
            .map(|column| self.build_column(column, params))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!("GROUP BY {}", columns.join(", ")))
    }

    fn build_union(&self, unions: &[Union], params: &mut Params) -> Result<String> {
        let mut parts = Vec::with_capacity(unions.len());

        for union in unions {
            let sql = self.build_with_params(&union.query, params)?;
            let keyword = if union.all { "UNION ALL" } else { "UNION" };
            parts.push(format!("{keyword} ( {sql} )"));
        }

        Ok(parts.join(" "))
    }

    fn build_order_by(&self, order_by: &[OrderBy], params: &mut Params) -> Result<String> {
        if order_by.is_empty() {
            return Ok(String::new());
        }

        let columns = order_by
            .iter()
            .map(|order| {
                let column = self.build_column(&order.column, params)?;
                Ok(match order.direction {
                    Direction::Asc => column,
                    Direction::Desc => format!("{column} DESC"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(format!("ORDER BY {}", columns.join(", ")))
    }
}

/// Bindings carried by expressions join the statement's bindings.
///
/// A carried name already bound to a different value is renamed to the next
/// free placeholder and `sql` is rewritten to match. Returns the fragment to
/// embed.
pub(crate) fn merge_params(params: &mut Params, sql: &str, extra: &Params) -> String {
    let mut renames = HashMap::new();

    for (name, value) in extra {
        match params.get(name) {
            Some(bound) if bound == value => {}
            Some(_) => {
                let fresh = ConditionCompiler::bind_excluding(params, extra, value.clone());
                renames.insert(name.as_str(), fresh);
            }
            None => {
                params.insert(name.clone(), value.clone());
            }
        }
    }

    if renames.is_empty() {
        return sql.to_string();
    }

    PLACEHOLDER
        .replace_all(sql, |caps: &Captures<'_>| match renames.get(&caps[0]) {
            Some(fresh) => fresh.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
