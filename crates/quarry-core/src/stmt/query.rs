use super::{normalize_param_name, Condition, Expression, Params, Row, Value};

use std::{fmt, sync::Arc};

/// An unexecuted `SELECT` statement.
///
/// Built with a fluent chain of by-value methods. Compiling a query never
/// mutates it, so the same query can be built any number of times.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Selected columns. Empty means `SELECT *`.
    pub select: Vec<SelectItem>,

    /// Extra text placed between `SELECT` and the column list, e.g.
    /// `SQL_CALC_FOUND_ROWS`.
    pub select_option: Option<String>,

    pub distinct: bool,

    /// Tables or derived tables in the `FROM` clause. Empty means the
    /// caller (e.g. an active query) supplies it.
    pub from: Vec<TableRef>,

    pub joins: Vec<Join>,

    pub where_: Option<Condition>,

    pub group_by: Vec<Column>,

    pub having: Option<Condition>,

    pub unions: Vec<Union>,

    pub order_by: Vec<OrderBy>,

    pub limit: Option<u64>,

    pub offset: Option<u64>,

    /// User-supplied named parameters, keyed with their leading `:`.
    pub params: Params,

    /// How rows are keyed when results are indexed.
    pub index_by: Option<IndexBy>,
}

/// A column, expression or scalar sub-query.
#[derive(Debug, Clone)]
pub enum Column {
    Name(String),
    Expression(Expression),
    Query(Box<Query>),
}

#[derive(Debug, Clone)]
pub struct SelectItem {
    pub column: Column,
    pub alias: Option<String>,
}

/// A table, or a derived table, referenced by `FROM` or `JOIN`.
#[derive(Debug, Clone)]
pub struct TableRef {
    pub source: TableSource,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub enum TableSource {
    Table(String),
    Query(Box<Query>),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct Join {
    /// Join keyword, e.g. `INNER JOIN` or `LEFT JOIN`.
    pub kind: String,
    pub table: TableRef,
    pub on: Option<Condition>,
}

#[derive(Debug, Clone)]
pub struct Union {
    pub query: Box<Query>,
    pub all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: Column,
    pub direction: Direction,
}

/// Keys rows of a result set.
#[derive(Clone)]
pub enum IndexBy {
    Column(String),
    Func(Arc<dyn Fn(&Row) -> String + Send + Sync>),
}

impl IndexBy {
    pub fn key(&self, row: &Row) -> String {
        match self {
            IndexBy::Column(column) => row.get(column).map(Value::to_key).unwrap_or_default(),
            IndexBy::Func(f) => f(row),
        }
    }
}

impl fmt::Debug for IndexBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexBy::Column(column) => f.debug_tuple("Column").field(column).finish(),
            IndexBy::Func(_) => f.debug_tuple("Func").finish(),
        }
    }
}

impl Query {
    pub fn new() -> Query {
        Query::default()
    }

    /// Replace the select list. Plain strings may carry an alias
    /// (`"name AS n"`); the builder splits it when compiling.
    pub fn select<C: Into<Column>>(mut self, columns: impl IntoIterator<Item = C>) -> Query {
        self.select = columns.into_iter().map(SelectItem::from).collect();
        self
    }

    pub fn add_select<C: Into<Column>>(mut self, columns: impl IntoIterator<Item = C>) -> Query {
        self.select
            .extend(columns.into_iter().map(SelectItem::from));
        self
    }

    pub fn select_as(mut self, column: impl Into<Column>, alias: impl Into<String>) -> Query {
        self.select.push(SelectItem {
            column: column.into(),
            alias: Some(alias.into()),
        });
        self
    }

    pub fn select_option(mut self, option: impl Into<String>) -> Query {
        self.select_option = Some(option.into());
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Query {
        self.distinct = distinct;
        self
    }

    /// Replace the `FROM` clause with the given tables. A table string may
    /// carry an alias (`"customer c"`).
    pub fn from<T: Into<String>>(mut self, tables: impl IntoIterator<Item = T>) -> Query {
        self.from = tables
            .into_iter()
            .map(|table| TableRef::table(table.into()))
            .collect();
        self
    }

    pub fn from_alias(mut self, table: impl Into<String>, alias: impl Into<String>) -> Query {
        self.from.push(TableRef {
            source: TableSource::Table(table.into()),
            alias: Some(alias.into()),
        });
        self
    }

    pub fn from_query(mut self, query: Query, alias: impl Into<String>) -> Query {
        self.from.push(TableRef {
            source: TableSource::Query(Box::new(query)),
            alias: Some(alias.into()),
        });
        self
    }

    pub fn join(
        mut self,
        kind: impl Into<String>,
        table: impl Into<TableRef>,
        on: Option<Condition>,
    ) -> Query {
        self.joins.push(Join {
            kind: kind.into(),
            table: table.into(),
            on,
        });
        self
    }

    pub fn inner_join(self, table: impl Into<TableRef>, on: impl Into<Condition>) -> Query {
        self.join("INNER JOIN", table, Some(on.into()))
    }

    pub fn left_join(self, table: impl Into<TableRef>, on: impl Into<Condition>) -> Query {
        self.join("LEFT JOIN", table, Some(on.into()))
    }

    pub fn right_join(self, table: impl Into<TableRef>, on: impl Into<Condition>) -> Query {
        self.join("RIGHT JOIN", table, Some(on.into()))
    }

    pub fn where_(mut self, condition: impl Into<Condition>) -> Query {
        self.where_ = Some(condition.into());
        self
    }

    pub fn and_where(mut self, condition: impl Into<Condition>) -> Query {
        self.where_ = Some(Condition::combine("and", self.where_.take(), condition.into()));
        self
    }

    pub fn or_where(mut self, condition: impl Into<Condition>) -> Query {
        self.where_ = Some(Condition::combine("or", self.where_.take(), condition.into()));
        self
    }

    /// Like [`Query::where_`], but operands with empty values are dropped
    /// first. If nothing is left the `WHERE` clause is untouched.
    pub fn filter_where(mut self, condition: Condition) -> Query {
        if let Some(condition) = condition.filter_empty() {
            self.where_ = Some(condition);
        }
        self
    }

    pub fn and_filter_where(self, condition: Condition) -> Query {
        match condition.filter_empty() {
            Some(condition) => self.and_where(condition),
            None => self,
        }
    }

    pub fn or_filter_where(self, condition: Condition) -> Query {
        match condition.filter_empty() {
            Some(condition) => self.or_where(condition),
            None => self,
        }
    }

    pub fn group_by<C: Into<Column>>(mut self, columns: impl IntoIterator<Item = C>) -> Query {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_group_by<C: Into<Column>>(mut self, columns: impl IntoIterator<Item = C>) -> Query {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn having(mut self, condition: impl Into<Condition>) -> Query {
        self.having = Some(condition.into());
        self
    }

    pub fn and_having(mut self, condition: impl Into<Condition>) -> Query {
        self.having = Some(Condition::combine("and", self.having.take(), condition.into()));
        self
    }

    pub fn or_having(mut self, condition: impl Into<Condition>) -> Query {
        self.having = Some(Condition::combine("or", self.having.take(), condition.into()));
        self
    }

    pub fn union(mut self, query: Query) -> Query {
        self.unions.push(Union {
            query: Box::new(query),
            all: false,
        });
        self
    }

    pub fn union_all(mut self, query: Query) -> Query {
        self.unions.push(Union {
            query: Box::new(query),
            all: true,
        });
        self
    }

    pub fn order_by<C: Into<Column>>(
        mut self,
        columns: impl IntoIterator<Item = (C, Direction)>,
    ) -> Query {
        self.order_by.clear();
        self.add_order_by(columns)
    }

    pub fn add_order_by<C: Into<Column>>(
        mut self,
        columns: impl IntoIterator<Item = (C, Direction)>,
    ) -> Query {
        for (column, direction) in columns {
            let column = column.into();
            // A repeated column replaces the earlier direction in place
            if let Column::Name(name) = &column {
                if let Some(existing) = self
                    .order_by
                    .iter_mut()
                    .find(|o| matches!(&o.column, Column::Name(n) if n == name))
                {
                    existing.direction = direction;
                    continue;
                }
            }
            self.order_by.push(OrderBy { column, direction });
        }
        self
    }

    /// Order by a SQL-ish list such as `"created_at DESC, id"`.
    pub fn order_by_str(self, columns: &str) -> Query {
        let parsed: Vec<(Column, Direction)> = columns
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut words = part.rsplitn(2, char::is_whitespace);
                let last = words.next().unwrap_or_default();
                let rest = words.next().map(str::trim);
                match (rest, last.to_ascii_uppercase().as_str()) {
                    (Some(rest), "DESC") => (Column::from(rest), Direction::Desc),
                    (Some(rest), "ASC") => (Column::from(rest), Direction::Asc),
                    _ => (Column::from(part), Direction::Asc),
                }
            })
            .collect();
        self.order_by(parsed)
    }

    pub fn limit(mut self, limit: u64) -> Query {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Query {
        self.offset = Some(offset);
        self
    }

    /// Remove both `LIMIT` and `OFFSET`.
    pub fn unbounded(mut self) -> Query {
        self.limit = None;
        self.offset = None;
        self
    }

    /// Replace the user-supplied parameters.
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Query
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.params.clear();
        self.add_params(params)
    }

    pub fn add_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Query
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (k, v) in params {
            self.params.insert(normalize_param_name(k.into()), v.into());
        }
        self
    }

    pub fn index_by(mut self, column: impl Into<String>) -> Query {
        self.index_by = Some(IndexBy::Column(column.into()));
        self
    }

    pub fn index_by_fn(mut self, f: impl Fn(&Row) -> String + Send + Sync + 'static) -> Query {
        self.index_by = Some(IndexBy::Func(Arc::new(f)));
        self
    }

    /// Key rows by `index_by`. Without it rows are keyed by position.
    pub fn index_rows(&self, rows: Vec<Row>) -> indexmap::IndexMap<String, Row> {
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| match &self.index_by {
                Some(index_by) => (index_by.key(&row), row),
                None => (i.to_string(), row),
            })
            .collect()
    }
}

impl TableRef {
    pub fn table(name: impl Into<String>) -> TableRef {
        TableRef {
            source: TableSource::Table(name.into()),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> TableRef {
        TableRef {
            source: TableSource::Table(name.into()),
            alias: Some(alias.into()),
        }
    }

    pub fn table_name(&self) -> Option<&str> {
        match &self.source {
            TableSource::Table(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for TableRef {
    fn from(value: &str) -> Self {
        TableRef::table(value)
    }
}

impl From<String> for TableRef {
    fn from(value: String) -> Self {
        TableRef::table(value)
    }
}

impl From<&str> for Column {
    fn from(value: &str) -> Self {
        Column::Name(value.to_string())
    }
}

impl From<String> for Column {
    fn from(value: String) -> Self {
        Column::Name(value)
    }
}

impl From<&String> for Column {
    fn from(value: &String) -> Self {
        Column::Name(value.clone())
    }
}

impl From<Expression> for Column {
    fn from(value: Expression) -> Self {
        Column::Expression(value)
    }
}

impl From<Query> for Column {
    fn from(value: Query) -> Self {
        Column::Query(Box::new(value))
    }
}

impl<C: Into<Column>> From<C> for SelectItem {
    fn from(value: C) -> Self {
        SelectItem {
            column: value.into(),
            alias: None,
        }
    }
}
