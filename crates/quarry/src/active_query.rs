//! Queries that hydrate [`Record`]s and their relations.
//!
//! An [`ActiveQuery`] is either a primary query, started with
//! [`Db::find`], or a relation query derived from a [`RelationDef`]. A
//! relation query bound to one owning record loads that record's relation
//! on demand; an unbound one loads the relation for a whole batch of
//! records with a single statement (see [`ActiveQuery::with`]).
//!
//! Preparing a query never mutates it: `join_with` expansion and relation
//! filters are applied to a derived [`Query`], so the same `ActiveQuery`
//! can be built or executed any number of times.

mod join_with;
mod populate;

use crate::{model::Via, query_ext::QueryExt, Db, ModelDef, Record, Related};

use quarry_core::{
    stmt::{Column, Condition, Direction, Params, Query, Row, TableRef, Value},
    Error, Result,
};

use async_recursion::async_recursion;
use indexmap::IndexMap;
use regex::Regex;
use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, LazyLock},
};

/// `table alias` in a `FROM` entry.
static TABLE_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s+(\{\{\w+\}\}|\w+)$").unwrap());

type Customize = Arc<dyn Fn(ActiveQuery) -> ActiveQuery + Send + Sync>;

#[derive(Clone)]
pub struct ActiveQuery {
    db: Db,
    model: Arc<ModelDef>,
    query: Query,
    with: Vec<EagerLoad>,
    join_with: Vec<JoinWith>,
    relation: Option<Box<RelationState>>,

    /// Skip `after_find` hooks. Inherited by eagerly loaded relations.
    as_array: bool,
}

/// A relation path to load eagerly, e.g. `orders.items`.
#[derive(Clone)]
struct EagerLoad {
    path: String,
    customize: Option<Customize>,
}

#[derive(Clone)]
struct JoinWith {
    relations: Vec<EagerLoad>,
    eager_loading: bool,
    join_type: String,
}

#[derive(Clone)]
struct RelationState {
    link: IndexMap<String, String>,
    multiple: bool,
    via: Option<ViaQuery>,
    inverse_of: Option<String>,
    on: Option<Condition>,

    /// Owning record of a lazily loaded relation.
    primary: Option<Record>,
}

#[derive(Clone)]
enum ViaQuery {
    /// Relation name and its query.
    Relation(String, Box<ActiveQuery>),

    /// Query over the junction table; its link points at the owning model.
    Table(Box<ActiveQuery>),
}

impl ActiveQuery {
    pub(crate) fn new(db: Db, model: Arc<ModelDef>) -> ActiveQuery {
        ActiveQuery {
            db,
            model,
            query: Query::new(),
            with: vec![],
            join_with: vec![],
            relation: None,
            as_array: false,
        }
    }

    /// The query for relation `name` declared by `owner`.
    pub(crate) fn for_relation(db: &Db, owner: &ModelDef, name: &str) -> Result<ActiveQuery> {
        let def = owner.get_relation(name)?;

        if def.link.is_empty() {
            return Err(Error::invalid_configuration(format!(
                "relation `{}.{name}` has an empty link",
                owner.name
            )));
        }

        let via = match &def.via {
            None => None,
            Some(Via::Relation(via)) => Some(ViaQuery::Relation(
                via.clone(),
                Box::new(ActiveQuery::for_relation(db, owner, via)?),
            )),
            Some(Via::Table { table, link }) => {
                let junction = Arc::new(ModelDef::new(table.clone(), table.clone()));
                let mut junction = ActiveQuery::new(db.clone(), junction);
                junction.as_array = true;
                junction.relation = Some(Box::new(RelationState {
                    link: link.clone(),
                    multiple: true,
                    via: None,
                    inverse_of: None,
                    on: None,
                    primary: None,
                }));
                Some(ViaQuery::Table(Box::new(junction)))
            }
        };

        let mut query = ActiveQuery::new(db.clone(), db.model(&def.target)?);
        query.query = def.query.clone();
        query.relation = Some(Box::new(RelationState {
            link: def.link.clone(),
            multiple: def.multiple,
            via,
            inverse_of: def.inverse_of.clone(),
            on: def.on.clone(),
            primary: None,
        }));
        Ok(query)
    }

    /// Bind a relation query to the record that owns the relation.
    pub(crate) fn with_primary(mut self, record: Record) -> ActiveQuery {
        if let Some(relation) = &mut self.relation {
            relation.primary = Some(record);
        }
        self
    }

    pub fn model(&self) -> &ModelDef {
        &self.model
    }

    /// The query as configured, before `join_with` expansion.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Apply arbitrary [`Query`] methods.
    pub fn map_query(mut self, f: impl FnOnce(Query) -> Query) -> ActiveQuery {
        self.query = f(self.query);
        self
    }

    pub fn select<C: Into<Column>>(self, columns: impl IntoIterator<Item = C>) -> ActiveQuery {
        self.map_query(|query| query.select(columns))
    }

    pub fn add_select<C: Into<Column>>(self, columns: impl IntoIterator<Item = C>) -> ActiveQuery {
        self.map_query(|query| query.add_select(columns))
    }

    pub fn distinct(self, distinct: bool) -> ActiveQuery {
        self.map_query(|query| query.distinct(distinct))
    }

    /// Alias the model's table, e.g. `c` for `customer c`.
    pub fn alias(mut self, alias: impl Into<String>) -> ActiveQuery {
        let alias = alias.into();
        match self.query.from.first_mut() {
            Some(table) => table.alias = Some(alias),
            None => self.query.from = vec![TableRef::aliased(self.model.table.clone(), alias)],
        }
        self
    }

    pub fn join(
        self,
        kind: impl Into<String>,
        table: impl Into<TableRef>,
        on: Option<Condition>,
    ) -> ActiveQuery {
        self.map_query(|query| query.join(kind, table, on))
    }

    pub fn inner_join(self, table: impl Into<TableRef>, on: impl Into<Condition>) -> ActiveQuery {
        self.map_query(|query| query.inner_join(table, on))
    }

    pub fn left_join(self, table: impl Into<TableRef>, on: impl Into<Condition>) -> ActiveQuery {
        self.map_query(|query| query.left_join(table, on))
    }

    pub fn where_(self, condition: impl Into<Condition>) -> ActiveQuery {
        self.map_query(|query| query.where_(condition))
    }

    pub fn and_where(self, condition: impl Into<Condition>) -> ActiveQuery {
        self.map_query(|query| query.and_where(condition))
    }

    pub fn or_where(self, condition: impl Into<Condition>) -> ActiveQuery {
        self.map_query(|query| query.or_where(condition))
    }

    pub fn filter_where(self, condition: Condition) -> ActiveQuery {
        self.map_query(|query| query.filter_where(condition))
    }

    pub fn and_filter_where(self, condition: Condition) -> ActiveQuery {
        self.map_query(|query| query.and_filter_where(condition))
    }

    pub fn group_by<C: Into<Column>>(self, columns: impl IntoIterator<Item = C>) -> ActiveQuery {
        self.map_query(|query| query.group_by(columns))
    }

    pub fn having(self, condition: impl Into<Condition>) -> ActiveQuery {
        self.map_query(|query| query.having(condition))
    }

    pub fn order_by<C: Into<Column>>(
        self,
        columns: impl IntoIterator<Item = (C, Direction)>,
    ) -> ActiveQuery {
        self.map_query(|query| query.order_by(columns))
    }

    pub fn order_by_str(self, columns: &str) -> ActiveQuery {
        self.map_query(|query| query.order_by_str(columns))
    }

    pub fn limit(self, limit: u64) -> ActiveQuery {
        self.map_query(|query| query.limit(limit))
    }

    pub fn offset(self, offset: u64) -> ActiveQuery {
        self.map_query(|query| query.offset(offset))
    }

    pub fn params<K, V>(self, params: impl IntoIterator<Item = (K, V)>) -> ActiveQuery
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.map_query(|query| query.add_params(params))
    }

    pub fn index_by(self, column: impl Into<String>) -> ActiveQuery {
        self.map_query(|query| query.index_by(column))
    }

    /// Eagerly load relations. Dotted paths such as `orders.items` load
    /// nested relations.
    pub fn with<S: Into<String>>(mut self, relations: impl IntoIterator<Item = S>) -> ActiveQuery {
        self.with.extend(relations.into_iter().map(|path| EagerLoad {
            path: path.into(),
            customize: None,
        }));
        self
    }

    /// Eagerly load `relation`, customising its query with `f`.
    pub fn with_fn(
        mut self,
        relation: impl Into<String>,
        f: impl Fn(ActiveQuery) -> ActiveQuery + Send + Sync + 'static,
    ) -> ActiveQuery {
        self.with.push(EagerLoad {
            path: relation.into(),
            customize: Some(Arc::new(f)),
        });
        self
    }

    /// `LEFT JOIN` the tables of `relations` and load them eagerly.
    pub fn join_with<S: Into<String>>(self, relations: impl IntoIterator<Item = S>) -> ActiveQuery {
        self.join_with_options(relations, true, "LEFT JOIN")
    }

    /// `INNER JOIN` the tables of `relations` and load them eagerly.
    pub fn inner_join_with<S: Into<String>>(
        self,
        relations: impl IntoIterator<Item = S>,
    ) -> ActiveQuery {
        self.join_with_options(relations, true, "INNER JOIN")
    }

    pub fn join_with_options<S: Into<String>>(
        mut self,
        relations: impl IntoIterator<Item = S>,
        eager_loading: bool,
        join_type: &str,
    ) -> ActiveQuery {
        self.join_with.push(JoinWith {
            relations: relations
                .into_iter()
                .map(|path| EagerLoad {
                    path: path.into(),
                    customize: None,
                })
                .collect(),
            eager_loading,
            join_type: join_type.to_string(),
        });
        self
    }

    /// `LEFT JOIN` `relation`, customising the joined query with `f`.
    pub fn join_with_fn(
        mut self,
        relation: impl Into<String>,
        f: impl Fn(ActiveQuery) -> ActiveQuery + Send + Sync + 'static,
    ) -> ActiveQuery {
        self.join_with.push(JoinWith {
            relations: vec![EagerLoad {
                path: relation.into(),
                customize: Some(Arc::new(f)),
            }],
            eager_loading: true,
            join_type: "LEFT JOIN".to_string(),
        });
        self
    }

    /// Compile to SQL and bindings, with templates expanded.
    pub async fn build(&self) -> Result<(String, Params)> {
        let query = self.prepare().await?;
        let command = self.db.query_command(&query)?;
        Ok((command.sql().to_string(), command.params().clone()))
    }

    pub async fn all(&self) -> Result<Vec<Record>> {
        let query = self.prepare().await?;
        let rows = self.db.query_command(&query)?.query_all().await?;
        self.populate(&query, rows).await
    }

    /// Records keyed by the query's `index_by`, or by primary key.
    pub async fn all_indexed(&self) -> Result<IndexMap<String, Record>> {
        let records = self.all().await?;
        let index_by = self.query.index_by.clone();

        Ok(records
            .into_iter()
            .map(|record| {
                let key = match &index_by {
                    Some(index_by) => index_by.key(&record.attributes()),
                    None => record.primary_key_value().to_key(),
                };
                (key, record)
            })
            .collect())
    }

    pub async fn one(&self) -> Result<Option<Record>> {
        let query = self.prepare().await?;
        let Some(row) = self.db.query_command(&query)?.query_one().await? else {
            return Ok(None);
        };
        Ok(self.populate(&query, vec![row]).await?.into_iter().next())
    }

    /// Rows with loaded relations embedded as values. No `after_find`
    /// hooks run.
    pub async fn all_rows(&self) -> Result<Vec<Row>> {
        let records = self.as_array().all().await?;
        Ok(records.iter().map(Record::to_row).collect())
    }

    pub async fn one_row(&self) -> Result<Option<Row>> {
        let record = self.as_array().one().await?;
        Ok(record.as_ref().map(Record::to_row))
    }

    pub async fn count(&self) -> Result<i64> {
        self.prepare().await?.count(&self.db, "*").await
    }

    pub async fn exists(&self) -> Result<bool> {
        self.prepare().await?.exists(&self.db).await
    }

    /// Load the relation this query represents for its owning record.
    pub(crate) async fn find_for(&self) -> Result<Related> {
        if !self.relation_state()?.multiple {
            return Ok(Related::One(self.one().await?));
        }

        let records = self.all().await?;
        Ok(match &self.query.index_by {
            Some(index_by) => Related::Indexed(
                records
                    .into_iter()
                    .map(|record| (index_by.key(&record.attributes()), record))
                    .collect(),
            ),
            None => Related::Many(records),
        })
    }

    fn as_array(&self) -> ActiveQuery {
        let mut query = self.clone();
        query.as_array = true;
        query
    }

    /// The query to execute: `join_with` expanded, `FROM` defaulted to the
    /// model's table and, for a bound relation query, filtered to the
    /// owning record.
    #[async_recursion]
    pub(crate) async fn prepare(&self) -> Result<Query> {
        let mut query = self.query.clone();

        if !self.join_with.is_empty() {
            query = self.build_join_with(query)?;
        }

        if query.from.is_empty() {
            query.from = vec![TableRef::table(self.model.table.clone())];
        }

        if query.select.is_empty() && !query.joins.is_empty() {
            let (_, alias) = self.table_name_and_alias();
            query.select = vec![format!("{alias}.*").into()];
        }

        let Some(relation) = &self.relation else {
            return Ok(query);
        };

        if let Some(primary) = &relation.primary {
            let filter = match &relation.via {
                Some(ViaQuery::Table(junction)) => {
                    let rows = junction
                        .find_junction_rows(&[primary.attributes()])
                        .await?;
                    self.link_condition(&relation.link, &rows)
                }
                Some(ViaQuery::Relation(name, via)) => {
                    let via = via.as_ref().clone().with_primary(primary.clone());
                    let related = via.find_for().await?;
                    primary.populate_relation(name.clone(), related.clone());
                    let rows = related
                        .into_vec()
                        .iter()
                        .map(Record::attributes)
                        .collect::<Vec<_>>();
                    self.link_condition(&relation.link, &rows)
                }
                None => self.link_condition(&relation.link, &[primary.attributes()]),
            };
            query = query.and_where(filter);
        }

        if let Some(on) = &relation.on {
            query = query.and_where(on.clone());
        }

        Ok(query)
    }

    /// `link keys IN (values of link values in rows)`. Columns are
    /// qualified with the table alias when the query joins other tables.
    fn link_condition(&self, link: &IndexMap<String, String>, rows: &[Row]) -> Condition {
        let qualify = !self.query.joins.is_empty() || !self.join_with.is_empty();
        let (_, alias) = self.table_name_and_alias();
        let columns = link
            .keys()
            .map(|column| match qualify && !column.contains('.') {
                true => format!("{alias}.{column}"),
                false => column.clone(),
            })
            .collect::<Vec<_>>();

        if let ([column], [source]) = (columns.as_slice(), link.values().collect::<Vec<_>>().as_slice()) {
            let mut seen = HashSet::new();
            let mut values = vec![];

            for row in rows {
                let value = row.get(*source).cloned().unwrap_or(Value::Null);
                // A list-valued attribute links to each of its members
                let members = match value {
                    Value::List(members) => members,
                    value => vec![value],
                };
                for member in members {
                    if seen.insert(member.to_key()) {
                        values.push(member);
                    }
                }
            }

            return Condition::in_list(column.clone(), Value::List(values));
        }

        let mut seen = HashSet::new();
        let tuples = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(link.values())
                    .map(|(column, source)| {
                        let value = row.get(source).cloned().unwrap_or(Value::Null);
                        (column.clone(), value)
                    })
                    .collect::<Row>()
            })
            .filter(|tuple| seen.insert(Value::Record(tuple.clone()).to_key()))
            .collect::<Vec<_>>();

        Condition::in_composite(columns, tuples)
    }

    /// Rows of a junction table linked to `primary`.
    async fn find_junction_rows(&self, primary: &[Row]) -> Result<Vec<Row>> {
        if primary.is_empty() {
            return Ok(vec![]);
        }

        let relation = self.relation_state()?;
        let query = self
            .prepare()
            .await?
            .and_where(self.link_condition(&relation.link, primary));
        self.db.query_command(&query)?.query_all().await
    }

    /// The table name and alias of the first `FROM` entry, or of the
    /// model's table.
    fn table_name_and_alias(&self) -> (String, String) {
        let table = match self.query.from.first() {
            Some(table) => match (&table.alias, table.table_name()) {
                (Some(alias), name) => {
                    return (name.unwrap_or_default().to_string(), alias.clone())
                }
                (None, Some(name)) => name.to_string(),
                (None, None) => self.model.table.clone(),
            },
            None => self.model.table.clone(),
        };

        match TABLE_ALIAS.captures(&table) {
            Some(caps) => (caps[1].to_string(), caps[2].to_string()),
            None => (table.clone(), table),
        }
    }

    fn relation_state(&self) -> Result<&RelationState> {
        self.relation.as_deref().ok_or_else(|| {
            Error::invalid_configuration(format!(
                "query for model `{}` is not a relation query",
                self.model.name
            ))
        })
    }
}

impl fmt::Debug for ActiveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveQuery")
            .field("model", &self.model.name)
            .field("query", &self.query)
            .field(
                "with",
                &self.with.iter().map(|w| &w.path).collect::<Vec<_>>(),
            )
            .field("join_with", &self.join_with.len())
            .field("as_array", &self.as_array)
            .finish()
    }
}
