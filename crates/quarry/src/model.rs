use crate::Record;

use quarry_core::{
    stmt::{Condition, Query},
    Error, Result,
};

use indexmap::IndexMap;
use std::{fmt, sync::Arc};

type AfterFind = Arc<dyn Fn(&Record) + Send + Sync>;

/// Describes a model: the table it maps to, its primary key and its
/// relations.
///
/// Models are registered with [`crate::db::Builder::register`] and looked up
/// by name; relations reference their target model by that name.
#[derive(Clone)]
pub struct ModelDef {
    pub name: String,

    /// Table name, possibly a `{{%template}}`.
    pub table: String,

    /// Primary key columns. When empty the key is read from the table
    /// schema on demand.
    pub primary_key: Vec<String>,

    pub relations: IndexMap<String, RelationDef>,

    after_find: Option<AfterFind>,
}

/// A relation from one model to another.
#[derive(Debug, Clone)]
pub struct RelationDef {
    pub name: String,

    /// Name of the related model.
    pub target: String,

    /// Column of the related model to column of the declaring model.
    pub link: IndexMap<String, String>,

    /// `true` for has-many, `false` for has-one.
    pub multiple: bool,

    pub via: Option<Via>,

    /// Relation on the target model that points back to the declaring
    /// model. Populated from memory once this relation is loaded.
    pub inverse_of: Option<String>,

    /// Extra condition used in the `ON` clause of a join, and as a filter
    /// when the relation is loaded.
    pub on: Option<Condition>,

    /// Conditions, ordering and indexing applied to the related query.
    pub query: Query,
}

/// How a relation reaches its target through an intermediate step.
#[derive(Debug, Clone)]
pub enum Via {
    /// Another relation of the same model.
    Relation(String),

    /// A junction table. `link` maps junction columns to columns of the
    /// declaring model.
    Table {
        table: String,
        link: IndexMap<String, String>,
    },
}

impl ModelDef {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> ModelDef {
        ModelDef {
            name: name.into(),
            table: table.into(),
            primary_key: vec![],
            relations: IndexMap::new(),
            after_find: None,
        }
    }

    pub fn primary_key<C: Into<String>>(mut self, columns: impl IntoIterator<Item = C>) -> ModelDef {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_many<K, V>(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        link: impl IntoIterator<Item = (K, V)>,
    ) -> ModelDef
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.relation(RelationDef::has_many(name, target, link))
    }

    pub fn has_one<K, V>(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        link: impl IntoIterator<Item = (K, V)>,
    ) -> ModelDef
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.relation(RelationDef::has_one(name, target, link))
    }

    pub fn relation(mut self, relation: RelationDef) -> ModelDef {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    /// Hook run on every record hydrated for this model.
    pub fn after_find(mut self, f: impl Fn(&Record) + Send + Sync + 'static) -> ModelDef {
        self.after_find = Some(Arc::new(f));
        self
    }

    pub fn get_relation(&self, name: &str) -> Result<&RelationDef> {
        self.relations.get(name).ok_or_else(|| {
            Error::invalid_configuration(format!(
                "model `{}` has no relation named `{name}`",
                self.name
            ))
        })
    }

    pub(crate) fn run_after_find(&self, record: &Record) {
        if let Some(after_find) = &self.after_find {
            after_find(record);
        }
    }
}

impl fmt::Debug for ModelDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDef")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("relations", &self.relations)
            .finish_non_exhaustive()
    }
}

impl RelationDef {
    pub fn has_many<K, V>(
        name: impl Into<String>,
        target: impl Into<String>,
        link: impl IntoIterator<Item = (K, V)>,
    ) -> RelationDef
    where
        K: Into<String>,
        V: Into<String>,
    {
        RelationDef::new(name.into(), target.into(), collect_link(link), true)
    }

    pub fn has_one<K, V>(
        name: impl Into<String>,
        target: impl Into<String>,
        link: impl IntoIterator<Item = (K, V)>,
    ) -> RelationDef
    where
        K: Into<String>,
        V: Into<String>,
    {
        RelationDef::new(name.into(), target.into(), collect_link(link), false)
    }

    fn new(name: String, target: String, link: IndexMap<String, String>, multiple: bool) -> RelationDef {
        RelationDef {
            name,
            target,
            link,
            multiple,
            via: None,
            inverse_of: None,
            on: None,
            query: Query::new(),
        }
    }

    /// Reach the target through another relation of the declaring model.
    /// `link` then maps target columns to columns of that relation's model.
    pub fn via(mut self, relation: impl Into<String>) -> RelationDef {
        self.via = Some(Via::Relation(relation.into()));
        self
    }

    /// Reach the target through a junction table. `link` maps junction
    /// columns to columns of the declaring model; the relation's own link
    /// maps target columns to junction columns.
    pub fn via_table<K, V>(
        mut self,
        table: impl Into<String>,
        link: impl IntoIterator<Item = (K, V)>,
    ) -> RelationDef
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.via = Some(Via::Table {
            table: table.into(),
            link: collect_link(link),
        });
        self
    }

    pub fn inverse_of(mut self, relation: impl Into<String>) -> RelationDef {
        self.inverse_of = Some(relation.into());
        self
    }

    pub fn on_condition(mut self, condition: impl Into<Condition>) -> RelationDef {
        self.on = Some(condition.into());
        self
    }

    pub fn where_(mut self, condition: impl Into<Condition>) -> RelationDef {
        self.query = self.query.and_where(condition);
        self
    }

    pub fn order_by_str(mut self, columns: &str) -> RelationDef {
        self.query = self.query.order_by_str(columns);
        self
    }

    /// Key the related records of a has-many relation by `column`.
    pub fn index_by(mut self, column: impl Into<String>) -> RelationDef {
        self.query = self.query.index_by(column);
        self
    }
}

fn collect_link<K, V>(link: impl IntoIterator<Item = (K, V)>) -> IndexMap<String, String>
where
    K: Into<String>,
    V: Into<String>,
{
    link.into_iter()
        .map(|(child, parent)| (child.into(), parent.into()))
        .collect()
}
