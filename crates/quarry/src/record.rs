use crate::ModelDef;

use quarry_core::stmt::{Row, Value};

use indexmap::IndexMap;
use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, Weak},
};

/// A hydrated model instance.
///
/// Records are shared handles: cloning a `Record` yields another handle to
/// the same instance, and [`Record::same`] compares identity. Relations
/// populated from the inverse side hold weak references so a parent and its
/// children never keep each other alive.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

struct RecordInner {
    model: Arc<ModelDef>,
    attributes: RwLock<Row>,
    old_attributes: RwLock<Option<Row>>,
    related: RwLock<IndexMap<String, Slot>>,
}

enum Slot {
    Loaded(Related),
    InverseOne(Weak<RecordInner>),
    InverseMany(Vec<Weak<RecordInner>>),
}

/// The value of a populated relation.
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<Record>),
    Many(Vec<Record>),

    /// A has-many relation keyed by its `index_by` column.
    Indexed(IndexMap<String, Record>),
}

impl Record {
    /// A new record that has not been loaded from the database.
    pub fn new(model: Arc<ModelDef>, attributes: Row) -> Record {
        Record::build(model, attributes, None)
    }

    pub(crate) fn loaded(model: Arc<ModelDef>, attributes: Row) -> Record {
        let old = attributes.clone();
        Record::build(model, attributes, Some(old))
    }

    fn build(model: Arc<ModelDef>, attributes: Row, old: Option<Row>) -> Record {
        Record {
            inner: Arc::new(RecordInner {
                model,
                attributes: RwLock::new(attributes),
                old_attributes: RwLock::new(old),
                related: RwLock::default(),
            }),
        }
    }

    pub fn model(&self) -> &ModelDef {
        &self.inner.model
    }

    pub(crate) fn model_arc(&self) -> Arc<ModelDef> {
        self.inner.model.clone()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.read_attributes(|attributes| attributes.get(name).cloned())
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn attributes(&self) -> Row {
        self.read_attributes(Row::clone)
    }

    /// Attribute values as loaded from the database. `None` for records
    /// that were never loaded.
    pub fn old_attributes(&self) -> Option<Row> {
        self.inner
            .old_attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_new_record(&self) -> bool {
        self.old_attributes().is_none()
    }

    /// The primary key value: a scalar for single-column keys, a record of
    /// `column => value` for composite keys.
    pub fn primary_key_value(&self) -> Value {
        let primary_key = &self.inner.model.primary_key;
        self.read_attributes(|attributes| match primary_key.as_slice() {
            [column] => attributes.get(column).cloned().unwrap_or(Value::Null),
            columns => Value::Record(
                columns
                    .iter()
                    .map(|column| {
                        let value = attributes.get(column).cloned().unwrap_or(Value::Null);
                        (column.clone(), value)
                    })
                    .collect(),
            ),
        })
    }

    /// The populated value of relation `name`, if any. Inverse references
    /// whose targets were dropped count as not populated.
    pub fn related(&self, name: &str) -> Option<Related> {
        let related = self
            .inner
            .related
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        match related.get(name)? {
            Slot::Loaded(related) => Some(related.clone()),
            Slot::InverseOne(weak) => Some(Related::One(Some(upgrade(weak)?))),
            Slot::InverseMany(weak) => Some(Related::Many(
                weak.iter().map(upgrade).collect::<Option<_>>()?,
            )),
        }
    }

    pub fn related_one(&self, name: &str) -> Option<Record> {
        match self.related(name)? {
            Related::One(record) => record,
            related => related.into_vec().into_iter().next(),
        }
    }

    /// Records of relation `name`; empty when the relation is not populated.
    pub fn related_many(&self, name: &str) -> Vec<Record> {
        self.related(name).map(Related::into_vec).unwrap_or_default()
    }

    pub fn is_relation_populated(&self, name: &str) -> bool {
        self.related(name).is_some()
    }

    pub fn populate_relation(&self, name: impl Into<String>, related: Related) {
        self.set_slot(name.into(), Slot::Loaded(related));
    }

    pub(crate) fn populate_inverse_one(&self, name: &str, record: &Record) {
        self.set_slot(name.to_string(), Slot::InverseOne(Arc::downgrade(&record.inner)));
    }

    pub(crate) fn populate_inverse_many(&self, name: &str, records: &[Record]) {
        let weak = records
            .iter()
            .map(|record| Arc::downgrade(&record.inner))
            .collect();
        self.set_slot(name.to_string(), Slot::InverseMany(weak));
    }

    /// `true` when both handles point to the same instance.
    pub fn same(a: &Record, b: &Record) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Attributes plus every loaded relation, nested as values. Inverse
    /// references are left out.
    pub fn to_row(&self) -> Row {
        let mut row = self.attributes();
        let related = self
            .inner
            .related
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        for (name, slot) in related.iter() {
            if let Slot::Loaded(related) = slot {
                row.insert(name.clone(), related.to_value());
            }
        }
        row
    }

    /// Canonical key of the values in `columns`.
    pub(crate) fn key(&self, columns: &[&str]) -> String {
        self.read_attributes(|attributes| row_key(attributes, columns))
    }

    fn read_attributes<R>(&self, f: impl FnOnce(&Row) -> R) -> R {
        f(&self
            .inner
            .attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner))
    }

    fn set_slot(&self, name: String, slot: Slot) {
        self.inner
            .related
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, slot);
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.inner.model.name)
            .field("attributes", &self.attributes())
            .finish()
    }
}

impl Related {
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Related::One(record) => record.into_iter().collect(),
            Related::Many(records) => records,
            Related::Indexed(records) => records.into_values().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Related::One(record) => record.is_some() as usize,
            Related::Many(records) => records.len(),
            Related::Indexed(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_value(&self) -> Value {
        match self {
            Related::One(None) => Value::Null,
            Related::One(Some(record)) => Value::Record(record.to_row()),
            Related::Many(records) => Value::List(
                records
                    .iter()
                    .map(|record| Value::Record(record.to_row()))
                    .collect(),
            ),
            Related::Indexed(records) => Value::Record(
                records
                    .iter()
                    .map(|(key, record)| (key.clone(), Value::Record(record.to_row())))
                    .collect(),
            ),
        }
    }
}

fn upgrade(weak: &Weak<RecordInner>) -> Option<Record> {
    weak.upgrade().map(|inner| Record { inner })
}

/// Canonical key of the values in `columns`: the scalar key for one column,
/// the tuple key for several.
pub(crate) fn row_key(row: &Row, columns: &[&str]) -> String {
    match columns {
        [column] => row.get(*column).map(Value::to_key).unwrap_or_default(),
        columns => Value::List(
            columns
                .iter()
                .map(|column| row.get(*column).cloned().unwrap_or(Value::Null))
                .collect(),
        )
        .to_key(),
    }
}
