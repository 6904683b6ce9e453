use super::ColumnSchema;
use crate::{Error, Result};

use indexmap::IndexMap;

/// Metadata of a database table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Schema (database) the table lives in, when not the default one.
    pub schema_name: Option<String>,

    /// Unqualified table name.
    pub name: String,

    /// `schema.name`, or just `name` for the default schema.
    pub full_name: String,

    /// Columns in table order.
    pub columns: IndexMap<String, ColumnSchema>,

    /// Primary key column names. Every name is a key of `columns`.
    pub primary_key: Vec<String>,

    /// Sequence backing the auto-increment primary key, if any.
    pub sequence_name: Option<String>,

    pub foreign_keys: Vec<ForeignKey>,
}

/// A foreign key constraint, as introspected.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    /// Constraint name, when known.
    pub name: Option<String>,

    /// Referenced table.
    pub table: String,

    /// Local column to referenced column.
    pub columns: IndexMap<String, String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> TableSchema {
        let name = name.into();
        TableSchema {
            schema_name: None,
            full_name: name.clone(),
            name,
            columns: IndexMap::new(),
            primary_key: vec![],
            sequence_name: None,
            foreign_keys: vec![],
        }
    }

    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> TableSchema {
        let schema_name = schema_name.into();
        self.full_name = format!("{schema_name}.{}", self.name);
        self.schema_name = Some(schema_name);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Add a column, registering it as part of the primary key when flagged.
    pub fn push_column(&mut self, column: ColumnSchema) {
        if column.is_primary_key && !self.primary_key.contains(&column.name) {
            self.primary_key.push(column.name.clone());
        }
        self.columns.insert(column.name.clone(), column);
    }

    /// Replace the primary key, updating the column flags to match.
    pub fn set_primary_key<K: Into<String>>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<()> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();

        if let Some(missing) = keys.iter().find(|key| !self.columns.contains_key(*key)) {
            return Err(Error::invalid_configuration(format!(
                "primary key column `{missing}` does not exist in table `{}`",
                self.full_name
            )));
        }

        for column in self.columns.values_mut() {
            column.is_primary_key = keys.contains(&column.name);
        }
        self.primary_key = keys;
        Ok(())
    }
}
