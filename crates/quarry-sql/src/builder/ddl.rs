use super::QueryBuilder;
use crate::{ColumnSchemaBuilder, Flavor};

use quarry_core::{schema::TableSchema, Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// One column line of `SHOW CREATE TABLE` output: `` `name` definition, ``
static CREATE_TABLE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*`(.*?)`\s+(.*?),?$").unwrap());

/// A column type in DDL: an abstract type string such as `string(32) NOT
/// NULL`, or a [`ColumnSchemaBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Raw(String),
    Builder(ColumnSchemaBuilder),
}

/// One entry of a `CREATE TABLE` body.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDef {
    Column { name: String, ty: ColumnType },

    /// A table-level line, e.g. `PRIMARY KEY (a, b)`, emitted verbatim.
    Constraint(String),
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: impl Into<ColumnType>) -> ColumnDef {
        ColumnDef::Column {
            name: name.into(),
            ty: ty.into(),
        }
    }

    pub fn constraint(sql: impl Into<String>) -> ColumnDef {
        ColumnDef::Constraint(sql.into())
    }
}

impl From<&str> for ColumnType {
    fn from(value: &str) -> Self {
        ColumnType::Raw(value.to_string())
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        ColumnType::Raw(value)
    }
}

impl From<ColumnSchemaBuilder> for ColumnType {
    fn from(value: ColumnSchemaBuilder) -> Self {
        ColumnType::Builder(value)
    }
}

impl<T: Into<ColumnType>> From<(&str, T)> for ColumnDef {
    fn from((name, ty): (&str, T)) -> Self {
        ColumnDef::new(name, ty)
    }
}

impl QueryBuilder {
    /// Physical SQL for a column type.
    pub fn column_type(&self, ty: &ColumnType) -> String {
        match ty {
            ColumnType::Raw(ty) => self.dialect().column_type(ty),
            ColumnType::Builder(builder) => {
                self.dialect().column_type(&builder.to_abstract(self.dialect()))
            }
        }
    }

    pub fn create_table<C: Into<ColumnDef>>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = C>,
        options: Option<&str>,
    ) -> Result<String> {
        let lines = columns
            .into_iter()
            .map(|column| match column.into() {
                ColumnDef::Column { name, ty } => format!(
                    "\t{} {}",
                    self.dialect().quote_column_name(&name),
                    self.column_type(&ty)
                ),
                ColumnDef::Constraint(sql) => format!("\t{sql}"),
            })
            .collect::<Vec<_>>();

        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.dialect().quote_table_name(table),
            lines.join(",\n")
        );

        if let Some(options) = options {
            sql.push(' ');
            sql.push_str(options);
        }

        Ok(sql)
    }

    pub fn rename_table(&self, table: &str, new_name: &str) -> Result<String> {
        let dialect = self.dialect();
        let (table, new_name) = (
            dialect.quote_table_name(table),
            dialect.quote_table_name(new_name),
        );

        Ok(match dialect.flavor() {
            Flavor::Mysql => format!("RENAME TABLE {table} TO {new_name}"),
            Flavor::Postgresql | Flavor::Sqlite => {
                format!("ALTER TABLE {table} RENAME TO {new_name}")
            }
        })
    }

    pub fn drop_table(&self, table: &str) -> Result<String> {
        Ok(format!("DROP TABLE {}", self.dialect().quote_table_name(table)))
    }

    pub fn truncate_table(&self, table: &str) -> Result<String> {
        let table = self.dialect().quote_table_name(table);

        Ok(match self.dialect().flavor() {
            Flavor::Sqlite => format!("DELETE FROM {table}"),
            Flavor::Mysql | Flavor::Postgresql => format!("TRUNCATE TABLE {table}"),
        })
    }

    pub fn add_column(&self, table: &str, column: &str, ty: impl Into<ColumnType>) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD {} {}",
            self.dialect().quote_table_name(table),
            self.dialect().quote_column_name(column),
            self.column_type(&ty.into())
        ))
    }

    pub fn drop_column(&self, table: &str, column: &str) -> Result<String> {
        if self.dialect().flavor() == Flavor::Sqlite {
            return Err(Error::unsupported_feature(
                "SQLite cannot drop columns with ALTER TABLE in this builder",
            ));
        }

        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.dialect().quote_table_name(table),
            self.dialect().quote_column_name(column)
        ))
    }

    /// Rename a column.
    ///
    /// MySQL's `CHANGE` must restate the column definition. Pass the
    /// table's `SHOW CREATE TABLE` text as `create_table_sql` so the
    /// existing definition can be recovered; without it the definition is
    /// left out.
    pub fn rename_column(
        &self,
        table: &str,
        old_name: &str,
        new_name: &str,
        create_table_sql: Option<&str>,
    ) -> Result<String> {
        let dialect = self.dialect();
        let quoted_table = dialect.quote_table_name(table);
        let (old, new) = (
            dialect.quote_column_name(old_name),
            dialect.quote_column_name(new_name),
        );

        if dialect.flavor() != Flavor::Mysql {
            return Ok(format!("ALTER TABLE {quoted_table} RENAME COLUMN {old} TO {new}"));
        }

        let definition = create_table_sql.and_then(|sql| {
            CREATE_TABLE_COLUMN
                .captures_iter(sql)
                .find(|caps| &caps[1] == old_name)
                .map(|caps| caps[2].to_string())
        });

        Ok(match definition {
            Some(definition) => format!("ALTER TABLE {quoted_table} CHANGE {old} {new} {definition}"),
            None => format!("ALTER TABLE {quoted_table} CHANGE {old} {new}"),
        })
    }

    pub fn alter_column(&self, table: &str, column: &str, ty: impl Into<ColumnType>) -> Result<String> {
        let dialect = self.dialect();
        let table = dialect.quote_table_name(table);
        let column = dialect.quote_column_name(column);
        let ty = self.column_type(&ty.into());

        match dialect.flavor() {
            Flavor::Mysql => Ok(format!("ALTER TABLE {table} CHANGE {column} {column} {ty}")),
            Flavor::Postgresql => Ok(format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {ty}")),
            Flavor::Sqlite => Err(Error::unsupported_feature(
                "SQLite does not support altering column definitions",
            )),
        }
    }

    pub fn add_primary_key<C: AsRef<str>>(
        &self,
        name: &str,
        table: &str,
        columns: impl IntoIterator<Item = C>,
    ) -> Result<String> {
        if self.dialect().flavor() == Flavor::Sqlite {
            return Err(Error::unsupported_feature(
                "SQLite does not support adding a primary key to an existing table",
            ));
        }

        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.dialect().quote_table_name(table),
            self.dialect().quote_column_name(name),
            self.column_list(columns)
        ))
    }

    pub fn drop_primary_key(&self, name: &str, table: &str) -> Result<String> {
        let dialect = self.dialect();
        let table = dialect.quote_table_name(table);

        match dialect.flavor() {
            Flavor::Mysql => Ok(format!("ALTER TABLE {table} DROP PRIMARY KEY")),
            Flavor::Postgresql => Ok(format!(
                "ALTER TABLE {table} DROP CONSTRAINT {}",
                dialect.quote_column_name(name)
            )),
            Flavor::Sqlite => Err(Error::unsupported_feature(
                "SQLite does not support dropping a primary key",
            )),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_foreign_key<C: AsRef<str>, R: AsRef<str>>(
        &self,
        name: &str,
        table: &str,
        columns: impl IntoIterator<Item = C>,
        ref_table: &str,
        ref_columns: impl IntoIterator<Item = R>,
        on_delete: Option<&str>,
        on_update: Option<&str>,
    ) -> Result<String> {
        if self.dialect().flavor() == Flavor::Sqlite {
            return Err(Error::unsupported_feature(
                "SQLite does not support adding foreign keys to an existing table",
            ));
        }

        let dialect = self.dialect();
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            dialect.quote_table_name(table),
            dialect.quote_column_name(name),
            self.column_list(columns),
            dialect.quote_table_name(ref_table),
            self.column_list(ref_columns)
        );

        if let Some(on_delete) = on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(on_delete);
        }

        if let Some(on_update) = on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(on_update);
        }

        Ok(sql)
    }

    pub fn drop_foreign_key(&self, name: &str, table: &str) -> Result<String> {
        let dialect = self.dialect();
        let table = dialect.quote_table_name(table);
        let name = dialect.quote_column_name(name);

        match dialect.flavor() {
            Flavor::Mysql => Ok(format!("ALTER TABLE {table} DROP FOREIGN KEY {name}")),
            Flavor::Postgresql => Ok(format!("ALTER TABLE {table} DROP CONSTRAINT {name}")),
            Flavor::Sqlite => Err(Error::unsupported_feature(
                "SQLite does not support dropping foreign keys",
            )),
        }
    }

    pub fn create_index<C: AsRef<str>>(
        &self,
        name: &str,
        table: &str,
        columns: impl IntoIterator<Item = C>,
        unique: bool,
    ) -> Result<String> {
        Ok(format!(
            "{} {} ON {} ({})",
            if unique {
                "CREATE UNIQUE INDEX"
            } else {
                "CREATE INDEX"
            },
            self.dialect().quote_table_name(name),
            self.dialect().quote_table_name(table),
            self.column_list(columns)
        ))
    }

    pub fn drop_index(&self, name: &str, table: &str) -> Result<String> {
        let dialect = self.dialect();
        let name = dialect.quote_table_name(name);

        Ok(match dialect.flavor() {
            Flavor::Mysql => format!("DROP INDEX {name} ON {}", dialect.quote_table_name(table)),
            Flavor::Postgresql | Flavor::Sqlite => format!("DROP INDEX {name}"),
        })
    }

    /// Reset the auto-increment sequence of `table` so the next generated
    /// key is `value`.
    ///
    /// Fails with a configuration error, before any I/O, when the table has
    /// no sequence.
    pub fn reset_sequence(&self, table: &TableSchema, value: u64) -> Result<String> {
        let Some(sequence) = &table.sequence_name else {
            return Err(Error::invalid_configuration(format!(
                "there is no sequence associated with table `{}`",
                table.full_name
            )));
        };

        let dialect = self.dialect();
        let quoted = dialect.quote_table_name(&table.full_name);

        Ok(match dialect.flavor() {
            Flavor::Mysql => format!("ALTER TABLE {quoted} AUTO_INCREMENT={value}"),
            Flavor::Postgresql => format!(
                "SELECT SETVAL({}, {value}, false)",
                dialect.quote_value(sequence)
            ),
            Flavor::Sqlite => format!(
                "UPDATE sqlite_sequence SET seq={} WHERE name={}",
                value.saturating_sub(1),
                dialect.quote_value(&table.name)
            ),
        })
    }

    /// Enable or disable foreign key checks. PostgreSQL toggles triggers
    /// per table and therefore needs `table`.
    pub fn check_integrity(
        &self,
        check: bool,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<String> {
        let dialect = self.dialect();

        match dialect.flavor() {
            Flavor::Mysql => Ok(format!("SET FOREIGN_KEY_CHECKS = {}", check as u8)),
            Flavor::Sqlite => Ok(format!("PRAGMA foreign_keys = {}", check as u8)),
            Flavor::Postgresql => {
                let Some(table) = table else {
                    return Err(Error::unsupported_feature(
                        "PostgreSQL integrity checks are toggled per table; a table is required",
                    ));
                };
                let table = match schema {
                    Some(schema) => format!("{schema}.{table}"),
                    None => table.to_string(),
                };
                Ok(format!(
                    "ALTER TABLE {} {} TRIGGER ALL",
                    dialect.quote_table_name(&table),
                    if check { "ENABLE" } else { "DISABLE" }
                ))
            }
        }
    }

    fn column_list<C: AsRef<str>>(&self, columns: impl IntoIterator<Item = C>) -> String {
        columns
            .into_iter()
            .map(|column| {
                let column = column.as_ref();
                if column.contains('(') {
                    column.to_string()
                } else {
                    self.dialect().quote_column_name(column)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
