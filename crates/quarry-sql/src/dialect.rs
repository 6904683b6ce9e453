mod type_map;

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Largest value MySQL accepts for `LIMIT`, used when only an offset is set.
pub const MYSQL_MAX_LIMIT: &str = "18446744073709551615";

/// SQLite requires a limit before `OFFSET`; this is its "no limit" value.
const SQLITE_MAX_LIMIT: &str = "9223372036854775807";

static TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(%?[\w\-\. ]+%?)\}\}|\[\[([\w\-\. ]+)\]\]").unwrap()
});

static TABLE_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").unwrap());

/// SQL dialects Quarry can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Mysql,
    Postgresql,
    Sqlite,
}

/// Everything that differs between database engines at the SQL text level:
/// identifier quoting, the abstract type map, `LIMIT`/`OFFSET` rendering
/// and table-name templates.
#[derive(Debug, Clone)]
pub struct Dialect {
    flavor: Flavor,

    /// Substituted for `%` in `{{%name}}` table templates.
    table_prefix: String,
}

impl Dialect {
    pub fn new(flavor: Flavor) -> Dialect {
        Dialect {
            flavor,
            table_prefix: String::new(),
        }
    }

    pub fn mysql() -> Dialect {
        Dialect::new(Flavor::Mysql)
    }

    pub fn postgresql() -> Dialect {
        Dialect::new(Flavor::Postgresql)
    }

    pub fn sqlite() -> Dialect {
        Dialect::new(Flavor::Sqlite)
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Dialect {
        self.table_prefix = prefix.into();
        self
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    fn quote_char(&self) -> char {
        match self.flavor {
            Flavor::Mysql => '`',
            Flavor::Postgresql | Flavor::Sqlite => '"',
        }
    }

    /// Quote a table name that has no schema prefix. Names that already
    /// contain the quote character are returned unchanged.
    pub fn quote_simple_table_name(&self, name: &str) -> String {
        let q = self.quote_char();
        if name.contains(q) {
            name.to_string()
        } else {
            format!("{q}{name}{q}")
        }
    }

    /// Quote a column name that has no table prefix. `*` is never quoted.
    pub fn quote_simple_column_name(&self, name: &str) -> String {
        let q = self.quote_char();
        if name == "*" || name.contains(q) {
            name.to_string()
        } else {
            format!("{q}{name}{q}")
        }
    }

    /// Quote a possibly schema-qualified table name.
    ///
    /// Names containing `(` (expressions, sub-queries) or a `{{...}}`
    /// template are returned unchanged. Each dotted segment is quoted
    /// separately.
    pub fn quote_table_name(&self, name: &str) -> String {
        if name.contains('(') || name.contains("{{") {
            return name.to_string();
        }

        if !name.contains('.') {
            return self.quote_simple_table_name(name);
        }

        name.split('.')
            .map(|part| self.quote_simple_table_name(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quote a possibly table-qualified column name.
    pub fn quote_column_name(&self, name: &str) -> String {
        if name.contains('(') || name.contains("[[") {
            return name.to_string();
        }

        let (prefix, name) = match name.rsplit_once('.') {
            Some((table, column)) => (format!("{}.", self.quote_table_name(table)), column),
            None => (String::new(), name),
        };

        if name.contains("{{") {
            return name.to_string();
        }

        prefix + &self.quote_simple_column_name(name)
    }

    /// Quote a string literal for direct embedding in SQL.
    pub fn quote_value(&self, value: &str) -> String {
        match self.flavor {
            Flavor::Mysql => format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'")),
            Flavor::Postgresql | Flavor::Sqlite => format!("'{}'", value.replace('\'', "''")),
        }
    }

    /// Expand `{{table}}` and `[[column]]` templates into quoted names. A
    /// `%` inside a table template is replaced with the table prefix.
    pub fn quote_sql(&self, sql: &str) -> String {
        TEMPLATE
            .replace_all(sql, |caps: &Captures<'_>| {
                if let Some(column) = caps.get(2) {
                    return self.quote_column_name(column.as_str());
                }
                let table = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                self.quote_table_name(table)
                    .replace('%', &self.table_prefix)
            })
            .into_owned()
    }

    /// The table name without template braces and with the prefix applied:
    /// `{{%user}}` becomes `tbl_user` for the prefix `tbl_`.
    pub fn raw_table_name(&self, name: &str) -> String {
        if !name.contains("{{") {
            return name.to_string();
        }

        TABLE_TEMPLATE
            .replace_all(name, "$1")
            .replace('%', &self.table_prefix)
    }

    /// Render `LIMIT`/`OFFSET`. An offset of zero counts as unset.
    pub fn build_limit(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let offset = offset.filter(|offset| *offset > 0);

        match (self.flavor, limit, offset) {
            (_, Some(limit), Some(offset)) => format!("LIMIT {limit} OFFSET {offset}"),
            (_, Some(limit), None) => format!("LIMIT {limit}"),
            (Flavor::Mysql, None, Some(offset)) => format!("LIMIT {offset}, {MYSQL_MAX_LIMIT}"),
            (Flavor::Sqlite, None, Some(offset)) => {
                format!("LIMIT {SQLITE_MAX_LIMIT} OFFSET {offset}")
            }
            (Flavor::Postgresql, None, Some(offset)) => format!("OFFSET {offset}"),
            (_, None, None) => String::new(),
        }
    }
}
