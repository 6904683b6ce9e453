use super::{Dialect, Flavor};

use quarry_core::schema::AbstractType;
use regex::Regex;
use std::sync::LazyLock;

/// `string(32) NOT NULL` => (`string`, `32`, ` NOT NULL`)
static SIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\w+)\((.+?)\)(.*)$").unwrap());

/// `string NOT NULL` => `string`
static LEADING_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\w+)\s+").unwrap());

static PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.+\)").unwrap());

impl Dialect {
    /// Physical type for an abstract type.
    pub fn physical_type(&self, ty: AbstractType) -> &'static str {
        use AbstractType::*;

        match self.flavor {
            Flavor::Mysql => match ty {
                Pk => "int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY",
                BigPk => "bigint(20) NOT NULL AUTO_INCREMENT PRIMARY KEY",
                String => "varchar(255)",
                Text => "text",
                SmallInt => "smallint(6)",
                Integer => "int(11)",
                BigInt => "bigint(20)",
                Float => "float",
                Double => "double",
                Decimal => "decimal(10,0)",
                DateTime => "datetime",
                Timestamp => "timestamp",
                Time => "time",
                Date => "date",
                Binary => "blob",
                Boolean => "tinyint(1)",
                Money => "decimal(19,4)",
            },
            Flavor::Postgresql => match ty {
                Pk => "serial NOT NULL PRIMARY KEY",
                BigPk => "bigserial NOT NULL PRIMARY KEY",
                String => "varchar(255)",
                Text => "text",
                SmallInt => "smallint",
                Integer => "integer",
                BigInt => "bigint",
                Float | Double => "double precision",
                Decimal => "numeric(10,0)",
                DateTime | Timestamp => "timestamp(0)",
                Time => "time(0)",
                Date => "date",
                Binary => "bytea",
                Boolean => "boolean",
                Money => "numeric(19,4)",
            },
            Flavor::Sqlite => match ty {
                Pk | BigPk => "integer PRIMARY KEY AUTOINCREMENT NOT NULL",
                String => "varchar(255)",
                Text => "text",
                SmallInt => "smallint",
                Integer => "integer",
                BigInt => "bigint",
                Float => "float",
                Double => "double",
                Decimal => "decimal(10,0)",
                DateTime => "datetime",
                Timestamp => "timestamp",
                Time => "time",
                Date => "date",
                Binary => "blob",
                Boolean => "boolean",
                Money => "decimal(19,4)",
            },
        }
    }

    fn lookup(&self, token: &str) -> Option<&'static str> {
        token
            .parse::<AbstractType>()
            .ok()
            .map(|ty| self.physical_type(ty))
    }

    /// Resolve a column type definition.
    ///
    /// The definition may be a bare abstract type (`string`), an abstract
    /// type with a size that replaces the default one (`string(32)`), or an
    /// abstract type followed by free text (`string NOT NULL`). Anything
    /// else is returned as-is.
    pub fn column_type(&self, ty: &str) -> String {
        if let Some(physical) = self.lookup(ty) {
            return physical.to_string();
        }

        if let Some(caps) = SIZED.captures(ty) {
            if let Some(physical) = self.lookup(&caps[1]) {
                let sized = PARENS.replace(physical, format!("({})", &caps[2]).as_str());
                return format!("{sized}{}", &caps[3]);
            }
            return ty.to_string();
        }

        if let Some(caps) = LEADING_WORD.captures(ty) {
            if let Some(physical) = self.lookup(&caps[1]) {
                return format!("{physical}{}", &ty[caps[1].len()..]);
            }
        }

        ty.to_string()
    }
}
