use quarry_core::{
    schema::{AbstractType, ColumnDefault, ColumnSchema},
    stmt::{Expression, Row, Value},
    Error, Result,
};

use regex::Regex;
use std::sync::LazyLock;

/// `decimal(10,2) unsigned` => (`decimal`, `10,2`)
static DB_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)(?:\(([^\)]+)\))?").unwrap());

static ENUM_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'[^']*'").unwrap());

/// Map a MySQL type name onto the abstract type it reads back as.
fn abstract_type(db_type: &str) -> AbstractType {
    use AbstractType::*;

    match db_type {
        "tinyint" | "smallint" => SmallInt,
        "bit" | "mediumint" | "int" | "integer" => Integer,
        "bigint" => BigInt,
        "float" | "real" => Float,
        "double" => Double,
        "decimal" | "numeric" => Decimal,
        "tinytext" | "mediumtext" | "longtext" | "text" => Text,
        "longblob" | "blob" => Binary,
        "varchar" | "string" | "char" | "enum" => String,
        "datetime" => DateTime,
        "year" | "date" => Date,
        "time" => Time,
        "timestamp" => Timestamp,
        _ => String,
    }
}

/// Build a column from one row of `SHOW FULL COLUMNS`.
pub(crate) fn load_column_schema(row: &Row) -> Result<ColumnSchema> {
    let name = text(row, "field")
        .ok_or_else(|| Error::invalid_configuration("column metadata row has no `Field`"))?;
    let db_type = text(row, "type").unwrap_or_default();

    let mut column = ColumnSchema::new(name, AbstractType::String);
    column.db_type = db_type.to_string();
    column.allow_null = text(row, "null") == Some("YES");
    column.is_primary_key = text(row, "key").is_some_and(|key| key.contains("PRI"));
    column.auto_increment = text(row, "extra")
        .is_some_and(|extra| extra.to_ascii_lowercase().contains("auto_increment"));
    column.unsigned = db_type.to_ascii_lowercase().contains("unsigned");
    column.comment = text(row, "comment")
        .filter(|comment| !comment.is_empty())
        .map(str::to_string);

    let mut base_type = String::new();

    if let Some(caps) = DB_TYPE.captures(db_type) {
        base_type = caps[1].to_ascii_lowercase();
        column.ty = abstract_type(&base_type);

        if let Some(args) = caps.get(2).map(|m| m.as_str()) {
            if base_type == "enum" {
                column.enum_values = ENUM_VALUE
                    .find_iter(args)
                    .map(|m| m.as_str().trim_matches('\'').to_string())
                    .collect();
            } else {
                let mut parts = args.split(',').map(|part| part.trim().parse::<u32>().ok());
                column.size = parts.next().flatten();
                column.precision = column.size;
                column.scale = parts.next().flatten();

                if base_type == "bit" {
                    match column.size {
                        Some(1) => column.ty = AbstractType::Boolean,
                        Some(size) if size > 32 => column.ty = AbstractType::BigInt,
                        Some(32) => column.ty = AbstractType::Integer,
                        _ => {}
                    }
                }
            }
        }
    }

    column.host_type = column.ty.host_type(column.unsigned);

    if !column.is_primary_key {
        column.default_value = default_value(&column, &base_type, field(row, "default"));
    }

    Ok(column)
}

fn default_value(column: &ColumnSchema, base_type: &str, default: Option<&Value>) -> Option<ColumnDefault> {
    let default = match default {
        None | Some(Value::Null) => return None,
        Some(default) => default,
    };

    if column.ty == AbstractType::Timestamp && default.as_str() == Some("CURRENT_TIMESTAMP") {
        return Some(ColumnDefault::Expression(Expression::new("CURRENT_TIMESTAMP")));
    }

    if base_type == "bit" {
        if let Some(bits) = default.as_str() {
            let bits = bits.trim_matches(|c| c == 'b' || c == '\'');
            if let Ok(value) = u64::from_str_radix(bits, 2) {
                return Some(ColumnDefault::Value(Value::U64(value)));
            }
        }
    }

    // Keep the raw default when it does not fit the column's host type.
    let value = column
        .typecast(default.clone())
        .unwrap_or_else(|_| default.clone());

    Some(ColumnDefault::Value(value))
}

/// Result set column names differ in case between servers and drivers.
fn field<'a>(row: &'a Row, name: &str) -> Option<&'a Value> {
    row.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn text<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    field(row, name).and_then(Value::as_str)
}
