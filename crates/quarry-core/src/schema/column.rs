use super::{AbstractType, HostType};
use crate::{
    stmt::{Expression, Operand, Value},
    Error, Result,
};

/// Metadata describing one table column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    /// The name of the column in the database.
    pub name: String,

    /// Portable type of the column.
    pub ty: AbstractType,

    /// Physical type as reported by the database, e.g. `int(11) unsigned`.
    pub db_type: String,

    /// The representation values are typecast to.
    pub host_type: HostType,

    pub allow_null: bool,

    pub default_value: Option<ColumnDefault>,

    /// Display size, e.g. the `255` of `varchar(255)`.
    pub size: Option<u32>,

    pub precision: Option<u32>,

    pub scale: Option<u32>,

    /// Allowed values of an `enum(...)` column.
    pub enum_values: Vec<String>,

    pub is_primary_key: bool,

    pub auto_increment: bool,

    pub unsigned: bool,

    pub comment: Option<String>,
}

/// A column default: either a literal or a database expression such as
/// `CURRENT_TIMESTAMP`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    Value(Value),
    Expression(Expression),
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, ty: AbstractType) -> ColumnSchema {
        ColumnSchema {
            name: name.into(),
            ty,
            db_type: ty.as_str().to_string(),
            host_type: ty.host_type(false),
            allow_null: true,
            default_value: None,
            size: None,
            precision: None,
            scale: None,
            enum_values: vec![],
            is_primary_key: false,
            auto_increment: false,
            unsigned: false,
            comment: None,
        }
    }

    /// Coerce a value read from or written to this column.
    ///
    /// An empty string becomes null unless the column is textual or binary.
    /// Null passes through. Everything else is converted to the column's
    /// host type.
    pub fn typecast(&self, value: Value) -> Result<Value> {
        if matches!(&value, Value::String(s) if s.is_empty()) && !self.ty.keeps_empty_string() {
            return Ok(Value::Null);
        }

        match (self.host_type, value) {
            (_, Value::Null) => Ok(Value::Null),
            (HostType::Integer, value) => typecast_integer(value),
            (HostType::Double, value) => match value.as_f64() {
                Some(v) => Ok(Value::F64(v)),
                None => Err(Error::type_conversion(value, "double")),
            },
            (HostType::Boolean, value) => typecast_bool(value),
            (HostType::String, value) => typecast_string(value),
            (HostType::Bytes, Value::Bytes(bytes)) => Ok(Value::Bytes(bytes)),
            (HostType::Bytes, Value::String(s)) => Ok(Value::Bytes(s.into_bytes())),
            (HostType::Bytes, value) => typecast_string(value),
        }
    }

    /// Typecast an operand. Expressions pass through unchanged.
    pub fn typecast_operand(&self, operand: Operand) -> Result<Operand> {
        match operand {
            Operand::Value(value) => Ok(Operand::Value(self.typecast(value)?)),
            operand => Ok(operand),
        }
    }
}

fn typecast_integer(value: Value) -> Result<Value> {
    match value {
        Value::I64(v) => Ok(Value::I64(v)),
        Value::U64(v) => Ok(i64::try_from(v).map(Value::I64).unwrap_or(Value::U64(v))),
        Value::F64(v) if v.is_finite() => Ok(Value::I64(v.trunc() as i64)),
        Value::Bool(v) => Ok(Value::I64(v as i64)),
        Value::String(ref s) => {
            let trimmed = s.trim();
            if let Ok(v) = trimmed.parse::<i64>() {
                Ok(Value::I64(v))
            } else if let Ok(v) = trimmed.parse::<u64>() {
                Ok(Value::U64(v))
            } else if let Ok(v) = trimmed.parse::<f64>() {
                typecast_integer(Value::F64(v))
            } else {
                Err(Error::type_conversion(value, "integer"))
            }
        }
        value => Err(Error::type_conversion(value, "integer")),
    }
}

fn typecast_bool(value: Value) -> Result<Value> {
    match value {
        Value::Bool(v) => Ok(Value::Bool(v)),
        Value::I64(v) => Ok(Value::Bool(v != 0)),
        Value::U64(v) => Ok(Value::Bool(v != 0)),
        Value::F64(v) => Ok(Value::Bool(v != 0.0)),
        Value::String(s) => {
            let falsy = matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "f" | "no" | "n" | "off"
            );
            Ok(Value::Bool(!falsy))
        }
        Value::Bytes(b) => Ok(Value::Bool(b != [0])),
        value => Err(Error::type_conversion(value, "boolean")),
    }
}

fn typecast_string(value: Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(s)),
        Value::Bytes(b) => Ok(Value::String(String::from_utf8_lossy(&b).into_owned())),
        Value::List(_) | Value::Record(_) => Err(Error::type_conversion(value, "string")),
        value => Ok(Value::String(value.to_key())),
    }
}
