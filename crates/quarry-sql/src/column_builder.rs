use crate::{Dialect, Flavor};

use quarry_core::{
    schema::AbstractType,
    stmt::{Expression, Value},
};

/// Fluent definition of a column for DDL statements.
///
/// Renders `TYPE(length) [UNSIGNED] [NOT NULL] [UNIQUE] [DEFAULT x]
/// [CHECK (...)]`, with clauses always in that order. The type is abstract
/// and resolved through the dialect's type map when the DDL is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchemaBuilder {
    ty: AbstractType,
    length: Vec<String>,
    not_null: bool,
    unique: bool,
    unsigned: bool,
    default: Option<DefaultValue>,
    check: Option<String>,
    comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum DefaultValue {
    Value(Value),
    Expression(Expression),
}

impl ColumnSchemaBuilder {
    pub fn new(ty: AbstractType) -> ColumnSchemaBuilder {
        ColumnSchemaBuilder {
            ty,
            length: vec![],
            not_null: false,
            unique: false,
            unsigned: false,
            default: None,
            check: None,
            comment: None,
        }
    }

    pub fn primary_key() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Pk)
    }

    pub fn big_primary_key() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::BigPk)
    }

    pub fn string(length: impl Into<Option<u32>>) -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::String).length(length)
    }

    pub fn text() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Text)
    }

    pub fn small_integer() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::SmallInt)
    }

    pub fn integer() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Integer)
    }

    pub fn big_integer() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::BigInt)
    }

    pub fn float() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Float)
    }

    pub fn double() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Double)
    }

    pub fn decimal(precision: u32, scale: u32) -> ColumnSchemaBuilder {
        let mut builder = ColumnSchemaBuilder::new(AbstractType::Decimal);
        builder.length = vec![precision.to_string(), scale.to_string()];
        builder
    }

    pub fn date_time() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::DateTime)
    }

    pub fn timestamp() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Timestamp)
    }

    pub fn time() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Time)
    }

    pub fn date() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Date)
    }

    pub fn binary() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Binary)
    }

    pub fn boolean() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Boolean)
    }

    pub fn money() -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(AbstractType::Money)
    }

    pub fn length(mut self, length: impl Into<Option<u32>>) -> ColumnSchemaBuilder {
        self.length = length.into().map(|l| l.to_string()).into_iter().collect();
        self
    }

    pub fn not_null(mut self) -> ColumnSchemaBuilder {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> ColumnSchemaBuilder {
        self.unique = true;
        self
    }

    pub fn unsigned(mut self) -> ColumnSchemaBuilder {
        self.unsigned = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> ColumnSchemaBuilder {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_expression(mut self, expr: impl Into<String>) -> ColumnSchemaBuilder {
        self.default = Some(DefaultValue::Expression(Expression::new(expr)));
        self
    }

    pub fn check(mut self, check: impl Into<String>) -> ColumnSchemaBuilder {
        self.check = Some(check.into());
        self
    }

    /// Only MySQL stores column comments inline.
    pub fn comment(mut self, comment: impl Into<String>) -> ColumnSchemaBuilder {
        self.comment = Some(comment.into());
        self
    }

    /// The abstract definition, e.g. `string(32) NOT NULL DEFAULT 'x'`.
    pub fn to_abstract(&self, dialect: &Dialect) -> String {
        let mut sql = self.ty.to_string();

        if !self.length.is_empty() {
            sql.push('(');
            sql.push_str(&self.length.join(","));
            sql.push(')');
        }

        if self.unsigned && dialect.flavor() == Flavor::Mysql {
            sql.push_str(" UNSIGNED");
        }

        if self.not_null {
            sql.push_str(" NOT NULL");
        }

        if self.unique {
            sql.push_str(" UNIQUE");
        }

        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            match default {
                DefaultValue::Expression(expr) => sql.push_str(&expr.sql),
                DefaultValue::Value(value) => sql.push_str(&default_literal(dialect, value)),
            }
        }

        if let Some(check) = &self.check {
            sql.push_str(" CHECK (");
            sql.push_str(check);
            sql.push(')');
        }

        if let (Some(comment), Flavor::Mysql) = (&self.comment, dialect.flavor()) {
            sql.push_str(" COMMENT ");
            sql.push_str(&dialect.quote_value(comment));
        }

        sql
    }
}

fn default_literal(dialect: &Dialect, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::I64(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::String(s) => dialect.quote_value(s),
        other => dialect.quote_value(&other.to_key()),
    }
}
