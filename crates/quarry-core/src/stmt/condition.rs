use super::{normalize_param_name, Expression, Params, Query, Row, Value};

use indexmap::IndexMap;

/// A boolean SQL condition that has not been compiled yet.
///
/// Conditions come in three public shapes: a hash of column tests, an
/// operator applied to operands, or pre-built SQL (raw text, an
/// [`Expression`] or a sub-query).
#[derive(Debug, Clone)]
pub enum Condition {
    /// `column => value` tests joined with `AND`. A null value tests
    /// `IS NULL`, a list value tests `IN`, a sub-query tests `IN (...)`, an
    /// expression is embedded on the right-hand side.
    Hash(IndexMap<String, Operand>),

    /// An operator such as `in`, `like` or `>=` applied to its operands.
    Operator(OperatorCondition),

    /// Raw SQL with named placeholders.
    Raw { sql: String, params: Params },

    /// A verbatim SQL fragment.
    Expression(Expression),

    /// A nested query, rendered in parentheses.
    SubQuery(Box<Query>),
}

#[derive(Debug, Clone)]
pub struct OperatorCondition {
    /// Operator token, matched case-insensitively.
    pub op: String,

    pub operands: Vec<Operand>,
}

/// One operand of an operator condition.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A plain value. Strings name columns in column position and are bound
    /// as parameters in value position.
    Value(Value),

    /// Embedded verbatim.
    Expression(Expression),

    /// A sub-select, used by `in`, `not in`, `exists` and `not exists`.
    Query(Box<Query>),

    /// A nested condition, used by `and`, `or` and `not`.
    Condition(Condition),
}

impl Condition {
    pub fn hash<K, V>(columns: impl IntoIterator<Item = (K, V)>) -> Condition
    where
        K: Into<String>,
        V: Into<Operand>,
    {
        Condition::Hash(
            columns
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Any operator applied to the given operands.
    pub fn operator(op: impl Into<String>, operands: Vec<Operand>) -> Condition {
        Condition::Operator(OperatorCondition {
            op: op.into(),
            operands,
        })
    }

    pub fn raw(sql: impl Into<String>) -> Condition {
        Condition::Raw {
            sql: sql.into(),
            params: Params::new(),
        }
    }

    pub fn raw_with_params<K, V>(
        sql: impl Into<String>,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Condition
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Condition::Raw {
            sql: sql.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (normalize_param_name(k.into()), v.into()))
                .collect(),
        }
    }

    pub fn compare(op: &str, column: impl Into<String>, value: impl Into<Operand>) -> Condition {
        Condition::operator(op, vec![column_operand(column), value.into()])
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Operand>) -> Condition {
        Condition::compare("=", column, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Operand>) -> Condition {
        Condition::compare("<>", column, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Operand>) -> Condition {
        Condition::compare(">", column, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Operand>) -> Condition {
        Condition::compare(">=", column, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Operand>) -> Condition {
        Condition::compare("<", column, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Operand>) -> Condition {
        Condition::compare("<=", column, value)
    }

    pub fn between(
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Condition {
        Condition::operator("between", vec![column_operand(column), low.into(), high.into()])
    }

    pub fn not_between(
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Condition {
        Condition::operator(
            "not between",
            vec![column_operand(column), low.into(), high.into()],
        )
    }

    /// `column IN (values...)`, or `column IN (sub-query)` when `values` is a
    /// [`Query`].
    pub fn in_list(column: impl Into<String>, values: impl Into<Operand>) -> Condition {
        Condition::operator("in", vec![column_operand(column), values.into()])
    }

    pub fn not_in(column: impl Into<String>, values: impl Into<Operand>) -> Condition {
        Condition::operator("not in", vec![column_operand(column), values.into()])
    }

    /// Tuple `IN` over several columns; each row maps column names to values.
    pub fn in_composite<C: Into<String>>(
        columns: impl IntoIterator<Item = C>,
        rows: impl IntoIterator<Item = Row>,
    ) -> Condition {
        Condition::operator(
            "in",
            vec![
                columns_operand(columns),
                Operand::Value(Value::List(rows.into_iter().map(Value::Record).collect())),
            ],
        )
    }

    pub fn like(column: impl Into<String>, values: impl Into<Operand>) -> Condition {
        Condition::operator("like", vec![column_operand(column), values.into()])
    }

    pub fn not_like(column: impl Into<String>, values: impl Into<Operand>) -> Condition {
        Condition::operator("not like", vec![column_operand(column), values.into()])
    }

    pub fn or_like(column: impl Into<String>, values: impl Into<Operand>) -> Condition {
        Condition::operator("or like", vec![column_operand(column), values.into()])
    }

    pub fn or_not_like(column: impl Into<String>, values: impl Into<Operand>) -> Condition {
        Condition::operator("or not like", vec![column_operand(column), values.into()])
    }

    /// A `like`-family condition with an explicit escape map. An empty map
    /// means the values are already escaped.
    pub fn like_escaped<K, V>(
        op: &str,
        column: impl Into<String>,
        values: impl Into<Operand>,
        escape: impl IntoIterator<Item = (K, V)>,
    ) -> Condition
    where
        K: Into<String>,
        V: Into<String>,
    {
        let escape = Value::Record(
            escape
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        );
        Condition::operator(
            op,
            vec![column_operand(column), values.into(), Operand::Value(escape)],
        )
    }

    pub fn exists(query: Query) -> Condition {
        Condition::operator("exists", vec![Operand::Query(Box::new(query))])
    }

    pub fn not_exists(query: Query) -> Condition {
        Condition::operator("not exists", vec![Operand::Query(Box::new(query))])
    }

    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Condition {
        Condition::operator(
            "and",
            conditions.into_iter().map(Operand::Condition).collect(),
        )
    }

    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Condition {
        Condition::operator(
            "or",
            conditions.into_iter().map(Operand::Condition).collect(),
        )
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Condition {
        Condition::operator("not", vec![Operand::Condition(condition)])
    }

    /// Join two optional conditions with `op`, flattening when the existing
    /// condition already uses the same operator.
    pub fn combine(op: &str, lhs: Option<Condition>, rhs: Condition) -> Condition {
        match lhs {
            None => rhs,
            Some(Condition::Operator(mut existing)) if existing.op.eq_ignore_ascii_case(op) => {
                existing.operands.push(Operand::Condition(rhs));
                Condition::Operator(existing)
            }
            Some(lhs) => Condition::operator(
                op,
                vec![Operand::Condition(lhs), Operand::Condition(rhs)],
            ),
        }
    }

    /// True for conditions that compile to nothing: an empty hash, raw SQL
    /// with no text, or an operator with no operands.
    pub fn is_empty(&self) -> bool {
        match self {
            Condition::Hash(columns) => columns.is_empty(),
            Condition::Raw { sql, .. } => sql.trim().is_empty(),
            Condition::Operator(cond) => cond.operands.is_empty(),
            _ => false,
        }
    }
}

impl OperatorCondition {
    /// The operator token upper-cased and with inner whitespace collapsed.
    pub fn normalized_op(&self) -> String {
        self.op
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase()
    }
}

fn column_operand(column: impl Into<String>) -> Operand {
    Operand::Value(Value::String(column.into()))
}

fn columns_operand<C: Into<String>>(columns: impl IntoIterator<Item = C>) -> Operand {
    Operand::Value(Value::List(
        columns
            .into_iter()
            .map(|c| Value::String(c.into()))
            .collect(),
    ))
}

impl Operand {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Into<Value>> From<T> for Operand {
    fn from(value: T) -> Self {
        Operand::Value(value.into())
    }
}

impl From<Expression> for Operand {
    fn from(value: Expression) -> Self {
        Operand::Expression(value)
    }
}

impl From<Query> for Operand {
    fn from(value: Query) -> Self {
        Operand::Query(Box::new(value))
    }
}

impl From<Condition> for Operand {
    fn from(value: Condition) -> Self {
        Operand::Condition(value)
    }
}

impl From<Expression> for Condition {
    fn from(value: Expression) -> Self {
        Condition::Expression(value)
    }
}

impl From<&str> for Condition {
    fn from(value: &str) -> Self {
        Condition::raw(value)
    }
}

impl From<String> for Condition {
    fn from(value: String) -> Self {
        Condition::raw(value)
    }
}

impl From<Query> for Condition {
    fn from(value: Query) -> Self {
        Condition::SubQuery(Box::new(value))
    }
}
