use super::{merge_params, QueryBuilder};

use quarry_core::{
    stmt::{
        like_escape_pairs, like_pattern, Condition, Expression, Operand, OperatorCondition, Params,
        Value,
    },
    Error, Result,
};
use indexmap::IndexMap;

/// Prefix of auto-generated placeholders: `:qp0`, `:qp1`, ...
pub const PARAM_PREFIX: &str = ":qp";

/// Compiles [`Condition`] trees into SQL fragments.
///
/// Values are bound as auto-named placeholders in left-to-right order.
/// Expressions are embedded verbatim and contribute their own bindings.
/// An empty result means "no condition".
#[derive(Debug, Clone, Copy)]
pub struct ConditionCompiler<'a> {
    builder: &'a QueryBuilder,
}

impl<'a> ConditionCompiler<'a> {
    pub fn new(builder: &'a QueryBuilder) -> ConditionCompiler<'a> {
        ConditionCompiler { builder }
    }

    pub fn compile(&self, condition: &Condition, params: &mut Params) -> Result<String> {
        match condition {
            Condition::Hash(columns) => self.compile_hash(columns, params),
            Condition::Operator(cond) => self.compile_operator(cond, params),
            Condition::Raw { sql, params: raw } => {
                Ok(merge_params(params, sql, raw))
            }
            Condition::Expression(expr) => {
                Ok(merge_params(params, &expr.sql, &expr.params))
            }
            Condition::SubQuery(query) => Ok(format!(
                "({})",
                self.builder.build_with_params(query, params)?
            )),
        }
    }

    /// Bind `value` under the next free auto-generated name.
    ///
    /// The counter starts at the number of bindings so far and skips names
    /// that are already taken, so user-supplied names are never overwritten.
    pub fn bind(params: &mut Params, value: Value) -> String {
        Self::bind_excluding(params, &Params::new(), value)
    }

    /// Like [`bind`](Self::bind), also skipping every name in `reserved`.
    pub(crate) fn bind_excluding(params: &mut Params, reserved: &Params, value: Value) -> String {
        let mut n = params.len();
        let mut name = format!("{PARAM_PREFIX}{n}");

        while params.contains_key(&name) || reserved.contains_key(&name) {
            n += 1;
            name = format!("{PARAM_PREFIX}{n}");
        }

        params.insert(name.clone(), value);
        name
    }

    fn compile_hash(&self, columns: &IndexMap<String, Operand>, params: &mut Params) -> Result<String> {
        let mut parts = Vec::with_capacity(columns.len());

        for (column, operand) in columns {
            let part = match operand {
                Operand::Value(Value::List(_)) | Operand::Query(_) => {
                    let column = Operand::Value(Value::String(column.clone()));
                    self.compile_in("IN", &column, operand, params)?
                }
                Operand::Value(Value::Null) => format!("{} IS NULL", self.quote(column)),
                Operand::Value(value) => {
                    let placeholder = Self::bind(params, value.clone());
                    format!("{}={placeholder}", self.quote(column))
                }
                Operand::Expression(expr) => {
                    let sql = merge_params(params, &expr.sql, &expr.params);
                    format!("{}={sql}", self.quote(column))
                }
                Operand::Condition(_) => {
                    return Err(Error::invalid_condition(format!(
                        "hash condition value for column `{column}` cannot be a condition"
                    )))
                }
            };
            parts.push(part);
        }

        Ok(match parts.len() {
            0 => String::new(),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(") AND (")),
        })
    }

    fn compile_operator(&self, cond: &OperatorCondition, params: &mut Params) -> Result<String> {
        let op = cond.normalized_op();
        let operands = &cond.operands[..];

        if let Some(like) = LikeOp::parse(&op) {
            return self.compile_like(&op, like, operands, params);
        }

        match op.as_str() {
            "AND" | "OR" => self.compile_and_or(&op, operands, params),
            "NOT" => {
                let [operand] = operands else {
                    return Err(operand_count(&op, "exactly one operand"));
                };
                let inner = self.compile_nested(&op, operand, params)?;
                Ok(if inner.is_empty() {
                    inner
                } else {
                    format!("NOT ({inner})")
                })
            }
            "BETWEEN" | "NOT BETWEEN" => {
                let [column, low, high] = operands else {
                    return Err(operand_count(&op, "three operands"));
                };
                let column = self.column(&op, column, params)?;
                let low = self.value(&op, low, params)?;
                let high = self.value(&op, high, params)?;
                Ok(format!("{column} {op} {low} AND {high}"))
            }
            "IN" | "NOT IN" => {
                let [column, values] = operands else {
                    return Err(operand_count(&op, "two operands"));
                };
                self.compile_in(&op, column, values, params)
            }
            "EXISTS" | "NOT EXISTS" => match operands {
                [Operand::Query(query)] => Ok(format!(
                    "{op} ({})",
                    self.builder.build_with_params(query, params)?
                )),
                [_] => Err(Error::invalid_condition(format!(
                    "sub-query for operator '{op}' must be a query"
                ))),
                _ => Err(operand_count(&op, "exactly one operand")),
            },
            _ => match op.strip_prefix("NOT ") {
                Some(inner) => {
                    let cond = OperatorCondition {
                        op: inner.to_string(),
                        operands: cond.operands.clone(),
                    };
                    let inner = self.compile_operator(&cond, params)?;
                    Ok(if inner.is_empty() {
                        inner
                    } else {
                        format!("NOT ({inner})")
                    })
                }
                None => self.compile_simple(&op, operands, params),
            },
        }
    }

    fn compile_and_or(&self, op: &str, operands: &[Operand], params: &mut Params) -> Result<String> {
        let mut parts = Vec::with_capacity(operands.len());

        for operand in operands {
            let part = self.compile_nested(op, operand, params)?;
            if !part.is_empty() {
                parts.push(part);
            }
        }

        Ok(if parts.is_empty() {
            String::new()
        } else {
            format!("({})", parts.join(&format!(") {op} (")))
        })
    }

    /// An operand of `and`, `or` or `not`: a nested condition, or a scalar
    /// taken as literal SQL.
    fn compile_nested(&self, op: &str, operand: &Operand, params: &mut Params) -> Result<String> {
        match operand {
            Operand::Condition(cond) => self.compile(cond, params),
            Operand::Expression(expr) => {
                Ok(merge_params(params, &expr.sql, &expr.params))
            }
            Operand::Query(query) => Ok(format!(
                "({})",
                self.builder.build_with_params(query, params)?
            )),
            Operand::Value(Value::Null) => Ok(String::new()),
            Operand::Value(Value::String(sql)) => Ok(sql.clone()),
            Operand::Value(value @ (Value::List(_) | Value::Record(_) | Value::Bytes(_))) => {
                Err(Error::invalid_condition(format!(
                    "operator '{op}' expects conditions as operands, got {value:?}"
                )))
            }
            Operand::Value(value) => Ok(value.to_key()),
        }
    }

    fn compile_in(
        &self,
        op: &str,
        column: &Operand,
        values: &Operand,
        params: &mut Params,
    ) -> Result<String> {
        let columns = match column {
            Operand::Value(Value::List(columns)) => columns
                .iter()
                .map(|column| match column {
                    Value::String(column) => Ok(column.as_str()),
                    _ => Err(Error::invalid_condition(format!(
                        "operator '{op}' expects column names, got {column:?}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Operand::Value(Value::String(column)) => vec![column.as_str()],
            _ => {
                return Err(Error::invalid_condition(format!(
                    "operator '{op}' expects a column name as its first operand"
                )))
            }
        };

        let empty = || if op == "IN" { "0=1" } else { "" }.to_string();

        let values = match values {
            Operand::Query(query) => {
                let sql = self.builder.build_with_params(query, params)?;
                let columns = match &columns[..] {
                    [column] => self.quote(column),
                    columns => format!(
                        "({})",
                        columns.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ")
                    ),
                };
                return Ok(format!("{columns} {op} ({sql})"));
            }
            Operand::Value(Value::List(items)) => items.iter().map(InValue::Value).collect(),
            Operand::Value(value) => vec![InValue::Value(value)],
            Operand::Expression(expr) => vec![InValue::Expression(expr)],
            Operand::Condition(_) => {
                return Err(Error::invalid_condition(format!(
                    "operator '{op}' cannot take a condition as its value list"
                )))
            }
        };

        if values.is_empty() || columns.is_empty() {
            return Ok(empty());
        }

        if columns.len() > 1 {
            return self.compile_composite_in(op, &columns, &values, params);
        }

        let column = columns[0];
        let mut placeholders = Vec::with_capacity(values.len());

        for value in values {
            let sql = match value {
                InValue::Expression(expr) => {
                    merge_params(params, &expr.sql, &expr.params)
                }
                InValue::Value(value) => {
                    let value = match value {
                        Value::Record(fields) => fields.get(column).unwrap_or(&Value::Null),
                        value => value,
                    };
                    match value {
                        Value::Null => "NULL".to_string(),
                        value => Self::bind(params, value.clone()),
                    }
                }
            };
            placeholders.push(sql);
        }

        let column = self.quote(column);

        Ok(if placeholders.len() > 1 {
            format!("{column} {op} ({})", placeholders.join(", "))
        } else {
            let op = if op == "IN" { "=" } else { "<>" };
            format!("{column}{op}{}", placeholders[0])
        })
    }

    fn compile_composite_in(
        &self,
        op: &str,
        columns: &[&str],
        values: &[InValue<'_>],
        params: &mut Params,
    ) -> Result<String> {
        let mut rows = Vec::with_capacity(values.len());

        for value in values {
            let InValue::Value(value) = value else {
                return Err(Error::invalid_condition(format!(
                    "operator '{op}' over several columns expects rows of values"
                )));
            };

            let mut row = Vec::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                let value = match value {
                    Value::Record(fields) => fields.get(*column),
                    Value::List(items) => items.get(i),
                    _ => None,
                };
                row.push(match value {
                    None | Some(Value::Null) => "NULL".to_string(),
                    Some(value) => Self::bind(params, value.clone()),
                });
            }
            rows.push(format!("({})", row.join(", ")));
        }

        let columns = columns
            .iter()
            .map(|column| self.quote(column))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("({columns}) {op} ({})", rows.join(", ")))
    }

    fn compile_like(
        &self,
        op: &str,
        like: LikeOp<'_>,
        operands: &[Operand],
        params: &mut Params,
    ) -> Result<String> {
        let (column, values, escape) = match operands {
            [column, values] => (column, values, None),
            [column, values, escape] => (column, values, Some(escape)),
            _ => return Err(operand_count(op, "two operands")),
        };

        let escape = like_escape_pairs(op, escape)?;

        let values = match values {
            Operand::Value(Value::List(items)) => items.iter().map(InValue::Value).collect(),
            Operand::Value(value) => vec![InValue::Value(value)],
            Operand::Expression(expr) => vec![InValue::Expression(expr)],
            _ => {
                return Err(Error::invalid_condition(format!(
                    "operator '{op}' expects a value or a list of values"
                )))
            }
        };

        if values.is_empty() {
            return Ok(if like.not { "" } else { "0=1" }.to_string());
        }

        let column = self.column(op, column, params)?;
        let mut parts = Vec::with_capacity(values.len());

        for value in values {
            let placeholder = match value {
                InValue::Expression(expr) => {
                    merge_params(params, &expr.sql, &expr.params)
                }
                InValue::Value(value) => {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        value => value.to_key(),
                    };
                    Self::bind(params, Value::String(like_pattern(&text, &escape)))
                }
            };
            parts.push(format!("{column} {} {placeholder}", like.operator));
        }

        Ok(parts.join(if like.or { " OR " } else { " AND " }))
    }

    fn compile_simple(&self, op: &str, operands: &[Operand], params: &mut Params) -> Result<String> {
        let [column, value] = operands else {
            return Err(operand_count(op, "two operands"));
        };

        let column = self.column(op, column, params)?;
        let value = self.value(op, value, params)?;
        Ok(format!("{column} {op} {value}"))
    }

    /// The column operand, quoted unless it already holds an expression.
    fn column(&self, op: &str, operand: &Operand, params: &mut Params) -> Result<String> {
        match operand {
            Operand::Value(Value::String(column)) => Ok(self.quote(column)),
            Operand::Expression(expr) => {
                Ok(merge_params(params, &expr.sql, &expr.params))
            }
            _ => Err(Error::invalid_condition(format!(
                "operator '{op}' expects a column name as its first operand"
            ))),
        }
    }

    /// A value operand: bound, embedded or built as a sub-query.
    fn value(&self, op: &str, operand: &Operand, params: &mut Params) -> Result<String> {
        match operand {
            Operand::Value(Value::Null) => Ok("NULL".to_string()),
            Operand::Value(value @ (Value::List(_) | Value::Record(_))) => {
                Err(Error::invalid_condition(format!(
                    "operator '{op}' expects a single value, got {value:?}"
                )))
            }
            Operand::Value(value) => Ok(Self::bind(params, value.clone())),
            Operand::Expression(expr) => {
                Ok(merge_params(params, &expr.sql, &expr.params))
            }
            Operand::Query(query) => Ok(format!(
                "({})",
                self.builder.build_with_params(query, params)?
            )),
            Operand::Condition(_) => Err(Error::invalid_condition(format!(
                "operator '{op}' cannot compare against a condition"
            ))),
        }
    }

    fn quote(&self, column: &str) -> String {
        if column.contains('(') {
            column.to_string()
        } else {
            self.builder.dialect().quote_column_name(column)
        }
    }
}

enum InValue<'a> {
    Value(&'a Value),
    Expression(&'a Expression),
}

/// The parts of a `like`-family operator such as `OR NOT ILIKE`.
#[derive(Debug, Clone, Copy)]
struct LikeOp<'a> {
    /// Join clauses with `OR` instead of `AND`.
    or: bool,
    not: bool,
    /// `LIKE`, `ILIKE`, `NOT LIKE` or `NOT ILIKE`.
    operator: &'a str,
}

impl<'a> LikeOp<'a> {
    fn parse(op: &'a str) -> Option<LikeOp<'a>> {
        let (or, rest) = if let Some(rest) = op.strip_prefix("OR ") {
            (true, rest)
        } else if let Some(rest) = op.strip_prefix("AND ") {
            (false, rest)
        } else {
            (false, op)
        };

        match rest {
            "LIKE" | "ILIKE" => Some(LikeOp {
                or,
                not: false,
                operator: rest,
            }),
            "NOT LIKE" | "NOT ILIKE" => Some(LikeOp {
                or,
                not: true,
                operator: rest,
            }),
            _ => None,
        }
    }
}

fn operand_count(op: &str, expected: &str) -> Error {
    Error::invalid_condition(format!("operator '{op}' requires {expected}"))
}
