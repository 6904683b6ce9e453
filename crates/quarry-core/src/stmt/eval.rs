use super::{
    like::like_matches, like_escape_pairs, like_pattern, Condition, Operand, OperatorCondition,
    Row, Value,
};
use crate::{Error, Result};

use std::cmp::Ordering;

impl Condition {
    /// Evaluate the condition against an in-memory row.
    ///
    /// Mirrors the SQL compiler's dispatch, including the empty-list policy:
    /// an empty `in`/`like` never matches, an empty `not in`/`not like`
    /// always matches. Sub-queries, raw SQL and expressions cannot be
    /// evaluated without a database and fail with an unsupported feature
    /// error.
    pub fn matches(&self, row: &Row) -> Result<bool> {
        match self {
            Condition::Hash(columns) => {
                for (column, operand) in columns {
                    if !eval_hash_entry(row, column, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Operator(cond) => cond.matches(row),
            Condition::Raw { .. } => Err(Error::unsupported_feature(
                "raw SQL conditions are not supported in local evaluation",
            )),
            Condition::Expression(expr) => Err(Error::unsupported_feature(format!(
                "expression `{}` is not supported in local evaluation",
                expr.sql
            ))),
            Condition::SubQuery(_) => Err(Error::unsupported_feature(
                "sub-queries are not supported in local evaluation",
            )),
        }
    }
}

impl OperatorCondition {
    fn matches(&self, row: &Row) -> Result<bool> {
        let op = self.normalized_op();

        match op.as_str() {
            "AND" => {
                for operand in &self.operands {
                    if !eval_nested(row, &op, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            "OR" => {
                for operand in &self.operands {
                    if eval_nested(row, &op, operand)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            "NOT" => {
                let [operand] = &self.operands[..] else {
                    return Err(operand_count(&op, "exactly one operand"));
                };
                Ok(!eval_nested(row, &op, operand)?)
            }
            "BETWEEN" | "NOT BETWEEN" => {
                let [column, low, high] = &self.operands[..] else {
                    return Err(operand_count(&op, "three operands"));
                };
                let value = row_value(row, column_name(&op, column)?);
                let low = local_value(&op, low)?;
                let high = local_value(&op, high)?;

                let inside = matches!(
                    value.loose_cmp(low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    value.loose_cmp(high),
                    Some(Ordering::Less | Ordering::Equal)
                );

                Ok(if op == "BETWEEN" { inside } else { !value.is_null() && !inside })
            }
            "IN" | "NOT IN" => {
                let [column, values] = &self.operands[..] else {
                    return Err(operand_count(&op, "two operands"));
                };
                let found = eval_in(row, &op, column, values)?;
                Ok(if op == "IN" {
                    found
                } else {
                    !found && !is_null_column(row, column)
                })
            }
            "LIKE" | "NOT LIKE" | "OR LIKE" | "OR NOT LIKE" => eval_like(row, &op, &self.operands),
            "EXISTS" | "NOT EXISTS" => Err(Error::unsupported_feature(format!(
                "operator '{op}' requires a sub-query and is not supported in local evaluation"
            ))),
            "=" | "<>" | "!=" | ">" | ">=" | "<" | "<=" => {
                let [column, value] = &self.operands[..] else {
                    return Err(operand_count(&op, "two operands"));
                };
                let lhs = row_value(row, column_name(&op, column)?);
                let rhs = local_value(&op, value)?;
                Ok(compare(&op, lhs, rhs))
            }
            _ => match op.strip_prefix("NOT ") {
                Some(inner) => {
                    let cond = OperatorCondition {
                        op: inner.to_string(),
                        operands: self.operands.clone(),
                    };
                    // NOT of an unknown result is still unknown
                    match self.operands.first() {
                        Some(column) if is_null_column(row, column) => Ok(false),
                        _ => Ok(!cond.matches(row)?),
                    }
                }
                None => Err(Error::unsupported_feature(format!(
                    "operator '{op}' is not supported in local evaluation"
                ))),
            },
        }
    }
}

fn eval_hash_entry(row: &Row, column: &str, operand: &Operand) -> Result<bool> {
    let actual = row_value(row, column);

    match operand {
        Operand::Value(Value::Null) => Ok(actual.is_null()),
        Operand::Value(Value::List(items)) => Ok(items.iter().any(|item| actual.loose_eq(item))),
        Operand::Value(expected) => Ok(actual.loose_eq(expected)),
        Operand::Expression(expr) => Err(Error::unsupported_feature(format!(
            "expression `{}` for column `{column}` is not supported in local evaluation",
            expr.sql
        ))),
        Operand::Query(_) => Err(Error::unsupported_feature(format!(
            "sub-query for column `{column}` is not supported in local evaluation"
        ))),
        Operand::Condition(_) => Err(Error::invalid_condition(format!(
            "hash condition value for column `{column}` cannot be a condition"
        ))),
    }
}

fn eval_nested(row: &Row, op: &str, operand: &Operand) -> Result<bool> {
    match operand {
        Operand::Condition(cond) => cond.matches(row),
        Operand::Value(Value::String(_)) => Err(Error::unsupported_feature(format!(
            "raw SQL operand of '{op}' is not supported in local evaluation"
        ))),
        _ => Err(Error::invalid_condition(format!(
            "operator '{op}' expects conditions as operands"
        ))),
    }
}

fn eval_in(row: &Row, op: &str, column: &Operand, values: &Operand) -> Result<bool> {
    let values = match values {
        Operand::Value(Value::List(items)) => items.clone(),
        Operand::Value(value) => vec![value.clone()],
        Operand::Query(_) => {
            return Err(Error::unsupported_feature(format!(
                "sub-query operand of '{op}' is not supported in local evaluation"
            )))
        }
        Operand::Expression(expr) => {
            return Err(Error::unsupported_feature(format!(
                "expression `{}` in '{op}' is not supported in local evaluation",
                expr.sql
            )))
        }
        Operand::Condition(_) => {
            return Err(Error::invalid_condition(format!(
                "operator '{op}' cannot take a condition as its value list"
            )))
        }
    };

    match column {
        Operand::Value(Value::List(columns)) => {
            let columns = columns
                .iter()
                .map(|c| {
                    c.as_str().ok_or_else(|| {
                        Error::invalid_condition(format!("operator '{op}' expects column names"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(values.iter().any(|candidate| {
                columns.iter().enumerate().all(|(i, column)| {
                    let expected = match candidate {
                        Value::Record(fields) => fields.get(*column).unwrap_or(&Value::Null),
                        Value::List(items) => items.get(i).unwrap_or(&Value::Null),
                        other => other,
                    };
                    row_value(row, column).loose_eq(expected)
                })
            }))
        }
        _ => {
            let column = column_name(op, column)?;
            let actual = row_value(row, column);
            Ok(values.iter().any(|candidate| {
                let expected = match candidate {
                    Value::Record(fields) => fields.get(column).unwrap_or(&Value::Null),
                    other => other,
                };
                actual.loose_eq(expected)
            }))
        }
    }
}

fn eval_like(row: &Row, op: &str, operands: &[Operand]) -> Result<bool> {
    let (column, values, escape) = match operands {
        [column, values] => (column, values, None),
        [column, values, escape] => (column, values, Some(escape)),
        _ => return Err(operand_count(op, "two operands")),
    };

    let negate = op.contains("NOT");
    let any = op.starts_with("OR");
    let escape = like_escape_pairs(op, escape)?;

    let patterns = match values {
        Operand::Value(Value::List(items)) => items.clone(),
        Operand::Value(value) => vec![value.clone()],
        Operand::Expression(expr) => {
            return Err(Error::unsupported_feature(format!(
                "expression `{}` in '{op}' is not supported in local evaluation",
                expr.sql
            )))
        }
        _ => return Err(Error::invalid_condition(format!("invalid value for '{op}'"))),
    };

    if patterns.is_empty() {
        return Ok(negate);
    }

    let haystack = match row_value(row, column_name(op, column)?) {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_key()),
    };

    let mut results = patterns.iter().map(|pattern| {
        let text = match pattern {
            Value::String(s) => s.clone(),
            value => value.to_key(),
        };
        let pattern = like_pattern(&text, &escape);
        match &haystack {
            // NULL LIKE x and NULL NOT LIKE x are both false in SQL
            None => false,
            Some(haystack) => like_matches(&pattern, haystack) != negate,
        }
    });

    Ok(if any {
        results.any(|r| r)
    } else {
        results.all(|r| r)
    })
}

fn compare(op: &str, lhs: &Value, rhs: &Value) -> bool {
    match op {
        "=" => lhs.loose_eq(rhs),
        "<>" | "!=" => !lhs.is_null() && !rhs.is_null() && !lhs.loose_eq(rhs),
        _ => match lhs.loose_cmp(rhs) {
            Some(ordering) => match op {
                ">" => ordering == Ordering::Greater,
                ">=" => ordering != Ordering::Less,
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                _ => false,
            },
            None => false,
        },
    }
}

fn is_null_column(row: &Row, column: &Operand) -> bool {
    match column {
        Operand::Value(Value::String(column)) => row_value(row, column).is_null(),
        _ => false,
    }
}

fn row_value<'a>(row: &'a Row, column: &str) -> &'a Value {
    static NULL: Value = Value::Null;

    row.get(column)
        .or_else(|| {
            // Qualified names (`t.col`) fall back to the bare column
            column
                .rsplit_once('.')
                .and_then(|(_, bare)| row.get(bare))
        })
        .unwrap_or(&NULL)
}

fn column_name<'a>(op: &str, operand: &'a Operand) -> Result<&'a str> {
    match operand {
        Operand::Value(Value::String(column)) => Ok(column),
        Operand::Expression(expr) => Err(Error::unsupported_feature(format!(
            "expression `{}` as the column of '{op}' is not supported in local evaluation",
            expr.sql
        ))),
        _ => Err(Error::invalid_condition(format!(
            "operator '{op}' expects a column name as its first operand"
        ))),
    }
}

fn local_value<'a>(op: &str, operand: &'a Operand) -> Result<&'a Value> {
    match operand {
        Operand::Value(value) => Ok(value),
        Operand::Expression(expr) => Err(Error::unsupported_feature(format!(
            "expression `{}` in '{op}' is not supported in local evaluation",
            expr.sql
        ))),
        Operand::Query(_) => Err(Error::unsupported_feature(format!(
            "sub-query in '{op}' is not supported in local evaluation"
        ))),
        Operand::Condition(_) => Err(Error::invalid_condition(format!(
            "operator '{op}' cannot compare against a condition"
        ))),
    }
}

fn operand_count(op: &str, expected: &str) -> Error {
    Error::invalid_condition(format!("operator '{op}' requires {expected}"))
}
