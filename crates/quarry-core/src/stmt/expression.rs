use super::{Params, Value};

use std::fmt;

/// A verbatim SQL fragment.
///
/// Expressions are embedded into the generated SQL as-is: they are never
/// quoted, escaped or bound as a parameter. Any parameters the fragment
/// references travel with it and are merged into the statement's bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub sql: String,
    pub params: Params,
}

impl Expression {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::new(),
        }
    }

    pub fn with_params<K, V>(sql: impl Into<String>, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            sql: sql.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (normalize_param_name(k.into()), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Parameter names are stored with their leading `:`, the way they appear in
/// the SQL text.
pub fn normalize_param_name(name: String) -> String {
    if name.starts_with(':') {
        name
    } else {
        format!(":{name}")
    }
}
