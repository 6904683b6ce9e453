mod condition;
pub use condition::{Condition, Operand, OperatorCondition};

mod eval;

mod expression;
pub use expression::{normalize_param_name, Expression};

mod filter;

mod like;
pub use like::{like_escape_pairs, like_pattern, DEFAULT_LIKE_ESCAPE};

mod query;
pub use query::{
    Column, Direction, IndexBy, Join, OrderBy, Query, SelectItem, TableRef, TableSource, Union,
};

mod value;
pub use value::{Row, Value};

use indexmap::IndexMap;

/// Named parameter bindings, keyed with their leading `:`.
pub type Params = IndexMap<String, Value>;
