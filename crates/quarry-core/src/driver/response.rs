use crate::{
    stmt::{Row, Value},
    Error, Result,
};

/// What the caller wants back from a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// Every row.
    All,

    /// The first row only.
    One,

    /// The first column of the first row.
    Scalar,

    /// The first column of every row.
    Column,

    /// No rows: a write or DDL statement.
    Execute,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Rows produced by a query.
    Rows(Vec<Row>),

    /// Outcome of a statement that does not produce rows.
    Count {
        affected: u64,
        last_insert_id: Option<Value>,
    },
}

impl Response {
    pub fn rows(rows: impl IntoIterator<Item = Row>) -> Response {
        Response::Rows(rows.into_iter().collect())
    }

    pub fn count(affected: u64) -> Response {
        Response::Count {
            affected,
            last_insert_id: None,
        }
    }

    pub fn into_rows(self) -> Result<Vec<Row>> {
        match self {
            Response::Rows(rows) => Ok(rows),
            Response::Count { .. } => Err(Error::from_args(format_args!(
                "expected rows from the driver, got an affected-row count"
            ))),
        }
    }

    pub fn into_count(self) -> Result<u64> {
        match self {
            Response::Count { affected, .. } => Ok(affected),
            Response::Rows(rows) => Ok(rows.len() as u64),
        }
    }

    pub fn last_insert_id(&self) -> Option<&Value> {
        match self {
            Response::Count { last_insert_id, .. } => last_insert_id.as_ref(),
            Response::Rows(_) => None,
        }
    }
}
