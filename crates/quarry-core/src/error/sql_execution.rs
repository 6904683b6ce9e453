use super::{Error, ErrorKind};

/// Error reported by the driver while executing a statement.
///
/// Carries the SQL text so failures can be traced back to the statement.
/// Bound parameter values are deliberately not part of the message.
#[derive(Debug)]
pub(super) struct SqlExecutionError {
    sql: Box<str>,
    cause: Error,
}

impl SqlExecutionError {
    pub(super) fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl core::fmt::Display for SqlExecutionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "SQL execution failed: {}\nThe SQL being executed was: {}",
            self.cause, self.sql
        )
    }
}

impl Error {
    /// Creates an SQL execution error wrapping the driver's failure.
    pub fn sql_execution(sql: impl Into<String>, cause: Error) -> Error {
        Error::from(ErrorKind::SqlExecution(SqlExecutionError {
            sql: sql.into().into(),
            cause,
        }))
    }

    /// Returns `true` if this error is an SQL execution error.
    pub fn is_sql_execution(&self) -> bool {
        self.any_kind(|kind| matches!(kind, ErrorKind::SqlExecution(_)))
    }

    /// The SQL text of the failing statement, if this is an execution error.
    pub fn sql(&self) -> Option<&str> {
        self.chain().find_map(|err| match err.kind() {
            ErrorKind::SqlExecution(err) => Some(&*err.sql),
            _ => None,
        })
    }
}
