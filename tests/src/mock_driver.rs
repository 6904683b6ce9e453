use crate::{ExecLog, Statement};

use async_trait::async_trait;
use quarry::{
    driver::{Response, ResultMode},
    err,
    stmt::{Params, Row, Value},
    Driver, Result,
};
use std::sync::{Arc, Mutex};

/// A driver that answers statements from canned replies and records every
/// statement it receives.
///
/// Replies are matched by substring of the SQL; the first rule that
/// matches wins. Statements nothing matches get no rows, or an affected
/// count of zero for writes.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    rules: Arc<Mutex<Vec<Rule>>>,
    statements: Arc<Mutex<Vec<Statement>>>,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    reply: Reply,
}

#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<Row>),
    Count(u64, Option<Value>),
    Fail(String),
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `pattern` with `rows`.
    pub fn on(&self, pattern: &str, rows: impl IntoIterator<Item = Row>) -> &Self {
        self.push(pattern, Reply::Rows(rows.into_iter().collect()))
    }

    /// Answer writes containing `pattern` with an affected count and an
    /// optional generated id.
    pub fn on_execute(&self, pattern: &str, affected: u64, last_insert_id: Option<Value>) -> &Self {
        self.push(pattern, Reply::Count(affected, last_insert_id))
    }

    /// Fail statements containing `pattern`.
    pub fn fail(&self, pattern: &str, message: &str) -> &Self {
        self.push(pattern, Reply::Fail(message.to_string()))
    }

    /// Get a handle to the statement log
    pub fn log(&self) -> ExecLog {
        ExecLog::new(self.statements.clone())
    }

    fn push(&self, pattern: &str, reply: Reply) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            reply,
        });
        self
    }

    fn reply(&self, sql: &str) -> Option<Reply> {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| sql.contains(&rule.pattern))
            .map(|rule| rule.reply.clone())
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn execute(&self, sql: &str, params: &Params, mode: ResultMode) -> Result<Response> {
        self.statements.lock().unwrap().push(Statement {
            sql: sql.to_string(),
            params: params.clone(),
            mode,
        });

        match (self.reply(sql), mode) {
            (Some(Reply::Fail(message)), _) => Err(err!("{message}")),
            (Some(Reply::Rows(rows)), ResultMode::One | ResultMode::Scalar) => {
                Ok(Response::rows(rows.into_iter().take(1)))
            }
            (Some(Reply::Rows(rows)), _) => Ok(Response::rows(rows)),
            (Some(Reply::Count(affected, last_insert_id)), _) => Ok(Response::Count {
                affected,
                last_insert_id,
            }),
            (None, ResultMode::Execute) => Ok(Response::count(0)),
            (None, _) => Ok(Response::rows([])),
        }
    }
}
