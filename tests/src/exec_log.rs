use quarry_core::{driver::ResultMode, stmt::Params};
use std::sync::{Arc, Mutex};

/// A statement as the driver received it.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
    pub mode: ResultMode,
}

/// A wrapper around the statement log that provides a clean API for tests
#[derive(Debug, Clone)]
pub struct ExecLog {
    statements: Arc<Mutex<Vec<Statement>>>,
}

impl ExecLog {
    pub(crate) fn new(statements: Arc<Mutex<Vec<Statement>>>) -> Self {
        Self { statements }
    }

    /// Get the number of executed statements
    pub fn len(&self) -> usize {
        self.statements.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.lock().unwrap().is_empty()
    }

    /// SQL of every executed statement, in order
    pub fn sql(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .map(|statement| statement.sql.clone())
            .collect()
    }

    /// Pop the oldest statement
    pub fn pop(&self) -> Statement {
        let mut statements = self.statements.lock().unwrap();
        assert!(!statements.is_empty(), "no statement was executed");
        statements.remove(0)
    }

    /// Count statements whose SQL contains `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .filter(|statement| statement.sql.contains(pattern))
            .count()
    }

    pub fn clear(&self) {
        self.statements.lock().unwrap().clear();
    }
}
