mod response;
pub use response::{ResultMode, Response};

use crate::{async_trait, stmt::Params, Result};

use std::fmt::Debug;

/// Executes SQL against a database.
///
/// The driver receives fully compiled SQL with `:name` placeholders and the
/// matching bindings. It does not quote, rewrite or cache anything.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    async fn execute(&self, sql: &str, params: &Params, mode: ResultMode) -> Result<Response>;
}
