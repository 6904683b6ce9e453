pub mod active_query;
pub use active_query::ActiveQuery;

mod command;
pub use command::Command;

pub mod db;
pub use db::Db;

pub mod model;
pub use model::{ModelDef, RelationDef, Via};

mod query_ext;
pub use query_ext::QueryExt;

mod record;
pub use record::{Record, Related};

pub mod schema;

pub use quarry_core::{bail, driver, err, row, stmt, Driver, Error, Result};
pub use quarry_sql::{Dialect, Flavor, QueryBuilder};

#[cfg(feature = "mysql")]
pub use quarry_mysql::MySQL;
