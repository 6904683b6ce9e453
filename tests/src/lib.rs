#[macro_use]
mod macros;

mod exec_log;
pub use exec_log::{ExecLog, Statement};

mod mock_driver;
pub use mock_driver::MockDriver;

mod stub_introspector;
pub use stub_introspector::StubIntrospector;

pub mod setup;

pub use quarry::{row, stmt::Value};
