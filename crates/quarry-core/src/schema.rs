mod column;
pub use column::{ColumnDefault, ColumnSchema};

mod introspect;
pub use introspect::Introspect;

mod table;
pub use table::{ForeignKey, TableSchema};

mod ty;
pub use ty::{AbstractType, HostType};
