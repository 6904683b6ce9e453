use std::{fmt, str::FromStr};

use crate::Error;

/// Portable column type, independent of any SQL dialect.
///
/// Dialects resolve these through their type map when compiling DDL, and
/// introspection maps physical types back onto them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractType {
    Pk,
    BigPk,
    String,
    Text,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    DateTime,
    Timestamp,
    Time,
    Date,
    Binary,
    Boolean,
    Money,
}

/// The host-side representation a column's values are coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostType {
    Integer,
    Double,
    Boolean,
    String,
    Bytes,
}

impl AbstractType {
    pub const ALL: [AbstractType; 17] = [
        AbstractType::Pk,
        AbstractType::BigPk,
        AbstractType::String,
        AbstractType::Text,
        AbstractType::SmallInt,
        AbstractType::Integer,
        AbstractType::BigInt,
        AbstractType::Float,
        AbstractType::Double,
        AbstractType::Decimal,
        AbstractType::DateTime,
        AbstractType::Timestamp,
        AbstractType::Time,
        AbstractType::Date,
        AbstractType::Binary,
        AbstractType::Boolean,
        AbstractType::Money,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AbstractType::Pk => "pk",
            AbstractType::BigPk => "bigpk",
            AbstractType::String => "string",
            AbstractType::Text => "text",
            AbstractType::SmallInt => "smallint",
            AbstractType::Integer => "integer",
            AbstractType::BigInt => "bigint",
            AbstractType::Float => "float",
            AbstractType::Double => "double",
            AbstractType::Decimal => "decimal",
            AbstractType::DateTime => "datetime",
            AbstractType::Timestamp => "timestamp",
            AbstractType::Time => "time",
            AbstractType::Date => "date",
            AbstractType::Binary => "binary",
            AbstractType::Boolean => "boolean",
            AbstractType::Money => "money",
        }
    }

    /// The host type values of this column are typecast to.
    ///
    /// Unsigned big integers stay strings because they may not fit a signed
    /// 64-bit integer. Decimals and money stay strings to keep precision.
    pub fn host_type(self, unsigned: bool) -> HostType {
        match self {
            AbstractType::SmallInt | AbstractType::Integer | AbstractType::Pk => HostType::Integer,
            AbstractType::BigInt | AbstractType::BigPk if !unsigned => HostType::Integer,
            AbstractType::Boolean => HostType::Boolean,
            AbstractType::Float | AbstractType::Double => HostType::Double,
            AbstractType::Binary => HostType::Bytes,
            _ => HostType::String,
        }
    }

    /// Types for which an empty string is a legitimate value rather than
    /// "no value".
    pub fn keeps_empty_string(self) -> bool {
        matches!(
            self,
            AbstractType::String | AbstractType::Text | AbstractType::Binary
        )
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbstractType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AbstractType::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_configuration(format!("unknown abstract column type `{s}`")))
    }
}
