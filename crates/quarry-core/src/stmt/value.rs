use indexmap::IndexMap;

use std::cmp::Ordering;

/// A row as returned by the driver: column name to value, in column order.
pub type Row = IndexMap<String, Value>;

#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 64-bit integer
    I64(i64),

    /// Unsigned 64-bit integer
    U64(u64),

    /// Double precision float
    F64(f64),

    /// String value
    String(String),

    /// Raw bytes
    Bytes(Vec<u8>),

    /// A list of values
    List(Vec<Value>),

    /// A mapping of names to values, e.g. one row of a composite key
    Record(Row),
}

impl Value {
    pub const fn null() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn list_from_vec(items: Vec<Self>) -> Self {
        Self::List(items)
    }

    pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Row> {
        match self {
            Self::Record(row) => Some(row),
            _ => None,
        }
    }

    /// Integer view of the value, parsing strings the way a driver row
    /// returns numeric columns as text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            Self::U64(v) => i64::try_from(*v).ok(),
            Self::F64(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Bool(v) => Some(*v as i64),
            Self::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::I64(v) => Some(*v as f64),
            Self::U64(v) => Some(*v as f64),
            Self::F64(v) => Some(*v),
            Self::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Self::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// True for null, empty or whitespace-only strings and empty lists.
    ///
    /// This is the emptiness test used by `filter_where`.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Record(row) => row.is_empty(),
            _ => false,
        }
    }

    /// Canonical string key for the value.
    ///
    /// Scalars that compare equal loosely produce the same key (`1`, `1u64`,
    /// `1.0` and `"1"` all become `1`). Lists and records become a bracketed
    /// tuple of their member keys, so composite keys compare by full tuple.
    pub fn to_key(&self) -> String {
        let mut dst = String::new();
        self.write_key(&mut dst);
        dst
    }

    fn write_key(&self, dst: &mut String) {
        match self {
            Self::Null => {}
            Self::Bool(v) => dst.push_str(if *v { "1" } else { "0" }),
            Self::I64(v) => dst.push_str(&v.to_string()),
            Self::U64(v) => dst.push_str(&v.to_string()),
            Self::F64(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                    dst.push_str(&(*v as i64).to_string())
                } else {
                    dst.push_str(&v.to_string())
                }
            }
            Self::String(v) => dst.push_str(v),
            Self::Bytes(v) => dst.push_str(&String::from_utf8_lossy(v)),
            Self::List(items) => write_tuple_key(items.iter(), dst),
            Self::Record(row) => write_tuple_key(row.values(), dst),
        }
    }

    /// Equality the way a dynamically typed row compares: numbers compare
    /// numerically across representations and numeric strings match numbers.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.loose_eq(b))
            }
            (Self::Record(a), Self::Record(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|o| v.loose_eq(o)).unwrap_or(false))
            }
            (Self::String(a), Self::String(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => self == other,
            },
        }
    }

    /// Ordering used by local comparison operators. Returns `None` when the
    /// values are not comparable (e.g. null or a list).
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => {
                match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                    (Ok(a), Ok(b)) => a.partial_cmp(&b),
                    _ => Some(a.cmp(b)),
                }
            }
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::List(_) | Self::Record(_), _) | (_, Self::List(_) | Self::Record(_)) => None,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

fn write_tuple_key<'a>(items: impl Iterator<Item = &'a Value>, dst: &mut String) {
    dst.push('(');
    for (i, item) in items.enumerate() {
        if i > 0 {
            dst.push(',');
        }
        // Strings are length-prefixed so `("a,b")` and `("a","b")` differ
        match item {
            Value::String(s) => {
                dst.push_str(&s.len().to_string());
                dst.push(':');
                dst.push_str(s);
            }
            _ => item.write_key(dst),
        }
    }
    dst.push(')');
}

impl From<bool> for Value {
    fn from(src: bool) -> Self {
        Self::Bool(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Self {
        Self::I64(src.into())
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Self {
        Self::I64(src)
    }
}

impl From<u32> for Value {
    fn from(src: u32) -> Self {
        Self::U64(src.into())
    }
}

impl From<u64> for Value {
    fn from(src: u64) -> Self {
        Self::U64(src)
    }
}

impl From<usize> for Value {
    fn from(src: usize) -> Self {
        Self::U64(src as u64)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Self {
        Self::F64(src)
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Self {
        Self::String(src.to_string())
    }
}

impl From<String> for Value {
    fn from(src: String) -> Self {
        Self::String(src)
    }
}

impl From<&String> for Value {
    fn from(src: &String) -> Self {
        Self::String(src.clone())
    }
}

impl From<Row> for Value {
    fn from(src: Row) -> Self {
        Self::Record(src)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(src: Vec<T>) -> Self {
        Self::List(src.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(src: [T; N]) -> Self {
        Self::List(src.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(src: Option<T>) -> Self {
        match src {
            Some(value) => value.into(),
            None => Self::Null,
        }
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Value::I64(val) if val == other)
    }
}

impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        *self == i64::from(*other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Value::String(val) if val == other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Value::Bool(val) if val == other)
    }
}

/// Build a [`Row`] from `name => value` pairs.
#[macro_export]
macro_rules! row {
    () => { $crate::stmt::Row::new() };
    ( $( $name:expr => $value:expr ),+ $(,)? ) => {{
        let mut row = $crate::stmt::Row::new();
        $( row.insert(::std::string::String::from($name), $crate::stmt::Value::from($value)); )+
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_keys_collide_across_representations() {
        assert_eq!(Value::I64(1).to_key(), Value::from("1").to_key());
        assert_eq!(Value::U64(1).to_key(), Value::F64(1.0).to_key());
        assert_ne!(Value::I64(1).to_key(), Value::I64(10).to_key());
    }

    #[test]
    fn composite_keys_compare_by_full_tuple() {
        let a = Value::from(vec![Value::from(1), Value::from("a,b")]);
        let b = Value::from(vec![Value::from(1), Value::from("a"), Value::from("b")]);
        assert_ne!(a.to_key(), b.to_key());

        let c = Value::record([("order_id", 1), ("item_id", 2)]);
        let d = Value::from(vec![1, 2]);
        assert_eq!(c.to_key(), d.to_key());
    }

    #[test]
    fn loose_eq_numbers_and_strings() {
        assert!(Value::I64(3).loose_eq(&Value::from("3")));
        assert!(Value::F64(3.0).loose_eq(&Value::U64(3)));
        assert!(!Value::Null.loose_eq(&Value::I64(0)));
        assert!(!Value::from("abc").loose_eq(&Value::from("ABC")));
    }

    #[test]
    fn loose_cmp_orders_numeric_strings_numerically() {
        assert_eq!(
            Value::from("10").loose_cmp(&Value::from("9")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::I64(2).loose_cmp(&Value::F64(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Null.loose_cmp(&Value::I64(1)), None);
    }

    #[test]
    fn emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("  ").is_empty());
        assert!(Value::from(Vec::<i64>::new()).is_empty());
        assert!(!Value::I64(0).is_empty());
        assert!(!Value::Bool(false).is_empty());
    }

    #[test]
    fn row_macro_preserves_order() {
        let row = row! { "b" => 2, "a" => 1 };
        let names: Vec<_> = row.keys().cloned().collect();
        assert_eq!(names, ["b", "a"]);
    }
}
