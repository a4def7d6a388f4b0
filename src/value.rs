use bigdecimal::BigDecimal;

use crate::datetime::Datetime;

/// A JSON item as seen by the path evaluator.
///
/// This is the tree the evaluator walks: the context document, every named
/// parameter and every item of a result sequence are `Value`s.
///
/// # Object model
///
/// Objects are kept as an ordered list of members rather than a map. The
/// SQL/JSON data model allows an object to bind the same key more than once,
/// and member accessors return every binding in insertion order.
///
/// # Numbers
///
/// All numbers are arbitrary-precision decimals. Arithmetic never goes
/// through binary floating point, so `0.1 + 0.2 == 0.3` holds inside a path.
/// Only a quotient with no finite decimal expansion is rounded, to the
/// 100 significant digits `bigdecimal` divides to.
///
/// # Examples
///
/// ```
/// use sqljson_path::Value;
///
/// let object = Value::Object(vec![
///     ("name".to_string(), Value::from("widget")),
///     ("price".to_string(), Value::from(12)),
/// ]);
/// assert_eq!(object.type_name(), "object");
/// assert_eq!(object.members("price").count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Exact decimal number
    Number(BigDecimal),

    /// UTF-8 string
    String(String),

    /// Array of values (homogeneous or heterogeneous)
    Array(Vec<Value>),

    /// Object as an ordered member list; keys may repeat
    Object(Vec<(String, Value)>),

    /// Datetime item produced by `.datetime()`
    Datetime(Datetime),
}

impl Value {
    /// The tag returned by the `type()` item method.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Datetime(dt) => dt.type_name(),
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<&BigDecimal> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Every value bound to `key`, in insertion order.
    ///
    /// Yields nothing for non-objects.
    pub fn members<'v>(&'v self, key: &'v str) -> impl Iterator<Item = &'v Value> + 'v {
        let members: &[(String, Value)] = match self {
            Value::Object(members) => members,
            _ => &[],
        };
        members
            .iter()
            .filter(move |(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(BigDecimal::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(BigDecimal::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(BigDecimal::from(n as u64))
    }
}

impl From<BigDecimal> for Value {
    fn from(n: BigDecimal) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Datetime> for Value {
    fn from(dt: Datetime) -> Self {
        Value::Datetime(dt)
    }
}
