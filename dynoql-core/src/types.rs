use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Store-native tagged value, as sent to and received from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// Number (kept as string for precision)
    N(String),
    /// String
    S(String),
    /// Binary
    B(Bytes),
    /// Boolean
    Bool(bool),
    /// Null
    Null,
    /// List
    L(Vec<AttributeValue>),
    /// Map
    M(HashMap<String, AttributeValue>),
    /// String set
    Ss(Vec<String>),
    /// Number set
    Ns(Vec<String>),
    /// Binary set
    Bs(Vec<Bytes>),
}

impl AttributeValue {
    pub fn string(s: impl Into<String>) -> Self {
        AttributeValue::S(s.into())
    }

    pub fn number(n: impl ToString) -> Self {
        AttributeValue::N(n.to_string())
    }

    pub fn binary(b: impl Into<Bytes>) -> Self {
        AttributeValue::B(b.into())
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            AttributeValue::M(m) => Some(m),
            _ => None,
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        TypeTag::of(self)
    }
}

/// Item - a map of attribute names to store-native values
pub type Item = HashMap<String, AttributeValue>;

/// Short type name the store uses for each attribute kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    B,
    Bool,
    Bs,
    L,
    M,
    N,
    Ns,
    Null,
    S,
    Ss,
}

impl TypeTag {
    pub fn of(value: &AttributeValue) -> TypeTag {
        match value {
            AttributeValue::B(_) => TypeTag::B,
            AttributeValue::Bool(_) => TypeTag::Bool,
            AttributeValue::Bs(_) => TypeTag::Bs,
            AttributeValue::L(_) => TypeTag::L,
            AttributeValue::M(_) => TypeTag::M,
            AttributeValue::N(_) => TypeTag::N,
            AttributeValue::Ns(_) => TypeTag::Ns,
            AttributeValue::Null => TypeTag::Null,
            AttributeValue::S(_) => TypeTag::S,
            AttributeValue::Ss(_) => TypeTag::Ss,
        }
    }

    /// Like [`TypeTag::of`] for an optional value; an absent value has no tag.
    pub fn of_opt(value: Option<&AttributeValue>) -> Option<TypeTag> {
        value.map(TypeTag::of)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::B => "B",
            TypeTag::Bool => "BOOL",
            TypeTag::Bs => "BS",
            TypeTag::L => "L",
            TypeTag::M => "M",
            TypeTag::N => "N",
            TypeTag::Ns => "NS",
            TypeTag::Null => "NULL",
            TypeTag::S => "S",
            TypeTag::Ss => "SS",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-defined type that knows how to turn itself into a [`Value`].
///
/// The converter calls `to_value` and converts the result again, so a
/// valuer may return another `Value::Custom`.
pub trait Valuer: fmt::Debug + Send + Sync {
    fn to_value(&self) -> std::result::Result<Value, String>;
}

/// Generic host value used for statement parameters and result rows.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Bytes),
    List(Vec<Value>),
    /// Unordered collection of scalars, sent as a string/number/binary set
    Set(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Pre-tagged store value, sent as-is
    Attribute(AttributeValue),
    Custom(Arc<dyn Valuer>),
}

/// Coarse classification of a [`Value`], used for result column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    List,
    Set,
    Map,
    Attribute,
    Custom,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn bytes(b: impl Into<Bytes>) -> Self {
        Value::Bytes(b.into())
    }

    pub fn custom(v: impl Valuer + 'static) -> Self {
        Value::Custom(Arc::new(v))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) | Value::UInt(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::List(_) => ValueKind::List,
            Value::Set(_) => ValueKind::Set,
            Value::Map(_) => ValueKind::Map,
            Value::Attribute(_) => ValueKind::Attribute,
            Value::Custom(_) => ValueKind::Custom,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) | Value::Set(l) => Some(l),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Int(a), Value::UInt(b)) | (Value::UInt(b), Value::Int(a)) => {
                u64::try_from(*a).map(|a| a == *b).unwrap_or(false)
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Attribute(a), Value::Attribute(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::UInt(u as u64)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(m: HashMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl From<AttributeValue> for Value {
    fn from(av: AttributeValue) -> Self {
        Value::Attribute(av)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
