/// Conversion between generic [`Value`]s and store-native [`AttributeValue`]s

use crate::error::{Error, Result};
use crate::types::{AttributeValue, TypeTag, Value};
use base64::Engine;
use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;

/// Nesting limit for valuers that return other valuers.
const MAX_VALUER_DEPTH: usize = 32;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ConvertError(pub String);

// ============================================================================
// Value -> AttributeValue
// ============================================================================

/// Converts a parameter value into a store-native attribute.
///
/// Pre-tagged attributes pass through unchanged. Custom valuers are unwrapped
/// and their result is converted again. Everything else is inferred from the
/// value's shape.
pub fn to_attribute_value(value: &Value) -> std::result::Result<AttributeValue, ConvertError> {
    convert_value(value, 0)
}

fn convert_value(value: &Value, depth: usize) -> std::result::Result<AttributeValue, ConvertError> {
    match value {
        Value::Attribute(av) => Ok(av.clone()),
        Value::Custom(valuer) => {
            if depth >= MAX_VALUER_DEPTH {
                return Err(ConvertError("custom value nests too deeply".to_string()));
            }
            let inner = valuer.to_value().map_err(ConvertError)?;
            convert_value(&inner, depth + 1)
        }
        Value::Null => Ok(AttributeValue::Null),
        Value::Bool(b) => Ok(AttributeValue::Bool(*b)),
        Value::Int(i) => Ok(AttributeValue::N(i.to_string())),
        Value::UInt(u) => Ok(AttributeValue::N(u.to_string())),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(ConvertError(format!("{} is not a valid number", f)));
            }
            Ok(AttributeValue::N(f.to_string()))
        }
        Value::String(s) => Ok(AttributeValue::S(s.clone())),
        Value::Bytes(b) => Ok(AttributeValue::B(b.clone())),
        Value::List(items) => items
            .iter()
            .map(|v| convert_value(v, depth))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(AttributeValue::L),
        Value::Map(map) => map
            .iter()
            .map(|(k, v)| convert_value(v, depth).map(|av| (k.clone(), av)))
            .collect::<std::result::Result<HashMap<_, _>, _>>()
            .map(AttributeValue::M),
        Value::Set(items) => convert_set(items, depth),
    }
}

fn convert_set(items: &[Value], depth: usize) -> std::result::Result<AttributeValue, ConvertError> {
    if items.is_empty() {
        return Err(ConvertError("sets must not be empty".to_string()));
    }

    let members = items
        .iter()
        .map(|v| convert_value(v, depth))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match members[0].type_tag() {
        TypeTag::S => members
            .into_iter()
            .map(|av| match av {
                AttributeValue::S(s) => Ok(s),
                other => Err(mixed_set(&other)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(AttributeValue::Ss),
        TypeTag::N => members
            .into_iter()
            .map(|av| match av {
                AttributeValue::N(n) => Ok(n),
                other => Err(mixed_set(&other)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(AttributeValue::Ns),
        TypeTag::B => members
            .into_iter()
            .map(|av| match av {
                AttributeValue::B(b) => Ok(b),
                other => Err(mixed_set(&other)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(AttributeValue::Bs),
        tag => Err(ConvertError(format!(
            "sets may only hold strings, numbers or binaries, found {}",
            tag
        ))),
    }
}

fn mixed_set(found: &AttributeValue) -> ConvertError {
    ConvertError(format!(
        "set members must share one type, found {}",
        found.type_tag()
    ))
}

/// Converts statement parameters, reporting failures with their 1-based ordinal.
pub fn marshal_params(statement: &str, params: &[Value]) -> Result<Vec<AttributeValue>> {
    params
        .iter()
        .enumerate()
        .map(|(i, v)| {
            to_attribute_value(v).map_err(|e| Error::Marshal {
                statement: statement.to_string(),
                position: i + 1,
                message: e.0,
            })
        })
        .collect()
}

// ============================================================================
// AttributeValue -> Value
// ============================================================================

/// Converts a store-native attribute into a generic value.
///
/// Numbers become `Int` when they are integral and fit, `UInt` for large
/// positive integers, and `Float` otherwise.
pub fn from_attribute_value(av: &AttributeValue) -> Value {
    match av {
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::B(b) => Value::Bytes(b.clone()),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null => Value::Null,
        AttributeValue::L(items) => Value::List(items.iter().map(from_attribute_value).collect()),
        AttributeValue::M(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute_value(v)))
                .collect(),
        ),
        AttributeValue::Ss(items) => {
            Value::Set(items.iter().map(|s| Value::String(s.clone())).collect())
        }
        AttributeValue::Ns(items) => Value::Set(items.iter().map(|n| parse_number(n)).collect()),
        AttributeValue::Bs(items) => Value::Set(items.iter().map(|b| Value::Bytes(b.clone())).collect()),
    }
}

fn parse_number(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(u) = n.parse::<u64>() {
        return Value::UInt(u);
    }
    match n.parse::<f64>() {
        Ok(f) => Value::Float(f),
        Err(_) => Value::String(n.to_string()),
    }
}

// ============================================================================
// JSON
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Renders a value as JSON. Binary data is base64-encoded.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::UInt(u) => serde_json::Value::from(*u),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => serde_json::Value::String(encode_bytes(b)),
        Value::List(items) | Value::Set(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(map) => serde_json::Value::Object(
            map.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect(),
        ),
        Value::Attribute(av) => value_to_json(&from_attribute_value(av)),
        Value::Custom(valuer) => valuer
            .to_value()
            .map(|v| value_to_json(&v))
            .unwrap_or(serde_json::Value::Null),
    }
}

pub fn encode_bytes(b: &Bytes) -> String {
    base64::engine::general_purpose::STANDARD.encode(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Valuer;

    #[test]
    fn test_scalar_inference() {
        assert_eq!(to_attribute_value(&Value::Null).unwrap(), AttributeValue::Null);
        assert_eq!(to_attribute_value(&Value::from(42)).unwrap(), AttributeValue::N("42".into()));
        assert_eq!(to_attribute_value(&Value::from(1.5)).unwrap(), AttributeValue::N("1.5".into()));
        assert_eq!(to_attribute_value(&Value::from("hi")).unwrap(), AttributeValue::S("hi".into()));
        assert_eq!(
            to_attribute_value(&Value::bytes(Bytes::from_static(b"\x01\x02"))).unwrap(),
            AttributeValue::B(Bytes::from_static(b"\x01\x02"))
        );
    }

    #[test]
    fn test_tagged_value_passes_through() {
        let av = AttributeValue::Ss(vec!["a".into(), "b".into()]);
        assert_eq!(to_attribute_value(&Value::Attribute(av.clone())).unwrap(), av);
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(to_attribute_value(&Value::Float(f64::NAN)).is_err());
        assert!(to_attribute_value(&Value::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_nested_containers() {
        let mut inner = HashMap::new();
        inner.insert("n".to_string(), Value::from(1));
        let value = Value::List(vec![Value::Map(inner), Value::Bool(false)]);

        match to_attribute_value(&value).unwrap() {
            AttributeValue::L(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(
                    items[0].as_map().and_then(|m| m.get("n")),
                    Some(&AttributeValue::N("1".into()))
                );
                assert_eq!(items[1], AttributeValue::Bool(false));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_sets_must_be_homogeneous_and_non_empty() {
        let nums = Value::Set(vec![Value::from(1), Value::from(2.5)]);
        assert_eq!(
            to_attribute_value(&nums).unwrap(),
            AttributeValue::Ns(vec!["1".into(), "2.5".into()])
        );

        assert!(to_attribute_value(&Value::Set(vec![])).is_err());
        assert!(to_attribute_value(&Value::Set(vec![Value::from(1), Value::from("x")])).is_err());
        assert!(to_attribute_value(&Value::Set(vec![Value::Bool(true)])).is_err());
    }

    #[derive(Debug)]
    struct Money {
        cents: i64,
    }

    impl Valuer for Money {
        fn to_value(&self) -> std::result::Result<Value, String> {
            Ok(Value::Float(self.cents as f64 / 100.0))
        }
    }

    #[derive(Debug)]
    struct Wrapped(Money);

    impl Valuer for Wrapped {
        fn to_value(&self) -> std::result::Result<Value, String> {
            Ok(Value::custom(Money { cents: self.0.cents }))
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Valuer for Broken {
        fn to_value(&self) -> std::result::Result<Value, String> {
            Err("cannot encode".to_string())
        }
    }

    #[test]
    fn test_custom_valuer_unwrapped_recursively() {
        let v = Value::custom(Wrapped(Money { cents: 1250 }));
        assert_eq!(to_attribute_value(&v).unwrap(), AttributeValue::N("12.5".into()));
    }

    #[test]
    fn test_marshal_params_reports_position() {
        let params = vec![Value::from("ok"), Value::custom(Broken)];
        match marshal_params("INSERT INTO t VALUE {'a': ?, 'b': ?}", &params) {
            Err(Error::Marshal { position, message, .. }) => {
                assert_eq!(position, 2);
                assert_eq!(message, "cannot encode");
            }
            other => panic!("expected marshal error, got {:?}", other),
        }
    }

    #[test]
    fn test_numbers_decode_to_int_or_float() {
        assert_eq!(from_attribute_value(&AttributeValue::N("7".into())), Value::Int(7));
        assert_eq!(from_attribute_value(&AttributeValue::N("7.25".into())), Value::Float(7.25));
        assert_eq!(
            from_attribute_value(&AttributeValue::N("18446744073709551615".into())),
            Value::UInt(u64::MAX)
        );
    }

    #[test]
    fn test_sets_decode_to_set_values() {
        let v = from_attribute_value(&AttributeValue::Ss(vec!["x".into()]));
        assert_eq!(v, Value::Set(vec![Value::from("x")]));
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"name": "Alice", "tags": [1, 2], "ok": true});
        let value = Value::from(json.clone());
        assert_eq!(value.as_map().and_then(|m| m.get("name")), Some(&Value::from("Alice")));
        assert_eq!(value_to_json(&value), json);

        let bytes = Value::bytes(Bytes::from_static(b"hi"));
        assert_eq!(value_to_json(&bytes), serde_json::json!("aGk="));
    }
}
