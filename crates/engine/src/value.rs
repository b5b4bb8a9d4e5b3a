//! Runtime values and their interchange-format projections.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::{EngineError, Result};

/// A value held by the interpreter.
///
/// Named lists keep their insertion order so a value round-tripped through
/// the interchange format comes back with its fields in the same order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Vector(Vec<Value>),
    List(IndexMap<String, Value>),
}

impl Value {
    /// Class name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "logical",
            Value::Int(_) => "integer",
            Value::Real(_) => "double",
            Value::Str(_) => "character",
            Value::Vector(_) => "vector",
            Value::List(_) => "list",
        }
    }

    /// Numeric view, for arithmetic and the numeric builtins.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Project into the interchange representation. Scalars stay unboxed.
    ///
    /// Non-finite reals cannot be carried by the format; under `force` they
    /// collapse to null, otherwise they are an error.
    pub fn to_json(&self, force: bool) -> Result<JsonValue> {
        match self {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Int(i) => Ok(JsonValue::Number((*i).into())),
            Value::Real(r) => match serde_json::Number::from_f64(*r) {
                Some(n) => Ok(JsonValue::Number(n)),
                None if force => Ok(JsonValue::Null),
                None => Err(EngineError::Eval(format!(
                    "{} cannot be represented in the interchange format",
                    r
                ))),
            },
            Value::Str(s) => Ok(JsonValue::String(s.clone())),
            Value::Vector(items) => {
                let converted: Result<Vec<JsonValue>> =
                    items.iter().map(|v| v.to_json(force)).collect();
                Ok(JsonValue::Array(converted?))
            }
            Value::List(entries) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json(force)?);
                }
                Ok(JsonValue::Object(map))
            }
        }
    }

    /// Build a value from an already-parsed interchange document.
    ///
    /// Whole numbers come back as integers; everything else maps
    /// structurally.
    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::Str(s.clone()),
            JsonValue::Array(items) => {
                Value::Vector(items.iter().map(Value::from_json).collect())
            }
            JsonValue::Object(map) => {
                let mut entries = IndexMap::new();
                for (key, value) in map {
                    entries.insert(key.clone(), Value::from_json(value));
                }
                Value::List(entries)
            }
        }
    }
}

/// Character coercion, as `paste` and `cat` see it.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(true) => write!(f, "TRUE"),
            Value::Bool(false) => write!(f, "FALSE"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Str(s) => write!(f, "{}", s),
            Value::Vector(items) => {
                write!(f, "c(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::List(entries) => {
                write!(f, "list(")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", key, value)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_stay_unboxed() {
        assert_eq!(Value::Int(6).to_json(true).unwrap(), json!(6));
        assert_eq!(Value::Real(4.2).to_json(true).unwrap(), json!(4.2));
        assert_eq!(
            Value::Str("ok".into()).to_json(true).unwrap(),
            json!("ok")
        );
    }

    #[test]
    fn whole_numbers_decode_as_integers() {
        assert_eq!(Value::from_json(&json!(30)), Value::Int(30));
        assert_eq!(Value::from_json(&json!(4.2)), Value::Real(4.2));
    }

    #[test]
    fn non_finite_reals_need_force() {
        assert!(Value::Real(f64::NAN).to_json(false).is_err());
        assert_eq!(Value::Real(f64::NAN).to_json(true).unwrap(), json!(null));
        assert_eq!(
            Value::Real(f64::INFINITY).to_json(true).unwrap(),
            json!(null)
        );
    }

    #[test]
    fn object_round_trip_is_lossless() {
        let doc = json!({"name": "Ann", "age": 30});
        let value = Value::from_json(&doc);
        assert_eq!(value.to_json(true).unwrap(), doc);
    }

    #[test]
    fn display_coerces_like_as_character() {
        assert_eq!(Value::Int(3349).to_string(), "3349");
        assert_eq!(Value::Real(4.2).to_string(), "4.2");
        assert_eq!(Value::Bool(true).to_string(), "TRUE");
        assert_eq!(Value::Str("John".into()).to_string(), "John");
    }
}
