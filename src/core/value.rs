use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use crate::core::{NestError, Result};

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `Null` and whitespace-only text count as blank; `false` and `0` do not.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Form-style truthiness used for flags such as `_destroy`.
    pub fn is_truthy_flag(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i == 1,
            Self::Text(s) => matches!(s.trim(), "1" | "true" | "t"),
            _ => false,
        }
    }

    /// Converts a JSON scalar. Objects and arrays are not values.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Integer(i))
                } else {
                    n.as_f64().map(Self::Float).ok_or_else(|| {
                        NestError::TypeMismatch(format!("Number {} does not fit a FLOAT", n))
                    })
                }
            }
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            other => Err(NestError::TypeMismatch(format!(
                "Expected a scalar, got {}",
                other
            ))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Null, _) => Some(Ordering::Less),
            (_, Self::Null) => Some(Ordering::Greater),

            (Self::Integer(a), Self::Integer(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(i), Self::Float(f)) => (*i as f64).partial_cmp(f),
            (Self::Float(f), Self::Integer(i)) => f.partial_cmp(&(*i as f64)),

            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.partial_cmp(b),

            _ => None,
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            Self::Integer(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Self::Float(f) => {
                2u8.hash(state);
                f.to_bits().hash(state);
            }
            Self::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Self::Boolean(b) => {
                4u8.hash(state);
                b.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, ""),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            _ => false,
        }
    }

    /// Typecasts a raw form value into this column type.
    ///
    /// Form submissions carry everything as text, so `"123"` becomes an
    /// integer and a blank string becomes `Null` for non-text columns.
    pub fn cast(&self, value: &Value) -> Result<Value> {
        if self.is_compatible(value) {
            return Ok(match (self, value) {
                (Self::Float, Value::Integer(i)) => Value::Float(*i as f64),
                _ => value.clone(),
            });
        }

        let mismatch = || {
            NestError::TypeMismatch(format!("Cannot cast {} '{}' to {}", value.type_name(), value, self))
        };

        match (self, value) {
            (Self::Text, other) => Ok(Value::Text(other.to_string())),
            (_, Value::Text(s)) if s.trim().is_empty() => Ok(Value::Null),
            (Self::Integer, Value::Text(s)) => s.trim().parse().map(Value::Integer).map_err(|_| mismatch()),
            (Self::Float, Value::Text(s)) => s.trim().parse().map(Value::Float).map_err(|_| mismatch()),
            (Self::Boolean, Value::Text(s)) => match s.trim() {
                "1" | "true" | "t" => Ok(Value::Boolean(true)),
                "0" | "false" | "f" => Ok(Value::Boolean(false)),
                _ => Err(mismatch()),
            },
            (Self::Boolean, Value::Integer(i)) => Ok(Value::Boolean(*i != 0)),
            (Self::Integer, Value::Boolean(b)) => Ok(Value::Integer(i64::from(*b))),
            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_eq!(Value::Float(2.5), Value::Float(2.5));
        assert_ne!(Value::Integer(1), Value::Integer(2));
        assert_eq!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn test_blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::Text("".into()).is_blank());
        assert!(Value::Text("   ".into()).is_blank());
        assert!(!Value::Text("x".into()).is_blank());
        assert!(!Value::Boolean(false).is_blank());
        assert!(!Value::Integer(0).is_blank());
    }

    #[test]
    fn test_truthy_flags() {
        assert!(Value::from("1").is_truthy_flag());
        assert!(Value::from("true").is_truthy_flag());
        assert!(Value::from(true).is_truthy_flag());
        assert!(Value::from(1).is_truthy_flag());
        assert!(!Value::from("0").is_truthy_flag());
        assert!(!Value::Null.is_truthy_flag());
    }

    #[test]
    fn test_cast_form_strings() {
        assert_eq!(DataType::Integer.cast(&"123".into()).unwrap(), Value::Integer(123));
        assert_eq!(DataType::Integer.cast(&"".into()).unwrap(), Value::Null);
        assert_eq!(DataType::Boolean.cast(&"1".into()).unwrap(), Value::Boolean(true));
        assert_eq!(DataType::Text.cast(&Value::Integer(7)).unwrap(), Value::from("7"));
        assert!(DataType::Integer.cast(&"abc".into()).is_err());
    }

    #[test]
    fn test_json_scalars() {
        let json = serde_json::json!({"n": 3, "s": "x", "b": true, "z": null});
        assert_eq!(Value::from_json(&json["n"]).unwrap(), Value::Integer(3));
        assert_eq!(Value::from_json(&json["s"]).unwrap(), Value::from("x"));
        assert_eq!(Value::from_json(&json["b"]).unwrap(), Value::Boolean(true));
        assert!(Value::from_json(&json["z"]).unwrap().is_null());
        assert!(Value::from_json(&json).is_err());
    }
}
