use super::{DataType, NestError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Field name to value, ordered so dumps and comparisons are deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// Identity of a persisted record. Unset until the first insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = NestError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(RecordId)
            .map_err(|_| NestError::TypeMismatch(format!("'{}' is not a record id", s)))
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId(id)
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::Integer(id.0)
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn cast(&self, value: &Value) -> Result<Value> {
        self.data_type.cast(value).map_err(|err| match err {
            NestError::TypeMismatch(msg) => {
                NestError::TypeMismatch(format!("Column '{}': {}", self.name, msg))
            }
            other => other,
        })
    }
}
