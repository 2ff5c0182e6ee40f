use crate::config::NestedParamsConfig;
use crate::core::{NestError, RecordId, Result};
use std::fmt;

/// Key of one entry in a keyed child collection.
///
/// Parsed once at the boundary; nothing downstream looks at the raw string
/// again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NestedKey {
    /// Identity of a child that is already persisted.
    Existing(RecordId),
    /// Synthetic marker for a child to build, prefix included.
    New(String),
}

impl NestedKey {
    pub fn parse(association: &str, raw: &str, config: &NestedParamsConfig) -> Result<Self> {
        let raw = raw.trim();
        if raw.starts_with(config.new_record_prefix.as_str()) {
            return Ok(NestedKey::New(raw.to_string()));
        }
        raw.parse::<RecordId>()
            .map(NestedKey::Existing)
            .map_err(|_| NestError::MalformedKey {
                association: association.to_string(),
                key: raw.to_string(),
            })
    }

    pub fn is_new(&self) -> bool {
        matches!(self, NestedKey::New(_))
    }

    pub fn existing_id(&self) -> Option<RecordId> {
        match self {
            NestedKey::Existing(id) => Some(*id),
            NestedKey::New(_) => None,
        }
    }
}

impl From<RecordId> for NestedKey {
    fn from(id: RecordId) -> Self {
        NestedKey::Existing(id)
    }
}

impl fmt::Display for NestedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NestedKey::Existing(id) => write!(f, "{}", id),
            NestedKey::New(marker) => write!(f, "{}", marker),
        }
    }
}
