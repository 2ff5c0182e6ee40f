//! Nested input as the engine sees it, after boundary decoding.

pub mod json;
pub mod key;

pub use key::NestedKey;

use crate::config::NestedParamsConfig;
use crate::core::{Result, Value};
use crate::entity::Record;
use std::collections::BTreeMap;

/// Top-level params for one record are just an attribute set.
pub type Params = AttributeSet;

#[derive(Debug, Clone)]
pub enum ParamValue {
    Scalar(Value),
    Nested(AssociationInput),
}

impl ParamValue {
    pub fn is_blank(&self) -> bool {
        match self {
            ParamValue::Scalar(value) => value.is_blank(),
            ParamValue::Nested(input) => input.is_blank(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            ParamValue::Scalar(value) => Some(value),
            ParamValue::Nested(_) => None,
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<AssociationInput> for ParamValue {
    fn from(input: AssociationInput) -> Self {
        ParamValue::Nested(input)
    }
}

/// Field name -> raw value, as submitted.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    entries: BTreeMap<String, ParamValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut set = Self::new();
        for (key, value) in pairs {
            set.entries
                .insert(key.into(), ParamValue::Scalar(value.into()));
        }
        set
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries
            .insert(key.to_string(), ParamValue::Scalar(value.into()));
        self
    }

    pub fn nest(mut self, association: &str, input: AssociationInput) -> Self {
        self.entries
            .insert(association.to_string(), ParamValue::Nested(input));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn scalar(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(ParamValue::as_scalar)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every value, nested ones included, is blank.
    pub fn is_blank(&self) -> bool {
        self.entries.values().all(ParamValue::is_blank)
    }

    /// Whether any destroy flag in the set is truthy.
    pub fn destroy_requested(&self, config: &NestedParamsConfig) -> bool {
        config
            .destroy_flags
            .iter()
            .any(|flag| self.scalar(flag).is_some_and(Value::is_truthy_flag))
    }

    /// Copy without the destroy flags, which are never written to a record.
    pub fn without_flags(&self, config: &NestedParamsConfig) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(key, _)| !config.is_destroy_flag(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Incoming input for a many-association.
#[derive(Debug, Clone)]
pub enum IncomingCollection {
    /// Identity marker -> attributes; can update, build and destroy.
    Keyed(Vec<(NestedKey, AttributeSet)>),
    /// Array form; every entry builds a new child.
    Sequence(Vec<AttributeSet>),
}

impl IncomingCollection {
    /// Builds the keyed form from raw string keys.
    pub fn keyed<I, K>(association: &str, entries: I, config: &NestedParamsConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (K, AttributeSet)>,
        K: AsRef<str>,
    {
        let mut keyed = Vec::new();
        for (raw, attributes) in entries {
            keyed.push((NestedKey::parse(association, raw.as_ref(), config)?, attributes));
        }
        Ok(IncomingCollection::Keyed(keyed))
    }

    pub fn len(&self) -> usize {
        match self {
            IncomingCollection::Keyed(entries) => entries.len(),
            IncomingCollection::Sequence(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_blank(&self) -> bool {
        match self {
            IncomingCollection::Keyed(entries) => entries.iter().all(|(_, a)| a.is_blank()),
            IncomingCollection::Sequence(entries) => entries.iter().all(AttributeSet::is_blank),
        }
    }
}

/// An already-instantiated value handed to an association setter.
#[derive(Debug, Clone)]
pub enum DirectValue {
    One(Option<Record>),
    Many(Vec<Record>),
}

/// Anything that can be assigned to an association property.
#[derive(Debug, Clone)]
pub enum AssociationInput {
    /// A single attribute hash, for one-cardinality associations.
    Attributes(AttributeSet),
    /// Keyed or array form, for many-cardinality associations.
    Collection(IncomingCollection),
    /// Bypasses reconciliation and goes through the direct setter.
    Direct(DirectValue),
}

impl AssociationInput {
    pub fn is_blank(&self) -> bool {
        match self {
            AssociationInput::Attributes(attributes) => attributes.is_blank(),
            AssociationInput::Collection(collection) => collection.is_blank(),
            AssociationInput::Direct(DirectValue::One(record)) => record.is_none(),
            AssociationInput::Direct(DirectValue::Many(records)) => records.is_empty(),
        }
    }
}
