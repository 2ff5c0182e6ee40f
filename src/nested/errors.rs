use std::collections::BTreeMap;
use std::fmt;

/// Validation messages keyed by attribute, in insertion order per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    messages: BTreeMap<String, Vec<String>>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, message: &str) {
        self.messages
            .entry(key.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// First message registered under `key`.
    pub fn on(&self, key: &str) -> Option<&str> {
        self.messages
            .get(key)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn messages_on(&self, key: &str) -> &[String] {
        self.messages.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }

    /// Every (key, message) pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.messages.iter().flat_map(|(key, messages)| {
            messages
                .iter()
                .map(move |message| (key.as_str(), message.as_str()))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    /// Number of messages, not keys.
    pub fn len(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// "Tasks name can't be blank" style sentences.
    pub fn full_messages(&self) -> Vec<String> {
        self.iter()
            .map(|(key, message)| format!("{} {}", humanize(key), message))
            .collect()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

fn humanize(key: &str) -> String {
    let spaced = key.trim_end_matches("_id").replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
