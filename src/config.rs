use serde::{Deserialize, Serialize};

/// Conventions shared by the params decoder, the reconciler and the field namer
///
/// Defaults follow the Rails form conventions the params were designed around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedParamsConfig {
    /// Prefix that marks a keyed entry as a not-yet-persisted child
    pub new_record_prefix: String,

    /// Suffix accepted on association keys (`tasks_attributes`)
    pub attributes_suffix: String,

    /// Keys whose truthy value asks for an existing child to be destroyed
    pub destroy_flags: Vec<String>,

    /// Attributes never written by mass assignment
    pub protected_attributes: Vec<String>,
}

impl Default for NestedParamsConfig {
    fn default() -> Self {
        Self {
            new_record_prefix: "new_".to_string(),
            attributes_suffix: "_attributes".to_string(),
            destroy_flags: vec!["_destroy".to_string(), "_delete".to_string()],
            protected_attributes: vec!["id".to_string()],
        }
    }
}

impl NestedParamsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the new-record marker prefix
    pub fn new_record_prefix(mut self, prefix: &str) -> Self {
        self.new_record_prefix = prefix.to_string();
        self
    }

    /// Set the association key suffix
    pub fn attributes_suffix(mut self, suffix: &str) -> Self {
        self.attributes_suffix = suffix.to_string();
        self
    }

    /// Add an attribute that mass assignment must skip
    pub fn protect(mut self, attribute: &str) -> Self {
        if !self.is_protected(attribute) {
            self.protected_attributes.push(attribute.to_string());
        }
        self
    }

    /// Parse from a JSON document; missing keys keep their defaults
    pub fn from_json(json: &str) -> crate::core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_protected(&self, attribute: &str) -> bool {
        self.protected_attributes.iter().any(|a| a == attribute)
    }

    pub fn is_destroy_flag(&self, key: &str) -> bool {
        self.destroy_flags.iter().any(|f| f == key)
    }

    /// Strips the attributes suffix from an association key, if present
    pub fn association_name<'a>(&self, key: &'a str) -> &'a str {
        key.strip_suffix(self.attributes_suffix.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(key)
    }
}
