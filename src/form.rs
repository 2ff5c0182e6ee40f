//! Form field names for nested children, and decoding of submitted form
//! pairs back into the JSON shape `Params::from_json` understands.

use crate::config::NestedParamsConfig;
use crate::core::{NestError, Result};
use crate::entity::Entity;
use serde_json::{Map, Value as Json};

/// Produces `owner[assoc_attributes][<key>][field]` names.
///
/// Persisted children are keyed by id, new ones by a `new_<n>` marker.
/// Markers are zero-padded to a common width so plain string order is the
/// display order, which is the order the reconciler builds them in.
#[derive(Debug, Clone)]
pub struct FieldNamer {
    object_name: String,
    config: NestedParamsConfig,
}

impl FieldNamer {
    pub fn new(object_name: &str) -> Self {
        Self::with_config(object_name, NestedParamsConfig::default())
    }

    pub fn with_config(object_name: &str, config: NestedParamsConfig) -> Self {
        Self {
            object_name: object_name.to_string(),
            config,
        }
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// `owner[field]`
    pub fn field(&self, field: &str) -> String {
        format!("{}[{}]", self.object_name, field)
    }

    /// Namer for a one-association: `owner[assoc_attributes]`.
    pub fn for_one(&self, association: &str) -> FieldNamer {
        let name = format!(
            "{}[{}{}]",
            self.object_name, association, self.config.attributes_suffix
        );
        Self::with_config(&name, self.config.clone())
    }

    /// One namer per child of a many-association, in display order.
    pub fn for_many<E: Entity>(&self, association: &str, children: &[E]) -> Vec<FieldNamer> {
        let fresh = children.iter().filter(|c| c.is_new_record()).count();
        let width = fresh.to_string().len();
        let mut counter = 0;

        children
            .iter()
            .map(|child| {
                let key = match child.id() {
                    Some(id) => id.to_string(),
                    None => {
                        counter += 1;
                        format!("{}{:0width$}", self.config.new_record_prefix, counter, width = width)
                    }
                };
                let name = format!(
                    "{}[{}{}][{}]",
                    self.object_name, association, self.config.attributes_suffix, key
                );
                Self::with_config(&name, self.config.clone())
            })
            .collect()
    }

    /// HTML id for a field: brackets become underscores.
    pub fn dom_id(&self, field: &str) -> String {
        self.field(field)
            .replace("][", "_")
            .replace(['[', ']'], "_")
            .trim_end_matches('_')
            .to_string()
    }
}

/// Folds `name=value` form pairs into nested JSON.
///
/// `project[tasks_attributes][1][name]=Cook` becomes
/// `{"project": {"tasks_attributes": {"1": {"name": "Cook"}}}}`. Every leaf
/// stays a string; the column types cast it on assignment.
pub fn decode_fields<'a, I>(pairs: I) -> Result<Json>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut root = Map::new();
    for (name, value) in pairs {
        let path = split_field_name(name)?;
        insert_path(&mut root, name, &path, value)?;
    }
    Ok(Json::Object(root))
}

fn split_field_name(name: &str) -> Result<Vec<&str>> {
    let malformed = || NestError::InvalidParams(format!("Malformed field name '{}'", name));

    let (head, mut rest) = match name.find('[') {
        Some(pos) => name.split_at(pos),
        None => (name, ""),
    };
    if head.is_empty() {
        return Err(malformed());
    }

    let mut path = vec![head];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(malformed)?;
        let end = inner.find(']').ok_or_else(malformed)?;
        if end == 0 {
            return Err(malformed());
        }
        path.push(&inner[..end]);
        rest = &inner[end + 1..];
    }
    Ok(path)
}

fn insert_path(node: &mut Map<String, Json>, name: &str, path: &[&str], value: &str) -> Result<()> {
    let Some((segment, rest)) = path.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        node.insert(segment.to_string(), Json::String(value.to_string()));
        return Ok(());
    }
    let child = node
        .entry(segment.to_string())
        .or_insert_with(|| Json::Object(Map::new()));
    match child {
        Json::Object(map) => insert_path(map, name, rest, value),
        _ => Err(NestError::InvalidParams(format!(
            "Field '{}' nests under a plain value",
            name
        ))),
    }
}
