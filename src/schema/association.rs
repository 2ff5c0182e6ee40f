use super::ModelSchema;
use crate::params::AttributeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::One => write!(f, "has_one"),
            Cardinality::Many => write!(f, "has_many"),
        }
    }
}

pub type RejectIf = Arc<dyn Fn(&AttributeSet) -> bool + Send + Sync>;

/// Policy attached to one parent -> child relationship.
///
/// This is everything the reconciler, the aggregator and the autosave
/// coordinator need to know; none of them look at the child model itself.
#[derive(Clone)]
pub struct ChildCollectionSpec {
    pub name: String,
    pub cardinality: Cardinality,
    /// Column on the child that points back at the owner.
    pub foreign_key: Option<String>,
    pub nested_params: bool,
    pub autosave: bool,
    pub destroy_missing: bool,
    pub reject_empty: bool,
    /// Honour `_destroy` on existing entries.
    pub allow_destroy: bool,
    pub reject_if: Option<RejectIf>,
    /// Destroying the owner destroys the children first.
    pub dependent_destroy: bool,
}

impl ChildCollectionSpec {
    pub fn new(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            cardinality,
            foreign_key: None,
            nested_params: false,
            autosave: false,
            destroy_missing: false,
            reject_empty: false,
            allow_destroy: false,
            reject_if: None,
            dependent_destroy: false,
        }
    }

    pub fn many(name: impl Into<String>) -> Self {
        Self::new(name, Cardinality::Many)
    }

    pub fn one(name: impl Into<String>) -> Self {
        Self::new(name, Cardinality::One)
    }

    /// Accept attribute hashes for this association. Implies autosave.
    pub fn nested_params(mut self) -> Self {
        self.nested_params = true;
        self.autosave = true;
        self
    }

    pub fn autosave(mut self) -> Self {
        self.autosave = true;
        self
    }

    pub fn destroy_missing(mut self) -> Self {
        self.destroy_missing = true;
        self
    }

    pub fn reject_empty(mut self) -> Self {
        self.reject_empty = true;
        self
    }

    pub fn allow_destroy(mut self) -> Self {
        self.allow_destroy = true;
        self
    }

    pub fn reject_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&AttributeSet) -> bool + Send + Sync + 'static,
    {
        self.reject_if = Some(Arc::new(predicate));
        self
    }

    pub fn dependent_destroy(mut self) -> Self {
        self.dependent_destroy = true;
        self
    }

    pub fn foreign_key(mut self, column: &str) -> Self {
        self.foreign_key = Some(column.to_string());
        self
    }

    /// Whether a new-record entry must be dropped before building.
    pub fn rejects(&self, attributes: &AttributeSet) -> bool {
        (self.reject_empty && attributes.is_blank())
            || self.reject_if.as_ref().is_some_and(|reject| reject(attributes))
    }
}

impl fmt::Debug for ChildCollectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildCollectionSpec")
            .field("name", &self.name)
            .field("cardinality", &self.cardinality)
            .field("foreign_key", &self.foreign_key)
            .field("nested_params", &self.nested_params)
            .field("autosave", &self.autosave)
            .field("destroy_missing", &self.destroy_missing)
            .field("reject_empty", &self.reject_empty)
            .field("allow_destroy", &self.allow_destroy)
            .field("reject_if", &self.reject_if.is_some())
            .field("dependent_destroy", &self.dependent_destroy)
            .finish()
    }
}

/// A relationship descriptor: the policy plus the child model it builds.
#[derive(Debug, Clone)]
pub struct AssociationSchema {
    pub spec: ChildCollectionSpec,
    pub model: Arc<ModelSchema>,
}

impl AssociationSchema {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}
