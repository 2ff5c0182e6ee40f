//! The capability set the nested-attributes engine is generic over.

pub mod record;

pub use record::Record;

use crate::config::NestedParamsConfig;
use crate::core::{Attributes, RecordId, Result, Value};
use crate::nested::Errors;
use crate::params::AttributeSet;
use crate::session::Session;
use async_trait::async_trait;
use std::fmt;

/// Core trait for records the engine can reconcile, validate and persist.
///
/// `Clone` is how a failed save restores the pre-save in-memory graph.
#[async_trait]
pub trait Entity: Clone + fmt::Debug + Send + Sync {
    /// Identity, unset until the first successful insert.
    fn id(&self) -> Option<RecordId>;

    fn is_new_record(&self) -> bool {
        self.id().is_none()
    }

    /// Stored attribute values; `id` is not among them.
    fn attributes(&self) -> &Attributes;

    /// `Value::Null` for attributes that were never set.
    fn read_attribute(&self, name: &str) -> Value;

    fn write_attribute(&mut self, name: &str, value: Value) -> Result<()>;

    /// Mass assignment, nested association input included.
    fn assign_attributes(&mut self, attributes: &AttributeSet, config: &NestedParamsConfig) -> Result<()>;

    /// Runs validations, children included, and stores the outcome in `errors`.
    fn validate(&mut self) -> bool;

    fn errors(&self) -> &Errors;

    /// Writes this record and autosaves its children. No validation.
    async fn save(&mut self, session: &Session) -> Result<()>;

    /// Deletes this record, and its dependent children.
    async fn destroy(&mut self, session: &Session) -> Result<()>;
}
