//! Model descriptors: columns, validations, callbacks and associations.

pub mod association;

pub use association::{AssociationSchema, Cardinality, ChildCollectionSpec, RejectIf};

use crate::core::{Column, DataType, NestError, Result};
use crate::entity::{Entity, Record};
use crate::nested::Errors;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PRESENCE_MESSAGE: &str = "can't be blank";

pub type ValidateFn = Arc<dyn Fn(&Record, &mut Errors) + Send + Sync>;
pub type CallbackFn = Arc<dyn Fn(&Record) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub enum Validation {
    Presence { field: String, message: String },
    Custom(ValidateFn),
}

impl Validation {
    pub fn run(&self, record: &Record, errors: &mut Errors) {
        match self {
            Validation::Presence { field, message } => {
                if record.read_attribute(field).is_blank() {
                    errors.add(field, message);
                }
            }
            Validation::Custom(validate) => validate(record, errors),
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Presence { field, message } => f
                .debug_struct("Presence")
                .field("field", field)
                .field("message", message)
                .finish(),
            Validation::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

pub struct ModelSchema {
    name: String,
    table: String,
    columns: Vec<Column>,
    virtual_attributes: Vec<String>,
    validations: Vec<Validation>,
    after_save: Vec<CallbackFn>,
    associations: Vec<AssociationSchema>,
}

impl ModelSchema {
    /// Starts a model; the table defaults to the plural of `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: format!("{}s", name),
            columns: Vec::new(),
            virtual_attributes: Vec::new(),
            validations: Vec::new(),
            after_save: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn table_name(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    pub fn column(mut self, name: &str, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    /// An assignable attribute that is never written to storage.
    pub fn attr_accessor(mut self, name: &str) -> Self {
        self.virtual_attributes.push(name.to_string());
        self
    }

    pub fn validates_presence_of(self, field: &str) -> Self {
        self.validates_presence_of_with_message(field, DEFAULT_PRESENCE_MESSAGE)
    }

    pub fn validates_presence_of_with_message(mut self, field: &str, message: &str) -> Self {
        self.validations.push(Validation::Presence {
            field: field.to_string(),
            message: message.to_string(),
        });
        self
    }

    pub fn validates_with<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Record, &mut Errors) + Send + Sync + 'static,
    {
        self.validations.push(Validation::Custom(Arc::new(validate)));
        self
    }

    /// Runs inside the save transaction after the row is written; an `Err`
    /// aborts the whole save.
    pub fn after_save<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Record) -> Result<()> + Send + Sync + 'static,
    {
        self.after_save.push(Arc::new(callback));
        self
    }

    pub fn has_many(self, spec: ChildCollectionSpec, model: Arc<ModelSchema>) -> Self {
        debug_assert_eq!(spec.cardinality, Cardinality::Many);
        self.associate(spec, model)
    }

    pub fn has_one(self, spec: ChildCollectionSpec, model: Arc<ModelSchema>) -> Self {
        debug_assert_eq!(spec.cardinality, Cardinality::One);
        self.associate(spec, model)
    }

    fn associate(mut self, mut spec: ChildCollectionSpec, model: Arc<ModelSchema>) -> Self {
        if spec.foreign_key.is_none() {
            spec.foreign_key = Some(format!("{}_id", self.name));
        }
        self.associations.retain(|a| a.spec.name != spec.name);
        self.associations.push(AssociationSchema { spec, model });
        self
    }

    pub fn build(self) -> Arc<ModelSchema> {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_virtual(&self, name: &str) -> bool {
        self.virtual_attributes.iter().any(|a| a == name)
    }

    /// Schemaless models (no declared columns) accept any attribute.
    pub fn accepts_attribute(&self, name: &str) -> bool {
        self.columns.is_empty() || self.get_column(name).is_some() || self.is_virtual(name)
    }

    pub fn validations(&self) -> &[Validation] {
        &self.validations
    }

    pub fn after_save_callbacks(&self) -> &[CallbackFn] {
        &self.after_save
    }

    pub fn associations(&self) -> &[AssociationSchema] {
        &self.associations
    }

    pub fn association(&self, name: &str) -> Option<&AssociationSchema> {
        self.associations.iter().find(|a| a.spec.name == name)
    }

    pub fn require_association(&self, name: &str) -> Result<&AssociationSchema> {
        self.association(name)
            .ok_or_else(|| NestError::UnknownAssociation {
                model: self.name.clone(),
                association: name.to_string(),
            })
    }
}

impl fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSchema")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("validations", &self.validations)
            .field(
                "associations",
                &self
                    .associations
                    .iter()
                    .map(|a| &a.spec)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_defaults_to_owner_name() {
        let task = ModelSchema::new("task").column("name", DataType::Text).build();
        let project = ModelSchema::new("project")
            .has_many(ChildCollectionSpec::many("tasks").nested_params(), task)
            .build();

        let tasks = project.require_association("tasks").unwrap();
        assert_eq!(tasks.spec.foreign_key.as_deref(), Some("project_id"));
        assert_eq!(tasks.model.table(), "tasks");
        assert!(project.require_association("colors").is_err());
    }

    #[test]
    fn test_redeclaring_an_association_replaces_it() {
        let artist = ModelSchema::new("artist").build();
        let visitor = ModelSchema::new("visitor")
            .has_many(ChildCollectionSpec::many("artists").nested_params().destroy_missing(), artist.clone())
            .has_many(ChildCollectionSpec::many("artists").nested_params(), artist)
            .build();

        assert_eq!(visitor.associations().len(), 1);
        assert!(!visitor.association("artists").unwrap().spec.destroy_missing);
    }

    #[test]
    fn test_accepts_attribute() {
        let schemaless = ModelSchema::new("thing").build();
        assert!(schemaless.accepts_attribute("anything"));

        let task = ModelSchema::new("task")
            .column("name", DataType::Text)
            .attr_accessor("raise_exception")
            .build();
        assert!(task.accepts_attribute("name"));
        assert!(task.accepts_attribute("raise_exception"));
        assert!(task.is_virtual("raise_exception"));
        assert!(!task.accepts_attribute("colour"));
    }
}
