use super::Entity;
use crate::config::NestedParamsConfig;
use crate::core::{Attributes, NestError, RecordId, Result, Value};
use crate::nested::{
    Association, AutosaveCoordinator, ChildCollection, ChildReconciler, Errors, HasOne, SaveGuard,
    ValidationAggregator,
};
use crate::params::{AssociationInput, AttributeSet, DirectValue, ParamValue, Params};
use crate::schema::{AssociationSchema, Cardinality, ModelSchema};
use crate::session::Session;
use async_recursion::async_recursion;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A dynamic record driven by its `ModelSchema`.
///
/// Owns its attribute values, the errors of its last validation and one
/// association container per declared association.
#[derive(Clone)]
pub struct Record {
    schema: Arc<ModelSchema>,
    id: Option<RecordId>,
    attributes: Attributes,
    associations: BTreeMap<String, Association<Record>>,
    errors: Errors,
}

fn empty_association(association: &AssociationSchema) -> Association<Record> {
    match association.spec.cardinality {
        Cardinality::One => Association::One(HasOne::new()),
        Cardinality::Many => Association::Many(ChildCollection::new()),
    }
}

impl Record {
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        let associations = schema
            .associations()
            .iter()
            .map(|association| (association.spec.name.clone(), empty_association(association)))
            .collect();
        Self {
            schema,
            id: None,
            attributes: Attributes::new(),
            associations,
            errors: Errors::new(),
        }
    }

    /// New record with params assigned under the default conventions.
    pub fn with_attributes(schema: Arc<ModelSchema>, params: &Params) -> Result<Self> {
        let mut record = Self::new(schema);
        record.assign_params(params)?;
        Ok(record)
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn model_name(&self) -> &str {
        self.schema.name()
    }

    /// Text form of an attribute; empty for `Null`.
    pub fn get(&self, name: &str) -> String {
        self.read_attribute(name).to_string()
    }

    pub fn assign_params(&mut self, params: &Params) -> Result<()> {
        self.assign_attributes(params, &NestedParamsConfig::default())
    }

    pub fn association(&self, name: &str) -> Option<&Association<Record>> {
        self.associations.get(name)
    }

    pub fn association_mut(&mut self, name: &str) -> Option<&mut Association<Record>> {
        self.associations.get_mut(name)
    }

    /// Live children of a many-association; empty for unknown names.
    pub fn children(&self, name: &str) -> &[Record] {
        self.association(name)
            .and_then(Association::as_many)
            .map(ChildCollection::as_slice)
            .unwrap_or(&[])
    }

    pub fn children_mut(&mut self, name: &str) -> Option<&mut ChildCollection<Record>> {
        self.association_mut(name).and_then(Association::as_many_mut)
    }

    pub fn child(&self, name: &str) -> Option<&Record> {
        self.association(name)
            .and_then(Association::as_one)
            .and_then(HasOne::get)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Record> {
        self.association_mut(name)
            .and_then(Association::as_one_mut)
            .and_then(HasOne::get_mut)
    }

    /// Builds an empty child on the association and hands it back.
    pub fn build_child(&mut self, name: &str) -> Result<&mut Record> {
        let model = self.schema.require_association(name)?.model.clone();
        match self.associations.get_mut(name) {
            Some(Association::Many(children)) => {
                children.push(Record::new(model));
                children
                    .last_mut()
                    .ok_or_else(|| NestError::InvalidParams(format!("Could not build '{}'", name)))
            }
            Some(Association::One(has_one)) => Ok(has_one.get_or_build(|| Record::new(model))),
            None => Err(NestError::UnknownAssociation {
                model: self.schema.name().to_string(),
                association: name.to_string(),
            }),
        }
    }

    /// Direct setter for a many-association, bypassing reconciliation.
    pub fn set_children(&mut self, name: &str, children: Vec<Record>) -> Result<()> {
        let model = self.schema.require_association(name)?.model.clone();
        ensure_model(&model, &children)?;
        let collection = self
            .children_mut(name)
            .ok_or_else(|| NestError::InvalidParams(format!("'{}' is not a has_many association", name)))?;
        collection.replace(children);
        Ok(())
    }

    /// Direct setter for a one-association, bypassing reconciliation.
    pub fn set_child(&mut self, name: &str, child: Option<Record>) -> Result<()> {
        let model = self.schema.require_association(name)?.model.clone();
        ensure_model(&model, child.as_slice())?;
        let has_one = self
            .association_mut(name)
            .and_then(Association::as_one_mut)
            .ok_or_else(|| NestError::InvalidParams(format!("'{}' is not a has_one association", name)))?;
        has_one.replace(child);
        Ok(())
    }

    /// New record, params assigned, non-strict save. Check `errors()` or
    /// `is_new_record()` for the outcome.
    pub async fn create(session: &Session, schema: Arc<ModelSchema>, params: &Params) -> Result<Record> {
        let mut record = Record::with_attributes(schema, params)?;
        SaveGuard::new(session).save(&mut record, true).await;
        Ok(record)
    }

    /// Loads a record and, recursively, every associated child.
    pub async fn find(session: &Session, schema: Arc<ModelSchema>, id: RecordId) -> Result<Record> {
        let row = session
            .find(schema.table(), id)
            .await?
            .ok_or_else(|| NestError::RecordNotFound {
                table: schema.table().to_string(),
                id: id.as_i64(),
            })?;
        Self::load(session, schema, id, row).await
    }

    #[async_recursion]
    async fn load(
        session: &Session,
        schema: Arc<ModelSchema>,
        id: RecordId,
        row: Attributes,
    ) -> Result<Record> {
        let mut record = Record::new(schema.clone());
        record.id = Some(id);
        record.attributes = row;

        for association in schema.associations() {
            let Some(foreign_key) = &association.spec.foreign_key else {
                continue;
            };
            let rows = session
                .find_by(association.model.table(), foreign_key, &Value::from(id))
                .await?;
            let mut children = Vec::with_capacity(rows.len());
            for (child_id, child_row) in rows {
                children.push(Self::load(session, association.model.clone(), child_id, child_row).await?);
            }
            let loaded = match association.spec.cardinality {
                Cardinality::Many => Association::Many(ChildCollection::from_loaded(children)),
                Cardinality::One => Association::One(HasOne::from_loaded(children.into_iter().next())),
            };
            record.associations.insert(association.spec.name.clone(), loaded);
        }
        Ok(record)
    }

    /// Discards in-memory changes and re-reads the stored graph.
    pub async fn reload(&mut self, session: &Session) -> Result<()> {
        let id = self.id.ok_or_else(|| {
            NestError::InvalidParams(format!("Cannot reload a new {}", self.schema.name()))
        })?;
        *self = Record::find(session, self.schema.clone(), id).await?;
        Ok(())
    }

    pub async fn save_with(&mut self, session: &Session, run_validations: bool) -> bool {
        SaveGuard::new(session).save(self, run_validations).await
    }

    pub async fn save_strict(&mut self, session: &Session) -> Result<()> {
        SaveGuard::new(session).save_strict(self).await
    }

    /// Assign then save. Lookup failures in the params are returned as
    /// errors; validation and persistence failures come back as `Ok(false)`.
    pub async fn update_attributes(&mut self, session: &Session, params: &Params) -> Result<bool> {
        self.assign_params(params)?;
        Ok(self.save_with(session, true).await)
    }

    pub async fn update_attributes_strict(&mut self, session: &Session, params: &Params) -> Result<()> {
        self.assign_params(params)?;
        self.save_strict(session).await
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        if let Some(id) = self.id {
            object.insert("id".to_string(), serde_json::Value::from(id.as_i64()));
        }
        for (name, value) in &self.attributes {
            object.insert(name.clone(), value.to_json());
        }
        for (name, association) in &self.associations {
            let value = match association {
                Association::Many(children) => {
                    serde_json::Value::Array(children.iter().map(Record::to_json).collect())
                }
                Association::One(has_one) => has_one
                    .get()
                    .map_or(serde_json::Value::Null, Record::to_json),
            };
            object.insert(name.clone(), value);
        }
        serde_json::Value::Object(object)
    }

    fn persisted_row(&self) -> Attributes {
        self.attributes
            .iter()
            .filter(|(name, _)| !self.schema.is_virtual(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn assign_in_place(&mut self, attributes: &AttributeSet, config: &NestedParamsConfig) -> Result<()> {
        for (key, value) in attributes.iter() {
            if config.is_protected(key) || config.is_destroy_flag(key) {
                continue;
            }
            match value {
                ParamValue::Scalar(value) => {
                    if !self.schema.accepts_attribute(key) {
                        return Err(NestError::UnknownAttribute {
                            model: self.schema.name().to_string(),
                            attribute: key.clone(),
                        });
                    }
                    self.write_attribute(key, value.clone())?;
                }
                ParamValue::Nested(input) => {
                    self.assign_association(config.association_name(key), input, config)?;
                }
            }
        }
        Ok(())
    }

    fn assign_association(
        &mut self,
        name: &str,
        input: &AssociationInput,
        config: &NestedParamsConfig,
    ) -> Result<()> {
        let AssociationSchema { spec, model } = self.schema.require_association(name)?.clone();

        match input {
            AssociationInput::Direct(DirectValue::Many(records)) => self.set_children(name, records.clone()),
            AssociationInput::Direct(DirectValue::One(record)) => self.set_child(name, record.clone()),
            _ if !spec.nested_params => Err(NestError::InvalidParams(format!(
                "Association '{}' does not accept nested attributes",
                name
            ))),
            AssociationInput::Collection(incoming) => {
                let collection = self.children_mut(name).ok_or_else(|| {
                    NestError::InvalidParams(format!(
                        "{} association '{}' takes a single attribute set",
                        spec.cardinality, name
                    ))
                })?;
                ChildReconciler::reconcile_many(collection, incoming, &spec, config, || {
                    Record::new(model.clone())
                })?;
                Ok(())
            }
            AssociationInput::Attributes(attributes) => {
                let has_one = self
                    .association_mut(name)
                    .and_then(Association::as_one_mut)
                    .ok_or_else(|| {
                        NestError::InvalidParams(format!(
                            "{} association '{}' takes a keyed or array collection",
                            spec.cardinality, name
                        ))
                    })?;
                ChildReconciler::reconcile_one(has_one, attributes, &spec, config, || {
                    Record::new(model.clone())
                })
            }
        }
    }
}

fn ensure_model(model: &ModelSchema, records: &[Record]) -> Result<()> {
    match records.iter().find(|r| r.schema.name() != model.name()) {
        Some(record) => Err(NestError::TypeMismatch(format!(
            "Expected a {}, got a {}",
            model.name(),
            record.schema.name()
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl Entity for Record {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn read_attribute(&self, name: &str) -> Value {
        if name == "id" {
            return self.id.map_or(Value::Null, Value::from);
        }
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }

    fn write_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        let value = match self.schema.get_column(name) {
            Some(column) => column.cast(&value)?,
            None => value,
        };
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// All or nothing: a failure anywhere, nested children included, leaves
    /// the record as it was.
    fn assign_attributes(&mut self, attributes: &AttributeSet, config: &NestedParamsConfig) -> Result<()> {
        let mut staged = self.clone();
        staged.assign_in_place(attributes, config)?;
        *self = staged;
        Ok(())
    }

    fn validate(&mut self) -> bool {
        let schema = self.schema.clone();
        let mut errors = Errors::new();

        for validation in schema.validations() {
            validation.run(self, &mut errors);
        }

        for association in schema.associations().iter().filter(|a| a.spec.autosave) {
            match self.associations.get_mut(association.name()) {
                Some(Association::Many(children)) => {
                    ValidationAggregator::aggregate_many(children.iter_mut(), association.name(), &mut errors);
                }
                Some(Association::One(has_one)) => {
                    ValidationAggregator::aggregate_one(has_one.get_mut(), &mut errors);
                }
                None => {}
            }
        }

        self.errors = errors;
        self.errors.is_empty()
    }

    fn errors(&self) -> &Errors {
        &self.errors
    }

    async fn save(&mut self, session: &Session) -> Result<()> {
        let schema = self.schema.clone();
        let row = self.persisted_row();
        let id = match self.id {
            Some(id) => {
                session.update(schema.table(), id, row).await?;
                id
            }
            None => {
                let id = session.insert(schema.table(), row).await?;
                self.id = Some(id);
                id
            }
        };

        for callback in schema.after_save_callbacks() {
            callback(self)?;
        }

        for association in schema.associations().iter().filter(|a| a.spec.autosave) {
            match self.associations.get_mut(association.name()) {
                Some(Association::Many(children)) => {
                    AutosaveCoordinator::autosave_many(children, &association.spec, id, session).await?;
                }
                Some(Association::One(has_one)) => {
                    AutosaveCoordinator::autosave_one(has_one, &association.spec, id, session).await?;
                }
                None => {}
            }
        }
        Ok(())
    }

    async fn destroy(&mut self, session: &Session) -> Result<()> {
        let schema = self.schema.clone();
        for association in schema.associations().iter().filter(|a| a.spec.dependent_destroy) {
            match self.associations.get_mut(association.name()) {
                Some(Association::Many(children)) => {
                    for mut child in children.take_marked() {
                        child.destroy(session).await?;
                    }
                    for child in children.iter_mut() {
                        child.destroy(session).await?;
                    }
                }
                Some(Association::One(has_one)) => {
                    if let Some(child) = has_one.get_mut() {
                        child.destroy(session).await?;
                    }
                }
                None => {}
            }
        }
        if let Some(id) = self.id {
            session.delete(schema.table(), id).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.schema.name())
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("associations", &self.associations)
            .field("errors", &self.errors)
            .finish()
    }
}
