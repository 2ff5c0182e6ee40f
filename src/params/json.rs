//! Decoding of JSON request bodies into params.
//!
//! The decoder needs the model schema: the same JSON object means a plain
//! attribute under one key and a nested association under another.

use super::{AssociationInput, AttributeSet, DirectValue, IncomingCollection, NestedKey, ParamValue, Params};
use crate::config::NestedParamsConfig;
use crate::core::{NestError, Result, Value};
use crate::schema::{Cardinality, ModelSchema};
use serde_json::Value as Json;

impl AttributeSet {
    pub fn from_json(json: &Json, model: &ModelSchema, config: &NestedParamsConfig) -> Result<Params> {
        let Json::Object(object) = json else {
            return Err(NestError::InvalidParams(format!(
                "Params for '{}' must be an object",
                model.name()
            )));
        };

        let mut set = AttributeSet::new();
        for (key, value) in object {
            let association_name = config.association_name(key);
            match model.association(association_name) {
                Some(association) if !is_scalar(value) || value.is_null() => {
                    let input = decode_association(
                        association_name,
                        association.spec.cardinality,
                        &association.model,
                        value,
                        config,
                    )?;
                    set.insert(association_name, ParamValue::Nested(input));
                }
                Some(_) => {
                    return Err(NestError::InvalidParams(format!(
                        "'{}' names an association and cannot take the scalar {}",
                        key, value
                    )));
                }
                None if is_scalar(value) => {
                    set.insert(key.clone(), ParamValue::Scalar(Value::from_json(value)?));
                }
                None => {
                    return Err(NestError::UnknownAssociation {
                        model: model.name().to_string(),
                        association: association_name.to_string(),
                    });
                }
            }
        }
        Ok(set)
    }
}

fn is_scalar(json: &Json) -> bool {
    !matches!(json, Json::Object(_) | Json::Array(_))
}

fn decode_association(
    name: &str,
    cardinality: Cardinality,
    child: &ModelSchema,
    value: &Json,
    config: &NestedParamsConfig,
) -> Result<AssociationInput> {
    match (cardinality, value) {
        (Cardinality::One, Json::Object(_)) => Ok(AssociationInput::Attributes(
            AttributeSet::from_json(value, child, config)?,
        )),
        (Cardinality::One, Json::Null) => Ok(AssociationInput::Direct(DirectValue::One(None))),
        (Cardinality::Many, Json::Object(entries)) => {
            let mut keyed = Vec::with_capacity(entries.len());
            for (raw, attributes) in entries {
                let key = NestedKey::parse(name, raw, config)?;
                keyed.push((key, AttributeSet::from_json(attributes, child, config)?));
            }
            Ok(AssociationInput::Collection(IncomingCollection::Keyed(keyed)))
        }
        (Cardinality::Many, Json::Array(entries)) => {
            let sequence = entries
                .iter()
                .map(|attributes| AttributeSet::from_json(attributes, child, config))
                .collect::<Result<Vec<_>>>()?;
            Ok(AssociationInput::Collection(IncomingCollection::Sequence(sequence)))
        }
        (cardinality, other) => Err(NestError::InvalidParams(format!(
            "{} association '{}' cannot take {}",
            cardinality, name, other
        ))),
    }
}
