//! Turning submitted child attributes into create / update / destroy
//! decisions against the live children of an association.

use super::collection::{ChildCollection, HasOne};
use crate::config::NestedParamsConfig;
use crate::core::{NestError, RecordId, Result};
use crate::entity::Entity;
use crate::params::{AttributeSet, IncomingCollection, NestedKey};
use crate::schema::ChildCollectionSpec;
use std::collections::{BTreeSet, HashSet};
use tracing::{Level, event};

/// What to do with one association. Indices point into the child slice the
/// plan was computed against.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationPlan {
    /// Children to take out of the live list, ascending.
    pub destroy: Vec<usize>,
    /// Children whose attributes are overwritten in place.
    pub update: Vec<(usize, AttributeSet)>,
    /// New children, in build order.
    pub build: Vec<AttributeSet>,
    /// New-record entries dropped by `reject_empty` / `reject_if`.
    pub rejected: usize,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.destroy.is_empty() && self.update.is_empty() && self.build.is_empty()
    }

    /// Identities of the persisted children the plan destroys.
    pub fn destroyed_ids<E: Entity>(&self, current: &[E]) -> Vec<RecordId> {
        self.destroy
            .iter()
            .filter_map(|&index| current.get(index).and_then(Entity::id))
            .collect()
    }
}

pub struct ChildReconciler;

impl ChildReconciler {
    /// Computes the plan for a many-association without touching anything.
    pub fn plan<E: Entity>(
        current: &[E],
        incoming: &IncomingCollection,
        spec: &ChildCollectionSpec,
        config: &NestedParamsConfig,
    ) -> Result<ReconciliationPlan> {
        match incoming {
            IncomingCollection::Keyed(entries) => Self::plan_keyed(current, entries, spec, config),
            IncomingCollection::Sequence(entries) => {
                let mut plan = ReconciliationPlan::default();
                for attributes in entries {
                    let attributes = attributes.without_flags(config);
                    if spec.rejects(&attributes) {
                        plan.rejected += 1;
                    } else {
                        plan.build.push(attributes);
                    }
                }
                Ok(plan)
            }
        }
    }

    fn plan_keyed<E: Entity>(
        current: &[E],
        entries: &[(NestedKey, AttributeSet)],
        spec: &ChildCollectionSpec,
        config: &NestedParamsConfig,
    ) -> Result<ReconciliationPlan> {
        let mut plan = ReconciliationPlan::default();
        let mut destroy = BTreeSet::new();

        if spec.destroy_missing {
            let submitted: HashSet<RecordId> =
                entries.iter().filter_map(|(key, _)| key.existing_id()).collect();
            for (index, child) in current.iter().enumerate() {
                if !child.id().is_some_and(|id| submitted.contains(&id)) {
                    destroy.insert(index);
                }
            }
        }

        let mut fresh: Vec<(&str, AttributeSet)> = Vec::new();
        for (key, attributes) in entries {
            match key {
                NestedKey::New(marker) => {
                    let attributes = attributes.without_flags(config);
                    if spec.rejects(&attributes) {
                        plan.rejected += 1;
                    } else {
                        fresh.push((marker.as_str(), attributes));
                    }
                }
                NestedKey::Existing(id) => {
                    let index = current
                        .iter()
                        .position(|child| child.id() == Some(*id))
                        .ok_or_else(|| NestError::lookup(&spec.name, id))?;
                    if spec.allow_destroy && attributes.destroy_requested(config) {
                        destroy.insert(index);
                    } else {
                        plan.update.push((index, attributes.without_flags(config)));
                    }
                }
            }
        }

        // Markers are time- or counter-derived, so string order tracks
        // submission order.
        fresh.sort_by(|a, b| a.0.cmp(b.0));
        plan.build = fresh.into_iter().map(|(_, attributes)| attributes).collect();
        plan.destroy = destroy.into_iter().collect();
        Ok(plan)
    }

    /// Carries out a plan computed against `collection.as_slice()`.
    pub fn apply<E, F>(
        collection: &mut ChildCollection<E>,
        plan: ReconciliationPlan,
        config: &NestedParamsConfig,
        mut build: F,
    ) -> Result<()>
    where
        E: Entity,
        F: FnMut() -> E,
    {
        for (index, attributes) in &plan.update {
            let child = collection.get_index_mut(*index).ok_or_else(|| {
                NestError::InvalidParams(format!("Plan refers to missing child #{}", index))
            })?;
            child.assign_attributes(attributes, config)?;
        }

        for &index in plan.destroy.iter().rev() {
            collection.mark_for_destruction(index);
        }

        for attributes in &plan.build {
            let mut child = build();
            child.assign_attributes(attributes, config)?;
            collection.push(child);
        }
        Ok(())
    }

    /// Plans and applies in one step; returns the plan for inspection.
    pub fn reconcile_many<E, F>(
        collection: &mut ChildCollection<E>,
        incoming: &IncomingCollection,
        spec: &ChildCollectionSpec,
        config: &NestedParamsConfig,
        build: F,
    ) -> Result<ReconciliationPlan>
    where
        E: Entity,
        F: FnMut() -> E,
    {
        let plan = Self::plan(collection.as_slice(), incoming, spec, config)?;
        event!(
            Level::DEBUG,
            association = %spec.name,
            destroy = plan.destroy.len(),
            update = plan.update.len(),
            build = plan.build.len(),
            rejected = plan.rejected,
            "reconciled child collection"
        );
        Self::apply(collection, plan.clone(), config, build)?;
        Ok(plan)
    }

    /// One-cardinality: build the child if there is none, then overwrite its
    /// attributes. Never destroys.
    pub fn reconcile_one<E, F>(
        has_one: &mut HasOne<E>,
        attributes: &AttributeSet,
        spec: &ChildCollectionSpec,
        config: &NestedParamsConfig,
        build: F,
    ) -> Result<()>
    where
        E: Entity,
        F: FnOnce() -> E,
    {
        let built = has_one.get().is_none();
        let target = has_one.get_or_build(build);
        target.assign_attributes(&attributes.without_flags(config), config)?;
        event!(Level::DEBUG, association = %spec.name, built, "reconciled single child");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Value};
    use crate::entity::Record;
    use crate::schema::ModelSchema;
    use crate::session::Session;
    use std::sync::Arc;

    fn artist_schema() -> Arc<ModelSchema> {
        ModelSchema::new("artist")
            .column("name", DataType::Text)
            .validates_presence_of("name")
            .build()
    }

    async fn persisted(names: &[&str]) -> ChildCollection<Record> {
        let session = Session::in_memory();
        let schema = artist_schema();
        let mut children = Vec::new();
        for name in names {
            let mut artist = Record::new(schema.clone());
            artist.write_attribute("name", Value::from(*name)).unwrap();
            artist.save(&session).await.unwrap();
            children.push(artist);
        }
        ChildCollection::from_loaded(children)
    }

    fn keyed(entries: Vec<(String, AttributeSet)>) -> IncomingCollection {
        IncomingCollection::keyed("artists", entries, &NestedParamsConfig::default()).unwrap()
    }

    fn names(collection: &ChildCollection<Record>) -> Vec<String> {
        collection.iter().map(|c| c.get("name")).collect()
    }

    #[tokio::test]
    async fn test_keyed_updates_and_builds_in_marker_order() {
        let mut collection = persisted(&["paco", "poncho"]).await;
        let first = collection.first().and_then(Entity::id).unwrap();
        let incoming = keyed(vec![
            ("new_20".to_string(), AttributeSet::new().set("name", "second")),
            (first.to_string(), AttributeSet::new().set("name", "Paco")),
            ("new_10".to_string(), AttributeSet::new().set("name", "first")),
        ]);
        let spec = ChildCollectionSpec::many("artists").nested_params();
        let config = NestedParamsConfig::default();

        let plan = ChildReconciler::reconcile_many(&mut collection, &incoming, &spec, &config, || {
            Record::new(artist_schema())
        })
        .unwrap();

        assert_eq!(plan.update.len(), 1);
        assert!(plan.destroy.is_empty());
        assert_eq!(names(&collection), vec!["Paco", "poncho", "first", "second"]);
    }

    #[tokio::test]
    async fn test_destroy_missing_marks_unlisted_children() {
        let mut collection = persisted(&["paco", "poncho"]).await;
        let last = collection.last().and_then(Entity::id).unwrap();
        let incoming = keyed(vec![(last.to_string(), AttributeSet::new())]);
        let spec = ChildCollectionSpec::many("artists").nested_params().destroy_missing();
        let config = NestedParamsConfig::default();

        let plan = ChildReconciler::plan(collection.as_slice(), &incoming, &spec, &config).unwrap();
        assert_eq!(plan.destroy, vec![0]);
        let doomed = plan.destroyed_ids(collection.as_slice());

        ChildReconciler::apply(&mut collection, plan, &config, || Record::new(artist_schema())).unwrap();
        assert_eq!(names(&collection), vec!["poncho"]);
        assert_eq!(
            collection.marked_for_destruction().iter().map(|c| c.id().unwrap()).collect::<Vec<_>>(),
            doomed
        );
    }

    #[tokio::test]
    async fn test_missing_children_survive_without_destroy_missing() {
        let mut collection = persisted(&["paco", "poncho"]).await;
        let incoming = keyed(vec![("new_1".to_string(), AttributeSet::new().set("name", "jill"))]);
        let spec = ChildCollectionSpec::many("artists").nested_params();

        ChildReconciler::reconcile_many(&mut collection, &incoming, &spec, &NestedParamsConfig::default(), || {
            Record::new(artist_schema())
        })
        .unwrap();
        assert_eq!(names(&collection), vec!["paco", "poncho", "jill"]);
        assert!(!collection.has_pending_changes());
    }

    #[tokio::test]
    async fn test_unknown_identity_is_a_lookup_failure() {
        let collection = persisted(&["paco"]).await;
        let incoming = keyed(vec![("9999".to_string(), AttributeSet::new().set("name", "x"))]);
        let spec = ChildCollectionSpec::many("artists").nested_params();

        let err = ChildReconciler::plan(collection.as_slice(), &incoming, &spec, &NestedParamsConfig::default())
            .unwrap_err();
        assert!(err.is_lookup());
        assert!(matches!(err, NestError::LookupFailure { ref key, .. } if key == "9999"));
    }

    #[tokio::test]
    async fn test_destroy_flag_needs_allow_destroy() {
        let collection = persisted(&["paco"]).await;
        let id = collection.first().and_then(Entity::id).unwrap();
        let incoming = keyed(vec![(id.to_string(), AttributeSet::new().set("_destroy", "1"))]);
        let config = NestedParamsConfig::default();

        let ignored = ChildReconciler::plan(
            collection.as_slice(),
            &incoming,
            &ChildCollectionSpec::many("artists").nested_params(),
            &config,
        )
        .unwrap();
        assert!(ignored.destroy.is_empty());
        assert!(ignored.update[0].1.is_empty());

        let honoured = ChildReconciler::plan(
            collection.as_slice(),
            &incoming,
            &ChildCollectionSpec::many("artists").nested_params().allow_destroy(),
            &config,
        )
        .unwrap();
        assert_eq!(honoured.destroy, vec![0]);
        assert!(honoured.update.is_empty());
    }

    #[test]
    fn test_sequence_rejects_blank_entries() {
        let incoming = IncomingCollection::Sequence(vec![
            AttributeSet::new().set("name", "paco"),
            AttributeSet::new().set("name", ""),
        ]);
        let spec = ChildCollectionSpec::many("artists").nested_params().reject_empty();
        let plan = ChildReconciler::plan::<Record>(&[], &incoming, &spec, &NestedParamsConfig::default()).unwrap();
        assert_eq!(plan.build.len(), 1);
        assert_eq!(plan.rejected, 1);
    }

    #[test]
    fn test_reconcile_one_builds_then_updates() {
        let mut has_one = HasOne::new();
        let spec = ChildCollectionSpec::one("artist").nested_params();
        let config = NestedParamsConfig::default();

        ChildReconciler::reconcile_one(&mut has_one, &AttributeSet::new().set("name", "paco"), &spec, &config, || {
            Record::new(artist_schema())
        })
        .unwrap();
        ChildReconciler::reconcile_one(&mut has_one, &AttributeSet::new().set("name", "poncho"), &spec, &config, || {
            Record::new(artist_schema())
        })
        .unwrap();
        assert_eq!(has_one.get().map(|a| a.get("name")), Some("poncho".to_string()));
    }
}
