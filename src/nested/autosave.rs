use super::collection::{ChildCollection, HasOne};
use crate::core::{RecordId, Result, Value};
use crate::entity::Entity;
use crate::schema::ChildCollectionSpec;
use crate::session::Session;
use tracing::{Level, event};

/// Persists an owner's children once the owner row is written.
///
/// Children are saved with validation bypassed; they were validated as
/// part of the owner's validation. Must run inside the owner's transaction.
pub struct AutosaveCoordinator;

impl AutosaveCoordinator {
    pub async fn autosave_many<E: Entity>(
        collection: &mut ChildCollection<E>,
        spec: &ChildCollectionSpec,
        owner_id: RecordId,
        session: &Session,
    ) -> Result<()> {
        let marked = collection.take_marked();
        let orphaned = collection.take_orphaned();
        event!(
            Level::DEBUG,
            association = %spec.name,
            save = collection.len(),
            destroy = marked.len(),
            detach = orphaned.len(),
            "autosave"
        );

        for mut child in marked {
            child.destroy(session).await?;
        }
        for mut child in orphaned {
            Self::detach(&mut child, spec, session).await?;
        }
        for child in collection.iter_mut() {
            Self::save_child(child, spec, owner_id, session).await?;
        }
        Ok(())
    }

    /// Saves the target if present; absence is not an error.
    pub async fn autosave_one<E: Entity>(
        has_one: &mut HasOne<E>,
        spec: &ChildCollectionSpec,
        owner_id: RecordId,
        session: &Session,
    ) -> Result<()> {
        if let Some(mut replaced) = has_one.take_replaced() {
            if spec.dependent_destroy {
                replaced.destroy(session).await?;
            } else {
                Self::detach(&mut replaced, spec, session).await?;
            }
        }
        if let Some(child) = has_one.get_mut() {
            Self::save_child(child, spec, owner_id, session).await?;
        }
        Ok(())
    }

    async fn save_child<E: Entity>(
        child: &mut E,
        spec: &ChildCollectionSpec,
        owner_id: RecordId,
        session: &Session,
    ) -> Result<()> {
        if let Some(foreign_key) = &spec.foreign_key {
            child.write_attribute(foreign_key, owner_id.into())?;
        }
        child.save(session).await
    }

    async fn detach<E: Entity>(
        child: &mut E,
        spec: &ChildCollectionSpec,
        session: &Session,
    ) -> Result<()> {
        match &spec.foreign_key {
            Some(foreign_key) => {
                child.write_attribute(foreign_key, Value::Null)?;
                child.save(session).await
            }
            None => Ok(()),
        }
    }
}
