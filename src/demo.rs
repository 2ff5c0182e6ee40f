//! The project tracker models: a project with its author, tasks and tags,
//! tasks with their colors.

use crate::core::{DataType, NestError, Result};
use crate::entity::{Entity, Record};
use crate::nested::SaveGuard;
use crate::params::{AssociationInput, AttributeSet, IncomingCollection};
use crate::schema::{ChildCollectionSpec, ModelSchema};
use crate::session::Session;
use std::sync::Arc;

pub const RAISE_EXCEPTION: &str = "raise_exception";

#[derive(Debug, Clone)]
pub struct DemoSchemas {
    pub project: Arc<ModelSchema>,
    pub task: Arc<ModelSchema>,
    pub color: Arc<ModelSchema>,
    pub tag: Arc<ModelSchema>,
    pub author: Arc<ModelSchema>,
}

/// Faults the save when the virtual `raise_exception` attribute is 1.
fn raise_exception_if_needed(record: &Record) -> Result<()> {
    if record.read_attribute(RAISE_EXCEPTION).to_string() == "1" {
        return Err(NestError::Persistence(format!(
            "Oh noes! ({} after_save)",
            record.model_name()
        )));
    }
    Ok(())
}

pub fn schemas() -> DemoSchemas {
    let color = ModelSchema::new("color")
        .column("name", DataType::Text)
        .column("task_id", DataType::Integer)
        .build();

    let task = ModelSchema::new("task")
        .column("name", DataType::Text)
        .column("project_id", DataType::Integer)
        .attr_accessor(RAISE_EXCEPTION)
        .validates_presence_of("name")
        .after_save(raise_exception_if_needed)
        .has_many(
            ChildCollectionSpec::many("colors")
                .nested_params()
                .allow_destroy()
                .reject_if(|attributes| attributes.scalar("name").is_none_or(|name| name.is_blank())),
            color.clone(),
        )
        .build();

    let tag = ModelSchema::new("tag")
        .column("name", DataType::Text)
        .column("project_id", DataType::Integer)
        .attr_accessor(RAISE_EXCEPTION)
        .validates_presence_of_with_message("name", "can't just be blank")
        .after_save(raise_exception_if_needed)
        .build();

    let author = ModelSchema::new("author")
        .column("name", DataType::Text)
        .column("project_id", DataType::Integer)
        .attr_accessor(RAISE_EXCEPTION)
        .after_save(raise_exception_if_needed)
        .build();

    let project = ModelSchema::new("project")
        .column("name", DataType::Text)
        .validates_presence_of("name")
        .has_one(ChildCollectionSpec::one("author").nested_params(), author.clone())
        .has_many(
            ChildCollectionSpec::many("tasks")
                .nested_params()
                .destroy_missing()
                .dependent_destroy(),
            task.clone(),
        )
        .has_many(
            ChildCollectionSpec::many("tags").nested_params().destroy_missing(),
            tag.clone(),
        )
        .build();

    DemoSchemas {
        project,
        task,
        color,
        tag,
        author,
    }
}

/// Creates the "NestedParams" project with its two starter tasks.
pub async fn seed_project(session: &Session, schemas: &DemoSchemas) -> Result<Record> {
    let params = AttributeSet::new().set("name", "NestedParams").nest(
        "tasks",
        AssociationInput::Collection(IncomingCollection::Sequence(vec![
            AttributeSet::new().set("name", "Check other implementations"),
            AttributeSet::new().set("name", "Try with our plugin"),
        ])),
    );
    let mut project = Record::with_attributes(schemas.project.clone(), &params)?;
    SaveGuard::new(session).save_strict(&mut project).await?;
    Ok(project)
}
