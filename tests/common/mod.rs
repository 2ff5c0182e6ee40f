#![allow(dead_code)]

use nested_params::{
    AssociationInput, AttributeSet, ChildCollectionSpec, DataType, Entity, IncomingCollection,
    MemoryStore, ModelSchema, Record, RecordId, Session,
};
use std::sync::Arc;

/// Members, visitors, their artists and avatars, over one shared store.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub session: Session,
    pub member: Arc<ModelSchema>,
    pub visitor: Arc<ModelSchema>,
    pub artist: Arc<ModelSchema>,
    pub avatar: Arc<ModelSchema>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_visitor_artists(
            ChildCollectionSpec::many("artists")
                .nested_params()
                .destroy_missing()
                .reject_empty(),
        )
    }

    pub fn with_visitor_artists(artists: ChildCollectionSpec) -> Self {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());

        let artist = ModelSchema::new("artist")
            .column("member_id", DataType::Integer)
            .column("visitor_id", DataType::Integer)
            .column("name", DataType::Text)
            .validates_presence_of("name")
            .build();
        let avatar = ModelSchema::new("avatar")
            .column("member_id", DataType::Integer)
            .column("visitor_id", DataType::Integer)
            .column("name", DataType::Text)
            .validates_presence_of("name")
            .build();

        let member = ModelSchema::new("member")
            .column("email", DataType::Text)
            .column("address", DataType::Text)
            .has_one(ChildCollectionSpec::one("artist").nested_params(), artist.clone())
            .has_one(ChildCollectionSpec::one("avatar").autosave(), avatar.clone())
            .build();
        let visitor = ModelSchema::new("visitor")
            .column("email", DataType::Text)
            .column("address", DataType::Text)
            .has_many(artists, artist.clone())
            .has_many(ChildCollectionSpec::many("avatars").autosave(), avatar.clone())
            .build();

        Self {
            store,
            session,
            member,
            visitor,
            artist,
            avatar,
        }
    }

    pub async fn create(&self, schema: &Arc<ModelSchema>, params: AttributeSet) -> Record {
        let mut record = Record::with_attributes(schema.clone(), &params).unwrap();
        record.save_strict(&self.session).await.unwrap();
        record
    }

    pub async fn reload(&self, record: &mut Record) {
        record.reload(&self.session).await.unwrap();
    }

    pub async fn count(&self, schema: &Arc<ModelSchema>) -> usize {
        self.session.count(schema.table()).await.unwrap()
    }
}

pub fn sequence(names: &[&str]) -> AssociationInput {
    AssociationInput::Collection(IncomingCollection::Sequence(
        names
            .iter()
            .map(|name| AttributeSet::new().set("name", *name))
            .collect(),
    ))
}

pub fn names(record: &Record, association: &str) -> Vec<String> {
    record
        .children(association)
        .iter()
        .map(|child| child.get("name"))
        .collect()
}

pub fn sorted_names(record: &Record, association: &str) -> Vec<String> {
    let mut names = names(record, association);
    names.sort();
    names
}

pub fn ids(record: &Record, association: &str) -> Vec<RecordId> {
    record
        .children(association)
        .iter()
        .filter_map(Entity::id)
        .collect()
}
