/// Autosave tests
///
/// Children saved, validated and rolled back together with their owner.
/// Run with: cargo test --test autosave_tests
mod common;

use common::{Fixture, sorted_names};
use nested_params::{
    AttributeSet, Entity, NestError, Record, SaveGuard, SaveState, Session, Value,
};

async fn setup_member(fx: &Fixture) -> Record {
    let mut member =
        Record::with_attributes(fx.member.clone(), &AttributeSet::new().set("email", "paco@example.com"))
            .unwrap();
    member
        .build_child("avatar")
        .unwrap()
        .write_attribute("name", "smiley".into())
        .unwrap();
    member.save_strict(&fx.session).await.unwrap();
    member
}

async fn setup_visitor(fx: &Fixture) -> Record {
    let mut visitor =
        Record::with_attributes(fx.visitor.clone(), &AttributeSet::new().set("email", "paco@example.com"))
            .unwrap();
    for name in ["smiley1", "smiley2"] {
        visitor
            .build_child("avatars")
            .unwrap()
            .write_attribute("name", name.into())
            .unwrap();
    }
    visitor.save_strict(&fx.session).await.unwrap();
    visitor
}

fn avatar(record: &mut Record) -> &mut Record {
    record.child_mut("avatar").unwrap()
}

fn avatars(record: &mut Record) -> &mut nested_params::ChildCollection<Record> {
    record.children_mut("avatars").unwrap()
}

// ============================================================================
// has_one
// ============================================================================

#[tokio::test]
async fn test_has_one_owner_still_saves() {
    let fx = Fixture::new();
    let mut member = setup_member(&fx).await;
    member.write_attribute("email", "pablo@example.com".into()).unwrap();
    member.save_strict(&fx.session).await.unwrap();
    fx.reload(&mut member).await;
    assert_eq!(member.get("email"), "pablo@example.com");
}

#[tokio::test]
async fn test_has_one_saves_without_a_child() {
    let fx = Fixture::new();
    let mut member = fx
        .create(&fx.member, AttributeSet::new().set("email", ""))
        .await;
    member.write_attribute("email", "pablo@example.com".into()).unwrap();
    assert!(member.save_strict(&fx.session).await.is_ok());
}

#[tokio::test]
async fn test_has_one_saves_the_child() {
    let fx = Fixture::new();
    let mut member = setup_member(&fx).await;
    avatar(&mut member).write_attribute("name", "sadly".into()).unwrap();
    member.save_strict(&fx.session).await.unwrap();
    fx.reload(&mut member).await;
    assert_eq!(member.child("avatar").map(|a| a.get("name")), Some("sadly".to_string()));
    assert_eq!(
        member.child("avatar").map(|a| a.read_attribute("member_id")),
        member.id().map(Value::from)
    );
}

#[tokio::test]
async fn test_has_one_validates_the_child() {
    let fx = Fixture::new();
    let mut member = setup_member(&fx).await;
    avatar(&mut member).write_attribute("name", "".into()).unwrap();
    assert!(!member.validate());
    assert!(member.errors().on("name").is_some());
}

#[tokio::test]
async fn test_has_one_rolls_back_on_child_fault() {
    let fx = Fixture::new();
    let mut member = setup_member(&fx).await;
    fx.store.fail_writes_to(fx.avatar.table()).await;

    avatar(&mut member).write_attribute("visitor_id", 123.into()).unwrap();
    member.write_attribute("address", "Another address 1".into()).unwrap();
    assert!(!member.save_with(&fx.session, true).await);

    fx.store.clear_faults().await;
    fx.reload(&mut member).await;
    assert!(member.read_attribute("address").is_blank());
    assert!(member.child("avatar").unwrap().read_attribute("visitor_id").is_blank());
}

#[tokio::test]
async fn test_has_one_can_bypass_validations() {
    let fx = Fixture::new();
    let mut member = setup_member(&fx).await;
    member.write_attribute("email", "".into()).unwrap();
    avatar(&mut member).write_attribute("name", "".into()).unwrap();

    assert!(member.save_with(&fx.session, false).await);
    fx.reload(&mut member).await;
    assert!(member.read_attribute("email").is_blank());
    assert!(member.child("avatar").unwrap().read_attribute("name").is_blank());
}

#[tokio::test]
async fn test_has_one_strict_save_raises_record_invalid() {
    let fx = Fixture::new();
    let mut member = setup_member(&fx).await;
    avatar(&mut member).write_attribute("name", "".into()).unwrap();

    let err = member.save_strict(&fx.session).await.unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(err, NestError::RecordInvalid(_)));
}

// ============================================================================
// has_many
// ============================================================================

#[tokio::test]
async fn test_has_many_owner_assignment_still_works() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    visitor
        .assign_params(&AttributeSet::new().set("email", "pablo@example.com"))
        .unwrap();
    assert_eq!(visitor.get("email"), "pablo@example.com");
}

#[tokio::test]
async fn test_has_many_saves_the_children() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    avatars(&mut visitor).first_mut().unwrap().write_attribute("name", "sadly1".into()).unwrap();
    avatars(&mut visitor).last_mut().unwrap().write_attribute("name", "sadly2".into()).unwrap();

    visitor.save_strict(&fx.session).await.unwrap();
    fx.reload(&mut visitor).await;
    assert_eq!(sorted_names(&visitor, "avatars"), vec!["sadly1", "sadly2"]);
}

#[tokio::test]
async fn test_has_many_aggregates_errors_once_per_field() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    for child in avatars(&mut visitor).iter_mut() {
        child.write_attribute("name", "".into()).unwrap();
    }

    assert!(!visitor.validate());
    assert_eq!(visitor.errors().on("avatars_name"), Some("can't be blank"));
    assert!(visitor.errors().on("avatars").is_none());
    assert_eq!(visitor.errors().len(), 1);
    assert_eq!(visitor.errors().full_messages(), vec!["Avatars name can't be blank"]);
}

#[tokio::test]
async fn test_has_many_rolls_back_on_child_fault() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    fx.store.fail_writes_to(fx.avatar.table()).await;

    avatars(&mut visitor).last_mut().unwrap().write_attribute("member_id", 123.into()).unwrap();
    visitor.write_attribute("address", "Another address 1".into()).unwrap();
    assert!(!visitor.save_with(&fx.session, true).await);

    fx.store.clear_faults().await;
    fx.reload(&mut visitor).await;
    assert!(visitor.read_attribute("address").is_blank());
    assert!(visitor.children("avatars")[1].read_attribute("member_id").is_blank());
}

#[tokio::test]
async fn test_has_many_can_bypass_validations() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    visitor.write_attribute("email", "".into()).unwrap();
    avatars(&mut visitor).first_mut().unwrap().write_attribute("name", "".into()).unwrap();

    assert!(visitor.save_with(&fx.session, false).await);
    fx.reload(&mut visitor).await;
    assert!(visitor.read_attribute("email").is_blank());
    assert!(visitor.children("avatars")[0].read_attribute("name").is_blank());
}

#[tokio::test]
async fn test_has_many_strict_save_raises_record_invalid() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    avatars(&mut visitor).first_mut().unwrap().write_attribute("name", "".into()).unwrap();

    let err = visitor.save_strict(&fx.session).await.unwrap_err();
    assert!(matches!(err, NestError::RecordInvalid(_)));
    assert_eq!(err.to_string(), "Validation failed: Avatars name can't be blank");
    // The errors stay on the record for redisplay.
    assert!(visitor.errors().contains_key("avatars_name"));
}

// ============================================================================
// Save guard
// ============================================================================

#[tokio::test]
async fn test_failed_save_restores_new_children() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    visitor
        .build_child("avatars")
        .unwrap()
        .write_attribute("name", "smiley3".into())
        .unwrap();
    fx.store.fail_writes_to(fx.avatar.table()).await;

    let outcome = SaveGuard::new(&fx.session).attempt(&mut visitor, true).await;
    assert_eq!(outcome.state, SaveState::RolledBack);
    assert!(matches!(outcome.error, Some(NestError::Persistence(_))));

    let built = visitor.children("avatars").last().unwrap();
    assert!(built.is_new_record());
    assert_eq!(fx.count(&fx.avatar).await, 2);
}

#[tokio::test]
async fn test_invalid_save_writes_nothing() {
    let fx = Fixture::new();
    let mut visitor = Record::with_attributes(
        fx.visitor.clone(),
        &AttributeSet::new().set("email", "new@example.com"),
    )
    .unwrap();
    visitor.build_child("avatars").unwrap();

    let outcome = SaveGuard::new(&fx.session).attempt(&mut visitor, true).await;
    assert_eq!(outcome.state, SaveState::Invalid);
    assert!(visitor.is_new_record());
    assert_eq!(fx.count(&fx.visitor).await, 0);
    assert_eq!(fx.store.transaction_stats().await.active, 0);
}

#[tokio::test]
async fn test_save_joins_an_open_transaction() {
    let fx = Fixture::new();
    let mut first = setup_visitor(&fx).await;
    let mut second = setup_member(&fx).await;

    let result: nested_params::Result<()> = fx
        .session
        .with_transaction(|tx: Session| async move {
            first.write_attribute("email", "first@example.com".into())?;
            assert!(first.save_with(&tx, true).await);
            second.write_attribute("email", "second@example.com".into())?;
            assert!(second.save_with(&tx, true).await);
            Err(NestError::Transaction("abandoned".to_string()))
        })
        .await;
    assert!(result.is_err());

    let visitor_id = fx.store.rows(fx.visitor.table()).await[0].0;
    let stored = Record::find(&fx.session, fx.visitor.clone(), visitor_id).await.unwrap();
    assert_eq!(stored.get("email"), "paco@example.com");
    let member_id = fx.store.rows(fx.member.table()).await[0].0;
    let stored = Record::find(&fx.session, fx.member.clone(), member_id).await.unwrap();
    assert_eq!(stored.get("email"), "paco@example.com");
}

#[tokio::test]
async fn test_failed_save_inside_an_open_transaction_leaves_no_writes() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    let visitor_id = visitor.id().unwrap();
    let schema = fx.visitor.clone();
    fx.store.fail_writes_to(fx.avatar.table()).await;

    let result = fx
        .session
        .with_transaction(|tx: Session| async move {
            visitor.write_attribute("address", "Partial".into())?;
            avatars(&mut visitor).last_mut().unwrap().write_attribute("name", "sadly".into())?;
            let saved = visitor.save_with(&tx, true).await;

            let stored = Record::find(&tx, schema, visitor_id).await?;
            assert!(stored.read_attribute("address").is_blank());
            Ok(saved)
        })
        .await;
    assert!(matches!(result, Ok(false)));

    fx.store.clear_faults().await;
    let stored = Record::find(&fx.session, fx.visitor.clone(), visitor_id).await.unwrap();
    assert!(stored.read_attribute("address").is_blank());
    assert_eq!(sorted_names(&stored, "avatars"), vec!["smiley1", "smiley2"]);
    assert_eq!(fx.store.transaction_stats().await.active, 0);
}

#[tokio::test]
async fn test_destroy_removes_the_owner_only_without_dependent_destroy() {
    let fx = Fixture::new();
    let mut visitor = setup_visitor(&fx).await;
    visitor.destroy(&fx.session).await.unwrap();
    assert_eq!(fx.count(&fx.visitor).await, 0);
    assert_eq!(fx.count(&fx.avatar).await, 2);
}
