// ABOUTME: Integration tests for the association store, tag filters and type registry
// ABOUTME: Tests attach/detach/sync at the store level and composable name/category lookups

mod common;

use common::{create_note, create_tagger, create_task, create_test_db, Note, Task};
use polytag_tags::{
    AssociationKey, AssociationStore, TagCreateInput, TagQuery, Taggable, TaggableRegistry,
};
use rstest::rstest;

#[tokio::test]
async fn test_attach_detach() {
    let tagger = create_tagger().await;
    let tag = tagger
        .create_tag(TagCreateInput::new("Feature"))
        .await
        .unwrap();
    let task = create_task(tagger.pool(), "Task").await;
    let store = tagger.associations(&task);

    assert_eq!(store.key(), &AssociationKey::new("test.task", task.id));
    assert!(store.attach(tag.id).await.unwrap());
    assert!(!store.attach(tag.id).await.unwrap());
    assert_eq!(store.tag_ids().await.unwrap(), vec![tag.id]);

    assert_eq!(store.detach(tag.id).await.unwrap(), 1);
    assert_eq!(store.detach(tag.id).await.unwrap(), 0);
    assert!(store.tag_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_same_id_different_types_are_separate() {
    let tagger = create_tagger().await;
    let tag = tagger
        .create_tag(TagCreateInput::new("Feature"))
        .await
        .unwrap();
    let task = create_task(tagger.pool(), "Task").await;
    let note = create_note(tagger.pool(), "Note").await;
    assert_eq!(task.id, note.id);

    tagger.associations(&task).attach(tag.id).await.unwrap();

    assert_eq!(
        tagger.associations(&task).tag_ids().await.unwrap(),
        vec![tag.id]
    );
    assert!(tagger.associations(&note).tag_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_by_ids() {
    let tagger = create_tagger().await;
    let mut ids = Vec::new();
    for name in ["A", "B", "C", "D"] {
        ids.push(
            tagger
                .create_tag(TagCreateInput::new(name))
                .await
                .unwrap()
                .id,
        );
    }
    let store = AssociationStore::new(tagger.pool(), AssociationKey::new("test.task", 42));

    store.sync(&[ids[0], ids[1], ids[2]]).await.unwrap();
    let changes = store.sync(&[ids[2], ids[3], ids[3]]).await.unwrap();

    assert_eq!(changes.attached, vec![ids[3]]);
    assert_eq!(changes.detached, vec![ids[0], ids[1]]);
    assert_eq!(store.tag_ids().await.unwrap(), vec![ids[2], ids[3]]);

    // Same set again changes nothing
    assert!(store.sync(&[ids[3], ids[2]]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_failure_rolls_back() {
    let tagger = create_tagger().await;
    let tag = tagger
        .create_tag(TagCreateInput::new("A"))
        .await
        .unwrap();
    let store = AssociationStore::new(tagger.pool(), AssociationKey::new("test.task", 1));
    store.attach(tag.id).await.unwrap();

    // Unknown tag id violates the foreign key after the detach already ran
    let result = store.sync(&[9999]).await;
    assert!(result.is_err());
    assert_eq!(store.tag_ids().await.unwrap(), vec![tag.id]);
}

#[tokio::test]
async fn test_detach_all_for_tag_and_keys_for_tag() {
    let tagger = create_tagger().await;
    let tag = tagger
        .create_tag(TagCreateInput::new("A"))
        .await
        .unwrap();
    let other = tagger
        .create_tag(TagCreateInput::new("B"))
        .await
        .unwrap();
    let task = create_task(tagger.pool(), "Task").await;
    let note = create_note(tagger.pool(), "Note").await;
    tagger.associations(&note).attach(tag.id).await.unwrap();
    tagger.associations(&task).attach(tag.id).await.unwrap();
    tagger.associations(&task).attach(other.id).await.unwrap();

    let keys = AssociationStore::keys_for_tag(tagger.pool(), tag.id)
        .await
        .unwrap();
    assert_eq!(keys, vec![note.association_key(), task.association_key()]);

    let removed = AssociationStore::detach_all_for_tag(tagger.pool(), tag.id)
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(
        tagger.associations(&task).tag_ids().await.unwrap(),
        vec![other.id]
    );
}

#[rstest]
#[case::name_only(Some("Urgent"), None, 2)]
#[case::name_and_category(Some("Urgent"), Some("work"), 1)]
#[case::category_only(None, Some("work"), 2)]
#[case::unknown_category(Some("Urgent"), Some("garden"), 0)]
#[case::no_filters(None, None, 4)]
#[tokio::test]
async fn test_tag_query_filters(
    #[case] name: Option<&'static str>,
    #[case] category: Option<&'static str>,
    #[case] expected: usize,
) {
    let pool = create_test_db().await;
    let tagger = polytag_tags::Tagger::new(pool, TaggableRegistry::new());
    tagger
        .create("Urgent", Some("work"), None)
        .await
        .unwrap()
        .create("Urgent", Some("home"), None)
        .await
        .unwrap()
        .create("Meeting", Some("work"), None)
        .await
        .unwrap()
        .create("urgent", None, None)
        .await
        .unwrap();

    let mut query = TagQuery::new().category(category);
    if let Some(name) = name {
        query = query.name(name);
    }

    let tags = query.get(tagger.pool()).await.unwrap();
    assert_eq!(tags.len(), expected);
    for tag in &tags {
        if let Some(name) = name {
            assert_eq!(tag.name, name);
        }
        if let Some(category) = category {
            assert_eq!(tag.category.as_deref(), Some(category));
        }
    }
}

#[tokio::test]
async fn test_tag_query_first_picks_lowest_id() {
    let tagger = create_tagger().await;
    let first = tagger
        .create_tag(TagCreateInput::new("Dup").description("first"))
        .await
        .unwrap();
    tagger
        .create_tag(TagCreateInput::new("Dup").description("second"))
        .await
        .unwrap();

    let found = TagQuery::new()
        .name("Dup")
        .first(tagger.pool())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);

    let err = TagQuery::new()
        .name("Nope")
        .category(Some("x"))
        .first_or_fail(tagger.pool())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Tag 'Nope' not found (category: Some(\"x\"))");
}

#[tokio::test]
async fn test_tag_query_names() {
    let tagger = create_tagger().await;
    for name in ["A", "B", "C"] {
        tagger.create(name, Some("any"), None).await.unwrap();
    }

    let names = vec!["C".to_string(), "A".to_string(), "Z".to_string()];
    let tags = TagQuery::new().names(&names).get(tagger.pool()).await.unwrap();
    let found: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(found, vec!["A", "C"]);

    let empty: Vec<String> = Vec::new();
    assert!(TagQuery::new()
        .names(&empty)
        .get(tagger.pool())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_registry_lookup() {
    let pool = create_test_db().await;
    let task = create_task(&pool, "Task").await;
    let registry = TaggableRegistry::new().with::<Task>().with::<Note>();

    assert!(registry.is_registered("test.task"));
    assert!(!registry.is_registered("test.unknown"));
    assert_eq!(registry.types(), vec!["test.note", "test.task"]);

    let loaded = registry
        .load(&pool, "test.task", task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.key(), &task.association_key());
    assert_eq!(loaded.downcast_ref::<Task>(), Some(&task));
    assert!(loaded.downcast_ref::<Note>().is_none());

    assert!(registry
        .load(&pool, "test.task", task.id + 100)
        .await
        .unwrap()
        .is_none());
    assert!(registry.load(&pool, "test.unknown", 1).await.is_err());
}
