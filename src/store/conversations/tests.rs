use super::*;
use crate::store::test_support::temp_db;
use proptest::prelude::*;

#[tokio::test]
async fn test_create_conversation_uses_seed_title() {
    let (_dir, db) = temp_db();
    let conv = db.get_or_create(None, "alice", "Add buy milk").await.unwrap();
    assert_eq!(conv.owner_id, "alice");
    assert_eq!(conv.title, "Add buy milk");
    assert_eq!(conv.created_at, conv.updated_at);
}

#[tokio::test]
async fn test_blank_seed_title_gets_default() {
    let (_dir, db) = temp_db();
    let conv = db.get_or_create(None, "alice", "   ").await.unwrap();
    assert_eq!(conv.title, DEFAULT_TITLE);
}

#[tokio::test]
async fn test_existing_conversation_resolved_for_owner() {
    let (_dir, db) = temp_db();
    let created = db.get_or_create(None, "alice", "first").await.unwrap();
    let resolved = db
        .get_or_create(Some(created.id), "alice", "ignored")
        .await
        .unwrap();
    assert_eq!(resolved.id, created.id);
    assert_eq!(resolved.title, "first");
}

#[tokio::test]
async fn test_foreign_conversation_access_denied() {
    let (_dir, db) = temp_db();
    let created = db.get_or_create(None, "alice", "mine").await.unwrap();
    let err = db
        .get_or_create(Some(created.id), "bob", "")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskpilotError::AccessDenied { conversation_id } if conversation_id == created.id
    ));
}

#[tokio::test]
async fn test_unknown_conversation_not_found() {
    let (_dir, db) = temp_db();
    let err = db.get_or_create(Some(9999), "alice", "").await.unwrap_err();
    assert!(matches!(err, TaskpilotError::NotFound(_)));
    assert!(db.list_conversations("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_preserves_append_order() {
    let (_dir, db) = temp_db();
    let conv = db.get_or_create(None, "alice", "t").await.unwrap();
    db.append_message(conv.id, MessageRole::User, "one").await.unwrap();
    db.append_message(conv.id, MessageRole::Assistant, "two").await.unwrap();
    db.append_message(conv.id, MessageRole::User, "three").await.unwrap();

    let history = db.load_history(conv.id).await.unwrap();
    let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["one", "two", "three"]);
    assert_eq!(history[1].role, MessageRole::Assistant);
}

#[tokio::test]
async fn test_empty_content_not_persisted() {
    let (_dir, db) = temp_db();
    let conv = db.get_or_create(None, "alice", "t").await.unwrap();
    let skipped = db
        .append_message(conv.id, MessageRole::Assistant, "")
        .await
        .unwrap();
    assert!(skipped.is_none());
    assert!(db.load_history(conv.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_append_bumps_updated_at() {
    let (_dir, db) = temp_db();
    let conv = db.get_or_create(None, "alice", "t").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    db.append_message(conv.id, MessageRole::User, "hello").await.unwrap();
    let reloaded = db.get_conversation(conv.id).unwrap().unwrap();
    assert!(reloaded.updated_at > conv.updated_at);
    assert_eq!(reloaded.created_at, conv.created_at);
}

#[tokio::test]
async fn test_list_conversations_scoped_and_recent_first() {
    let (_dir, db) = temp_db();
    let older = db.get_or_create(None, "alice", "older").await.unwrap();
    let newer = db.get_or_create(None, "alice", "newer").await.unwrap();
    db.get_or_create(None, "bob", "bob's").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    db.append_message(older.id, MessageRole::User, "bump").await.unwrap();

    let listed = db.list_conversations("alice").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|c| c.id).collect();
    assert_eq!(ids, [older.id, newer.id]);
}

#[test]
fn test_message_role_parse() {
    assert_eq!("tool".parse::<MessageRole>().unwrap(), MessageRole::Tool);
    assert!("system".parse::<MessageRole>().is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn history_keeps_only_non_empty_in_order(
        contents in proptest::collection::vec(prop_oneof![Just(String::new()), "[a-z ]{1,12}"], 0..20)
    ) {
        let (_dir, db) = temp_db();
        let conv = db.resolve_conversation(None, "prop", "p").unwrap();
        for content in &contents {
            db.insert_message(conv.id, MessageRole::User, content).unwrap();
        }
        let expected: Vec<&str> = contents
            .iter()
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
            .collect();
        let history = db.select_history(conv.id).unwrap();
        let actual: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        prop_assert_eq!(actual, expected);
    }
}
