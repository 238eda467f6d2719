use super::*;
use crate::store::test_support::temp_db;
use proptest::prelude::*;

#[test]
fn test_status_parse_case_insensitive() {
    assert_eq!("pending".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
    assert_eq!("Completed".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
    let err = "done".parse::<TaskStatus>().unwrap_err();
    assert!(err.contains("Must be PENDING or COMPLETED"));
}

#[test]
fn test_task_serializes_without_owner() {
    let (_dir, db) = temp_db();
    let task = db.create_task("alice", "buy milk", "").unwrap();
    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(json["title"], "buy milk");
    assert_eq!(json["status"], "PENDING");
    assert!(json.get("owner_id").is_none());
}

#[test]
fn test_create_rejects_empty_title() {
    let (_dir, db) = temp_db();
    let err = db.create_task("alice", "   ", "desc").unwrap_err();
    assert_eq!(err.to_string(), "Title is required.");
}

#[test]
fn test_create_trims_title() {
    let (_dir, db) = temp_db();
    let task = db.create_task("alice", "  call mom  ", "").unwrap();
    assert_eq!(task.title, "call mom");
    assert_eq!(db.get_task("alice", task.id).unwrap().unwrap(), task);
}

#[test]
fn test_list_filters_by_status_and_owner() {
    let (_dir, db) = temp_db();
    let a = db.create_task("alice", "a", "").unwrap();
    let b = db.create_task("alice", "b", "").unwrap();
    db.create_task("bob", "c", "").unwrap();
    db.toggle_task("alice", b.id).unwrap();

    let all = db.list_tasks("alice", None).unwrap();
    assert_eq!(all.len(), 2);
    let pending = db.list_tasks("alice", Some(TaskStatus::Pending)).unwrap();
    assert_eq!(pending.iter().map(|t| t.id).collect::<Vec<_>>(), [a.id]);
    let completed = db.list_tasks("alice", Some(TaskStatus::Completed)).unwrap();
    assert_eq!(completed.iter().map(|t| t.id).collect::<Vec<_>>(), [b.id]);
}

#[test]
fn test_foreign_task_invisible() {
    let (_dir, db) = temp_db();
    let task = db.create_task("alice", "secret", "").unwrap();
    assert!(db.get_task("bob", task.id).unwrap().is_none());
    assert!(db.toggle_task("bob", task.id).unwrap().is_none());
    assert!(
        db.update_task("bob", task.id, &TaskUpdate::default())
            .unwrap()
            .is_none()
    );
    assert!(!db.delete_task("bob", task.id).unwrap());
    assert!(db.get_task("alice", task.id).unwrap().is_some());
}

#[test]
fn test_update_only_touches_given_fields() {
    let (_dir, db) = temp_db();
    let task = db.create_task("alice", "old title", "old desc").unwrap();
    let updated = db
        .update_task(
            "alice",
            task.id,
            &TaskUpdate {
                description: Some("new desc".into()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "old title");
    assert_eq!(updated.description, "new desc");
    assert!(updated.updated_at >= task.updated_at);
}

#[test]
fn test_update_ignores_blank_title() {
    let (_dir, db) = temp_db();
    let task = db.create_task("alice", "keep me", "").unwrap();
    let updated = db
        .update_task(
            "alice",
            task.id,
            &TaskUpdate {
                title: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "keep me");
}

#[test]
fn test_delete_removes_task() {
    let (_dir, db) = temp_db();
    let task = db.create_task("alice", "gone", "").unwrap();
    assert!(db.delete_task("alice", task.id).unwrap());
    assert!(db.get_task("alice", task.id).unwrap().is_none());
    assert!(!db.delete_task("alice", task.id).unwrap());
}

#[test]
fn test_concurrent_toggles_are_not_lost() {
    let (_dir, db) = temp_db();
    let db = std::sync::Arc::new(db);
    let ids: Vec<i64> = (0..100)
        .map(|i| db.create_task("alice", &format!("task {}", i), "").unwrap().id)
        .collect();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let db = db.clone();
            let ids = ids.clone();
            std::thread::spawn(move || {
                for id in ids {
                    db.toggle_task("alice", id).unwrap().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let completed = db.list_tasks("alice", Some(TaskStatus::Completed)).unwrap();
    assert!(completed.is_empty(), "{} tasks left toggled once", completed.len());
}

#[test]
fn test_update_does_not_overwrite_status() {
    let (_dir, db) = temp_db();
    let task = db.create_task("alice", "write report", "").unwrap();
    db.toggle_task("alice", task.id).unwrap();
    let updated = db
        .update_task(
            "alice",
            task.id,
            &TaskUpdate {
                title: Some("write the report".into()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.title, "write the report");
}

#[test]
fn test_toggle_foreign_task_is_none() {
    let (_dir, db) = temp_db();
    let task = db.create_task("alice", "mine", "").unwrap();
    assert!(db.toggle_task("bob", task.id).unwrap().is_none());
    assert_eq!(
        db.get_task("alice", task.id).unwrap().unwrap().status,
        TaskStatus::Pending
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn toggling_twice_restores_status(start_completed in any::<bool>()) {
        let (_dir, db) = temp_db();
        let task = db.create_task("prop", "toggle me", "").unwrap();
        if start_completed {
            db.toggle_task("prop", task.id).unwrap();
        }
        let before = db.get_task("prop", task.id).unwrap().unwrap().status;
        let once = db.toggle_task("prop", task.id).unwrap().unwrap().status;
        let twice = db.toggle_task("prop", task.id).unwrap().unwrap().status;
        prop_assert_ne!(once, before);
        prop_assert_eq!(twice, before);
    }
}
