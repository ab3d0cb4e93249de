use serde_json::json;
use sticky_agenda_core::{Todo, TodoRecord, Violation};

#[test]
fn create_sanitizes_text_and_starts_pending() {
    let todo = Todo::create("  call <Bob>  ").unwrap();

    assert!(todo.id().starts_with("todo_"));
    assert_eq!(todo.text(), "call &lt;Bob&gt;");
    assert!(!todo.is_completed());
    assert!(todo.completed_at().is_none());
}

#[test]
fn create_rejects_blank_text() {
    let err = Todo::create("   ").unwrap_err();
    assert_eq!(err.violations(), &[Violation::TodoTextRequired]);
}

#[test]
fn completion_is_idempotent_and_reversible() {
    let mut todo = Todo::create("water plants").unwrap();

    todo.mark_completed();
    let first_stamp = *todo.completed_at().unwrap();
    todo.mark_completed();
    assert!(todo.is_completed());
    assert_eq!(todo.completed_at(), Some(&first_stamp));

    todo.mark_pending();
    assert!(!todo.is_completed());
    assert!(todo.completed_at().is_none());
    todo.mark_pending();
    assert!(todo.completed_at().is_none());
}

#[test]
fn update_text_keeps_todo_on_blank_input() {
    let mut todo = Todo::create("draft").unwrap();

    assert!(todo.update_text(" \t ").is_err());
    assert_eq!(todo.text(), "draft");

    todo.update_text("final & done").unwrap();
    assert_eq!(todo.text(), "final &amp; done");
}

#[test]
fn completed_record_without_timestamp_gets_stamped() {
    let todo = Todo::from_record(TodoRecord {
        text: Some("ship".to_string()),
        completed: Some(true),
        ..TodoRecord::default()
    })
    .unwrap();

    assert!(todo.is_completed());
    assert!(todo.completed_at().is_some());
}

#[test]
fn pending_record_with_completion_timestamp_is_rejected() {
    let err = Todo::from_record(TodoRecord {
        text: Some("ship".to_string()),
        completed: Some(false),
        completed_at: Some("2025-01-01T10:00:00Z".to_string()),
        ..TodoRecord::default()
    })
    .unwrap_err();

    assert!(err.contains(&Violation::CompletionMismatch { entity: "todo" }));
}

#[test]
fn malformed_timestamp_is_reported_with_field_name() {
    let err = Todo::from_record(TodoRecord {
        text: Some("ship".to_string()),
        created_at: Some("yesterday".to_string()),
        ..TodoRecord::default()
    })
    .unwrap_err();

    assert!(err.contains(&Violation::InvalidTimestamp {
        field: "createdAt",
        value: "yesterday".to_string(),
    }));
}

#[test]
fn record_roundtrip_is_lossless() {
    let mut todo = Todo::create("book & pay").unwrap();
    todo.mark_completed();

    let restored = Todo::from_record(todo.to_record()).unwrap();
    assert_eq!(restored, todo);
}

#[test]
fn serializes_with_camel_case_keys() {
    let value = serde_json::to_value(
        Todo::from_record(TodoRecord {
            id: Some("todo_fixed".to_string()),
            text: Some("read".to_string()),
            created_at: Some("2025-01-01T08:00:00Z".to_string()),
            ..TodoRecord::default()
        })
        .unwrap(),
    )
    .unwrap();

    assert_eq!(value["id"], json!("todo_fixed"));
    assert_eq!(value["createdAt"], json!("2025-01-01T08:00:00Z"));
    assert_eq!(value["completed"], json!(false));
    assert!(value["completedAt"].is_null());
}

#[test]
fn search_is_case_insensitive() {
    let todo = Todo::create("Book Hotel").unwrap();
    assert!(todo.matches_search("hotel"));
    assert!(todo.matches_search(""));
    assert!(!todo.matches_search("flight"));
}

#[test]
fn stats_report_time_to_complete() {
    let done = Todo::from_record(TodoRecord {
        text: Some("review".to_string()),
        completed: Some(true),
        created_at: Some("2025-01-01T08:00:00Z".to_string()),
        completed_at: Some("2025-01-01T10:30:00Z".to_string()),
        ..TodoRecord::default()
    })
    .unwrap();

    let stats = done.stats();
    assert!(stats.completed);
    assert_eq!(stats.text_length, 6);
    assert_eq!(stats.time_to_complete, Some(chrono::Duration::minutes(150)));

    let open = Todo::create("later").unwrap().stats();
    assert!(!open.completed);
    assert_eq!(open.time_to_complete, None);
}
