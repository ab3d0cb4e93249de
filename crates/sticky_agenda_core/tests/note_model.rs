use chrono::{Days, Utc};
use serde_json::{json, Value};
use sticky_agenda_core::dates::{format_date, parse_date};
use sticky_agenda_core::{
    Note, NoteError, NoteRecord, NoteStatus, NoteUpdate, Priority, TodoRecord, TodoUpdate,
    ViewMode, Violation,
};

fn note_from(value: Value) -> Note {
    serde_json::from_value(value).unwrap()
}

#[test]
fn create_assigns_defaults() {
    let note = Note::create(NoteRecord::new("Plan week", "alice")).unwrap();

    assert!(note.id().starts_with("note_"));
    assert_eq!(note.status(), NoteStatus::Pending);
    assert_eq!(note.priority(), Priority::Medium);
    assert_eq!(note.category(), "general");
    assert_eq!(note.color(), "#ffeb3b");
    assert_eq!(note.position().x, 0.0);
    assert_eq!(note.position().y, 0.0);
    assert!(note.tags().is_empty());
    assert!(note.todos().is_empty());
    assert!(note.completed_at().is_none());
}

#[test]
fn create_sanitizes_user_text() {
    let mut record = NoteRecord::new("  <script>x</script> ", "O'Neil");
    record.description = Some("a & b".to_string());
    record.todos = Some(vec![TodoRecord::with_text("<i>one</i>")]);

    let note = Note::create(record).unwrap();
    assert_eq!(note.title(), "&lt;script&gt;x&lt;/script&gt;");
    assert_eq!(note.author(), "O&#x27;Neil");
    assert_eq!(note.description(), "a &amp; b");
    assert_eq!(note.todos()[0].text(), "&lt;i&gt;one&lt;/i&gt;");
}

#[test]
fn missing_title_and_bad_priority_are_reported_together() {
    let mut record = NoteRecord::new("", "alice");
    record.priority = Some(5);

    let err = Note::create(record).unwrap_err();
    assert!(err.contains(&Violation::TitleRequired));
    assert!(err.contains(&Violation::PriorityOutOfRange(5)));
    assert_eq!(err.violations().len(), 2);
}

#[test]
fn record_violations_cover_every_field_rule() {
    let err = Note::from_record(NoteRecord {
        title: Some("x".to_string()),
        author: Some(" ".to_string()),
        start_date: Some("2025-13-01".to_string()),
        status: Some("done".to_string()),
        color: Some("red".to_string()),
        todos: Some(vec![
            TodoRecord::with_text("ok"),
            TodoRecord::with_text(""),
        ]),
        ..NoteRecord::default()
    })
    .unwrap_err();

    assert!(err.contains(&Violation::AuthorRequired));
    assert!(err.contains(&Violation::InvalidDate {
        field: "startDate",
        value: "2025-13-01".to_string(),
    }));
    assert!(err.contains(&Violation::InvalidStatus("done".to_string())));
    assert!(err.contains(&Violation::InvalidColor("red".to_string())));
    assert!(err.contains(&Violation::Todo {
        index: 1,
        violation: Box::new(Violation::TodoTextRequired),
    }));
}

#[test]
fn duplicate_todo_ids_are_rejected() {
    let err = Note::from_record(NoteRecord {
        todos: Some(vec![
            TodoRecord {
                id: Some("todo_a".to_string()),
                ..TodoRecord::with_text("one")
            },
            TodoRecord {
                id: Some("todo_a".to_string()),
                ..TodoRecord::with_text("two")
            },
        ]),
        ..NoteRecord::new("title", "alice")
    })
    .unwrap_err();

    assert!(err.contains(&Violation::DuplicateTodoId("todo_a".to_string())));
}

#[test]
fn failed_update_leaves_note_untouched() {
    let mut note = Note::create(NoteRecord::new("Draft", "alice")).unwrap();
    let before = note.clone();

    let err = note
        .update(NoteUpdate {
            title: Some("   ".to_string()),
            priority: Some(9),
            ..NoteUpdate::default()
        })
        .unwrap_err();

    assert!(err.contains(&Violation::TitleRequired));
    assert!(err.contains(&Violation::PriorityOutOfRange(9)));
    assert_eq!(note, before);
}

#[test]
fn update_applies_fields_and_clears_dates() {
    let mut record = NoteRecord::new("Trip", "alice");
    record.end_date = Some("2025-05-01".to_string());
    let mut note = Note::create(record).unwrap();

    note.update(NoteUpdate {
        title: Some("Trip <2>".to_string()),
        priority: Some(1),
        category: Some("personal".to_string()),
        start_date: Some("2025-04-20".to_string()),
        end_date: Some(String::new()),
        tags: Some(vec!["travel".to_string(), "travel".to_string()]),
        ..NoteUpdate::default()
    })
    .unwrap();

    assert_eq!(note.title(), "Trip &lt;2&gt;");
    assert_eq!(note.priority(), Priority::High);
    assert_eq!(note.category(), "personal");
    assert_eq!(note.start_date(), parse_date("2025-04-20"));
    assert_eq!(note.end_date(), None);
    assert_eq!(note.tags().len(), 2);
}

#[test]
fn status_transitions_track_completion_time() {
    let mut note = Note::create(NoteRecord::new("Report", "alice")).unwrap();

    note.mark_completed();
    assert!(note.is_completed());
    let stamp = *note.completed_at().unwrap();
    note.mark_completed();
    assert_eq!(note.completed_at(), Some(&stamp));

    note.mark_pending();
    assert_eq!(note.status(), NoteStatus::Pending);
    assert!(note.completed_at().is_none());

    note.mark_completed();
    note.archive();
    assert_eq!(note.status(), NoteStatus::Archived);
    assert!(note.completed_at().is_none());
}

#[test]
fn position_must_be_finite() {
    let mut note = Note::create(NoteRecord::new("Board", "alice")).unwrap();

    note.update_position(120.5, -4.0).unwrap();
    assert_eq!(note.position().x, 120.5);

    let err = note.update_position(f64::NAN, 1.0).unwrap_err();
    assert!(err.contains(&Violation::NonFinitePosition));
    assert_eq!(note.position().x, 120.5);
}

#[test]
fn todo_progress_rounds_to_whole_percent() {
    let mut note = Note::create(NoteRecord::new("Chores", "alice")).unwrap();
    assert_eq!(note.todos_progress(), 0);

    let first = note.add_todo("dishes").unwrap().id().to_string();
    note.add_todo("laundry").unwrap();
    note.add_todo("vacuum").unwrap();

    assert!(note.toggle_todo(&first).unwrap());
    assert_eq!(note.todos_progress(), 33);
    assert_eq!(note.completed_todos().count(), 1);
    assert_eq!(note.pending_todos().count(), 2);

    assert!(!note.toggle_todo(&first).unwrap());
    assert_eq!(note.todos_progress(), 0);

    let ids: Vec<String> = note.todos().iter().map(|todo| todo.id().to_string()).collect();
    for id in &ids {
        note.toggle_todo(id).unwrap();
    }
    assert_eq!(note.todos_progress(), 100);
}

#[test]
fn todo_operations_report_unknown_ids() {
    let mut note = Note::create(NoteRecord::new("Chores", "alice")).unwrap();
    let id = note.add_todo("dishes").unwrap().id().to_string();

    assert_eq!(
        note.toggle_todo("todo_missing"),
        Err(NoteError::TodoNotFound("todo_missing".to_string()))
    );

    let updated = note
        .update_todo(
            &id,
            &TodoUpdate {
                text: Some("dishes & pans".to_string()),
                completed: Some(true),
            },
        )
        .unwrap();
    assert_eq!(updated.text(), "dishes &amp; pans");
    assert!(updated.is_completed());

    let blank = note.update_todo(
        &id,
        &TodoUpdate {
            text: Some(" ".to_string()),
            completed: None,
        },
    );
    assert!(matches!(blank, Err(NoteError::Validation(_))));

    let removed = note.remove_todo(&id).unwrap();
    assert_eq!(removed.id(), id);
    assert!(note.todos().is_empty());
    assert!(note.remove_todo(&id).is_err());
}

#[test]
fn due_predicates_follow_end_date() {
    let today = Utc::now().date_naive();
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap();

    let mut record = NoteRecord::new("Late", "alice");
    record.end_date = Some(format_date(yesterday));
    let mut late = Note::create(record).unwrap();
    assert!(late.is_overdue());
    assert!(late.stats().is_overdue);
    late.mark_completed();
    assert!(!late.is_overdue());

    let mut record = NoteRecord::new("Soon", "alice");
    record.end_date = Some(format_date(tomorrow));
    let soon = Note::create(record).unwrap();
    assert!(soon.is_due_tomorrow());
    assert!(!soon.is_due_today());
    assert!(!soon.is_overdue());

    let undated = Note::create(NoteRecord::new("Someday", "alice")).unwrap();
    assert!(!undated.is_overdue());
    assert!(!undated.is_due_today());
}

#[test]
fn search_reaches_todo_text_and_tags() {
    let note = note_from(json!({
        "title": "Weekend",
        "description": "Family stuff",
        "author": "alice",
        "tags": ["Garden"],
        "todos": [{ "text": "Buy Fertilizer" }]
    }));

    assert!(note.matches_search("fertilizer"));
    assert!(note.matches_search("garden"));
    assert!(note.matches_search("FAMILY"));
    assert!(!note.matches_search("office"));
}

#[test]
fn calendar_period_uses_dates_or_creation_day() {
    let dated = note_from(json!({
        "title": "Conference",
        "author": "alice",
        "createdAt": "2025-01-01T10:00:00Z",
        "startDate": "2025-03-03",
        "endDate": "2025-03-10"
    }));
    let reference = parse_date("2025-03-10").unwrap();
    assert!(dated.is_in_period(ViewMode::Day, reference));
    assert!(dated.is_in_period(ViewMode::Month, reference));
    assert!(!dated.is_in_period(ViewMode::Day, parse_date("2025-03-05").unwrap()));

    let undated = note_from(json!({
        "title": "Idea",
        "author": "alice",
        "createdAt": "2025-01-01T10:00:00Z"
    }));
    assert!(undated.is_in_period(ViewMode::Week, parse_date("2025-01-03").unwrap()));
    assert!(!undated.is_in_period(ViewMode::Week, parse_date("2025-01-05").unwrap()));
    assert_eq!(undated.effective_date(), parse_date("2025-01-01").unwrap());
}

#[test]
fn json_roundtrip_preserves_every_field() {
    let note = note_from(json!({
        "id": "note_fixed",
        "title": "Quarterly &amp; review",
        "description": "numbers",
        "author": "alice",
        "createdAt": "2025-02-01T09:30:00.250Z",
        "startDate": "2025-02-03",
        "endDate": "2025-02-07",
        "completedAt": "2025-02-06T17:00:00Z",
        "category": "work",
        "priority": 1,
        "tags": ["finance", "finance"],
        "status": "completed",
        "position": { "x": 10.5, "y": 20.0 },
        "color": "#A1B2C3",
        "todos": [{ "id": "todo_1", "text": "collect", "completed": true,
                    "createdAt": "2025-02-01T09:31:00Z", "completedAt": "2025-02-02T09:00:00Z" }],
        "attachments": [{ "kind": "link", "href": "https://example.com" }]
    }));

    let value = serde_json::to_value(&note).unwrap();
    assert_eq!(value["createdAt"], json!("2025-02-01T09:30:00.250Z"));
    assert_eq!(value["status"], json!("completed"));
    assert_eq!(value["priority"], json!(1));

    let restored: Note = serde_json::from_value(value).unwrap();
    assert_eq!(restored, note);
}

#[test]
fn completed_record_without_timestamp_is_stamped() {
    let note = note_from(json!({
        "title": "Done",
        "author": "alice",
        "status": "completed"
    }));
    assert!(note.completed_at().is_some());

    let err = Note::from_record(NoteRecord {
        status: Some("pending".to_string()),
        completed_at: Some("2025-01-01T00:00:00Z".to_string()),
        ..NoteRecord::new("Open", "alice")
    })
    .unwrap_err();
    assert!(err.contains(&Violation::CompletionMismatch { entity: "note" }));
}

#[test]
fn stats_summarize_todos_and_tags() {
    let note = note_from(json!({
        "title": "Move",
        "author": "alice",
        "tags": ["home", "boxes"],
        "todos": [
            { "text": "pack", "completed": true },
            { "text": "label" }
        ]
    }));

    let stats = note.stats();
    assert_eq!(stats.todos_count, 2);
    assert_eq!(stats.completed_todos_count, 1);
    assert_eq!(stats.todos_progress, 50);
    assert_eq!(stats.tags_count, 2);
    assert!(!stats.is_due_today);
}

#[test]
fn blank_category_update_is_rejected_and_roundtrip_holds() {
    let mut note = Note::create(NoteRecord::new("Sort inbox", "alice")).unwrap();
    let before = note.clone();

    let err = note
        .update(NoteUpdate {
            category: Some("  ".to_string()),
            ..NoteUpdate::default()
        })
        .unwrap_err();
    assert!(err.contains(&Violation::CategoryRequired));
    assert_eq!(note, before);

    note.update(NoteUpdate {
        category: Some("work".to_string()),
        ..NoteUpdate::default()
    })
    .unwrap();
    let restored = Note::from_record(note.to_record()).unwrap();
    assert_eq!(restored, note);
}
