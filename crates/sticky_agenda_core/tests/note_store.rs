use rusqlite::Connection;
use serde_json::json;
use sticky_agenda_core::db::{open_db, open_db_in_memory};
use sticky_agenda_core::{
    AgendaConfig, AgendaService, Note, NoteRecord, NoteStore, SqliteNoteStore, StoreError,
};

fn record(id: &str, title: &str) -> NoteRecord {
    NoteRecord {
        id: Some(id.to_string()),
        ..NoteRecord::new(title, "alice")
    }
}

#[test]
fn store_requires_migrated_connection() {
    let mut raw = Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteNoteStore::try_new(&mut raw),
        Err(StoreError::InvalidData(_))
    ));
}

#[test]
fn save_replaces_snapshot_and_keeps_order() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    assert!(store.load().unwrap().is_empty());
    assert!(store.last_saved().unwrap().is_none());

    store
        .save(&[record("b", "Second"), record("a", "First"), record("c", "Third")])
        .unwrap();
    store.save(&[record("c", "Third"), record("a", "First")]).unwrap();

    let loaded = store.load().unwrap();
    let ids: Vec<&str> = loaded
        .iter()
        .map(|value| value["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c", "a"]);

    let info = store.last_saved().unwrap().unwrap();
    assert_eq!(info.note_count, 2);
}

#[test]
fn saved_records_parse_back_into_notes() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();

    let note = Note::from_record(NoteRecord {
        tags: Some(vec!["x".to_string()]),
        end_date: Some("2025-07-01".to_string()),
        attachments: Some(vec![json!({ "name": "plan.pdf" })]),
        ..record("n1", "Plan")
    })
    .unwrap();
    store.save(&[note.to_record()]).unwrap();

    let loaded = store.load().unwrap();
    let restored: Note = serde_json::from_value(loaded[0].clone()).unwrap();
    assert_eq!(restored, note);
}

#[test]
fn agenda_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agenda.db");
    let config = AgendaConfig {
        auto_save: true,
        ..AgendaConfig::default()
    };

    let note_id = {
        let mut conn = open_db(&path).unwrap();
        let store = SqliteNoteStore::try_new(&mut conn).unwrap();
        let mut service = AgendaService::new(store, config.clone());
        let id = service
            .add_note(NoteRecord::new("Persist me", "alice"))
            .unwrap()
            .id()
            .to_string();
        let todo_id = service.add_todo(&id, "first step").unwrap();
        service.toggle_todo(&id, &todo_id).unwrap();
        id
    };

    let mut conn = open_db(&path).unwrap();
    let store = SqliteNoteStore::try_new(&mut conn).unwrap();
    let mut service = AgendaService::new(store, config);
    let report = service.load().unwrap();

    assert_eq!(report.loaded, 1);
    let note = service.note(&note_id).unwrap();
    assert_eq!(note.title(), "Persist me");
    assert_eq!(note.todos_progress(), 100);
}
