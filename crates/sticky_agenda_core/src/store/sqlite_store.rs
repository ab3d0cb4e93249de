//! SQLite-backed snapshot store.
//!
//! # Invariants
//! - Requires a connection migrated by `db::open_db*`.
//! - `save` swaps the whole snapshot and its metadata in one transaction.
//! - Slots preserve the order notes were saved in.

use super::{NoteStore, StoreError, StoreResult};
use crate::db::migrations::latest_version;
use crate::model::record::NoteRecord;
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::time::Instant;

/// Metadata of the most recent save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub saved_at: DateTime<Utc>,
    pub note_count: usize,
}

pub struct SqliteNoteStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the schema is not at the latest version.
    pub fn try_new(conn: &'conn mut Connection) -> StoreResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Returns metadata of the last save, or `None` before the first one.
    pub fn last_saved(&self) -> StoreResult<Option<SnapshotInfo>> {
        let row = self
            .conn
            .query_row(
                "SELECT saved_at, note_count FROM snapshot_meta WHERE id = 1;",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((saved_at_ms, note_count)) = row else {
            return Ok(None);
        };
        let saved_at = DateTime::from_timestamp_millis(saved_at_ms).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid saved_at value `{saved_at_ms}`"))
        })?;
        let note_count = usize::try_from(note_count).map_err(|_| {
            StoreError::InvalidData(format!("invalid note_count value `{note_count}`"))
        })?;
        Ok(Some(SnapshotInfo {
            saved_at,
            note_count,
        }))
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn load(&self) -> StoreResult<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT slot, payload FROM note_snapshots ORDER BY slot ASC;")?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let slot: i64 = row.get(0)?;
            let payload: String = row.get(1)?;
            let value: Value = serde_json::from_str(&payload).map_err(|err| {
                StoreError::InvalidData(format!("payload in slot {slot} is not JSON: {err}"))
            })?;
            records.push(value);
        }

        Ok(records)
    }

    fn save(&mut self, records: &[NoteRecord]) -> StoreResult<()> {
        let started_at = Instant::now();
        let payloads = records
            .iter()
            .map(|record| {
                serde_json::to_string(record)
                    .map(|payload| (record.id.clone().unwrap_or_default(), payload))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM note_snapshots;", [])?;
        for (slot, (note_id, payload)) in payloads.iter().enumerate() {
            tx.execute(
                "INSERT INTO note_snapshots (slot, note_id, payload) VALUES (?1, ?2, ?3);",
                params![slot as i64, note_id, payload],
            )?;
        }
        tx.execute(
            "INSERT INTO snapshot_meta (id, saved_at, note_count) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                saved_at = excluded.saved_at,
                note_count = excluded.note_count;",
            params![Utc::now().timestamp_millis(), payloads.len() as i64],
        )?;
        tx.commit()?;

        info!(
            "event=snapshot_save module=store status=ok note_count={} duration_ms={}",
            payloads.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

fn ensure_schema_ready(conn: &Connection) -> StoreResult<()> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();
    if version != latest {
        return Err(StoreError::InvalidData(format!(
            "connection schema version {version} does not match {latest}; open it with db::open_db"
        )));
    }
    Ok(())
}
