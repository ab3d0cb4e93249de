//! Structural record shapes exchanged with storage and embedding callers.
//!
//! # Responsibility
//! - Define the camelCase wire form of notes and todos.
//! - Provide field parsers that turn raw values into typed ones while
//!   collecting violations.
//!
//! # Invariants
//! - Every record field is optional; defaults are assigned by entity
//!   construction, not here.
//! - Empty strings in optional date/enum fields mean "absent".

use crate::dates;
use crate::model::note::Position;
use crate::validation::{ValidationReport, Violation};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record form of a todo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoRecord {
    pub id: Option<String>,
    pub text: Option<String>,
    pub completed: Option<bool>,
    /// RFC 3339 instant.
    pub created_at: Option<String>,
    /// RFC 3339 instant; present only for completed todos.
    pub completed_at: Option<String>,
}

impl TodoRecord {
    /// Minimal record carrying only todo text.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Record form of a note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    /// RFC 3339 instant.
    pub created_at: Option<String>,
    /// `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// RFC 3339 instant; present only for completed notes.
    pub completed_at: Option<String>,
    pub category: Option<String>,
    /// 1 = high, 2 = medium, 3 = low.
    pub priority: Option<i64>,
    pub tags: Option<Vec<String>>,
    /// `pending|completed|archived`.
    pub status: Option<String>,
    pub position: Option<Position>,
    /// `#RRGGBB`.
    pub color: Option<String>,
    pub todos: Option<Vec<TodoRecord>>,
    /// Opaque payloads kept as-is.
    pub attachments: Option<Vec<Value>>,
}

impl NoteRecord {
    /// Minimal record carrying the two required fields.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            author: Some(author.into()),
            ..Self::default()
        }
    }
}

/// Returns the value unless it is missing or blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Parses an optional `YYYY-MM-DD` field, recording a violation when malformed.
pub(crate) fn parse_optional_date(
    value: Option<&str>,
    field: &'static str,
    report: &mut ValidationReport,
) -> Option<NaiveDate> {
    let raw = non_blank(value)?;
    match dates::parse_date(raw) {
        Some(date) => Some(date),
        None => {
            report.push(Violation::InvalidDate {
                field,
                value: raw.to_string(),
            });
            None
        }
    }
}

/// Parses an optional instant field, recording a violation when malformed.
///
/// The outer `Option` distinguishes "absent" (`Some(None)`) from "malformed"
/// (`None`) so callers never substitute a default for a bad value.
pub(crate) fn parse_optional_timestamp(
    value: Option<&str>,
    field: &'static str,
    report: &mut ValidationReport,
) -> Option<Option<DateTime<Utc>>> {
    let Some(raw) = non_blank(value) else {
        return Some(None);
    };
    match dates::parse_timestamp(raw) {
        Some(instant) => Some(Some(instant)),
        None => {
            report.push(Violation::InvalidTimestamp {
                field,
                value: raw.to_string(),
            });
            None
        }
    }
}

pub(crate) fn format_optional_date(value: Option<NaiveDate>) -> Option<String> {
    value.map(dates::format_date)
}

pub(crate) fn format_optional_timestamp(value: Option<&DateTime<Utc>>) -> Option<String> {
    value.map(dates::format_timestamp)
}
