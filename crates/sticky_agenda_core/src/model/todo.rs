//! Todo entity: a checkable sub-task owned by one note.
//!
//! # Invariants
//! - `id` and `created_at` never change after construction.
//! - `completed_at` is `Some` exactly when `completed` is `true`.
//! - `text` is never blank.

use crate::dates;
use crate::model::record::{
    format_optional_timestamp, non_blank, parse_optional_timestamp, TodoRecord,
};
use crate::validation::{sanitize_text, validate_todo, ValidationError, ValidationReport, Violation};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque todo identifier, unique within the owning note.
pub type TodoId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TodoRecord", into = "TodoRecord")]
pub struct Todo {
    id: TodoId,
    text: String,
    completed: bool,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Partial todo change applied through the owning note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoUpdate {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

/// Per-todo summary for completion analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoStats {
    /// Length of the stored text in characters.
    pub text_length: usize,
    pub completed: bool,
    /// Time from creation to completion; `None` while pending.
    pub time_to_complete: Option<Duration>,
}

pub(crate) fn generate_todo_id() -> TodoId {
    format!("todo_{}", Uuid::new_v4().simple())
}

impl Todo {
    /// Creates a pending todo from user text.
    ///
    /// # Errors
    /// - `TodoTextRequired` when the text is blank after sanitization.
    pub fn create(text: &str) -> Result<Self, ValidationError> {
        let todo = Self {
            id: generate_todo_id(),
            text: sanitize_text(text),
            completed: false,
            created_at: dates::now(),
            completed_at: None,
        };
        validate_todo(&todo).into_result()?;
        Ok(todo)
    }

    /// Builds a todo from its record form.
    ///
    /// Stored text is taken verbatim; sanitization happens on user writes only.
    /// A completed record without `completedAt` is stamped with the current
    /// instant.
    pub fn from_record(record: TodoRecord) -> Result<Self, ValidationError> {
        let mut report = ValidationReport::new();

        let text = record.text.unwrap_or_default();
        if text.trim().is_empty() {
            report.push(Violation::TodoTextRequired);
        }
        let completed = record.completed.unwrap_or(false);
        let created_at =
            parse_optional_timestamp(record.created_at.as_deref(), "createdAt", &mut report);
        let completed_at =
            parse_optional_timestamp(record.completed_at.as_deref(), "completedAt", &mut report);

        if !completed && matches!(completed_at, Some(Some(_))) {
            report.push(Violation::CompletionMismatch { entity: "todo" });
        }
        report.into_result()?;

        let completed_at = match completed_at.flatten() {
            Some(instant) => Some(instant),
            None if completed => Some(dates::now()),
            None => None,
        };

        Ok(Self {
            id: non_blank(record.id.as_deref())
                .map(str::to_string)
                .unwrap_or_else(generate_todo_id),
            text,
            completed,
            created_at: created_at.flatten().unwrap_or_else(dates::now),
            completed_at,
        })
    }

    pub fn to_record(&self) -> TodoRecord {
        TodoRecord {
            id: Some(self.id.clone()),
            text: Some(self.text.clone()),
            completed: Some(self.completed),
            created_at: Some(dates::format_timestamp(&self.created_at)),
            completed_at: format_optional_timestamp(self.completed_at.as_ref()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn completed_at(&self) -> Option<&DateTime<Utc>> {
        self.completed_at.as_ref()
    }

    /// No-op when already completed.
    pub fn mark_completed(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.completed_at = Some(dates::now());
    }

    /// No-op when already pending.
    pub fn mark_pending(&mut self) {
        if !self.completed {
            return;
        }
        self.completed = false;
        self.completed_at = None;
    }

    pub fn set_completed(&mut self, completed: bool) {
        if completed {
            self.mark_completed();
        } else {
            self.mark_pending();
        }
    }

    /// Replaces the text after sanitizing it. Leaves the todo unchanged on error.
    pub fn update_text(&mut self, new_text: &str) -> Result<(), ValidationError> {
        let sanitized = sanitize_text(new_text);
        if sanitized.is_empty() {
            return Err(ValidationError::single(Violation::TodoTextRequired));
        }
        self.text = sanitized;
        Ok(())
    }

    /// Case-insensitive substring match; an empty query matches everything.
    pub fn matches_search(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        self.text.to_lowercase().contains(&query.to_lowercase())
    }

    pub fn stats(&self) -> TodoStats {
        TodoStats {
            text_length: self.text.chars().count(),
            completed: self.completed,
            time_to_complete: self
                .completed_at
                .map(|completed_at| completed_at - self.created_at),
        }
    }

    /// Applies a partial change, validating before committing.
    pub(crate) fn apply_update(&mut self, changes: &TodoUpdate) -> Result<(), ValidationError> {
        let mut candidate = self.clone();
        if let Some(text) = changes.text.as_deref() {
            candidate.update_text(text)?;
        }
        if let Some(completed) = changes.completed {
            candidate.set_completed(completed);
        }
        validate_todo(&candidate).into_result()?;
        *self = candidate;
        Ok(())
    }
}

impl TryFrom<TodoRecord> for Todo {
    type Error = ValidationError;

    fn try_from(value: TodoRecord) -> Result<Self, Self::Error> {
        Self::from_record(value)
    }
}

impl From<Todo> for TodoRecord {
    fn from(value: Todo) -> Self {
        value.to_record()
    }
}
