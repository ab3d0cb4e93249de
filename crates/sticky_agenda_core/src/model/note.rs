//! Note entity: the sticky-note task record.
//!
//! # Responsibility
//! - Own the note's todos and enforce note-level invariants on every write.
//! - Answer calendar and filter predicates used by agenda views.
//!
//! # Invariants
//! - A `Note` value is always valid: construction and every mutation
//!   re-validate and leave the note untouched on failure.
//! - `completed_at` is `Some` exactly when `status == Completed`.
//! - Todo ids are unique within one note.
//! - Tags keep insertion order and duplicates.

use crate::dates::{self, ViewMode};
use crate::filter::FilterCriteria;
use crate::model::record::{
    format_optional_date, format_optional_timestamp, non_blank, parse_optional_date,
    parse_optional_timestamp, NoteRecord, TodoRecord,
};
use crate::model::todo::{Todo, TodoId, TodoUpdate};
use crate::validation::{
    check_unique_todo_ids, is_hex_color, sanitize_text, validate_note, ValidationError,
    ValidationReport, Violation,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque note identifier.
pub type NoteId = String;

/// Fallback sticky-note color.
pub const DEFAULT_NOTE_COLOR: &str = "#ffeb3b";
/// Category assigned when a record has none.
pub const DEFAULT_CATEGORY: &str = "general";

/// Note urgency; lower level means more urgent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High = 1,
    #[default]
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Self::High),
            2 => Some(Self::Medium),
            3 => Some(Self::Low),
            _ => None,
        }
    }
}

/// Note lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    #[default]
    Pending,
    Completed,
    Archived,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Free-form board placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Partial note change.
///
/// Dates use an empty string to clear the field. `priority` stays raw so
/// out-of-range levels surface as validation violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub color: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Failure of a note mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    Validation(ValidationError),
    /// Referenced todo is not owned by the note.
    TodoNotFound(TodoId),
}

impl Display for NoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TodoNotFound(id) => write!(f, "todo not found: {id}"),
        }
    }
}

impl Error for NoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::TodoNotFound(_) => None,
        }
    }
}

impl From<ValidationError> for NoteError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Per-note summary for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteStats {
    pub todos_count: usize,
    pub completed_todos_count: usize,
    pub todos_progress: u8,
    pub tags_count: usize,
    pub is_overdue: bool,
    pub is_due_today: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NoteRecord", into = "NoteRecord")]
pub struct Note {
    id: NoteId,
    title: String,
    description: String,
    author: String,
    created_at: DateTime<Utc>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    completed_at: Option<DateTime<Utc>>,
    category: String,
    priority: Priority,
    tags: Vec<String>,
    status: NoteStatus,
    position: Position,
    color: String,
    todos: Vec<Todo>,
    attachments: Vec<Value>,
}

fn generate_note_id() -> NoteId {
    format!("note_{}", Uuid::new_v4().simple())
}

impl Note {
    /// Builds a note from its stored record form.
    ///
    /// Missing optional fields get defaults. Text is taken verbatim so
    /// `from_record(to_record())` is lossless; use [`Note::create`] for user
    /// input.
    ///
    /// # Errors
    /// Returns every violated rule, including those of nested todos.
    pub fn from_record(record: NoteRecord) -> Result<Self, ValidationError> {
        let mut report = ValidationReport::new();

        let title = record.title.unwrap_or_default();
        if title.trim().is_empty() {
            report.push(Violation::TitleRequired);
        }
        let author = record.author.unwrap_or_default();
        if author.trim().is_empty() {
            report.push(Violation::AuthorRequired);
        }

        let start_date =
            parse_optional_date(record.start_date.as_deref(), "startDate", &mut report);
        let end_date = parse_optional_date(record.end_date.as_deref(), "endDate", &mut report);
        let created_at =
            parse_optional_timestamp(record.created_at.as_deref(), "createdAt", &mut report);
        let completed_at =
            parse_optional_timestamp(record.completed_at.as_deref(), "completedAt", &mut report);

        let priority = match record.priority {
            None => Some(Priority::default()),
            Some(level) => {
                let parsed = Priority::from_level(level);
                if parsed.is_none() {
                    report.push(Violation::PriorityOutOfRange(level));
                }
                parsed
            }
        };

        let status = match non_blank(record.status.as_deref()) {
            None => Some(NoteStatus::default()),
            Some(raw) => {
                let parsed = NoteStatus::parse(raw);
                if parsed.is_none() {
                    report.push(Violation::InvalidStatus(raw.to_string()));
                }
                parsed
            }
        };

        let color = match non_blank(record.color.as_deref()) {
            None => DEFAULT_NOTE_COLOR.to_string(),
            Some(raw) => {
                if !is_hex_color(raw) {
                    report.push(Violation::InvalidColor(raw.to_string()));
                }
                raw.to_string()
            }
        };

        let position = record.position.unwrap_or_default();
        if !position.x.is_finite() || !position.y.is_finite() {
            report.push(Violation::NonFinitePosition);
        }

        if status.is_some_and(|status| status != NoteStatus::Completed)
            && matches!(completed_at, Some(Some(_)))
        {
            report.push(Violation::CompletionMismatch { entity: "note" });
        }

        let mut todos = Vec::new();
        for (index, todo_record) in record.todos.unwrap_or_default().into_iter().enumerate() {
            match Todo::from_record(todo_record) {
                Ok(todo) => todos.push(todo),
                Err(err) => report.push_todo_report(index, err.into()),
            }
        }
        check_unique_todo_ids(todos.iter().map(Todo::id), &mut report);

        report.into_result()?;

        let status = status.unwrap_or_default();
        let completed_at = match completed_at.flatten() {
            Some(instant) => Some(instant),
            None if status == NoteStatus::Completed => Some(dates::now()),
            None => None,
        };

        Ok(Self {
            id: non_blank(record.id.as_deref())
                .map(str::to_string)
                .unwrap_or_else(generate_note_id),
            title,
            description: record.description.unwrap_or_default(),
            author,
            created_at: created_at.flatten().unwrap_or_else(dates::now),
            start_date,
            end_date,
            completed_at,
            category: non_blank(record.category.as_deref())
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
            priority: priority.unwrap_or_default(),
            tags: record.tags.unwrap_or_default(),
            status,
            position,
            color,
            todos,
            attachments: record.attachments.unwrap_or_default(),
        })
    }

    /// Builds a note from user input, sanitizing every free-text field first.
    pub fn create(mut record: NoteRecord) -> Result<Self, ValidationError> {
        record.title = record.title.as_deref().map(sanitize_text);
        record.description = record.description.as_deref().map(sanitize_text);
        record.author = record.author.as_deref().map(sanitize_text);
        if let Some(todos) = record.todos.as_mut() {
            for todo in todos.iter_mut() {
                todo.text = todo.text.as_deref().map(sanitize_text);
            }
        }
        Self::from_record(record)
    }

    pub fn to_record(&self) -> NoteRecord {
        NoteRecord {
            id: Some(self.id.clone()),
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            author: Some(self.author.clone()),
            created_at: Some(dates::format_timestamp(&self.created_at)),
            start_date: format_optional_date(self.start_date),
            end_date: format_optional_date(self.end_date),
            completed_at: format_optional_timestamp(self.completed_at.as_ref()),
            category: Some(self.category.clone()),
            priority: Some(i64::from(self.priority.level())),
            tags: Some(self.tags.clone()),
            status: Some(self.status.as_str().to_string()),
            position: Some(self.position),
            color: Some(self.color.clone()),
            todos: Some(self.todos.iter().map(Todo::to_record).collect::<Vec<TodoRecord>>()),
            attachments: Some(self.attachments.clone()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn completed_at(&self) -> Option<&DateTime<Utc>> {
        self.completed_at.as_ref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn status(&self) -> NoteStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == NoteStatus::Completed
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn todo(&self, todo_id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id() == todo_id)
    }

    pub fn attachments(&self) -> &[Value] {
        &self.attachments
    }

    /// Applies a partial change; the note is untouched when any rule fails.
    pub fn update(&mut self, changes: NoteUpdate) -> Result<(), ValidationError> {
        let mut report = ValidationReport::new();
        let mut candidate = self.clone();

        if let Some(title) = changes.title.as_deref() {
            candidate.title = sanitize_text(title);
        }
        if let Some(description) = changes.description.as_deref() {
            candidate.description = sanitize_text(description);
        }
        if let Some(author) = changes.author.as_deref() {
            candidate.author = sanitize_text(author);
        }
        if let Some(category) = changes.category {
            candidate.category = category;
        }
        if let Some(level) = changes.priority {
            match Priority::from_level(level) {
                Some(priority) => candidate.priority = priority,
                None => report.push(Violation::PriorityOutOfRange(level)),
            }
        }
        if let Some(raw) = changes.start_date.as_deref() {
            candidate.start_date = parse_optional_date(Some(raw), "startDate", &mut report);
        }
        if let Some(raw) = changes.end_date.as_deref() {
            candidate.end_date = parse_optional_date(Some(raw), "endDate", &mut report);
        }
        if let Some(color) = changes.color {
            candidate.color = color;
        }
        if let Some(tags) = changes.tags {
            candidate.tags = tags;
        }

        report.merge(validate_note(&candidate));
        report.into_result()?;
        *self = candidate;
        Ok(())
    }

    /// No-op when already completed.
    pub fn mark_completed(&mut self) {
        if self.status == NoteStatus::Completed {
            return;
        }
        self.status = NoteStatus::Completed;
        self.completed_at = Some(dates::now());
    }

    /// No-op when already pending.
    pub fn mark_pending(&mut self) {
        if self.status == NoteStatus::Pending {
            return;
        }
        self.status = NoteStatus::Pending;
        self.completed_at = None;
    }

    pub fn archive(&mut self) {
        self.status = NoteStatus::Archived;
        self.completed_at = None;
    }

    pub fn update_position(&mut self, x: f64, y: f64) -> Result<(), ValidationError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ValidationError::single(Violation::NonFinitePosition));
        }
        self.position = Position { x, y };
        Ok(())
    }

    /// Appends a new pending todo built from user text.
    pub fn add_todo(&mut self, text: &str) -> Result<&Todo, ValidationError> {
        let todo = Todo::create(text)?;
        let index = self.todos.len();
        self.todos.push(todo);
        Ok(&self.todos[index])
    }

    pub fn update_todo(&mut self, todo_id: &str, changes: &TodoUpdate) -> Result<&Todo, NoteError> {
        let index = self.todo_index(todo_id)?;
        self.todos[index].apply_update(changes)?;
        Ok(&self.todos[index])
    }

    /// Flips completion of one todo and returns its new state.
    pub fn toggle_todo(&mut self, todo_id: &str) -> Result<bool, NoteError> {
        let index = self.todo_index(todo_id)?;
        let todo = &mut self.todos[index];
        let completed = !todo.is_completed();
        todo.set_completed(completed);
        Ok(completed)
    }

    pub fn remove_todo(&mut self, todo_id: &str) -> Result<Todo, NoteError> {
        let index = self.todo_index(todo_id)?;
        Ok(self.todos.remove(index))
    }

    fn todo_index(&self, todo_id: &str) -> Result<usize, NoteError> {
        self.todos
            .iter()
            .position(|todo| todo.id() == todo_id)
            .ok_or_else(|| NoteError::TodoNotFound(todo_id.to_string()))
    }

    pub fn completed_todos(&self) -> impl Iterator<Item = &Todo> {
        self.todos.iter().filter(|todo| todo.is_completed())
    }

    pub fn pending_todos(&self) -> impl Iterator<Item = &Todo> {
        self.todos.iter().filter(|todo| !todo.is_completed())
    }

    /// Completed share of todos as a rounded percentage; 0 without todos.
    pub fn todos_progress(&self) -> u8 {
        if self.todos.is_empty() {
            return 0;
        }
        let completed = self.completed_todos().count() as f64;
        let ratio = completed * 100.0 / self.todos.len() as f64;
        ratio.round().min(100.0) as u8
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_on(dates::today())
    }

    /// Past end date and not completed.
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        match self.end_date {
            Some(end) => self.status != NoteStatus::Completed && dates::is_past_on(end, today),
            None => false,
        }
    }

    pub fn is_due_today(&self) -> bool {
        self.is_due_today_on(dates::today())
    }

    pub fn is_due_today_on(&self, today: NaiveDate) -> bool {
        self.end_date == Some(today)
    }

    pub fn is_due_tomorrow(&self) -> bool {
        self.is_due_tomorrow_on(dates::today())
    }

    pub fn is_due_tomorrow_on(&self, today: NaiveDate) -> bool {
        self.end_date == Some(dates::next_day(today))
    }

    /// Date used for range filters: the start date, else the creation day.
    pub fn effective_date(&self) -> NaiveDate {
        self.start_date
            .unwrap_or_else(|| dates::date_of(&self.created_at))
    }

    /// Whether the note shows up in the calendar bucket around `reference`.
    ///
    /// Dated notes match on either end; undated notes fall back to the
    /// creation day.
    pub fn is_in_period(&self, mode: ViewMode, reference: NaiveDate) -> bool {
        if self.start_date.is_none() && self.end_date.is_none() {
            return mode.contains(reference, dates::date_of(&self.created_at));
        }
        self.start_date
            .is_some_and(|date| mode.contains(reference, date))
            || self
                .end_date
                .is_some_and(|date| mode.contains(reference, date))
    }

    /// Case-insensitive match over title, description, tags and todo texts.
    pub fn matches_search(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
            || self.todos.iter().any(|todo| todo.matches_search(query))
    }

    pub fn matches_filter(&self, criteria: &FilterCriteria) -> bool {
        self.matches_filter_on(criteria, dates::today())
    }

    /// Conjunction of every set criteria dimension.
    pub fn matches_filter_on(&self, criteria: &FilterCriteria, today: NaiveDate) -> bool {
        if criteria.status.is_some_and(|status| status != self.status) {
            return false;
        }
        if criteria
            .category()
            .is_some_and(|category| category != self.category)
        {
            return false;
        }
        if criteria
            .priority
            .is_some_and(|priority| priority != self.priority)
        {
            return false;
        }
        if criteria.author().is_some_and(|author| author != self.author) {
            return false;
        }
        if let Some(range) = criteria.date_range.as_ref() {
            if !range.contains(self.effective_date()) {
                return false;
            }
        }
        if let Some(query) = criteria.search_text() {
            if !self.matches_search(query) {
                return false;
            }
        }
        if let Some(tags) = criteria.tags() {
            if !tags.iter().any(|tag| self.tags.contains(tag)) {
                return false;
            }
        }
        if let Some(overdue) = criteria.overdue {
            if self.is_overdue_on(today) != overdue {
                return false;
            }
        }
        true
    }

    pub fn stats(&self) -> NoteStats {
        NoteStats {
            todos_count: self.todos.len(),
            completed_todos_count: self.completed_todos().count(),
            todos_progress: self.todos_progress(),
            tags_count: self.tags.len(),
            is_overdue: self.is_overdue(),
            is_due_today: self.is_due_today(),
        }
    }
}

impl TryFrom<NoteRecord> for Note {
    type Error = ValidationError;

    fn try_from(value: NoteRecord) -> Result<Self, Self::Error> {
        Self::from_record(value)
    }
}

impl From<Note> for NoteRecord {
    fn from(value: Note) -> Self {
        value.to_record()
    }
}
