//! Structural validation and text sanitization.
//!
//! # Responsibility
//! - Check note/todo invariants and report every violated rule at once.
//! - Escape user-supplied text before it is stored.
//!
//! # Invariants
//! - Reports keep violations in rule order; nothing short-circuits.
//! - `sanitize_text` is the only markup-escaping step in the core.

use crate::model::note::Note;
use crate::model::record::{NoteRecord, TodoRecord};
use crate::model::todo::Todo;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));

/// One violated structural rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    TitleRequired,
    AuthorRequired,
    CategoryRequired,
    TodoTextRequired,
    /// A calendar-date field is not `YYYY-MM-DD`.
    InvalidDate { field: &'static str, value: String },
    /// An instant field is not RFC 3339 (or a bare date).
    InvalidTimestamp { field: &'static str, value: String },
    PriorityOutOfRange(i64),
    InvalidStatus(String),
    InvalidColor(String),
    NonFinitePosition,
    /// `completedAt` presence disagrees with the completion state.
    CompletionMismatch { entity: &'static str },
    DuplicateTodoId(String),
    UnknownDatePreset(String),
    /// Violation inside the todo at `index` of the owning note.
    Todo { index: usize, violation: Box<Violation> },
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleRequired => write!(f, "title is required"),
            Self::AuthorRequired => write!(f, "author is required"),
            Self::CategoryRequired => write!(f, "category is required"),
            Self::TodoTextRequired => write!(f, "todo text is required"),
            Self::InvalidDate { field, value } => {
                write!(f, "{field} `{value}` is not a valid YYYY-MM-DD date")
            }
            Self::InvalidTimestamp { field, value } => {
                write!(f, "{field} `{value}` is not a valid timestamp")
            }
            Self::PriorityOutOfRange(value) => {
                write!(f, "priority must be 1, 2 or 3, got {value}")
            }
            Self::InvalidStatus(value) => write!(
                f,
                "status `{value}` must be one of pending|completed|archived"
            ),
            Self::InvalidColor(value) => {
                write!(f, "color `{value}` must be a #RRGGBB hex value")
            }
            Self::NonFinitePosition => {
                write!(f, "position coordinates x and y must be finite numbers")
            }
            Self::CompletionMismatch { entity } => write!(
                f,
                "{entity} completedAt must be set if and only if it is completed"
            ),
            Self::DuplicateTodoId(id) => write!(f, "todo id `{id}` appears more than once"),
            Self::UnknownDatePreset(value) => write!(
                f,
                "date preset `{value}` must be one of today|tomorrow|thisWeek|thisMonth|overdue"
            ),
            Self::Todo { index, violation } => write!(f, "todo[{index}]: {violation}"),
        }
    }
}

/// Aggregate validation outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Human-readable messages in rule order.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Appends a todo report, tagging each entry with the todo position.
    pub fn push_todo_report(&mut self, index: usize, report: ValidationReport) {
        self.violations
            .extend(report.violations.into_iter().map(|violation| Violation::Todo {
                index,
                violation: Box::new(violation),
            }));
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.violations.extend(other.violations);
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                violations: self.violations,
            })
        }
    }
}

/// Rejected construction or mutation, carrying every violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed: {}", self.messages().join("; "))
    }
}

impl Error for ValidationError {}

impl From<ValidationError> for ValidationReport {
    fn from(value: ValidationError) -> Self {
        Self {
            violations: value.violations,
        }
    }
}

/// Escapes `& < > " '` to HTML entities and trims surrounding whitespace.
pub fn sanitize_text(text: &str) -> String {
    let trimmed = text.trim();
    let mut escaped = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Validates a constructed todo.
pub fn validate_todo(todo: &Todo) -> ValidationReport {
    let mut report = ValidationReport::new();
    if todo.text().trim().is_empty() {
        report.push(Violation::TodoTextRequired);
    }
    if todo.is_completed() != todo.completed_at().is_some() {
        report.push(Violation::CompletionMismatch { entity: "todo" });
    }
    report
}

/// Validates a constructed note, including every owned todo.
pub fn validate_note(note: &Note) -> ValidationReport {
    let mut report = ValidationReport::new();

    if note.title().trim().is_empty() {
        report.push(Violation::TitleRequired);
    }
    if note.author().trim().is_empty() {
        report.push(Violation::AuthorRequired);
    }
    if note.category().trim().is_empty() {
        report.push(Violation::CategoryRequired);
    }
    if !is_hex_color(note.color()) {
        report.push(Violation::InvalidColor(note.color().to_string()));
    }
    let position = note.position();
    if !position.x.is_finite() || !position.y.is_finite() {
        report.push(Violation::NonFinitePosition);
    }
    if note.is_completed() != note.completed_at().is_some() {
        report.push(Violation::CompletionMismatch { entity: "note" });
    }

    for (index, todo) in note.todos().iter().enumerate() {
        report.push_todo_report(index, validate_todo(todo));
    }
    check_unique_todo_ids(note.todos().iter().map(Todo::id), &mut report);

    report
}

/// Records one violation per repeated todo id.
pub(crate) fn check_unique_todo_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    report: &mut ValidationReport,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            report.push(Violation::DuplicateTodoId(id.to_string()));
        }
    }
}

/// Validates a raw todo record without keeping the constructed entity.
pub fn validate_todo_record(record: &TodoRecord) -> ValidationReport {
    match Todo::from_record(record.clone()) {
        Ok(_) => ValidationReport::new(),
        Err(err) => err.into(),
    }
}

/// Validates a raw note record without keeping the constructed entity.
pub fn validate_note_record(record: &NoteRecord) -> ValidationReport {
    match Note::from_record(record.clone()) {
        Ok(_) => ValidationReport::new(),
        Err(err) => err.into(),
    }
}
