//! Agenda use-case service.
//!
//! # Responsibility
//! - Own the note collection, active filter criteria and calendar position.
//! - Bulk-load records while isolating per-record failures.
//! - Route every mutation through note operations and persist snapshots.
//! - Notify registered host listeners about state changes.
//!
//! # Invariants
//! - Note ids are unique within the collection.
//! - A rejected record never aborts a load; it is reported and logged.
//! - Views are recomputed on demand, so they never go stale.
//! - A mutation whose auto-save fails is rolled back before the error returns.
//! - Listeners only hear about changes that were kept.

use crate::config::AgendaConfig;
use crate::dates::{self, DateRange, Navigation, ViewMode};
use crate::filter::{apply_filters, notes_for_period, FilterCriteria, FilterInput};
use crate::model::note::{Note, NoteError, NoteId, NoteStatus, NoteUpdate};
use crate::model::record::NoteRecord;
use crate::model::todo::{Todo, TodoId, TodoUpdate};
use crate::store::{NoteStore, StoreError};
use crate::validation::ValidationError;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for agenda use-cases.
#[derive(Debug)]
pub enum AgendaError {
    NoteNotFound(NoteId),
    /// A note with this id is already in the collection.
    DuplicateNote(NoteId),
    Validation(ValidationError),
    Note(NoteError),
    Store(StoreError),
}

impl Display for AgendaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::DuplicateNote(id) => write!(f, "note already exists: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Note(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AgendaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoteNotFound(_) | Self::DuplicateNote(_) => None,
            Self::Validation(err) => Some(err),
            Self::Note(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ValidationError> for AgendaError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NoteError> for AgendaError {
    fn from(value: NoteError) -> Self {
        match value {
            NoteError::Validation(err) => Self::Validation(err),
            other => Self::Note(other),
        }
    }
}

impl From<StoreError> for AgendaError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Why one input record was left out of a load.
#[derive(Debug)]
pub enum LoadError {
    /// The value does not have the note record shape.
    Malformed(serde_json::Error),
    Invalid(ValidationError),
    DuplicateId(NoteId),
}

impl LoadError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::Invalid(_) => "invalid",
            Self::DuplicateId(_) => "duplicate_id",
        }
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed note record: {err}"),
            Self::Invalid(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "duplicate note id: {id}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::DuplicateId(_) => None,
        }
    }
}

/// One record excluded from a bulk load.
#[derive(Debug)]
pub struct RejectedRecord {
    /// Position in the input sequence.
    pub index: usize,
    /// Raw `id` field when the input carried one.
    pub note_id: Option<String>,
    pub error: LoadError,
}

/// Outcome of a bulk load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub rejected: Vec<RejectedRecord>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Collection-level counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub archived: usize,
    pub overdue: usize,
    /// Notes passing the active criteria.
    pub filtered: usize,
    /// Distinct categories in first-seen order.
    pub categories: Vec<String>,
    /// Distinct authors in first-seen order.
    pub authors: Vec<String>,
}

/// State change reported to host listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum AgendaEvent {
    /// A bulk load finished.
    Ready { loaded: usize, rejected: usize },
    NoteAdded(NoteId),
    NoteUpdated(NoteId),
    NoteRemoved(NoteId),
    /// Carries the criteria now in effect.
    FiltersChanged(FilterCriteria),
    TodoToggled {
        note_id: NoteId,
        todo_id: TodoId,
        completed: bool,
    },
    ViewChanged { mode: ViewMode, date: NaiveDate },
}

/// Handle returned by [`AgendaService::on`].
pub type ListenerId = u64;

type Listener = Box<dyn FnMut(&AgendaEvent)>;

/// Agenda facade over a snapshot store.
pub struct AgendaService<S: NoteStore> {
    store: S,
    config: AgendaConfig,
    notes: Vec<Note>,
    criteria: FilterCriteria,
    view_mode: ViewMode,
    current_date: NaiveDate,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: ListenerId,
}

impl<S: NoteStore> AgendaService<S> {
    /// Creates an empty agenda positioned per `config`.
    pub fn new(store: S, config: AgendaConfig) -> Self {
        let current_date = config.current_date.unwrap_or_else(dates::today);
        Self {
            store,
            view_mode: config.view_mode,
            config,
            notes: Vec::new(),
            criteria: FilterCriteria::default(),
            current_date,
            listeners: Vec::new(),
            next_listener_id: 1,
        }
    }

    /// Registers a listener for every later [`AgendaEvent`].
    pub fn on<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&AgendaEvent) + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregisters a listener. Returns `false` for unknown ids.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn config(&self) -> &AgendaConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replaces the collection with the store's snapshot.
    pub fn load(&mut self) -> Result<LoadReport, AgendaError> {
        let raw = self.store.load()?;
        Ok(self.set_notes(raw))
    }

    /// Replaces the collection with `raw` records, skipping bad ones.
    pub fn set_notes(&mut self, raw: Vec<Value>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut notes = Vec::with_capacity(raw.len());
        let mut seen_ids: HashSet<String> = HashSet::new();

        for (index, value) in raw.into_iter().enumerate() {
            let note_id = value.get("id").and_then(Value::as_str).map(str::to_string);
            let outcome = serde_json::from_value::<NoteRecord>(value)
                .map_err(LoadError::Malformed)
                .and_then(|record| Note::from_record(record).map_err(LoadError::Invalid))
                .and_then(|note| {
                    if seen_ids.insert(note.id().to_string()) {
                        Ok(note)
                    } else {
                        Err(LoadError::DuplicateId(note.id().to_string()))
                    }
                });

            match outcome {
                Ok(note) => notes.push(note),
                Err(error) => {
                    warn!(
                        "event=note_rejected module=agenda status=skipped index={} note_id={} reason={}",
                        index,
                        note_id.as_deref().unwrap_or("-"),
                        error.code()
                    );
                    report.rejected.push(RejectedRecord {
                        index,
                        note_id,
                        error,
                    });
                }
            }
        }

        report.loaded = notes.len();
        self.notes = notes;
        info!(
            "event=notes_load module=agenda status=ok loaded={} rejected={}",
            report.loaded,
            report.rejected.len()
        );
        self.notify(AgendaEvent::Ready {
            loaded: report.loaded,
            rejected: report.rejected.len(),
        });
        report
    }

    /// Writes the full collection to the store.
    pub fn save(&mut self) -> Result<(), AgendaError> {
        let records: Vec<NoteRecord> = self.notes.iter().map(Note::to_record).collect();
        self.store.save(&records)?;
        debug!(
            "event=notes_save module=agenda status=ok count={}",
            records.len()
        );
        Ok(())
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, note_id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id() == note_id)
    }

    /// Creates a note from user input and appends it.
    ///
    /// Records without a color get the configured default.
    pub fn add_note(&mut self, mut record: NoteRecord) -> Result<&Note, AgendaError> {
        if record.color.is_none() {
            record.color = Some(self.config.default_color.clone());
        }
        let note = Note::create(record)?;
        if self.note(note.id()).is_some() {
            return Err(AgendaError::DuplicateNote(note.id().to_string()));
        }

        let index = self.notes.len();
        let added_id = note.id().to_string();
        self.notes.push(note);
        self.persist_or_restore(|notes| {
            notes.pop();
        })?;
        debug!("event=note_add module=agenda status=ok note_id={added_id}");
        self.notify(AgendaEvent::NoteAdded(added_id));
        Ok(&self.notes[index])
    }

    pub fn update_note(&mut self, note_id: &str, changes: NoteUpdate) -> Result<&Note, AgendaError> {
        let index = self.index_of(note_id)?;
        let previous = self.notes[index].clone();
        self.notes[index].update(changes)?;
        self.persist_or_restore(|notes| notes[index] = previous)?;
        self.notify(AgendaEvent::NoteUpdated(note_id.to_string()));
        Ok(&self.notes[index])
    }

    pub fn remove_note(&mut self, note_id: &str) -> Result<Note, AgendaError> {
        let index = self.index_of(note_id)?;
        let removed = self.notes.remove(index);
        let restored = removed.clone();
        self.persist_or_restore(|notes| notes.insert(index, restored))?;
        debug!("event=note_remove module=agenda status=ok note_id={note_id}");
        self.notify(AgendaEvent::NoteRemoved(note_id.to_string()));
        Ok(removed)
    }

    pub fn mark_note_completed(&mut self, note_id: &str) -> Result<(), AgendaError> {
        self.with_note(note_id, |note| {
            note.mark_completed();
            Ok(())
        })
    }

    pub fn mark_note_pending(&mut self, note_id: &str) -> Result<(), AgendaError> {
        self.with_note(note_id, |note| {
            note.mark_pending();
            Ok(())
        })
    }

    pub fn archive_note(&mut self, note_id: &str) -> Result<(), AgendaError> {
        self.with_note(note_id, |note| {
            note.archive();
            Ok(())
        })
    }

    pub fn update_note_position(&mut self, note_id: &str, x: f64, y: f64) -> Result<(), AgendaError> {
        self.with_note(note_id, |note| Ok(note.update_position(x, y)?))
    }

    /// Moves every note back to the origin.
    pub fn reset_positions(&mut self) -> Result<(), AgendaError> {
        let previous = self.notes.clone();
        for index in 0..self.notes.len() {
            if let Err(err) = self.notes[index].update_position(0.0, 0.0) {
                self.notes = previous;
                return Err(err.into());
            }
        }
        self.persist_or_restore(|notes| *notes = previous)
    }

    /// Adds a todo to a note and returns the new todo id.
    pub fn add_todo(&mut self, note_id: &str, text: &str) -> Result<TodoId, AgendaError> {
        self.with_note(note_id, |note| Ok(note.add_todo(text)?.id().to_string()))
    }

    pub fn update_todo(
        &mut self,
        note_id: &str,
        todo_id: &str,
        changes: &TodoUpdate,
    ) -> Result<(), AgendaError> {
        self.with_note(note_id, |note| {
            note.update_todo(todo_id, changes)?;
            Ok(())
        })
    }

    /// Flips a todo's completion and returns its new state.
    pub fn toggle_todo(&mut self, note_id: &str, todo_id: &str) -> Result<bool, AgendaError> {
        let completed = self.with_note(note_id, |note| Ok(note.toggle_todo(todo_id)?))?;
        self.notify(AgendaEvent::TodoToggled {
            note_id: note_id.to_string(),
            todo_id: todo_id.to_string(),
            completed,
        });
        Ok(completed)
    }

    pub fn remove_todo(&mut self, note_id: &str, todo_id: &str) -> Result<Todo, AgendaError> {
        self.with_note(note_id, |note| Ok(note.remove_todo(todo_id)?))
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.criteria_changed();
    }

    /// Overrides only the dimensions `criteria` sets.
    pub fn merge_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria.merge(criteria);
        self.criteria_changed();
    }

    /// Parses raw filter-UI input and merges it into the active criteria.
    pub fn apply_filter_input(&mut self, input: FilterInput) -> Result<(), AgendaError> {
        let criteria = FilterCriteria::from_input(input)?;
        self.merge_criteria(criteria);
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.set_criteria(FilterCriteria::default());
    }

    /// Every note passing the active criteria, in agenda order.
    pub fn filtered_notes(&self) -> Vec<&Note> {
        apply_filters(&self.notes, &self.criteria)
    }

    /// Filtered notes inside the current calendar bucket, capped to one page.
    pub fn visible_notes(&self) -> Vec<&Note> {
        let filtered = self.filtered_notes();
        let mut visible = notes_for_period(&filtered, self.view_mode, self.current_date);
        if let Some(limit) = self.config.page_limit() {
            visible.truncate(limit);
        }
        visible
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.view_changed();
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn set_current_date(&mut self, date: NaiveDate) {
        self.current_date = date;
        self.view_changed();
    }

    /// Moves the reference date by one bucket and returns it.
    pub fn navigate(&mut self, direction: Navigation) -> NaiveDate {
        self.current_date = self
            .view_mode
            .navigate(self.current_date, direction, dates::today());
        self.view_changed();
        self.current_date
    }

    pub fn is_current_period(&self) -> bool {
        self.view_mode
            .is_current_period(self.current_date, dates::today())
    }

    pub fn period_range(&self) -> DateRange {
        self.view_mode.period_range(self.current_date)
    }

    pub fn stats(&self) -> AgendaStats {
        let count_status =
            |status: NoteStatus| self.notes.iter().filter(|note| note.status() == status).count();
        AgendaStats {
            total: self.notes.len(),
            pending: count_status(NoteStatus::Pending),
            completed: count_status(NoteStatus::Completed),
            archived: count_status(NoteStatus::Archived),
            overdue: self.notes.iter().filter(|note| note.is_overdue()).count(),
            filtered: self.filtered_notes().len(),
            categories: distinct(self.notes.iter().map(Note::category)),
            authors: distinct(self.notes.iter().map(Note::author)),
        }
    }

    /// Configured categories followed by any extra ones used by notes.
    pub fn category_options(&self) -> Vec<String> {
        distinct(
            self.config
                .categories
                .iter()
                .map(String::as_str)
                .chain(self.notes.iter().map(Note::category)),
        )
    }

    fn index_of(&self, note_id: &str) -> Result<usize, AgendaError> {
        self.notes
            .iter()
            .position(|note| note.id() == note_id)
            .ok_or_else(|| AgendaError::NoteNotFound(note_id.to_string()))
    }

    fn with_note<T, F>(&mut self, note_id: &str, change: F) -> Result<T, AgendaError>
    where
        F: FnOnce(&mut Note) -> Result<T, AgendaError>,
    {
        let index = self.index_of(note_id)?;
        let previous = self.notes[index].clone();
        let outcome = change(&mut self.notes[index])?;
        self.persist_or_restore(|notes| notes[index] = previous)?;
        debug!("event=note_mutate module=agenda status=ok note_id={note_id}");
        self.notify(AgendaEvent::NoteUpdated(note_id.to_string()));
        Ok(outcome)
    }

    /// Auto-saves when enabled; on failure applies `restore` and returns the error.
    fn persist_or_restore<F>(&mut self, restore: F) -> Result<(), AgendaError>
    where
        F: FnOnce(&mut Vec<Note>),
    {
        if !self.config.auto_save {
            return Ok(());
        }
        if let Err(err) = self.save() {
            restore(&mut self.notes);
            warn!("event=notes_save module=agenda status=rolled_back error={err}");
            return Err(err);
        }
        Ok(())
    }

    fn criteria_changed(&mut self) {
        debug!(
            "event=filters_change module=agenda status=ok active_dimensions={}",
            self.criteria.active_dimensions().len()
        );
        self.notify(AgendaEvent::FiltersChanged(self.criteria.clone()));
    }

    fn view_changed(&mut self) {
        self.notify(AgendaEvent::ViewChanged {
            mode: self.view_mode,
            date: self.current_date,
        });
    }

    fn notify(&mut self, event: AgendaEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}
