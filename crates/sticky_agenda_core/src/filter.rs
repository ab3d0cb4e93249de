//! Multi-criteria note filtering and agenda ordering.
//!
//! # Responsibility
//! - Model filter criteria with one optional slot per dimension.
//! - Produce the filtered, sorted read-only view consumed by renderers.
//!
//! # Invariants
//! - Filtering borrows notes and never mutates them.
//! - Output order: non-completed before completed, then newest `created_at`
//!   first; ties keep input order.
//! - Same notes + same criteria + same day always give the same view.

use crate::dates::{self, DatePreset, DateRange, ViewMode};
use crate::model::note::{Note, NoteStatus, Priority};
use crate::model::record::{non_blank, parse_optional_date};
use crate::validation::{ValidationError, ValidationReport, Violation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Filter constraints; `None` (or an empty string/list) means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Case-insensitive substring over title, description, tags and todos.
    pub search_text: Option<String>,
    pub status: Option<NoteStatus>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub author: Option<String>,
    /// Inclusive window over the note's effective date.
    pub date_range: Option<DateRange>,
    /// Matches notes carrying at least one of these tags.
    pub tags: Option<Vec<String>>,
    /// Matches notes whose overdue state equals the flag.
    pub overdue: Option<bool>,
}

/// Criteria dimension currently constraining the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDimension {
    SearchText,
    Status,
    Category,
    Priority,
    Author,
    DateRange,
    Tags,
    Overdue,
}

impl FilterCriteria {
    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn with_status(mut self, status: NoteStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_overdue(mut self, overdue: bool) -> Self {
        self.overdue = Some(overdue);
        self
    }

    /// Active search query, ignoring empty strings.
    pub fn search_text(&self) -> Option<&str> {
        self.search_text.as_deref().filter(|value| !value.is_empty())
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|value| !value.is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref().filter(|value| !value.is_empty())
    }

    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref().filter(|tags| !tags.is_empty())
    }

    /// Dimensions that currently constrain the view, in display order.
    pub fn active_dimensions(&self) -> Vec<FilterDimension> {
        let mut active = Vec::new();
        if self.search_text().is_some() {
            active.push(FilterDimension::SearchText);
        }
        if self.status.is_some() {
            active.push(FilterDimension::Status);
        }
        if self.category().is_some() {
            active.push(FilterDimension::Category);
        }
        if self.priority.is_some() {
            active.push(FilterDimension::Priority);
        }
        if self.author().is_some() {
            active.push(FilterDimension::Author);
        }
        if self.date_range.is_some() {
            active.push(FilterDimension::DateRange);
        }
        if self.tags().is_some() {
            active.push(FilterDimension::Tags);
        }
        if self.overdue.is_some() {
            active.push(FilterDimension::Overdue);
        }
        active
    }

    /// True when no dimension constrains the view.
    pub fn is_empty(&self) -> bool {
        self.active_dimensions().is_empty()
    }

    /// Overrides every dimension that `other` sets, keeping the rest.
    pub fn merge(&mut self, other: FilterCriteria) {
        if other.search_text.is_some() {
            self.search_text = other.search_text;
        }
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.category.is_some() {
            self.category = other.category;
        }
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.date_range.is_some() {
            self.date_range = other.date_range;
        }
        if other.tags.is_some() {
            self.tags = other.tags;
        }
        if other.overdue.is_some() {
            self.overdue = other.overdue;
        }
    }

    /// Parses raw filter-UI input.
    ///
    /// Empty strings and priority `0` mean "all". A `datePreset` is used only
    /// when no explicit `dateRange` is given; the `overdue` preset maps to the
    /// overdue dimension instead of a date window.
    pub fn from_input(input: FilterInput) -> Result<Self, ValidationError> {
        Self::from_input_on(input, dates::today())
    }

    pub fn from_input_on(input: FilterInput, today: NaiveDate) -> Result<Self, ValidationError> {
        let mut report = ValidationReport::new();

        let status = match non_blank(input.status.as_deref()) {
            None => None,
            Some(raw) => {
                let parsed = NoteStatus::parse(raw);
                if parsed.is_none() {
                    report.push(Violation::InvalidStatus(raw.to_string()));
                }
                parsed
            }
        };

        let priority = match input.priority {
            None | Some(0) => None,
            Some(level) => {
                let parsed = Priority::from_level(level);
                if parsed.is_none() {
                    report.push(Violation::PriorityOutOfRange(level));
                }
                parsed
            }
        };

        let mut overdue = input.overdue;
        let date_range = match input.date_range {
            Some(range) => {
                let start =
                    parse_optional_date(range.start.as_deref(), "dateRange.start", &mut report);
                let end = parse_optional_date(range.end.as_deref(), "dateRange.end", &mut report);
                Some(DateRange {
                    start,
                    end,
                    overdue: range.overdue.unwrap_or(false),
                })
            }
            None => match non_blank(input.date_preset.as_deref()) {
                None => None,
                Some(raw) => match DatePreset::parse(raw) {
                    Some(DatePreset::Overdue) => {
                        overdue = Some(true);
                        None
                    }
                    Some(preset) => Some(preset.range_on(today)),
                    None => {
                        report.push(Violation::UnknownDatePreset(raw.to_string()));
                        None
                    }
                },
            },
        };

        report.into_result()?;

        Ok(Self {
            search_text: non_blank(input.search_text.as_deref()).map(str::to_string),
            status,
            category: non_blank(input.category.as_deref()).map(str::to_string),
            priority,
            author: non_blank(input.author.as_deref()).map(str::to_string),
            date_range,
            tags: input.tags.filter(|tags| !tags.is_empty()),
            overdue,
        })
    }
}

/// Raw date window from the filter UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateRangeInput {
    pub start: Option<String>,
    pub end: Option<String>,
    pub overdue: Option<bool>,
}

/// Raw criteria as produced by the filter UI collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterInput {
    pub search_text: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i64>,
    pub author: Option<String>,
    pub date_range: Option<DateRangeInput>,
    /// `today|tomorrow|thisWeek|thisMonth|overdue`.
    pub date_preset: Option<String>,
    pub tags: Option<Vec<String>>,
    pub overdue: Option<bool>,
}

impl TryFrom<FilterInput> for FilterCriteria {
    type Error = ValidationError;

    fn try_from(value: FilterInput) -> Result<Self, Self::Error> {
        Self::from_input(value)
    }
}

/// Filters and orders `notes` for display.
pub fn apply_filters<'a>(notes: &'a [Note], criteria: &FilterCriteria) -> Vec<&'a Note> {
    apply_filters_on(notes, criteria, dates::today())
}

/// [`apply_filters`] against an explicit current day.
pub fn apply_filters_on<'a>(
    notes: &'a [Note],
    criteria: &FilterCriteria,
    today: NaiveDate,
) -> Vec<&'a Note> {
    let mut view: Vec<&Note> = if criteria.is_empty() {
        notes.iter().collect()
    } else {
        notes
            .iter()
            .filter(|note| note.matches_filter_on(criteria, today))
            .collect()
    };
    sort_notes(&mut view);
    view
}

/// Stable agenda ordering: open notes first, then newest first.
pub fn sort_notes(view: &mut [&Note]) {
    view.sort_by(|a, b| {
        a.is_completed()
            .cmp(&b.is_completed())
            .then_with(|| b.created_at().cmp(a.created_at()))
    });
}

/// Restricts a view to one calendar bucket, keeping its order.
pub fn notes_for_period<'a>(
    view: &[&'a Note],
    mode: ViewMode,
    reference: NaiveDate,
) -> Vec<&'a Note> {
    view.iter()
        .copied()
        .filter(|note| note.is_in_period(mode, reference))
        .collect()
}
