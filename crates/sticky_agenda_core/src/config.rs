//! Agenda configuration supplied by the embedding page.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `default_color` is a `#RRGGBB` value.

use crate::dates::ViewMode;
use crate::model::note::DEFAULT_NOTE_COLOR;
use crate::validation::is_hex_color;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_CATEGORIES: [&str; 4] = ["general", "personal", "work", "urgent"];

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid agenda config: {err}"),
            Self::InvalidValue { field, message } => {
                write!(f, "invalid agenda config field `{field}`: {message}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Agenda settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgendaConfig {
    /// Initial calendar granularity.
    pub view_mode: ViewMode,
    /// Initial reference date; `None` starts on today.
    pub current_date: Option<NaiveDate>,
    /// Categories offered by the filter UI, in display order.
    pub categories: Vec<String>,
    /// Cap on visible notes; `0` disables paging.
    pub max_notes_per_page: usize,
    /// Color for new notes created without one.
    pub default_color: String,
    /// Persist the snapshot after every successful mutation.
    pub auto_save: bool,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::default(),
            current_date: None,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            max_notes_per_page: 0,
            default_color: DEFAULT_NOTE_COLOR.to_string(),
            auto_save: false,
        }
    }
}

impl AgendaConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_hex_color(&self.default_color) {
            return Err(ConfigError::InvalidValue {
                field: "defaultColor",
                message: format!("`{}` is not a #RRGGBB value", self.default_color),
            });
        }
        if let Some(blank) = self.categories.iter().position(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "categories",
                message: format!("entry {blank} is blank"),
            });
        }
        Ok(())
    }

    /// Page size, or `None` when paging is disabled.
    pub fn page_limit(&self) -> Option<usize> {
        (self.max_notes_per_page > 0).then_some(self.max_notes_per_page)
    }
}
