//! Core domain logic for the sticky-note agenda.
//! Notes, todos, date buckets, filtering and validation live here; rendering
//! and interaction belong to the host.

pub mod config;
pub mod dates;
pub mod db;
pub mod filter;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod validation;

pub use config::{AgendaConfig, ConfigError};
pub use dates::{DatePreset, DateRange, Navigation, ViewMode};
pub use filter::{
    apply_filters, apply_filters_on, notes_for_period, sort_notes, FilterCriteria,
    FilterDimension, FilterInput,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::note::{Note, NoteError, NoteId, NoteStats, NoteStatus, NoteUpdate, Position, Priority};
pub use model::record::{NoteRecord, TodoRecord};
pub use model::todo::{Todo, TodoId, TodoStats, TodoUpdate};
pub use service::{
    AgendaError, AgendaEvent, AgendaService, AgendaStats, ListenerId, LoadError, LoadReport,
};
pub use store::{MemoryNoteStore, NoteStore, SqliteNoteStore, StoreError, StoreResult};
pub use validation::{ValidationError, ValidationReport, Violation};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
