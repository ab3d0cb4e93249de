//! Use-case services over the note store.
//!
//! # Responsibility
//! - Hold agenda state between host calls.
//! - Keep hosts decoupled from record parsing and storage details.

pub mod agenda_service;

pub use agenda_service::{
    AgendaError, AgendaEvent, AgendaService, AgendaStats, ListenerId, LoadError, LoadReport,
    RejectedRecord,
};
