//! Domain model for sticky-note agendas.
//!
//! # Responsibility
//! - Define the `Note` and `Todo` entities and their record forms.
//! - Keep every entity valid from construction through each mutation.
//!
//! # Invariants
//! - Entities are only built through validating constructors.
//! - A note exclusively owns its todos; nothing is shared between notes.

pub mod note;
pub mod record;
pub mod todo;
