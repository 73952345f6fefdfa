//! Core type definitions for the concession record store.
//!
//! This crate defines the types shared by every layer of the store:
//! - Record and action identifiers
//! - The [`Record`] entity and the [`RecordDraft`] form data it is built from
//! - The [`Action`] history entry with its remote-sync flag
//!
//! Nothing here performs I/O. Validation of form data lives next to the
//! draft type so that every caller rejects bad input the same way.

mod action;
mod ids;
mod record;

pub use action::{Action, ActionType};
pub use ids::{ActionId, ActorId, RecordId, LOCAL_ID_PREFIX};
pub use record::{ContactInfo, PermitType, Record, RecordDraft, RecordStatus, ValidationError};

