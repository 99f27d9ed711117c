//! Core types for the brunch signup manager.
//!
//! This module provides type-safe wrappers and rules for the domain concepts.

pub mod credential;
pub mod id;
pub mod label;
pub mod recurrence;
pub mod schedule;
pub mod signup;

pub use credential::{
    AdminAccount, CredentialError, CredentialFile, CredentialStore, PagingCredentials,
};
pub use id::*;
pub use label::{ItemName, LabelError, ParticipantName};
pub use recurrence::{Recurrence, RecurrenceError, german_weekday};
pub use schedule::{EventResolution, EventSource, ScheduleError, ScheduleState};
pub use signup::{Participation, Signup, required_roll_count};
