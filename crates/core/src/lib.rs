//! Brunch Core - Shared domain types for the brunch signup manager.
//!
//! This crate provides the domain model used by the other workspace members:
//! - `server` - Signup web application with admin area and reset job
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types, rules and traits - no I/O, no database
//! access, no HTTP clients. Date arithmetic for the event schedule lives here
//! so it can be tested without a clock or a database.
//!
//! # Modules
//!
//! - [`types`] - Participant names, signups, recurrence rules, schedule state
//!   and admin credentials

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
