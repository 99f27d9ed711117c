//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Admin login against the credential file
//! - `clock` - Injectable wall clock
//! - `dapnet` - DAPNET paging client
//! - `notify` - Roster summary as mail link and pager call
//! - `reset` - Background job clearing the roster after each event
//! - `resolver` - Next event date with admin override and cancellation
//! - `roster` - Current-cycle signups and the contribution catalog

pub mod auth;
pub mod clock;
pub mod dapnet;
pub mod notify;
pub mod reset;
pub mod resolver;
pub mod roster;

pub use auth::{AuthError, FileCredentialStore, hash_password};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dapnet::{DapnetClient, DapnetError};
pub use notify::{
    Notification, NotificationDispatcher, NotificationError, build_notification,
    describe_participation, mailto_link,
};
pub use reset::{ResetError, ResetScheduler, TickOutcome};
pub use resolver::{EventDateResolver, ResolverError};
pub use roster::{RosterError, RosterStore};
