//! Collaboration access control, invitation state machine and activity log
//! for shared documents.
//!
//! Identity is always an explicit argument. Every service works against the
//! shared [`weave_db::Database`] and reports failures through [`CollabError`].

pub mod access;
pub mod activity;
pub mod documents;
pub mod error;
pub mod manager;
pub mod notify;

mod convert;
#[cfg(test)]
mod testing;

pub use access::{AccessControl, Role};
pub use activity::ActivityLog;
pub use documents::DocumentService;
pub use error::{CollabError, Result};
pub use manager::{CollaborationManager, InviteLinkOutcome, InviteLinkVisit};
pub use notify::{InvitationNotice, InvitationNotifier, LogNotifier};
