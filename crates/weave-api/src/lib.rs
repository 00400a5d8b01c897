//! HTTP surface for documents, collaborations and activities.

pub mod activities;
pub mod collaborators;
pub mod documents;
pub mod error;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::router;
pub use state::{AppState, AppStateInner};
