use thiserror::Error;

/// Failure taxonomy shared by every collaboration operation.
#[derive(Debug, Error)]
pub enum CollabError {
    /// No caller identity was supplied
    #[error("authentication required")]
    Unauthenticated,

    /// The caller is known but lacks rights on the document
    #[error("not authorized to access this document")]
    Unauthorized,

    /// The document, user or invitation is absent, or not in the state the
    /// transition requires
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The (document, user) relationship already exists
    #[error("{0}")]
    Conflict(&'static str),

    /// Rejected input
    #[error("{0}")]
    Invalid(String),

    #[error("storage failure: {0}")]
    Store(#[from] anyhow::Error),
}

pub type Result<T, E = CollabError> = std::result::Result<T, E>;
