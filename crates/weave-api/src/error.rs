use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use weave_collab::CollabError;
use weave_types::api::MessageResponse;

/// Handler failure, rendered as a status code and `{"message": ...}` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Collab(#[from] CollabError),

    /// Body missing, not JSON, or not the expected shape
    #[error("invalid request body: {}", .0.body_text())]
    BadRequest(#[from] JsonRejection),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Collab(e) => match e {
                CollabError::Unauthenticated => StatusCode::UNAUTHORIZED,
                CollabError::Unauthorized => StatusCode::FORBIDDEN,
                CollabError::NotFound(_) => StatusCode::NOT_FOUND,
                CollabError::Conflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CollabError::Invalid(_) => StatusCode::BAD_REQUEST,
                CollabError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // Storage details stay in the log
            error!("{:#}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}

/// Run a blocking core call off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> weave_collab::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}
