use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use weave_types::api::{Claims, CreateDocumentRequest};

use crate::error::{ApiError, run_blocking};
use crate::state::AppState;

pub async fn create_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateDocumentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let document = run_blocking(move || state.documents.create(claims.sub, &req.name)).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Owned documents, accepted collaborations and pending invitations.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let board = run_blocking(move || state.documents.dashboard(claims.sub)).await?;
    Ok(Json(board))
}

pub async fn show_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = run_blocking(move || state.documents.show(document_id, Some(claims.sub))).await?;
    Ok(Json(detail))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || state.documents.delete(document_id, Some(claims.sub))).await?;
    Ok(StatusCode::NO_CONTENT)
}
