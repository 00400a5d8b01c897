use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use tracing::debug;
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use weave_types::api::{Claims, InviteRequest, MessageResponse};

use crate::error::{ApiError, run_blocking};
use crate::middleware::bearer_claims;
use crate::state::AppState;

pub async fn invite(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<InviteRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let collaboration =
        run_blocking(move || state.collaborations.invite(document_id, claims.sub, &req.email)).await?;
    Ok((StatusCode::CREATED, Json(collaboration)))
}

pub async fn accept(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let collaboration = run_blocking(move || state.collaborations.accept(document_id, claims.sub)).await?;
    Ok(Json(collaboration))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let collaboration = run_blocking(move || state.collaborations.reject(document_id, claims.sub)).await?;
    Ok(Json(collaboration))
}

pub async fn remove(
    State(state): State<AppState>,
    Path((document_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || state.collaborations.remove(document_id, claims.sub, user_id)).await?;
    Ok(Json(MessageResponse::new("Collaborator removed.")))
}

pub async fn leave(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || state.collaborations.leave(document_id, claims.sub)).await?;
    Ok(Json(MessageResponse::new("You have left the document.")))
}

pub async fn list_collaborators(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let collaborators =
        run_blocking(move || state.collaborations.list_collaborators(document_id, claims.sub)).await?;
    Ok(Json(collaborators))
}

/// Target of shared invitation links. Visitors without a valid token are
/// sent to log in first and brought back here afterwards.
pub async fn invite_link(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let Some(claims) = bearer_claims(&headers, &state.jwt_secret) else {
        debug!("Anonymous visit to invitation link for {}", document_id);
        return Ok(Redirect::to(&format!("/login?redirect=/invite/{}", document_id)));
    };

    let visit =
        run_blocking(move || state.collaborations.handle_invite_link(document_id, claims.sub)).await?;

    Ok(Redirect::to(&format!(
        "/documents?highlight={}&notice={}",
        visit.document.id,
        visit.outcome.notice()
    )))
}
