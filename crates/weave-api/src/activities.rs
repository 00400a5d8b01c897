use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use weave_types::api::{AppendActivityRequest, Claims};

use crate::error::{ApiError, run_blocking};
use crate::state::AppState;

pub async fn append_activity(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<AppendActivityRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let record = run_blocking(move || {
        state.activity.append(
            document_id,
            Some(claims.sub),
            &req.action_type,
            req.action_data,
            req.description,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_activities(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let records = run_blocking(move || state.activity.list(document_id, Some(claims.sub))).await?;
    Ok(Json(records))
}
