use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use weave_types::api::Claims;

use crate::state::AppState;

/// Verify a token signed by the identity service.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            None
        }
    }
}

/// Claims from the Authorization header, if present and valid.
pub fn bearer_claims(headers: &HeaderMap, secret: &str) -> Option<Claims> {
    let Authorization(bearer) = headers.typed_get::<Authorization<Bearer>>()?;
    verify_token(bearer.token(), secret)
}

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = bearer_claims(req.headers(), &state.jwt_secret).ok_or(StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
