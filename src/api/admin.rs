use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::api::routes::ApiState;
use crate::error::{AppError, Result};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Gate for routes that change process-wide state. With no `ADMIN_TOKEN`
/// configured every admin route answers 403.
pub async fn require_admin(
    State(state): State<ApiState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let Some(expected) = state.admin_token.as_ref() else {
        return Err(AppError::Forbidden("admin routes are disabled".to_string()));
    };
    if bearer_token(req.headers()) != Some(expected.expose()) {
        warn!(path = %req.uri().path(), "Rejected admin request");
        return Err(AppError::Unauthorized("missing or invalid admin token".to_string()));
    }
    Ok(next.run(req).await)
}
