use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use crate::{adapters::http::app_state::AppState, app_error::AppError};

/// Require `Authorization: Bearer <OPS_API_TOKEN>`.
pub async fn require_ops_token(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthorized)?;

    let expected = app_state.config.ops_api_token.expose_secret();
    if expected.is_empty() || !constant_time_compare(presented, expected) {
        tracing::warn!(uri = %request.uri(), "Rejected operations request with invalid token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
