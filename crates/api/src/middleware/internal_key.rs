//! Internal API key middleware for operational routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use residia_shared::AppError;

use crate::{AppState, error::ApiError};

/// Header carrying the internal API key.
pub const INTERNAL_KEY_HEADER: &str = "x-internal-api-key";

/// Compares two keys without short-circuiting on the first mismatch.
fn keys_match(provided: &str, expected: &str) -> bool {
    let (provided, expected) = (provided.as_bytes(), expected.as_bytes());
    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Rejects requests that do not carry the configured internal API key.
///
/// With no key configured every guarded route answers 403.
pub async fn require_internal_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.internal_api_key.as_deref() else {
        return ApiError(AppError::Forbidden(
            "internal routes are disabled".to_string(),
        ))
        .into_response();
    };

    let provided = request
        .headers()
        .get(INTERNAL_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(key) if keys_match(key, expected) => next.run(request).await,
        Some(_) => ApiError(AppError::Unauthorized("invalid internal API key".to_string()))
            .into_response(),
        None => ApiError(AppError::Unauthorized(format!(
            "{INTERNAL_KEY_HEADER} header is required"
        )))
        .into_response(),
    }
}
