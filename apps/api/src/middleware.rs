use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use flock_core::{AppError, UserIdentity};

use crate::error::ApiResult;

/// Header carrying the user id asserted by the upstream login gateway.
pub const USER_HEADER: &str = "x-flock-user";
/// Optional header carrying the user's email.
pub const EMAIL_HEADER: &str = "x-flock-email";

pub async fn require_actor(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = actor_from_headers(request.headers())?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn actor_from_headers(headers: &HeaderMap) -> Result<UserIdentity, AppError> {
    let subject = header_text(headers, USER_HEADER)
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    Ok(UserIdentity::new(subject, header_text(headers, EMAIL_HEADER)))
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
