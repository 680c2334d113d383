// Bearer-token presence check
// Tokens are issued and validated upstream; this layer only refuses
// requests that carry none.

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn require_bearer(request: Request, next: Next) -> Result<Response, ApiError> {
    if bearer_token(&request).is_none() {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}
