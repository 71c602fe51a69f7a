//! Authentication middleware for axum.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::ServiceTokenValidator;
use crate::error::GatewayError;

/// Require `Authorization: Bearer <service token>` when a token is configured.
pub async fn require_service_token(
    State(validator): State<ServiceTokenValidator>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    if !validator.enabled() {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| GatewayError::Unauthorized("Missing service token".to_string()))?;

    if !validator.validate(token.trim()) {
        tracing::warn!(path = %request.uri().path(), "Invalid service token attempted");
        return Err(GatewayError::Unauthorized(
            "Invalid service token".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
