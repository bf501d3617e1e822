use axum::{
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::errors::HttpError;

/// The raw bearer credential extracted from the Authorization header. The
/// credential itself is resolved against the token table in the service
/// layer; this only guards the header's shape.
#[derive(Clone)]
pub struct BearerToken(pub String);

pub async fn require_bearer(mut req: Request<Body>, next: Next) -> Result<Response, HttpError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(missing_credential)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(missing_credential)?
        .to_string();
    if token.is_empty() {
        return Err(missing_credential());
    }

    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}

fn missing_credential() -> HttpError {
    HttpError::new(
        StatusCode::UNAUTHORIZED,
        "missing bearer credential",
        Some("auth_required".to_string()),
    )
}
