//! Caller identity middleware
//!
//! The fronting gateway authenticates the user and forwards who they are in
//! `X-Caller-Id` and `X-Caller-Role`. This layer only turns those headers
//! into a [`Caller`] request extension; it never sees credentials.

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::common::ApiError;
use crate::domain::ports::{Caller, Role};
use crate::domain::DomainError;

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";

fn caller_from_headers(request: &Request<Body>) -> Result<Caller, DomainError> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let user_id = header(CALLER_ID_HEADER)
        .ok_or_else(|| DomainError::Unauthorized("Missing caller identity".to_string()))?;
    let role: Role = header(CALLER_ROLE_HEADER)
        .ok_or_else(|| DomainError::Unauthorized("Missing caller role".to_string()))?
        .parse()?;

    Ok(Caller::new(user_id, role))
}

/// Reject requests without a caller; attach the caller otherwise
pub async fn caller_middleware(mut request: Request<Body>, next: Next) -> Response {
    match caller_from_headers(&request) {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// Handlers take `CurrentCaller(caller)` instead of `Extension<Caller>` so
/// a route mounted without the middleware fails closed with 401.
pub struct CurrentCaller(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for CurrentCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .map(CurrentCaller)
            .ok_or_else(|| ApiError(DomainError::Unauthorized("Missing caller identity".to_string())))
    }
}
