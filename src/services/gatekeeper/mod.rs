//! Request gatekeeper for the `/api` tree.
//!
//! Order per request: rate limit, CSRF, bearer token, body sanitisation.
//! The first failing check answers; later checks never run.

pub mod route;
pub mod sanitize;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{OriginalUri, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::modules::auth::interface::AuthError;
use crate::services::csrf::CSRF_HEADER;
use crate::services::rate_limit::client_identifier;
use crate::AppState;

pub use route::AuthRoute;
pub use sanitize::{sanitize_body, Sanitizer};

/// Bodies above this never reach a handler anyway; the body limit layer
/// rejects them first.
const MAX_SANITIZED_BODY: usize = 100 * 1024;

pub async fn gatekeeper(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = match req.extensions().get::<OriginalUri>() {
        Some(original) => original.path().to_string(),
        None => req.uri().path().to_string(),
    };
    let route = AuthRoute::classify(&path);
    let policy = route.policy();

    let identifier = client_identifier(policy, req.headers(), &path);
    let decision = state.rate_limiters.get(policy).check(&identifier).await;
    if decision.limited {
        tracing::warn!(policy = policy.name(), path = %path, "rate limit exceeded");
        state.metrics.record_rate_limited(policy.name());
        return decision.into_response();
    }

    if req.method() != Method::GET && !route.csrf_exempt() {
        let token = header_str(req.headers(), CSRF_HEADER).unwrap_or_default();
        if !state.csrf.validate(token).await {
            tracing::warn!(path = %path, "csrf validation failed");
            state.metrics.record_csrf_rejection();
            return AuthError::CsrfInvalid.into_response();
        }
    }

    if route.requires_auth() {
        // reset tokens share the signing key but never authenticate
        let claims = bearer_token(req.headers())
            .and_then(|token| state.jwt_service.verify(token))
            .filter(|claims| !claims.is_reset());
        match claims {
            Some(claims) => {
                req.extensions_mut().insert(claims);
            }
            None => {
                state.metrics.record_unauthorized();
                return AuthError::Unauthorized.into_response();
            }
        }
    }

    if is_mutating(req.method()) && !route.sanitized_fields().is_empty() && is_json(req.headers()) {
        req = match sanitize_request(route, req).await {
            Ok(req) => req,
            Err(response) => return response,
        };
    }

    let mut response = next.run(req).await;
    decision.apply_headers(response.headers_mut());
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn is_json(headers: &HeaderMap) -> bool {
    header_str(headers, header::CONTENT_TYPE.as_str())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Buffers the body, rewrites listed fields and rebuilds the request.
/// Bodies that are not valid JSON are forwarded as-is for the handler to
/// reject.
async fn sanitize_request(route: AuthRoute, req: Request) -> Result<Request, Response> {
    let (mut parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_SANITIZED_BODY)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE.into_response())?;

    let bytes = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(mut value) => {
            if sanitize_body(route, &mut value) {
                parts.headers.remove(header::CONTENT_LENGTH);
                serde_json::to_vec(&value)
                    .map(Bytes::from)
                    .map_err(|e| AuthError::Internal(e.to_string()).into_response())?
            } else {
                bytes
            }
        }
        Err(_) => bytes,
    };

    Ok(Request::from_parts(parts, Body::from(bytes)))
}
