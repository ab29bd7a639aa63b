//! Authentication middleware
//!
//! Runs ahead of every route. It reads a bearer token, validates it and
//! resolves the subject into a `SecurityContext` stored on the request.
//! It never rejects a request itself: anything short of a valid token for
//! an existing, enabled account leaves the request anonymous, and routes
//! decide whether that is acceptable.

use super::context::SecurityContext;
use super::error::AuthError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the raw token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
}

/// Work out who (if anyone) is making the request
///
/// Reads the token service and credential store only; nothing is written.
pub async fn authenticate_request(state: &AppState, headers: &HeaderMap) -> SecurityContext {
    let Some(token) = bearer_token(headers) else {
        return SecurityContext::anonymous();
    };

    let claims = match state.tokens().validate(token) {
        Ok(claims) => claims,
        Err(kind) => {
            debug!(reason = %kind, "Ignoring bearer token");
            return SecurityContext::anonymous();
        }
    };

    match state.auth().resolve_identity(&claims.sub).await {
        Ok(context) => context,
        Err(AuthError::IdentityResolutionFailed) => {
            debug!("Token subject no longer resolves to an account");
            SecurityContext::anonymous()
        }
        Err(e) => {
            warn!("Identity lookup failed, continuing anonymously: {}", e);
            SecurityContext::anonymous()
        }
    }
}

/// Request interceptor installed with `axum::middleware::from_fn_with_state`
///
/// The context is attached at most once per request and is dropped with
/// the request on every exit path.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<SecurityContext>().is_none() {
        let context = authenticate_request(&state, request.headers()).await;
        request.extensions_mut().insert(context);
    }

    next.run(request).await
}
