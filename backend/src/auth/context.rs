//! Per-request security context
//!
//! The interceptor stores exactly one `SecurityContext` in each request's
//! extensions. It lives and dies with that request, so nothing can leak into
//! another request or a reused worker.

use crate::error::ApiError;
use auth_service_shared::CurrentUser;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::collections::BTreeSet;
use std::convert::Infallible;

/// A resolved identity and its granted authorities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub email: String,
    pub authorities: BTreeSet<String>,
}

/// Identity (if any) established for the current request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    authentication: Option<Authentication>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(email: impl Into<String>, authorities: BTreeSet<String>) -> Self {
        Self {
            authentication: Some(Authentication {
                email: email.into(),
                authorities,
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication.is_some()
    }

    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    pub fn principal(&self) -> Option<&str> {
        self.authentication.as_ref().map(|a| a.email.as_str())
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authentication
            .as_ref()
            .is_some_and(|a| a.authorities.contains(authority))
    }

    fn from_parts(parts: &Parts) -> Self {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .unwrap_or_default()
    }
}

/// Handlers can always ask for the context; a request the interceptor never
/// saw is simply anonymous.
#[axum::async_trait]
impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Authenticated caller
///
/// Use as an extractor on routes that must not be reached anonymously;
/// anonymous requests are rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
    pub authorities: BTreeSet<String>,
}

impl AuthUser {
    /// Require a granted authority, 403 otherwise
    pub fn require_authority(&self, authority: &str) -> Result<(), ApiError> {
        if self.authorities.contains(authority) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("Requires {}", authority)))
        }
    }
}

impl From<AuthUser> for CurrentUser {
    fn from(user: AuthUser) -> Self {
        CurrentUser {
            email: user.email,
            authorities: user.authorities.into_iter().collect(),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        SecurityContext::from_parts(parts)
            .authentication
            .map(|auth| AuthUser {
                email: auth.email,
                authorities: auth.authorities,
            })
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}
