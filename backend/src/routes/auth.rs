//! Authentication routes
//!
//! Provides endpoints for registration, login and the current identity.
//!
//! # Performance Optimizations
//!
//! - Uses the pre-computed token service from AppState
//! - Password hashing runs on blocking thread pool (doesn't block async runtime)

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use auth_service_shared::{AuthResponse, CurrentUser, LoginRequest, RegisterRequest};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(current_user))
}

/// Register a new user
///
/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<StatusCode> {
    state.auth().register(req).await?;
    Ok(StatusCode::CREATED)
}

/// Login with email and password
///
/// POST /api/auth/login
///
/// Any credential problem is a plain 401 "Invalid credentials".
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = state.auth().login(&req.email, &req.password).await?;
    Ok(Json(response))
}

/// Identity attached to the current request
///
/// GET /api/auth/me
///
/// # Authentication
/// Requires valid Bearer token in Authorization header.
async fn current_user(auth_user: AuthUser) -> Json<CurrentUser> {
    Json(auth_user.into())
}
