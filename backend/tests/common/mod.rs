//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory credential store.

#![allow(dead_code)]

use auth_service_backend::{
    config::{AppConfig, DatabaseConfig, JwtConfig, ServerConfig, StoreBackend},
    repositories::InMemoryCredentialStore,
    routes,
    state::AppState,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-32chars";

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<InMemoryCredentialStore>,
}

impl TestApp {
    /// Create a new test application with an empty in-memory store
    pub fn new() -> Self {
        let store = Arc::new(InMemoryCredentialStore::new());
        let state = AppState::new(store.clone(), test_config());
        let app = routes::create_router(state.clone());

        Self { app, state, store }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        self.send(Request::builder().method("GET").uri(path).body(Body::empty()).unwrap())
            .await
    }

    /// Make a GET request with a bearer token
    pub async fn get_auth(&self, path: &str, token: &str) -> (StatusCode, String) {
        self.send(
            Request::builder()
                .method("GET")
                .uri(path)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post(&self, path: &str, body: &str) -> (StatusCode, String) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }

    /// Register a user through the API
    pub async fn register(&self, email: &str, password: &str, roles: Option<&[&str]>) -> StatusCode {
        let mut body = json!({
            "employeeId": format!("EMP-{}", uuid::Uuid::new_v4()),
            "name": "Test User",
            "email": email,
            "password": password,
        });
        if let Some(roles) = roles {
            body["roles"] = json!(roles);
        }
        self.post("/api/auth/register", &body.to_string()).await.0
    }

    /// Log in through the API and return the access token
    pub async fn login(&self, email: &str, password: &str) -> Option<String> {
        let body = json!({ "email": email, "password": password });
        let (status, response) = self.post("/api/auth/login", &body.to_string()).await;
        if status != StatusCode::OK {
            return None;
        }
        let response: Value = serde_json::from_str(&response).unwrap();
        response["accessToken"].as_str().map(str::to_string)
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: String::new(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: SecretString::new(TEST_SECRET.to_string()),
            access_token_expiry_secs: 3600,
        },
    }
}
