//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! # Design Principles
//!
//! 1. **Pre-compute expensive resources**: signing keys are derived once
//! 2. **Cheap cloning**: All fields use Arc or are already Clone-cheap
//! 3. **Immutable after creation**: State is read-only during request handling

use crate::auth::{PasswordHasher, PasswordService, TokenService};
use crate::config::AppConfig;
use crate::repositories::CredentialStore;
use crate::services::AuthService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Identity record storage
    pub store: Arc<dyn CredentialStore>,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Token service holding the pre-computed signing keys
    pub tokens: TokenService,
    /// Login and registration
    pub auth: AuthService,
}

impl AppState {
    /// Create application state with the default password hasher
    ///
    /// # Note
    /// This derives the signing keys from the config secret and should only
    /// be called once at application startup.
    pub fn new(store: Arc<dyn CredentialStore>, config: AppConfig) -> Self {
        Self::with_hasher(store, Arc::new(PasswordService), config)
    }

    /// Create application state with a specific password hasher
    pub fn with_hasher(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        config: AppConfig,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt.secret, config.jwt.access_token_expiry_secs);
        let auth = AuthService::new(store.clone(), hasher, tokens.clone());

        Self {
            store,
            config: Arc::new(config),
            tokens,
            auth,
        }
    }

    /// Get a reference to the credential store
    #[inline]
    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a reference to the token service
    #[inline]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Get a reference to the authentication gate
    #[inline]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }
}
