//! Business logic services
//!
//! Services coordinate the credential store, password hasher and token
//! service.

pub mod auth;

pub use auth::AuthService;
