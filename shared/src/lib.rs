//! Auth Service Shared Library
//!
//! This crate contains the request/response types and input validation
//! helpers shared between the backend and its clients.

pub mod types;
pub mod validation;

// Re-export commonly used items
pub use types::*;
pub use validation::{DEFAULT_ROLE, TOKEN_TYPE};
