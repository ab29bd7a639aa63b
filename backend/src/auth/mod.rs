//! Authentication module
//!
//! Bearer-token authentication: token issuance and validation, password
//! hashing, the per-request security context and the middleware that
//! establishes it.

mod context;
mod error;
mod jwt;
mod middleware;
mod password;

pub use context::{AuthUser, Authentication, SecurityContext};
pub use error::AuthError;
pub use jwt::{roles_claim, Claims, SignedToken, TokenError, TokenService};
pub use middleware::{auth_middleware, authenticate_request, bearer_token};
pub use password::{PasswordHasher, PasswordService, DUMMY_HASH};
