//! Authentication failure kinds

use super::jwt::TokenError;
use thiserror::Error;

/// Errors from the login path and identity resolution
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email, disabled account or wrong password
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Token subject no longer maps to a usable account
    #[error("identity could not be resolved")]
    IdentityResolutionFailed,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}
