//! Token issuance and validation
//!
//! Tokens are HS256-signed JWTs carrying `sub`, `roles`, `iat` and `exp`.
//! The signing secret is handed in once at construction and never leaves
//! this module; keys are pre-computed so issuing and validating are cheap
//! and lock-free.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Claim names owned by the token service; caller-supplied values for these
/// are overwritten.
const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

/// Largest lifetime, in seconds, a `chrono::Duration` can hold
const MAX_TTL_SECS: i64 = i64::MAX / 1_000;

/// Failure kinds for issuing or validating a token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token subject must not be empty")]
    InvalidSubject,

    #[error("invalid claim: {0}")]
    InvalidClaims(String),

    #[error("token could not be decoded")]
    MalformedToken,

    #[error("token signature does not match")]
    SignatureInvalid,

    #[error("token has expired")]
    TokenExpired,

    #[error("token lifetime out of range")]
    LifetimeOutOfRange,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Decoded token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account email)
    pub sub: String,
    /// Role names granted at issue time
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Any additional caller-supplied claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A minted token together with its expiry
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

/// Pre-computed signing keys derived from the process secret
struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }
}

/// Signs and parses bearer tokens
///
/// Cloning shares the same keys. The service holds no mutable state, so
/// clones may be used from any number of tasks at once.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<TokenKeys>,
    default_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service from the signing secret
    ///
    /// Call once at startup and share via `AppState`. A default lifetime
    /// beyond what `Duration` can represent is clamped; issuing with it
    /// then fails with `LifetimeOutOfRange`.
    pub fn new(secret: &SecretString, default_ttl_secs: i64) -> Self {
        Self {
            keys: Arc::new(TokenKeys::new(secret)),
            default_ttl: Duration::seconds(default_ttl_secs.clamp(-MAX_TTL_SECS, MAX_TTL_SECS)),
        }
    }

    /// Lifetime used for login tokens
    #[inline]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `subject` that expires `ttl` from now
    ///
    /// `claims` is merged into the payload; it should carry at least a
    /// `roles` list. `sub`, `iat` and `exp` are always set by the service.
    pub fn issue(
        &self,
        subject: &str,
        claims: Map<String, Value>,
        ttl: Duration,
    ) -> Result<SignedToken, TokenError> {
        self.issue_at(subject, claims, ttl, Utc::now())
    }

    /// Issue a token as though the current time were `now`
    pub fn issue_at(
        &self,
        subject: &str,
        mut claims: Map<String, Value>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<SignedToken, TokenError> {
        if subject.trim().is_empty() {
            return Err(TokenError::InvalidSubject);
        }
        check_roles_claim(&claims)?;

        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::LifetimeOutOfRange)?;
        for key in RESERVED_CLAIMS {
            claims.remove(key);
        }
        claims.insert("sub".to_string(), Value::from(subject));
        claims.insert("iat".to_string(), Value::from(now.timestamp()));
        claims.insert("exp".to_string(), Value::from(expires_at.timestamp()));

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SignedToken { token, expires_at })
    }

    /// Decode a token, verify its signature and check it has not expired
    #[inline]
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as though the current time were `now`
    ///
    /// A token whose `exp` is at or before `now` is expired; no leeway.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.keys.decoding, &validation())
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                ErrorKind::ExpiredSignature => TokenError::TokenExpired,
                _ => TokenError::MalformedToken,
            })?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::MalformedToken);
        }
        if claims.exp <= now.timestamp() {
            return Err(TokenError::TokenExpired);
        }

        Ok(claims)
    }
}

/// Decoding rules: HS256 only, `sub` and `exp` required. Expiry is checked by
/// hand so that `exp == now` counts as expired.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["sub", "exp"]);
    validation
}

fn check_roles_claim(claims: &Map<String, Value>) -> Result<(), TokenError> {
    match claims.get("roles") {
        None => Ok(()),
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(()),
        Some(_) => Err(TokenError::InvalidClaims(
            "roles must be a list of strings".to_string(),
        )),
    }
}

/// Build the claim map for a set of role names
pub fn roles_claim<I, S>(roles: I) -> Map<String, Value>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let roles: Vec<Value> = roles.into_iter().map(|r| Value::String(r.into())).collect();
    let mut claims = Map::new();
    claims.insert("roles".to_string(), Value::Array(roles));
    claims
}
