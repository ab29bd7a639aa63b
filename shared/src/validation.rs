//! Input validation functions
//!
//! Field-level checks for registration live on the DTOs as `validator`
//! derives; the helpers here cover role names, which the derive can't
//! express cleanly.

use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Role granted when a registration doesn't ask for any
pub const DEFAULT_ROLE: &str = "ROLE_EMPLOYEE";

/// Token type reported alongside every issued access token
pub const TOKEN_TYPE: &str = "Bearer";

fn role_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^ROLE_[A-Z][A-Z0-9_]*$").unwrap())
}

/// Validate a single role name (`ROLE_` followed by upper-case words)
pub fn validate_role_name(role: &str) -> Result<(), String> {
    if role.len() > 64 {
        return Err("Role name too long".to_string());
    }
    if !role_pattern().is_match(role) {
        return Err(format!("Invalid role name: {}", role));
    }
    Ok(())
}

/// Resolve the role set for a new account
///
/// An absent or empty request yields the default role only.
pub fn resolve_roles(requested: Option<&BTreeSet<String>>) -> Result<BTreeSet<String>, String> {
    match requested {
        Some(roles) if !roles.is_empty() => {
            for role in roles {
                validate_role_name(role)?;
            }
            Ok(roles.clone())
        }
        _ => Ok(BTreeSet::from([DEFAULT_ROLE.to_string()])),
    }
}
