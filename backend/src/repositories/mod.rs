//! Credential repositories
//!
//! Provides the credential store seam and its implementations.

pub mod memory;
pub mod user;

pub use memory::InMemoryCredentialStore;
pub use user::{CreateError, CredentialStore, IdentityRecord, NewIdentity, PgCredentialStore};
