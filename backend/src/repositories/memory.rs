//! In-memory credential store for development and tests

use super::user::{CreateError, CredentialStore, IdentityRecord, NewIdentity};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Credential store keyed by email, held in process memory
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, IdentityRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record as-is
    pub async fn insert(&self, record: IdentityRecord) {
        self.users.write().await.insert(record.email.clone(), record);
    }

    /// Remove the record for an email, returning it if present
    pub async fn remove(&self, email: &str) -> Option<IdentityRecord> {
        self.users.write().await.remove(email)
    }

    /// Enable or disable an account
    pub async fn set_enabled(&self, email: &str, enabled: bool) -> bool {
        match self.users.write().await.get_mut(email) {
            Some(record) => {
                record.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        Ok(self.users.read().await.contains_key(email))
    }

    async fn exists_by_employee_id(&self, employee_id: &str) -> Result<bool> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|u| u.employee_id == employee_id))
    }

    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, CreateError> {
        let mut users = self.users.write().await;

        // Mirrors the unique constraints on the users table
        if users.contains_key(&identity.email) {
            return Err(CreateError::DuplicateEmail);
        }
        if users.values().any(|u| u.employee_id == identity.employee_id) {
            return Err(CreateError::DuplicateEmployeeId);
        }

        let record = IdentityRecord {
            id: Uuid::new_v4(),
            email: identity.email,
            employee_id: identity.employee_id,
            name: identity.name,
            password_hash: identity.password_hash,
            enabled: true,
            roles: identity.roles,
        };
        users.insert(record.email.clone(), record.clone());

        Ok(record)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
