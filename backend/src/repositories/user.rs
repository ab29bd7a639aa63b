//! User repository for credential lookups
//!
//! `CredentialStore` is the seam the auth core talks to. The PostgreSQL
//! implementation keeps roles in a separate `user_roles` table.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

const EMAIL_UNIQUE: &str = "users_email_key";
const EMPLOYEE_ID_UNIQUE: &str = "users_employee_id_key";

/// Stored identity used for credential and role lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub id: Uuid,
    pub email: String,
    pub employee_id: String,
    pub name: String,
    pub password_hash: String,
    pub enabled: bool,
    pub roles: BTreeSet<String>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub employee_id: String,
    pub name: String,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
}

/// Failure creating a user
///
/// Duplicates are reported by the store itself, so a registration that
/// loses a race with another one still gets a conflict.
#[derive(Error, Debug)]
pub enum CreateError {
    #[error("email already used")]
    DuplicateEmail,

    #[error("employee id already used")]
    DuplicateEmployeeId,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<sqlx::Error> for CreateError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                match db_err.constraint() {
                    Some(EMAIL_UNIQUE) => return Self::DuplicateEmail,
                    Some(EMPLOYEE_ID_UNIQUE) => return Self::DuplicateEmployeeId,
                    _ => {}
                }
            }
        }
        Self::Store(err.into())
    }
}

/// Persistence of identity records
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the record for an email, if any
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>>;

    /// Check if an email is already registered
    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// Check if an employee ID is already registered
    async fn exists_by_employee_id(&self, employee_id: &str) -> Result<bool>;

    /// Create an enabled user with the given roles
    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, CreateError>;

    /// Check the backing storage is reachable
    async fn health_check(&self) -> Result<()>;
}

/// User row from database
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    employee_id: String,
    name: String,
    password_hash: String,
    enabled: bool,
}

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn roles_for(&self, user_id: Uuid) -> Result<BTreeSet<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role FROM user_roles WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles.into_iter().collect())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, employee_id, name, password_hash, enabled
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let roles = self.roles_for(row.id).await?;

        Ok(Some(IdentityRecord {
            id: row.id,
            email: row.email,
            employee_id: row.employee_id,
            name: row.name,
            password_hash: row.password_hash,
            enabled: row.enabled,
            roles,
        }))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn exists_by_employee_id(&self, employee_id: &str) -> Result<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE employee_id = $1)
            "#,
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, CreateError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, employee_id, name, password_hash, enabled)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING id, email, employee_id, name, password_hash, enabled
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.email)
        .bind(&identity.employee_id)
        .bind(&identity.name)
        .bind(&identity.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        for role in &identity.roles {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role)
                VALUES ($1, $2)
                "#,
            )
            .bind(row.id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(IdentityRecord {
            id: row.id,
            email: row.email,
            employee_id: row.employee_id,
            name: row.name,
            password_hash: row.password_hash,
            enabled: row.enabled,
            roles: identity.roles,
        })
    }

    async fn health_check(&self) -> Result<()> {
        crate::db::health_check(&self.pool).await
    }
}
