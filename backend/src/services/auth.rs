//! Authentication gate: login and registration
//!
//! # Performance Optimizations
//!
//! - Password hashing/verification runs on the blocking thread pool
//! - The token service is shared (pre-computed keys)
//! - No lock is held across store or hasher calls

use crate::auth::{roles_claim, AuthError, PasswordHasher, SecurityContext, TokenService, DUMMY_HASH};
use crate::error::ApiError;
use crate::repositories::{CredentialStore, IdentityRecord, NewIdentity};
use auth_service_shared::{validation, AuthResponse, RegisterRequest, TOKEN_TYPE};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: TokenService,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Login with email and password
    ///
    /// Unknown email, disabled account and wrong password all fail with
    /// the same `AuthenticationFailed`. The password is verified in every
    /// case so the three take comparable time.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let record = self.store.find_by_email(email).await?;

        let hash = record
            .as_ref()
            .map_or(DUMMY_HASH.as_str(), |r| r.password_hash.as_str());
        let password_ok = match self.hasher.verify(password, hash).await {
            Ok(matches) => matches,
            Err(e) => {
                if record.is_some() {
                    warn!("Stored password hash unusable: {}", e);
                }
                false
            }
        };

        let record = match record {
            Some(record) if password_ok && record.enabled => record,
            _ => {
                debug!("Login rejected");
                return Err(AuthError::AuthenticationFailed);
            }
        };

        // Sorted because roles is a BTreeSet
        let ttl = self.tokens.default_ttl();
        let token = self
            .tokens
            .issue(&record.email, roles_claim(record.roles.iter().cloned()), ttl)?;

        info!(user_id = %record.id, "User logged in");

        Ok(AuthResponse {
            access_token: token.token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: ttl.num_seconds(),
        })
    }

    /// Register a new user
    ///
    /// Roles default to `ROLE_EMPLOYEE` when none are requested. Requested
    /// roles are accepted as long as the names are well-formed.
    pub async fn register(&self, req: RegisterRequest) -> Result<IdentityRecord, ApiError> {
        req.validate()?;
        let roles = validation::resolve_roles(req.roles.as_ref()).map_err(ApiError::BadRequest)?;

        if self.store.exists_by_email(&req.email).await? {
            return Err(ApiError::Conflict("Email already used".to_string()));
        }
        if self.store.exists_by_employee_id(&req.employee_id).await? {
            return Err(ApiError::Conflict("EmployeeId already used".to_string()));
        }

        let password_hash = self.hasher.hash(&req.password).await?;

        let record = self
            .store
            .create(NewIdentity {
                email: req.email,
                employee_id: req.employee_id,
                name: req.name,
                password_hash,
                roles,
            })
            .await?;

        info!(user_id = %record.id, roles = ?record.roles, "User registered");
        Ok(record)
    }

    /// Resolve a token subject back to the security context for a request
    ///
    /// Authorities come from the stored record, not the token, so role
    /// changes apply on the next request.
    pub async fn resolve_identity(&self, email: &str) -> Result<SecurityContext, AuthError> {
        match self.store.find_by_email(email).await? {
            Some(record) if record.enabled => {
                Ok(SecurityContext::authenticated(record.email, record.roles))
            }
            _ => Err(AuthError::IdentityResolutionFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PasswordService, TokenError};
    use crate::repositories::InMemoryCredentialStore;
    use async_trait::async_trait;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use secrecy::SecretString;
    use std::collections::BTreeSet;

    /// Cheap hasher so tests don't pay for argon2
    struct PlainHasher;

    #[async_trait]
    impl PasswordHasher for PlainHasher {
        async fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
            Ok(format!("plain:{}", plaintext))
        }

        async fn verify(&self, plaintext: &str, hash: &str) -> anyhow::Result<bool> {
            match hash.strip_prefix("plain:") {
                Some(stored) => Ok(stored == plaintext),
                None => anyhow::bail!("unknown hash format"),
            }
        }
    }

    fn tokens() -> TokenService {
        TokenService::new(&SecretString::new("service-test-secret".to_string()), 3600)
    }

    fn service(store: Arc<InMemoryCredentialStore>) -> AuthService {
        AuthService::new(store, Arc::new(PlainHasher), tokens())
    }

    fn register_request(email: &str, roles: Option<&[&str]>) -> RegisterRequest {
        RegisterRequest {
            employee_id: format!("E-{}", email.len()),
            name: Name().fake(),
            email: email.to_string(),
            password: "correct-pw".to_string(),
            roles: roles.map(|r| r.iter().map(|s| s.to_string()).collect()),
        }
    }

    async fn seeded(email: &str, roles: &[&str]) -> (AuthService, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        store
            .insert(IdentityRecord {
                id: uuid::Uuid::new_v4(),
                email: email.to_string(),
                employee_id: "E-100".to_string(),
                name: "Alice".to_string(),
                password_hash: "plain:correct-pw".to_string(),
                enabled: true,
                roles: roles.iter().map(|s| s.to_string()).collect(),
            })
            .await;
        (service(store.clone()), store)
    }

    #[tokio::test]
    async fn test_login_success() {
        let (service, _) = seeded("alice@example.com", &["ROLE_EMPLOYEE"]).await;

        let response = service.login("alice@example.com", "correct-pw").await.unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);

        let claims = tokens().validate(&response.access_token).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.roles, vec!["ROLE_EMPLOYEE".to_string()]);
    }

    #[tokio::test]
    async fn test_login_with_oversized_ttl_errors_instead_of_panicking() {
        let (_, store) = seeded("alice@example.com", &["ROLE_EMPLOYEE"]).await;
        let tokens = TokenService::new(
            &SecretString::new("service-test-secret".to_string()),
            10_000_000_000_000,
        );
        let service = AuthService::new(store, Arc::new(PlainHasher), tokens);

        let err = service.login("alice@example.com", "correct-pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Token(TokenError::LifetimeOutOfRange)));
    }

    #[tokio::test]
    async fn test_login_roles_are_sorted() {
        let (service, _) =
            seeded("alice@example.com", &["ROLE_MANAGER", "ROLE_ADMIN", "ROLE_EMPLOYEE"]).await;

        let response = service.login("alice@example.com", "correct-pw").await.unwrap();
        let claims = tokens().validate(&response.access_token).unwrap();
        assert_eq!(claims.roles, vec!["ROLE_ADMIN", "ROLE_EMPLOYEE", "ROLE_MANAGER"]);
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let (service, store) = seeded("alice@example.com", &["ROLE_EMPLOYEE"]).await;

        let unknown = service.login("nobody@example.com", "correct-pw").await.unwrap_err();
        let wrong_pw = service.login("alice@example.com", "wrong-pw").await.unwrap_err();
        store.set_enabled("alice@example.com", false).await;
        let disabled = service.login("alice@example.com", "correct-pw").await.unwrap_err();

        for err in [unknown, wrong_pw, disabled] {
            assert!(matches!(err, AuthError::AuthenticationFailed), "got {:?}", err);
        }
    }

    #[tokio::test]
    async fn test_login_with_unusable_hash_fails_closed() {
        let (service, store) = seeded("alice@example.com", &["ROLE_EMPLOYEE"]).await;
        let mut record = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        record.password_hash = "garbage".to_string();
        store.insert(record).await;

        let err = service.login("alice@example.com", "correct-pw").await.unwrap_err();
        assert!(matches!(err, AuthError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_login_with_argon2_hasher() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let service = AuthService::new(store.clone(), Arc::new(PasswordService), tokens());
        service
            .register(register_request("dana@example.com", None))
            .await
            .unwrap();

        assert!(service.login("dana@example.com", "correct-pw").await.is_ok());
        assert!(service.login("dana@example.com", "nope").await.is_err());
        assert!(service.login("ghost@example.com", "correct-pw").await.is_err());
    }

    #[tokio::test]
    async fn test_register_defaults_role() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let service = service(store.clone());
        let email: String = SafeEmail().fake();

        let record = service.register(register_request(&email, None)).await.unwrap();
        assert_eq!(record.roles, BTreeSet::from(["ROLE_EMPLOYEE".to_string()]));
        assert!(record.enabled);
        assert_eq!(record.password_hash, "plain:correct-pw");
        assert!(store.exists_by_email(&email).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_keeps_requested_roles() {
        let service = service(Arc::new(InMemoryCredentialStore::new()));

        let record = service
            .register(register_request("root@example.com", Some(&["ROLE_ADMIN"])))
            .await
            .unwrap();
        assert_eq!(record.roles, BTreeSet::from(["ROLE_ADMIN".to_string()]));
    }

    #[tokio::test]
    async fn test_register_conflicts() {
        let service = service(Arc::new(InMemoryCredentialStore::new()));
        service
            .register(register_request("alice@example.com", None))
            .await
            .unwrap();

        let same_email = register_request("alice@example.com", None);
        let err = service.register(same_email).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(msg) if msg == "Email already used"));

        let mut same_employee = register_request("other@example.com", None);
        same_employee.employee_id = format!("E-{}", "alice@example.com".len());
        let err = service.register(same_employee).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(msg) if msg == "EmployeeId already used"));
    }

    /// Holds each caller in `hash` until the other arrives, so both
    /// registrations pass the exists checks before either one writes
    struct GatedHasher {
        gate: tokio::sync::Barrier,
    }

    #[async_trait]
    impl PasswordHasher for GatedHasher {
        async fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
            self.gate.wait().await;
            PlainHasher.hash(plaintext).await
        }

        async fn verify(&self, plaintext: &str, hash: &str) -> anyhow::Result<bool> {
            PlainHasher.verify(plaintext, hash).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simultaneous_duplicate_registrations_conflict() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let hasher = Arc::new(GatedHasher {
            gate: tokio::sync::Barrier::new(2),
        });
        let service = AuthService::new(store.clone(), hasher, tokens());

        let first = tokio::spawn({
            let service = service.clone();
            async move { service.register(register_request("dup@example.com", None)).await }
        });
        let second = tokio::spawn({
            let service = service.clone();
            async move { service.register(register_request("dup@example.com", None)).await }
        });

        let (first, second) = (first.await.unwrap(), second.await.unwrap());
        let err = match (first, second) {
            (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
            other => panic!("expected one success and one failure, got {:?}", other),
        };
        assert!(matches!(err, ApiError::Conflict(msg) if msg == "Email already used"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let service = service(Arc::new(InMemoryCredentialStore::new()));

        let mut weak = register_request("weak@example.com", None);
        weak.password = "123".to_string();
        assert!(matches!(service.register(weak).await, Err(ApiError::Validation(_))));

        let bad_role = register_request("role@example.com", Some(&["superuser"]));
        assert!(matches!(service.register(bad_role).await, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_resolve_identity() {
        let (service, store) = seeded("alice@example.com", &["ROLE_EMPLOYEE"]).await;

        let context = service.resolve_identity("alice@example.com").await.unwrap();
        assert_eq!(context.principal(), Some("alice@example.com"));
        assert!(context.has_authority("ROLE_EMPLOYEE"));

        store.set_enabled("alice@example.com", false).await;
        assert!(matches!(
            service.resolve_identity("alice@example.com").await,
            Err(AuthError::IdentityResolutionFailed)
        ));

        store.remove("alice@example.com").await;
        assert!(matches!(
            service.resolve_identity("alice@example.com").await,
            Err(AuthError::IdentityResolutionFailed)
        ));
    }
}
