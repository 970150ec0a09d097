//! Authentication service layer
//!
//! Composes the credential store, password hasher and token issuer into the
//! five credential operations. The service holds no mutable state of its own;
//! every collaborator is injected at construction.

use std::sync::{Arc, OnceLock};

use credo_core::{CredentialStore, StoreError, User};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::error::AuthError;
use super::jwt::{Claims, TokenIssuer};
use super::models::{AuthResponse, UserPublic};
use super::password::PasswordHasher;
use crate::audit::{audit_log, AuditEvent, LoginFailureReason};

/// Hashed once and verified against when a login names an unknown email,
/// so both login failures cost one password verification.
const TIMING_DUMMY_PASSWORD: &str = "credo-timing-equalizer";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<TokenIssuer>,
    dummy_hash: Arc<OnceLock<String>>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// The store this service writes to
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Register a new user and issue a token
    ///
    /// # Errors
    ///
    /// * `UserExists` - email already registered, either by the pre-check or
    ///   by the store's uniqueness constraint
    /// * `HashingError`, `StoreUnavailable`, `TokenIssue`
    #[instrument(skip_all, fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthResponse, AuthError> {
        // Friendlier common-case error; the insert below is authoritative
        match self.store.find_by_email(email).await {
            Ok(_) => {
                self.audit_registration_failure(email, &AuthError::UserExists);
                return Err(AuthError::UserExists);
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = self.hash_password(password).await?;

        let user = match self.store.create(email, &password_hash, name).await {
            Ok(user) => user,
            Err(e) => {
                let err = AuthError::from(e);
                self.audit_registration_failure(email, &err);
                return Err(err);
            }
        };

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: user.id,
            email: user.email.clone(),
        });

        self.respond_with_token(user)
    }

    /// Authenticate with email and password
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`;
    /// only the audit log records which one happened.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = match self.store.find_by_email(email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                self.burn_verification(password).await;
                audit_log(&AuditEvent::LoginFailure {
                    email: email.to_string(),
                    reason: LoginFailureReason::UnknownEmail,
                });
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.verify_password(password, &user.password_hash).await? {
            audit_log(&AuditEvent::LoginFailure {
                email: email.to_string(),
                reason: LoginFailureReason::WrongPassword,
            });
            return Err(AuthError::InvalidCredentials);
        }

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
        });

        self.respond_with_token(user)
    }

    /// Fetch the current profile
    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserPublic, AuthError> {
        let user = self.store.find_by_id(user_id).await?;
        Ok(user.into())
    }

    /// Replace name and email
    ///
    /// Uniqueness is left to the store; a collision returns `UserExists`.
    #[instrument(skip_all, fields(user_id = %user_id, email = %email))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<UserPublic, AuthError> {
        let user = self.store.update(user_id, name, email).await?;

        audit_log(&AuditEvent::ProfileUpdated {
            user_id: user.id,
            email: user.email.clone(),
        });

        Ok(user.into())
    }

    /// Change the password after checking the current one
    ///
    /// Tokens issued before the change stay valid until they expire.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.store.find_by_id(user_id).await?;

        if !self.verify_password(old_password, &user.password_hash).await? {
            audit_log(&AuditEvent::PasswordChangeFailure { user_id });
            return Err(AuthError::InvalidCurrentPassword);
        }

        let new_hash = self.hash_password(new_password).await?;
        self.store.update_password_hash(user_id, &new_hash).await?;

        audit_log(&AuditEvent::PasswordChanged { user_id });
        Ok(())
    }

    /// Verify a bearer token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.tokens.verify(token)?)
    }

    fn respond_with_token(&self, user: User) -> Result<AuthResponse, AuthError> {
        let issued = self.tokens.issue(&user)?;
        debug!(user_id = %user.id, expires_at = issued.expires_at, "Issued access token");

        Ok(AuthResponse {
            user: user.into(),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    fn audit_registration_failure(&self, email: &str, err: &AuthError) {
        audit_log(&AuditEvent::RegistrationFailure {
            email: email.to_string(),
            reason: err.to_string(),
        });
    }

    /// Hash off the async executor
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::HashingError(format!("hashing task failed: {e}")))?
            .map_err(AuthError::from)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::HashingError(format!("verification task failed: {e}")))?
            .map_err(AuthError::from)
    }

    /// Spend one verification on a throwaway hash. Outcome is irrelevant.
    ///
    /// The dummy hash is only cached once hashing succeeds; a failed attempt
    /// is retried on the next unknown-email login.
    async fn burn_verification(&self, password: &str) {
        let hasher = Arc::clone(&self.hasher);
        let dummy_hash = Arc::clone(&self.dummy_hash);
        let password = password.to_owned();

        let task = tokio::task::spawn_blocking(move || {
            let hash = match dummy_hash.get() {
                Some(hash) => hash,
                None => match hasher.hash(TIMING_DUMMY_PASSWORD) {
                    Ok(hash) => dummy_hash.get_or_init(|| hash),
                    Err(e) => {
                        warn!(error = %e, "Failed to compute dummy hash for unknown-email login");
                        return;
                    }
                },
            };
            if let Err(e) = hasher.verify(&password, hash) {
                warn!(error = %e, "Dummy verification failed");
            }
        });

        if let Err(e) = task.await {
            warn!(error = %e, "Dummy verification task failed");
        }
    }
}
