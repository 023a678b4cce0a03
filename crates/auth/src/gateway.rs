//! Credential login and self-registration.
//!
//! The gateway never sees password hashes. It delegates credential checks to
//! a [`CredentialVerifier`] and identity creation to an [`IdentityStore`], and
//! only mints tokens through the shared [`TokenCodec`].

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use storefront_core::UserId;

use crate::{Role, TokenCodec, TokenError};

/// An identity as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub roles: BTreeSet<Role>,
}

/// Registration candidate.
///
/// Callers cannot pick roles; new identities get [`Role::USER`] only.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Registration {
    /// Strip surrounding whitespace from the fields identities are keyed on,
    /// so `"alice "` and `"alice"` are the same username.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() {
            return Err(AuthError::InvalidRegistration("username is required".into()));
        }
        if self.password.is_empty() {
            return Err(AuthError::InvalidRegistration("password is required".into()));
        }
        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !well_formed {
            return Err(AuthError::InvalidRegistration("email is not well-formed".into()));
        }
        Ok(())
    }
}

/// What the identity store is asked to persist on registration.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: BTreeSet<Role>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid credentials")]
    Invalid,

    #[error("credential backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityStoreError {
    #[error("username already taken")]
    UsernameTaken,

    #[error("email already taken")]
    EmailTaken,

    #[error("identity not found")]
    NotFound,

    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

/// Checks a username/password pair. The only component allowed to look at
/// stored password hashes.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify_credential(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, CredentialError>;
}

/// Identity persistence used by registration.
///
/// `create` must itself reject duplicates; the existence checks are only a
/// fast path and race with concurrent registrations.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn exists_by_username(&self, username: &str) -> Result<bool, IdentityStoreError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, IdentityStoreError>;

    async fn create(&self, identity: NewIdentity) -> Result<Identity, IdentityStoreError>;
}

#[async_trait]
impl<T> CredentialVerifier for Arc<T>
where
    T: CredentialVerifier + ?Sized,
{
    async fn verify_credential(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, CredentialError> {
        (**self).verify_credential(username, password).await
    }
}

#[async_trait]
impl<T> IdentityStore for Arc<T>
where
    T: IdentityStore + ?Sized,
{
    async fn exists_by_username(&self, username: &str) -> Result<bool, IdentityStoreError> {
        (**self).exists_by_username(username).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, IdentityStoreError> {
        (**self).exists_by_email(email).await
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, IdentityStoreError> {
        (**self).create(identity).await
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("username already exists")]
    DuplicateUsername,

    #[error("email already exists")]
    DuplicateEmail,

    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("identity backend failure: {0}")]
    Backend(String),
}

impl From<IdentityStoreError> for AuthError {
    fn from(value: IdentityStoreError) -> Self {
        match value {
            IdentityStoreError::UsernameTaken => AuthError::DuplicateUsername,
            IdentityStoreError::EmailTaken => AuthError::DuplicateEmail,
            other => AuthError::Backend(other.to_string()),
        }
    }
}

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub identity: Identity,
}

/// Turns credentials into tokens and registrations into identities.
///
/// Holds no mutable state of its own.
pub struct AuthenticationGateway<C, S> {
    codec: Arc<TokenCodec>,
    ttl: Duration,
    credentials: C,
    identities: S,
}

impl<C, S> AuthenticationGateway<C, S>
where
    C: CredentialVerifier,
    S: IdentityStore,
{
    pub fn new(codec: Arc<TokenCodec>, ttl: Duration, credentials: C, identities: S) -> Self {
        Self {
            codec,
            ttl,
            credentials,
            identities,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthSession, AuthError> {
        let identity = match self.credentials.verify_credential(username, password).await {
            Ok(identity) => identity,
            Err(CredentialError::Invalid) => {
                tracing::warn!(username, "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            Err(CredentialError::Unavailable(reason)) => return Err(AuthError::Backend(reason)),
        };

        let token = self.codec.issue(
            &identity.username,
            identity.roles.iter().cloned(),
            now,
            self.ttl,
        )?;
        tracing::info!(username = %identity.username, "login succeeded");
        Ok(AuthSession { token, identity })
    }

    pub async fn register(
        &self,
        candidate: Registration,
        now: DateTime<Utc>,
    ) -> Result<AuthSession, AuthError> {
        let candidate = candidate.normalized();
        candidate.validate()?;

        if self.identities.exists_by_username(&candidate.username).await? {
            return Err(AuthError::DuplicateUsername);
        }
        if self.identities.exists_by_email(&candidate.email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let identity = self
            .identities
            .create(NewIdentity {
                username: candidate.username,
                email: candidate.email,
                password: candidate.password,
                first_name: candidate.first_name,
                last_name: candidate.last_name,
                roles: BTreeSet::from([Role::USER]),
            })
            .await?;

        let token = self.codec.issue(
            &identity.username,
            identity.roles.iter().cloned(),
            now,
            self.ttl,
        )?;
        tracing::info!(username = %identity.username, user_id = %identity.user_id, "registered identity");
        Ok(AuthSession { token, identity })
    }
}
