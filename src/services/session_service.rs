//! Session service for logging in and out of the directory.
//!
//! Provides the session lifecycle:
//! - Registration of new users
//! - Login, which persists the token and user identity
//! - Logout, which removes them
//! - Restore-on-start from the credential store

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{is_valid_email, Session};
use crate::providers::directory::{DirectoryError, EmailDirectoryService};

/// Credential key holding the access token.
pub const TOKEN_KEY: &str = "session.token";
/// Credential key holding the logged-in user's email.
pub const USER_KEY: &str = "session.user";

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Email failed the local syntax check.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Empty password.
    #[error("password must not be empty")]
    MissingPassword,

    /// No session is stored.
    #[error("not logged in")]
    NotLoggedIn,

    /// The backend rejected the request.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Credential storage error.
    #[error("credential storage error: {0}")]
    CredentialError(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Storage abstraction for credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stores a credential, overwriting any previous value.
    async fn store(&self, key: &str, value: &str) -> SessionResult<()>;

    /// Retrieves a credential.
    async fn retrieve(&self, key: &str) -> SessionResult<Option<String>>;

    /// Deletes a credential. Deleting a missing credential succeeds.
    async fn delete(&self, key: &str) -> SessionResult<()>;
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    async fn store(&self, key: &str, value: &str) -> SessionResult<()> {
        (**self).store(key, value).await
    }

    async fn retrieve(&self, key: &str) -> SessionResult<Option<String>> {
        (**self).retrieve(key).await
    }

    async fn delete(&self, key: &str) -> SessionResult<()> {
        (**self).delete(key).await
    }
}

/// Service for the authentication lifecycle.
pub struct SessionService<D: EmailDirectoryService, C: CredentialStore> {
    directory: D,
    credentials: C,
}

impl<D: EmailDirectoryService, C: CredentialStore> SessionService<D, C> {
    /// Creates a new session service.
    pub fn new(directory: D, credentials: C) -> Self {
        Self {
            directory,
            credentials,
        }
    }

    /// Returns the directory backend.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Consumes the service, returning the directory backend.
    pub fn into_directory(self) -> D {
        self.directory
    }

    /// Registers a new user. The user still has to log in afterwards.
    pub async fn register(&self, email: &str, password: &str) -> SessionResult<()> {
        let email = validate_credentials(email, password)?;
        self.directory.register(email, password).await?;
        tracing::info!(user = %email, "user registered");
        Ok(())
    }

    /// Logs in and persists the session.
    ///
    /// The email is only trimmed; the backend decides whether the credentials
    /// are acceptable.
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<Session> {
        let email = email.trim();
        let session = self.directory.authenticate(email, password).await?;

        self.credentials.store(TOKEN_KEY, &session.access_token).await?;
        self.credentials.store(USER_KEY, &session.user).await?;

        tracing::info!(user = %session.user, "logged in");
        Ok(session)
    }

    /// Removes the persisted session.
    pub async fn logout(&self) -> SessionResult<()> {
        self.credentials.delete(TOKEN_KEY).await?;
        self.credentials.delete(USER_KEY).await?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Restores the persisted session, if both token and user are present.
    ///
    /// A half-written session (token without user or the reverse) counts as
    /// logged out and is cleared.
    pub async fn restore(&self) -> SessionResult<Option<Session>> {
        let token = self.credentials.retrieve(TOKEN_KEY).await?;
        let user = self.credentials.retrieve(USER_KEY).await?;

        match (token, user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                tracing::debug!(user = %user, "session restored");
                Ok(Some(Session::new(token, user)))
            }
            (None, None) => Ok(None),
            _ => {
                tracing::warn!("incomplete stored session, clearing");
                self.logout().await?;
                Ok(None)
            }
        }
    }

    /// Restores the persisted session or fails with [`SessionError::NotLoggedIn`].
    pub async fn require(&self) -> SessionResult<Session> {
        self.restore().await?.ok_or(SessionError::NotLoggedIn)
    }
}

/// Trims the email and checks both fields before any backend call.
fn validate_credentials<'a>(email: &'a str, password: &str) -> SessionResult<&'a str> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(SessionError::InvalidEmail(email.to_string()));
    }
    if password.is_empty() {
        return Err(SessionError::MissingPassword);
    }
    Ok(email)
}
