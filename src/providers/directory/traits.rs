//! Email directory service trait definition.
//!
//! This module defines the [`EmailDirectoryService`] trait which abstracts over
//! the backend that stores domains and their email addresses. The state machine
//! in [`crate::app`] talks to the backend only through this trait.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{Domain, EmailAddress, Session};

/// Result type alias for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors reported by the directory backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Network or connection error.
    #[error("connection error: {0}")]
    Network(String),

    /// The backend rejected the input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing or rejected credential.
    #[error("unauthorized")]
    Unauthorized,

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Login rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Registration for an existing user.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    /// Domain deletion was attempted without a matching confirmation.
    #[error("confirmation required")]
    ConfirmationRequired,

    /// Any other backend failure.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code, or 0 when not HTTP.
        status: u16,
        /// Message reported by the server.
        message: String,
    },

    /// The response could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl DirectoryError {
    /// The human-readable detail reported by the backend, if it sent one.
    ///
    /// Used to surface server messages verbatim in place of generic fallbacks.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Validation(msg) | Self::NotFound(msg) | Self::AlreadyRegistered(msg) => {
                Some(msg.as_str())
            }
            Self::Server { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Returns the server message or the given fallback text.
    pub fn message_or(&self, fallback: &str) -> String {
        self.server_message()
            .filter(|msg| !msg.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Trait for email directory backends.
///
/// Implementations handle transport and authentication. Every method is async
/// and returns [`Result`] so backend failures can be surfaced to the user.
///
/// # Example
///
/// ```ignore
/// use email_groups::providers::directory::EmailDirectoryService;
///
/// async fn print_domains(service: &impl EmailDirectoryService) -> Result<()> {
///     for domain in service.list_domains().await? {
///         println!("{domain}");
///     }
///     Ok(())
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailDirectoryService: Send + Sync {
    /// Lists all known domains in backend order.
    async fn list_domains(&self) -> Result<Vec<Domain>>;

    /// Lists the email addresses stored under a domain.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] if the backend does not know the domain.
    async fn list_emails(&self, domain: &Domain) -> Result<Vec<EmailAddress>>;

    /// Adds an email under a domain.
    ///
    /// The value is sent as given; the backend may normalize it.
    async fn add_email(&self, domain: &Domain, email: &str) -> Result<()>;

    /// Deletes an email from a domain.
    async fn delete_email(&self, domain: &Domain, email: &EmailAddress) -> Result<()>;

    /// Deletes a domain and every email under it.
    ///
    /// `confirmation` must repeat the domain identifier.
    async fn delete_domain(&self, domain: &Domain, confirmation: &str) -> Result<()>;

    /// Downloads the CSV export of the whole directory.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unauthorized`] if the session is not accepted.
    async fn export_csv(&self, session: &Session) -> Result<Bytes>;

    /// Exchanges credentials for a session.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Session>;

    /// Creates a new user.
    async fn register(&self, email: &str, password: &str) -> Result<()>;
}

/// Blanket implementation for `Arc<T>` where `T: EmailDirectoryService`.
#[async_trait]
impl<T: EmailDirectoryService + ?Sized> EmailDirectoryService for Arc<T> {
    async fn list_domains(&self) -> Result<Vec<Domain>> {
        (**self).list_domains().await
    }

    async fn list_emails(&self, domain: &Domain) -> Result<Vec<EmailAddress>> {
        (**self).list_emails(domain).await
    }

    async fn add_email(&self, domain: &Domain, email: &str) -> Result<()> {
        (**self).add_email(domain, email).await
    }

    async fn delete_email(&self, domain: &Domain, email: &EmailAddress) -> Result<()> {
        (**self).delete_email(domain, email).await
    }

    async fn delete_domain(&self, domain: &Domain, confirmation: &str) -> Result<()> {
        (**self).delete_domain(domain, confirmation).await
    }

    async fn export_csv(&self, session: &Session) -> Result<Bytes> {
        (**self).export_csv(session).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
        (**self).authenticate(email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<()> {
        (**self).register(email, password).await
    }
}
