//! Errors surfaced by the domain/email store.

use thiserror::Error;

/// Fallback shown when adding fails without a server message.
pub const ADD_FAILED_FALLBACK: &str = "Failed to add email";
/// Fallback shown when deleting an email fails without a server message.
pub const DELETE_FAILED_FALLBACK: &str = "Delete failed";
/// Fallback shown when deleting a domain fails without a server message.
pub const DOMAIN_DELETE_FAILED_FALLBACK: &str = "Domain deletion failed.";
/// Fallback shown when the export fails without a server message.
pub const EXPORT_FAILED_FALLBACK: &str = "Download failed or unauthorized.";

/// The last error recorded by the store.
///
/// Client-detected variants are raised before any backend call. The others
/// carry the server message when one was sent, or a fixed fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The address is already stored under the selected domain, ignoring case.
    #[error("Email already exists under this domain.")]
    DuplicateEmail,

    /// The typed confirmation does not equal the domain.
    #[error("Confirmation does not match. Domain not deleted.")]
    ConfirmationMismatch,

    /// An email operation was attempted with no domain selected.
    #[error("No domain selected.")]
    NoDomainSelected,

    /// The domain is not in the current domain list.
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    /// The deletion token is unknown or was already used.
    #[error("No pending deletion matches this request.")]
    UnknownDeletionRequest,

    /// The domain list could not be loaded.
    #[error("Could not load domains: {0}")]
    DomainsUnavailable(String),

    /// The backend rejected an add.
    #[error("{0}")]
    AddFailed(String),

    /// The backend rejected an email deletion.
    #[error("{0}")]
    DeleteFailed(String),

    /// The backend rejected a domain deletion.
    #[error("{0}")]
    DomainDeleteFailed(String),

    /// The export could not be downloaded.
    #[error("{0}")]
    ExportFailed(String),
}

impl StoreError {
    /// Returns true for errors detected without contacting the backend.
    pub fn is_client_detected(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEmail
                | Self::ConfirmationMismatch
                | Self::NoDomainSelected
                | Self::UnknownDomain(_)
                | Self::UnknownDeletionRequest
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
