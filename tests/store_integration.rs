//! Integration tests for the domain/email store.
//!
//! These run the store against the in-memory directory backend, which applies
//! the same normalization and validation rules as the REST backend, with a
//! session obtained through the session service.

use std::sync::Arc;

use email_groups::app::{DomainEmailStore, LoadOutcome, StoreError, EXPORT_FAILED_FALLBACK};
use email_groups::domain::{Domain, EmailAddress, Session};
use email_groups::providers::directory::{
    DirectoryCall, DirectoryError, EmailDirectoryService, InMemoryDirectory,
};
use email_groups::services::SessionService;
use email_groups::storage::MemoryCredentials;
use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

type Store = DomainEmailStore<Arc<InMemoryDirectory>>;

fn seeded_directory() -> Arc<InMemoryDirectory> {
    Arc::new(
        InMemoryDirectory::with_emails(["a@acme.com", "b@acme.com", "c@beta.io"])
            .with_user("me@example.com", "hunter2"),
    )
}

async fn logged_in_store(directory: &Arc<InMemoryDirectory>) -> Store {
    let sessions = SessionService::new(Arc::clone(directory), MemoryCredentials::new());
    let session = assert_ok!(sessions.login("me@example.com", "hunter2").await);

    let mut store = DomainEmailStore::new(Arc::clone(directory), session);
    assert_ok!(store.initialize().await);
    store
}

fn emails(list: &[&str]) -> Vec<EmailAddress> {
    list.iter().map(|e| EmailAddress::from(*e)).collect()
}

fn domains(list: &[&str]) -> Vec<Domain> {
    list.iter().map(|d| Domain::from(*d)).collect()
}

// ============================================================================
// Loading and selection
// ============================================================================

#[tokio::test]
async fn initialize_selects_first_domain() {
    let directory = seeded_directory();
    let store = logged_in_store(&directory).await;

    assert_eq!(store.domains(), domains(&["acme.com", "beta.io"]).as_slice());
    assert_eq!(store.selected_domain(), Some(&Domain::from("acme.com")));
    assert_eq!(store.emails(), emails(&["a@acme.com", "b@acme.com"]).as_slice());
    assert!(store.last_error().is_none());
}

#[tokio::test]
async fn switching_domains_replaces_emails() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;

    let outcome = store.select_domain(&Domain::from("beta.io")).await;

    assert_eq!(outcome, LoadOutcome::Applied);
    assert_eq!(store.emails(), emails(&["c@beta.io"]).as_slice());
}

#[tokio::test]
async fn failed_load_keeps_previous_emails() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;
    directory.fail_next(
        DirectoryCall::ListEmails,
        DirectoryError::Network("connection reset".into()),
    );

    let outcome = store.select_domain(&Domain::from("beta.io")).await;

    assert_eq!(outcome, LoadOutcome::Failed);
    assert_eq!(store.selected_domain(), Some(&Domain::from("beta.io")));
    assert_eq!(store.emails(), emails(&["a@acme.com", "b@acme.com"]).as_slice());
    assert!(store.last_error().is_none());
}

#[tokio::test]
async fn refresh_picks_up_new_domains_and_keeps_selection() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;
    assert_eq!(store.select_domain(&Domain::from("beta.io")).await, LoadOutcome::Applied);

    // Another client adds an address under a new domain.
    assert_ok!(directory.add_email(&Domain::from("gamma.dev"), "z@gamma.dev").await);
    assert_ok!(store.refresh().await);

    assert_eq!(
        store.domains(),
        domains(&["acme.com", "beta.io", "gamma.dev"]).as_slice()
    );
    assert_eq!(store.selected_domain(), Some(&Domain::from("beta.io")));
}

#[tokio::test]
async fn refresh_after_selected_domain_is_removed_elsewhere() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;

    // Another client deletes the selected domain.
    assert_ok!(directory.delete_domain(&Domain::from("acme.com"), "acme.com").await);
    assert_ok!(store.refresh().await);

    assert_eq!(store.domains(), domains(&["beta.io"]).as_slice());
    assert_eq!(store.selected_domain(), Some(&Domain::from("beta.io")));
    assert_eq!(store.emails(), emails(&["c@beta.io"]).as_slice());
}

#[tokio::test]
async fn email_operations_need_a_selected_domain() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;

    assert_ok!(store.delete_domain(&Domain::from("acme.com"), "acme.com").await);
    assert!(store.selected_domain().is_none());

    let err = assert_err!(store.add_email("z@beta.io").await);
    assert_eq!(err, StoreError::NoDomainSelected);
    let err = assert_err!(store.delete_email(&EmailAddress::from("c@beta.io")).await);
    assert_eq!(err, StoreError::NoDomainSelected);

    assert_eq!(directory.calls(DirectoryCall::AddEmail), 0);
    assert_eq!(directory.calls(DirectoryCall::DeleteEmail), 0);
    assert_eq!(directory.stored_emails(), vec!["c@beta.io".to_string()]);
}

#[tokio::test]
async fn initialize_failure_is_reported() {
    let directory = seeded_directory();
    directory.fail_next(
        DirectoryCall::ListDomains,
        DirectoryError::Server {
            status: 500,
            message: "Internal Server Error".into(),
        },
    );

    let session = Session::new("t", "me@example.com");
    let mut store = DomainEmailStore::new(Arc::clone(&directory), session);
    let err = assert_err!(store.initialize().await);

    assert!(matches!(err, StoreError::DomainsUnavailable(_)));
    assert!(store.domains().is_empty());
    assert!(store.selected_domain().is_none());
}

// ============================================================================
// Adding and deleting emails
// ============================================================================

#[tokio::test]
async fn add_email_refetches_normalized_value() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;

    store.set_pending_input("  New@ACME.com ");
    assert_ok!(store.submit_pending().await);

    assert_eq!(
        store.emails(),
        emails(&["a@acme.com", "b@acme.com", "new@acme.com"]).as_slice()
    );
    assert_eq!(store.pending_input(), "");
    assert!(directory.stored_emails().contains(&"new@acme.com".to_string()));
}

#[tokio::test]
async fn duplicate_is_rejected_before_backend_call() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;

    let err = assert_err!(store.add_email("A@Acme.com").await);

    assert_eq!(err, StoreError::DuplicateEmail);
    assert_eq!(err.to_string(), "Email already exists under this domain.");
    assert_eq!(directory.calls(DirectoryCall::AddEmail), 0);
}

#[tokio::test]
async fn backend_rejection_surfaces_server_message() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;

    let err = assert_err!(store.add_email("x@beta.io").await);
    assert_eq!(err, StoreError::AddFailed("Email domain mismatch".into()));

    let err = assert_err!(store.add_email("not-an-email").await);
    assert_eq!(err, StoreError::AddFailed("Invalid email format".into()));
    assert_eq!(store.emails().len(), 2);
}

#[tokio::test]
async fn delete_email_removes_locally() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;
    let loads = directory.calls(DirectoryCall::ListEmails);

    assert_ok!(store.delete_email(&EmailAddress::from("b@acme.com")).await);

    assert_eq!(store.emails(), emails(&["a@acme.com"]).as_slice());
    assert_eq!(directory.calls(DirectoryCall::ListEmails), loads);

    let err = assert_err!(store.delete_email(&EmailAddress::from("b@acme.com")).await);
    assert_eq!(err, StoreError::DeleteFailed("Email not found".into()));
}

// ============================================================================
// Deleting domains
// ============================================================================

#[tokio::test]
async fn domain_deletion_requires_exact_confirmation() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;
    let acme = Domain::from("acme.com");

    let pending = assert_ok!(store.request_domain_deletion(&acme));
    assert_eq!(pending.prompt(), "Type \"acme.com\" to confirm deletion:");
    let err = assert_err!(store.confirm_domain_deletion(pending.token, "Acme.com").await);

    assert_eq!(err, StoreError::ConfirmationMismatch);
    assert_eq!(directory.calls(DirectoryCall::DeleteDomain), 0);
    assert_eq!(store.domains(), domains(&["acme.com", "beta.io"]).as_slice());

    assert_ok!(store.delete_domain(&acme, "acme.com").await);

    assert_eq!(store.domains(), domains(&["beta.io"]).as_slice());
    assert!(store.selected_domain().is_none());
    assert!(store.emails().is_empty());
    assert_eq!(directory.stored_emails(), vec!["c@beta.io".to_string()]);
}

#[tokio::test]
async fn deleting_other_domain_keeps_selection() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;

    assert_ok!(store.delete_domain(&Domain::from("beta.io"), "beta.io").await);

    assert_eq!(store.domains(), domains(&["acme.com"]).as_slice());
    assert_eq!(store.selected_domain(), Some(&Domain::from("acme.com")));
    assert_eq!(store.emails(), emails(&["a@acme.com", "b@acme.com"]).as_slice());
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn export_groups_emails_by_domain() {
    let directory = seeded_directory();
    let mut store = logged_in_store(&directory).await;

    let csv = assert_ok!(store.export_csv().await);

    assert_eq!(
        std::str::from_utf8(&csv).unwrap(),
        "Domain,Email\r\nacme.com,\r\n,a@acme.com\r\n,b@acme.com\r\nbeta.io,\r\n,c@beta.io\r\n"
    );
}

#[tokio::test]
async fn export_with_unknown_token_fails() {
    let directory = seeded_directory();
    let mut store =
        DomainEmailStore::new(Arc::clone(&directory), Session::new("forged", "me@example.com"));

    let err = assert_err!(store.export_csv().await);

    assert_eq!(err, StoreError::ExportFailed(EXPORT_FAILED_FALLBACK.into()));
    assert_eq!(store.last_error(), Some(&err));
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn session_survives_service_restart() {
    let directory = seeded_directory();
    let credentials = Arc::new(MemoryCredentials::new());

    let first = SessionService::new(Arc::clone(&directory), Arc::clone(&credentials));
    let session = assert_ok!(first.login("me@example.com", "hunter2").await);
    drop(first);

    let second = SessionService::new(Arc::clone(&directory), Arc::clone(&credentials));
    let restored = assert_ok!(second.require().await);
    assert_eq!(restored.access_token, session.access_token);
    assert_eq!(restored.user, "me@example.com");

    assert_ok!(second.logout().await);
    assert!(assert_ok!(second.restore().await).is_none());
}
