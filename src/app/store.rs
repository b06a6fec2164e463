//! The domain/email store.
//!
//! [`DomainEmailStore`] keeps the selected domain, its emails and the pending
//! input consistent with the backend while the user adds and deletes emails,
//! switches domains and deletes whole domains.
//!
//! # Update strategy
//!
//! - Adding refetches the full email set after the backend accepts the address,
//!   because the backend may normalize what it stores.
//! - Deleting an email removes it locally by exact match without a refetch.
//! - Deleting a domain is a two-step protocol: [`request_domain_deletion`]
//!   hands out a token, [`confirm_domain_deletion`] checks the typed text.
//!
//! # Stale loads
//!
//! Every email load carries a generation number. A response is applied only if
//! its generation is the latest one issued and its domain is still selected,
//! so a slow response for a previous domain never overwrites the current one.
//!
//! # Known gap
//!
//! Duplicates are detected on lowercase forms while the trimmed input is sent
//! as typed. The backend lowercases on write, so after a refetch the stored
//! value may differ in case from what the user entered.
//!
//! [`request_domain_deletion`]: DomainEmailStore::request_domain_deletion
//! [`confirm_domain_deletion`]: DomainEmailStore::confirm_domain_deletion

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::{
    StoreError, StoreResult, ADD_FAILED_FALLBACK, DELETE_FAILED_FALLBACK,
    DOMAIN_DELETE_FAILED_FALLBACK, EXPORT_FAILED_FALLBACK,
};
use super::state::DirectoryState;
use crate::domain::{Domain, EmailAddress, Session};
use crate::providers::directory::{self, EmailDirectoryService};

/// An outstanding request to delete a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    /// Token to pass to [`DomainEmailStore::confirm_domain_deletion`].
    pub token: Uuid,
    /// Domain that will be deleted.
    pub domain: Domain,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
}

impl PendingDeletion {
    /// Prompt to show the user.
    pub fn prompt(&self) -> String {
        format!("Type \"{}\" to confirm deletion:", self.domain)
    }
}

/// Identifies one email load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailLoadTicket {
    /// Domain being loaded.
    pub domain: Domain,
    /// Generation at the time the load was issued.
    pub generation: u64,
}

/// What happened to an email load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response replaced the email set.
    Applied,
    /// A newer load was issued or the domain is no longer selected.
    Stale,
    /// The backend failed; the previous emails are kept.
    Failed,
    /// Nothing was loaded because the domain is not in the list.
    Skipped,
}

/// State machine over the directory backend.
pub struct DomainEmailStore<D: EmailDirectoryService> {
    directory: D,
    session: Session,
    state: DirectoryState,
    load_generation: u64,
    pending_deletion: Option<PendingDeletion>,
}

impl<D: EmailDirectoryService> DomainEmailStore<D> {
    /// Creates a store for an authenticated session. Call
    /// [`initialize`](Self::initialize) to load the domain list.
    pub fn new(directory: D, session: Session) -> Self {
        Self {
            directory,
            session,
            state: DirectoryState::new(),
            load_generation: 0,
            pending_deletion: None,
        }
    }

    /// Returns the directory backend.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Returns the session this store acts for.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the full view state.
    pub fn state(&self) -> &DirectoryState {
        &self.state
    }

    /// Known domains.
    pub fn domains(&self) -> &[Domain] {
        &self.state.domains
    }

    /// The selected domain, if any.
    pub fn selected_domain(&self) -> Option<&Domain> {
        self.state.selected_domain.as_ref()
    }

    /// Emails of the selected domain.
    pub fn emails(&self) -> &[EmailAddress] {
        &self.state.emails
    }

    /// Text in the add-email input.
    pub fn pending_input(&self) -> &str {
        &self.state.pending_input
    }

    /// Updates the add-email input.
    pub fn set_pending_input(&mut self, input: impl Into<String>) {
        self.state.set_pending_input(input);
    }

    /// The most recent failure.
    pub fn last_error(&self) -> Option<&StoreError> {
        self.state.last_error.as_ref()
    }

    /// Dismisses the last error.
    pub fn clear_error(&mut self) {
        self.state.clear_error();
    }

    /// The outstanding domain deletion request, if any.
    pub fn pending_deletion(&self) -> Option<&PendingDeletion> {
        self.pending_deletion.as_ref()
    }

    /// Loads the domain list and selects the first domain.
    pub async fn initialize(&mut self) -> StoreResult<()> {
        let domains = self.fetch_domains().await?;
        let first = domains.first().cloned();
        self.state.set_domains(domains);

        match first {
            Some(domain) => {
                self.state.select(domain.clone());
                self.load_emails(&domain).await;
            }
            None => self.state.clear_selection(),
        }
        Ok(())
    }

    /// Reloads the domain list, keeping the selection if it still exists.
    pub async fn refresh(&mut self) -> StoreResult<()> {
        let current = self.state.selected_domain.clone();
        let domains = self.fetch_domains().await?;

        let keep = current.filter(|d| domains.contains(d));
        let next = keep.or_else(|| domains.first().cloned());
        self.state.set_domains(domains);

        match next {
            Some(domain) => {
                if !self.state.is_selected(&domain) {
                    self.state.select(domain.clone());
                }
                self.load_emails(&domain).await;
            }
            None => self.state.clear_selection(),
        }
        Ok(())
    }

    /// Selects a domain and loads its emails.
    ///
    /// Domains that are not in the list are ignored.
    pub async fn select_domain(&mut self, domain: &Domain) -> LoadOutcome {
        if !self.state.has_domain(domain) {
            tracing::debug!(domain = %domain, "ignoring selection of unknown domain");
            return LoadOutcome::Skipped;
        }
        self.state.select(domain.clone());
        self.load_emails(domain).await
    }

    /// Fetches the emails of `domain` and replaces the current set.
    ///
    /// Failures are logged and leave the previous emails in place.
    pub async fn load_emails(&mut self, domain: &Domain) -> LoadOutcome {
        let ticket = self.begin_email_load(domain);
        let result = self.directory.list_emails(domain).await;
        self.apply_email_load(ticket, result)
    }

    /// Issues a ticket for a new email load, invalidating older ones.
    pub fn begin_email_load(&mut self, domain: &Domain) -> EmailLoadTicket {
        self.load_generation += 1;
        EmailLoadTicket {
            domain: domain.clone(),
            generation: self.load_generation,
        }
    }

    /// Applies the result of a load issued by [`begin_email_load`](Self::begin_email_load).
    pub fn apply_email_load(
        &mut self,
        ticket: EmailLoadTicket,
        result: directory::Result<Vec<EmailAddress>>,
    ) -> LoadOutcome {
        if ticket.generation != self.load_generation || !self.state.is_selected(&ticket.domain) {
            tracing::debug!(
                domain = %ticket.domain,
                generation = ticket.generation,
                latest = self.load_generation,
                "discarding stale email load"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(emails) => {
                tracing::debug!(domain = %ticket.domain, count = emails.len(), "emails loaded");
                self.state.replace_emails(emails);
                LoadOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(domain = %ticket.domain, error = %e, "failed to load emails");
                LoadOutcome::Failed
            }
        }
    }

    /// Adds an email to the selected domain.
    ///
    /// Blank input is ignored. Duplicates (ignoring case) are rejected without
    /// contacting the backend. On success the pending input is cleared and the
    /// email set is refetched.
    pub async fn add_email(&mut self, raw: &str) -> StoreResult<()> {
        self.state.clear_error();

        let email = raw.trim();
        if email.is_empty() {
            return Ok(());
        }
        if self.state.contains_email_ignoring_case(email) {
            return self.fail(StoreError::DuplicateEmail);
        }
        let Some(domain) = self.state.selected_domain.clone() else {
            return self.fail(StoreError::NoDomainSelected);
        };

        if let Err(e) = self.directory.add_email(&domain, email).await {
            return self.fail(StoreError::AddFailed(e.message_or(ADD_FAILED_FALLBACK)));
        }

        tracing::info!(domain = %domain, email = %email, "email added");
        self.state.clear_pending_input();
        self.load_emails(&domain).await;
        Ok(())
    }

    /// Adds the current pending input.
    pub async fn submit_pending(&mut self) -> StoreResult<()> {
        let input = self.state.pending_input.clone();
        self.add_email(&input).await
    }

    /// Deletes an email from the selected domain and removes it locally.
    pub async fn delete_email(&mut self, email: &EmailAddress) -> StoreResult<()> {
        let Some(domain) = self.state.selected_domain.clone() else {
            return self.fail(StoreError::NoDomainSelected);
        };

        if let Err(e) = self.directory.delete_email(&domain, email).await {
            return self.fail(StoreError::DeleteFailed(e.message_or(DELETE_FAILED_FALLBACK)));
        }

        tracing::info!(domain = %domain, email = %email, "email deleted");
        self.state.remove_email(email);
        Ok(())
    }

    /// Starts deleting a domain. The returned token must be confirmed with the
    /// domain name typed exactly.
    ///
    /// A new request replaces any outstanding one.
    pub fn request_domain_deletion(&mut self, domain: &Domain) -> StoreResult<PendingDeletion> {
        if !self.state.has_domain(domain) {
            return self.fail(StoreError::UnknownDomain(domain.to_string()));
        }
        let pending = PendingDeletion {
            token: Uuid::new_v4(),
            domain: domain.clone(),
            requested_at: Utc::now(),
        };
        self.pending_deletion = Some(pending.clone());
        Ok(pending)
    }

    /// Drops the outstanding deletion request.
    pub fn cancel_domain_deletion(&mut self) {
        self.pending_deletion = None;
    }

    /// Confirms a deletion request.
    ///
    /// The request is consumed whether or not the confirmation matches.
    pub async fn confirm_domain_deletion(
        &mut self,
        token: Uuid,
        confirmation: &str,
    ) -> StoreResult<()> {
        let pending = match self.pending_deletion.take() {
            Some(pending) if pending.token == token => pending,
            other => {
                self.pending_deletion = other;
                return self.fail(StoreError::UnknownDeletionRequest);
            }
        };

        let domain = pending.domain;
        if confirmation != domain.as_str() {
            return self.fail(StoreError::ConfirmationMismatch);
        }

        if let Err(e) = self.directory.delete_domain(&domain, confirmation).await {
            return self.fail(StoreError::DomainDeleteFailed(
                e.message_or(DOMAIN_DELETE_FAILED_FALLBACK),
            ));
        }

        tracing::info!(domain = %domain, "domain deleted");
        self.state.remove_domain(&domain);
        Ok(())
    }

    /// Requests and confirms a domain deletion in one call.
    pub async fn delete_domain(&mut self, domain: &Domain, confirmation: &str) -> StoreResult<()> {
        let pending = self.request_domain_deletion(domain)?;
        self.confirm_domain_deletion(pending.token, confirmation).await
    }

    /// Domains matching `query`, case-insensitively, in list order.
    pub fn filter_domains(&self, query: &str) -> Vec<Domain> {
        self.state.filter_domains(query)
    }

    /// Downloads the CSV export for this session.
    pub async fn export_csv(&mut self) -> StoreResult<Bytes> {
        match self.directory.export_csv(&self.session).await {
            Ok(bytes) => {
                tracing::info!(size = bytes.len(), "csv exported");
                Ok(bytes)
            }
            Err(e) => self.fail(StoreError::ExportFailed(e.message_or(EXPORT_FAILED_FALLBACK))),
        }
    }

    async fn fetch_domains(&mut self) -> StoreResult<Vec<Domain>> {
        match self.directory.list_domains().await {
            Ok(domains) => Ok(domains),
            Err(e) => self.fail(StoreError::DomainsUnavailable(e.to_string())),
        }
    }

    fn fail<T>(&mut self, error: StoreError) -> StoreResult<T> {
        tracing::warn!(error = %error, "store operation failed");
        self.state.set_error(error.clone());
        Err(error)
    }
}
