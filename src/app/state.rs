//! Directory view state.
//!
//! The synchronous part of the store: the domain list, the selection, the
//! emails of the selected domain, the pending input and the last error. All
//! transitions here are pure; the async store drives them from backend
//! responses.

use crate::domain::{normalize_email, Domain, EmailAddress};

use super::error::StoreError;

/// State shown by a directory front end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryState {
    /// Known domains, in backend order.
    pub domains: Vec<Domain>,
    /// The active domain, if any.
    pub selected_domain: Option<Domain>,
    /// Emails of the selected domain, as last read from the backend.
    pub emails: Vec<EmailAddress>,
    /// Text typed into the "add email" input.
    pub pending_input: String,
    /// Most recent failure.
    pub last_error: Option<StoreError>,
}

impl DirectoryState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a domain is in the list.
    pub fn has_domain(&self, domain: &Domain) -> bool {
        self.domains.contains(domain)
    }

    /// Check if `domain` is the selected one.
    pub fn is_selected(&self, domain: &Domain) -> bool {
        self.selected_domain.as_ref() == Some(domain)
    }

    /// Replace the domain list.
    pub fn set_domains(&mut self, domains: Vec<Domain>) {
        self.domains = domains;
    }

    /// Select a domain. Emails are kept until the next load replaces them.
    pub fn select(&mut self, domain: Domain) {
        self.selected_domain = Some(domain);
        self.last_error = None;
    }

    /// Clear the selection and the emails shown for it.
    pub fn clear_selection(&mut self) {
        self.selected_domain = None;
        self.emails.clear();
    }

    /// Replace the email set wholesale.
    pub fn replace_emails(&mut self, emails: Vec<EmailAddress>) {
        self.emails = emails;
    }

    /// Check if an address is already present, ignoring case and padding.
    pub fn contains_email_ignoring_case(&self, candidate: &str) -> bool {
        let candidate = normalize_email(candidate);
        self.emails.iter().any(|e| e.normalized() == candidate)
    }

    /// Remove an email by exact string match. Returns true if one was removed.
    pub fn remove_email(&mut self, email: &EmailAddress) -> bool {
        let before = self.emails.len();
        self.emails.retain(|e| e != email);
        self.emails.len() != before
    }

    /// Remove a domain from the list.
    ///
    /// If it was selected the selection becomes empty; no other domain is
    /// selected in its place.
    pub fn remove_domain(&mut self, domain: &Domain) -> bool {
        let before = self.domains.len();
        self.domains.retain(|d| d != domain);
        if self.is_selected(domain) {
            self.clear_selection();
        }
        self.domains.len() != before
    }

    /// Domains matching `query`, case-insensitively, in list order.
    pub fn filter_domains(&self, query: &str) -> Vec<Domain> {
        filter_domains(&self.domains, query)
    }

    /// Set the pending input.
    pub fn set_pending_input(&mut self, input: impl Into<String>) {
        self.pending_input = input.into();
    }

    /// Clear the pending input.
    pub fn clear_pending_input(&mut self) {
        self.pending_input.clear();
    }

    /// Record an error.
    pub fn set_error(&mut self, error: StoreError) {
        self.last_error = Some(error);
    }

    /// Clear the last error.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

/// Case-insensitive substring filter that keeps list order.
///
/// An empty query returns every domain.
pub fn filter_domains(domains: &[Domain], query: &str) -> Vec<Domain> {
    domains
        .iter()
        .filter(|d| d.matches_query(query))
        .cloned()
        .collect()
}
