//! In-process directory backend.
//!
//! [`InMemoryDirectory`] applies the same rules as the REST backend: addresses
//! are lowercased and trimmed on write, must match the backend's address
//! pattern and must belong to the domain they are added under. It is used by
//! tests and offline demos, and supports one-shot failure injection per
//! operation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;

use super::{DirectoryError, EmailDirectoryService, Result};
use crate::domain::{is_valid_email, normalize_email, Domain, EmailAddress, Session};

/// Operations of [`EmailDirectoryService`], used for call counting and
/// failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryCall {
    /// [`EmailDirectoryService::list_domains`]
    ListDomains,
    /// [`EmailDirectoryService::list_emails`]
    ListEmails,
    /// [`EmailDirectoryService::add_email`]
    AddEmail,
    /// [`EmailDirectoryService::delete_email`]
    DeleteEmail,
    /// [`EmailDirectoryService::delete_domain`]
    DeleteDomain,
    /// [`EmailDirectoryService::export_csv`]
    ExportCsv,
    /// [`EmailDirectoryService::authenticate`]
    Authenticate,
    /// [`EmailDirectoryService::register`]
    Register,
}

/// Address pattern the backend enforces on add: word characters, dots and
/// hyphens around a single `@`, ending in a dotted word suffix.
static ADD_EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn matches_add_pattern(email: &str) -> bool {
    ADD_EMAIL_PATTERN
        .get_or_init(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("invalid email pattern"))
        .is_match(email)
}

#[derive(Debug, Default)]
struct Inner {
    /// Stored addresses, in insertion order.
    emails: Vec<String>,
    /// Registered users and their passwords.
    users: HashMap<String, String>,
    /// Tokens handed out by `authenticate`.
    tokens: HashSet<String>,
    calls: HashMap<DirectoryCall, usize>,
    failures: HashMap<DirectoryCall, VecDeque<DirectoryError>>,
}

impl Inner {
    fn record(&mut self, call: DirectoryCall) -> Result<()> {
        *self.calls.entry(call).or_insert(0) += 1;
        match self.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn normalized_emails(&self) -> impl Iterator<Item = String> + '_ {
        self.emails.iter().map(|e| normalize_email(e))
    }
}

/// Directory backend held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: Mutex<Inner>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with addresses, stored as given.
    pub fn with_emails<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let directory = Self::new();
        directory.lock().emails = emails.into_iter().map(Into::into).collect();
        directory
    }

    /// Adds a registered user.
    pub fn with_user(self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.lock().users.insert(email.into(), password.into());
        self
    }

    /// Makes the next call of `call` fail with `error`.
    ///
    /// Injected failures queue up; each one is consumed by a single call.
    pub fn fail_next(&self, call: DirectoryCall, error: DirectoryError) {
        self.lock()
            .failures
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// Number of times `call` has been made.
    pub fn calls(&self, call: DirectoryCall) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    /// Snapshot of every stored address.
    pub fn stored_emails(&self) -> Vec<String> {
        self.lock().emails.clone()
    }

    // A poisoned lock only means another test thread panicked mid-call; the
    // data is still a plain Vec/HashMap and safe to reuse.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl EmailDirectoryService for InMemoryDirectory {
    async fn list_domains(&self) -> Result<Vec<Domain>> {
        let mut inner = self.lock();
        inner.record(DirectoryCall::ListDomains)?;
        let domains: BTreeSet<String> = inner
            .normalized_emails()
            .filter_map(|e| e.rsplit_once('@').map(|(_, d)| d.to_string()))
            .collect();
        Ok(domains.into_iter().map(Domain::from).collect())
    }

    async fn list_emails(&self, domain: &Domain) -> Result<Vec<EmailAddress>> {
        let mut inner = self.lock();
        inner.record(DirectoryCall::ListEmails)?;
        let suffix = format!("@{}", domain);
        let emails: BTreeSet<&String> = inner
            .emails
            .iter()
            .filter(|e| normalize_email(e).ends_with(&suffix))
            .collect();
        Ok(emails
            .into_iter()
            .map(|e| EmailAddress::from(e.as_str()))
            .collect())
    }

    async fn add_email(&self, domain: &Domain, email: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.record(DirectoryCall::AddEmail)?;
        let email = normalize_email(email);

        if !matches_add_pattern(&email) {
            return Err(DirectoryError::Validation("Invalid email format".into()));
        }
        if email.rsplit_once('@').map(|(_, d)| d) != Some(domain.as_str()) {
            return Err(DirectoryError::Validation("Email domain mismatch".into()));
        }
        if inner.normalized_emails().any(|existing| existing == email) {
            return Err(DirectoryError::Validation("Email already exists".into()));
        }

        inner.emails.push(email);
        Ok(())
    }

    async fn delete_email(&self, _domain: &Domain, email: &EmailAddress) -> Result<()> {
        let mut inner = self.lock();
        inner.record(DirectoryCall::DeleteEmail)?;
        let target = email.normalized();

        let before = inner.emails.len();
        inner.emails.retain(|e| normalize_email(e) != target);
        if inner.emails.len() == before {
            return Err(DirectoryError::NotFound("Email not found".into()));
        }
        Ok(())
    }

    async fn delete_domain(&self, domain: &Domain, confirmation: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.record(DirectoryCall::DeleteDomain)?;
        if confirmation != domain.as_str() {
            return Err(DirectoryError::ConfirmationRequired);
        }

        let suffix = format!("@{}", domain);
        let before = inner.emails.len();
        inner.emails.retain(|e| !normalize_email(e).ends_with(&suffix));
        if inner.emails.len() == before {
            return Err(DirectoryError::NotFound(format!("Domain {} not found", domain)));
        }
        Ok(())
    }

    async fn export_csv(&self, session: &Session) -> Result<Bytes> {
        let mut inner = self.lock();
        inner.record(DirectoryCall::ExportCsv)?;
        if !inner.tokens.contains(&session.access_token) {
            return Err(DirectoryError::Unauthorized);
        }

        let mut by_domain: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for email in inner.normalized_emails() {
            if let Some((_, domain)) = email.rsplit_once('@') {
                by_domain
                    .entry(domain.to_string())
                    .or_default()
                    .push(email.clone());
            }
        }
        Ok(Bytes::from(render_csv(&by_domain)))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
        let mut inner = self.lock();
        inner.record(DirectoryCall::Authenticate)?;
        match inner.users.get(email) {
            Some(stored) if stored == password => {
                let token = uuid::Uuid::new_v4().to_string();
                inner.tokens.insert(token.clone());
                Ok(Session::new(token, email))
            }
            _ => Err(DirectoryError::InvalidCredentials),
        }
    }

    async fn register(&self, email: &str, password: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.record(DirectoryCall::Register)?;
        if !is_valid_email(email) {
            return Err(DirectoryError::Validation("Invalid email format".into()));
        }
        if password.is_empty() {
            return Err(DirectoryError::Validation("Password required".into()));
        }
        if inner.users.contains_key(email) {
            return Err(DirectoryError::AlreadyRegistered(
                "Email already registered".into(),
            ));
        }
        inner.users.insert(email.to_string(), password.to_string());
        Ok(())
    }
}

/// Writes the export layout: a header, then per domain a `domain,` row
/// followed by one `,email` row per address.
fn render_csv(by_domain: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::from("Domain,Email\r\n");
    for (domain, emails) in by_domain {
        out.push_str(&csv_field(domain));
        out.push_str(",\r\n");
        for email in emails {
            out.push(',');
            out.push_str(&csv_field(email));
            out.push_str("\r\n");
        }
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::with_emails(["a@acme.com", "B@beta.io", "c@acme.com"])
    }

    #[tokio::test]
    async fn lists_sorted_unique_domains() {
        let domains = directory().list_domains().await.unwrap();
        assert_eq!(domains, vec![Domain::from("acme.com"), Domain::from("beta.io")]);
    }

    #[tokio::test]
    async fn lists_emails_as_stored() {
        let emails = directory().list_emails(&Domain::from("beta.io")).await.unwrap();
        assert_eq!(emails, vec![EmailAddress::from("B@beta.io")]);
    }

    #[tokio::test]
    async fn add_normalizes_and_validates() {
        let dir = directory();
        let acme = Domain::from("acme.com");

        dir.add_email(&acme, "  New@Acme.com ").await.unwrap();
        assert!(dir.stored_emails().contains(&"new@acme.com".to_string()));

        let err = dir.add_email(&acme, "bad").await.unwrap_err();
        assert_eq!(err, DirectoryError::Validation("Invalid email format".into()));

        let err = dir.add_email(&acme, "x@beta.io").await.unwrap_err();
        assert_eq!(err, DirectoryError::Validation("Email domain mismatch".into()));

        let err = dir.add_email(&acme, "A@ACME.com").await.unwrap_err();
        assert_eq!(err, DirectoryError::Validation("Email already exists".into()));
    }

    #[tokio::test]
    async fn add_rejects_characters_outside_backend_pattern() {
        let dir = directory();
        let acme = Domain::from("acme.com");

        for email in ["a+b@acme.com", "a!b@acme.com", "x#y@acme.com"] {
            let err = dir.add_email(&acme, email).await.unwrap_err();
            assert_eq!(
                err,
                DirectoryError::Validation("Invalid email format".into()),
                "{email}"
            );
        }
        assert_eq!(dir.stored_emails().len(), 3);

        dir.add_email(&acme, "first_last-2.x@acme.com").await.unwrap();
        assert!(dir.stored_emails().contains(&"first_last-2.x@acme.com".to_string()));
    }

    #[test]
    fn add_pattern_matches_backend_rule() {
        assert!(matches_add_pattern("a@acme.com"));
        assert!(matches_add_pattern("a.b-c_d@sub.acme.co.uk"));
        assert!(!matches_add_pattern("a@acme"));
        assert!(!matches_add_pattern("a@acme.com."));
        assert!(!matches_add_pattern("a@b@acme.com"));
        assert!(!matches_add_pattern("a b@acme.com"));
        assert!(!matches_add_pattern("a+b@acme.com"));
    }

    #[tokio::test]
    async fn delete_missing_email_is_not_found() {
        let dir = directory();
        let err = dir
            .delete_email(&Domain::from("acme.com"), &EmailAddress::from("zz@acme.com"))
            .await
            .unwrap_err();
        assert_eq!(err, DirectoryError::NotFound("Email not found".into()));
    }

    #[tokio::test]
    async fn delete_domain_requires_confirmation() {
        let dir = directory();
        let acme = Domain::from("acme.com");

        let err = dir.delete_domain(&acme, "acme.co").await.unwrap_err();
        assert_eq!(err, DirectoryError::ConfirmationRequired);

        dir.delete_domain(&acme, "acme.com").await.unwrap();
        assert_eq!(dir.stored_emails(), vec!["B@beta.io".to_string()]);
    }

    #[tokio::test]
    async fn export_requires_issued_token() {
        let dir = directory().with_user("me@example.com", "pw");

        let stranger = Session::new("forged", "me@example.com");
        assert_eq!(
            dir.export_csv(&stranger).await.unwrap_err(),
            DirectoryError::Unauthorized
        );

        let session = dir.authenticate("me@example.com", "pw").await.unwrap();
        let csv = dir.export_csv(&session).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&csv).unwrap(),
            "Domain,Email\r\nacme.com,\r\n,a@acme.com\r\n,c@acme.com\r\nbeta.io,\r\n,b@beta.io\r\n"
        );
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let dir = InMemoryDirectory::new();
        dir.register("me@example.com", "pw").await.unwrap();

        let err = dir.register("me@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, DirectoryError::AlreadyRegistered(_)));

        assert_eq!(
            dir.authenticate("me@example.com", "wrong").await.unwrap_err(),
            DirectoryError::InvalidCredentials
        );
        let session = dir.authenticate("me@example.com", "pw").await.unwrap();
        assert_eq!(session.user, "me@example.com");
    }

    #[tokio::test]
    async fn injected_failures_are_one_shot() {
        let dir = directory();
        dir.fail_next(DirectoryCall::ListDomains, DirectoryError::Network("down".into()));

        assert!(dir.list_domains().await.is_err());
        assert!(dir.list_domains().await.is_ok());
        assert_eq!(dir.calls(DirectoryCall::ListDomains), 2);
        assert_eq!(dir.calls(DirectoryCall::ListEmails), 0);
    }

    #[test]
    fn csv_field_quotes_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
