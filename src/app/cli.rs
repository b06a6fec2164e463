//! Command-line front end.
//!
//! Each invocation restores the stored session, builds a [`DomainEmailStore`]
//! and runs one command against it. Commands other than `register`, `login`
//! and `logout` require a stored session.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use super::store::{DomainEmailStore, LoadOutcome};
use crate::config::Settings;
use crate::domain::{Domain, EmailAddress};
use crate::providers::directory::{EmailDirectoryService, HttpDirectoryService};
use crate::services::{CredentialStore, SessionService};
use crate::storage::KeychainAccess;

/// Organize email addresses by domain.
#[derive(Debug, Parser)]
#[command(name = "email-groups", version, about)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, overriding settings and environment.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create an account.
    Register {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and store the session.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// List domains.
    Domains {
        /// Only show domains containing this text (case-insensitive).
        #[arg(long, short)]
        search: Option<String>,
    },
    /// List the emails of a domain (the first domain by default).
    Emails { domain: Option<String> },
    /// Add an email under a domain.
    Add { domain: String, email: String },
    /// Delete an email from a domain.
    Delete { domain: String, email: String },
    /// Delete a domain and all of its emails.
    DeleteDomain {
        domain: String,
        /// Must repeat the domain name exactly.
        #[arg(long)]
        confirm: String,
    },
    /// Download the CSV export.
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Main application entry point.
pub struct App;

impl App {
    /// Run one command against the configured backend and OS keychain.
    pub async fn run(cli: Cli) -> Result<()> {
        let path = match cli.config {
            Some(path) => path,
            None => Settings::default_path()?,
        };
        let mut settings = Settings::load_from(&path)?.apply_env();
        if let Some(url) = cli.api_url {
            settings.api.base_url = url;
        }
        tracing::debug!(base_url = %settings.api.base_url, "settings loaded");

        let directory =
            HttpDirectoryService::with_timeout(&settings.api.base_url, settings.api.timeout())?;
        let keychain = KeychainAccess::with_service(settings.session.keychain_service.clone());
        let sessions = SessionService::new(directory, keychain);

        let stdout = std::io::stdout();
        execute(cli.command, sessions, &settings, &mut stdout.lock()).await
    }
}

/// Runs `command`, writing user-facing output to `out`.
pub async fn execute<D, C, W>(
    command: Command,
    sessions: SessionService<D, C>,
    settings: &Settings,
    out: &mut W,
) -> Result<()>
where
    D: EmailDirectoryService,
    C: CredentialStore,
    W: Write,
{
    match command {
        Command::Register { email, password } => {
            sessions.register(&email, &password).await?;
            writeln!(out, "Registered successfully. Please login.")?;
        }
        Command::Login { email, password } => {
            let session = sessions.login(&email, &password).await?;
            writeln!(out, "Logged in as {}", session.user)?;
        }
        Command::Logout => {
            sessions.logout().await?;
            writeln!(out, "Logged out.")?;
        }
        Command::Whoami => match sessions.restore().await? {
            Some(session) => writeln!(out, "{}", session.user)?,
            None => bail!("not logged in"),
        },
        command => {
            let session = sessions.require().await?;
            let mut store = DomainEmailStore::new(sessions.into_directory(), session);
            run_store_command(&mut store, command, settings, out).await?;
        }
    }
    Ok(())
}

async fn run_store_command<D, W>(
    store: &mut DomainEmailStore<D>,
    command: Command,
    settings: &Settings,
    out: &mut W,
) -> Result<()>
where
    D: EmailDirectoryService,
    W: Write,
{
    if let Command::Export { output } = command {
        let csv = store.export_csv().await?;
        let path = output.unwrap_or_else(|| PathBuf::from(&settings.export.file_name));
        tokio::fs::write(&path, &csv)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        writeln!(out, "Saved {} bytes to {}", csv.len(), path.display())?;
        return Ok(());
    }

    store.initialize().await?;

    match command {
        Command::Domains { search } => {
            let selected = store.selected_domain().cloned();
            for domain in store.filter_domains(search.as_deref().unwrap_or_default()) {
                let marker = if selected.as_ref() == Some(&domain) { "*" } else { " " };
                writeln!(out, "{marker} {domain}")?;
            }
        }
        Command::Emails { domain } => {
            if let Some(domain) = domain {
                select(store, &domain).await?;
            }
            print_emails(store, out)?;
        }
        Command::Add { domain, email } => {
            select(store, &domain).await?;
            store.set_pending_input(email);
            store.submit_pending().await?;
            print_emails(store, out)?;
        }
        Command::Delete { domain, email } => {
            select(store, &domain).await?;
            store.delete_email(&EmailAddress::from(email)).await?;
            print_emails(store, out)?;
        }
        Command::DeleteDomain { domain, confirm } => {
            let domain = Domain::from(domain);
            let pending = store.request_domain_deletion(&domain)?;
            store.confirm_domain_deletion(pending.token, &confirm).await?;
            writeln!(out, "Domain \"{domain}\" deleted successfully.")?;
        }
        Command::Register { .. }
        | Command::Login { .. }
        | Command::Logout
        | Command::Whoami
        | Command::Export { .. } => unreachable!("handled before the store is built"),
    }
    Ok(())
}

async fn select<D: EmailDirectoryService>(
    store: &mut DomainEmailStore<D>,
    domain: &str,
) -> Result<()> {
    let domain = Domain::from(domain);
    match store.select_domain(&domain).await {
        LoadOutcome::Applied => Ok(()),
        LoadOutcome::Skipped => bail!("unknown domain: {domain}"),
        LoadOutcome::Failed | LoadOutcome::Stale => bail!("could not load emails for {domain}"),
    }
}

fn print_emails<D: EmailDirectoryService, W: Write>(
    store: &DomainEmailStore<D>,
    out: &mut W,
) -> Result<()> {
    let Some(domain) = store.selected_domain() else {
        writeln!(out, "No domains found.")?;
        return Ok(());
    };
    if store.emails().is_empty() {
        writeln!(out, "No emails found under {domain}.")?;
        return Ok(());
    }
    writeln!(out, "Emails under {domain}:")?;
    for email in store.emails() {
        writeln!(out, "  {email}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delete_domain() {
        let cli = Cli::try_parse_from([
            "email-groups",
            "delete-domain",
            "acme.com",
            "--confirm",
            "acme.com",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::DeleteDomain {
                domain: "acme.com".into(),
                confirm: "acme.com".into()
            }
        );
    }

    #[test]
    fn parses_global_overrides() {
        let cli = Cli::try_parse_from([
            "email-groups",
            "domains",
            "--search",
            "acme",
            "--api-url",
            "http://backend:8000",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://backend:8000"));
        assert_eq!(
            cli.command,
            Command::Domains {
                search: Some("acme".into())
            }
        );
    }

    #[test]
    fn delete_domain_requires_confirmation_flag() {
        assert!(Cli::try_parse_from(["email-groups", "delete-domain", "acme.com"]).is_err());
    }
}
