//! email-groups - Manage email addresses grouped by domain
//!
//! This crate provides the client side of the email groups service: the
//! domain/email store, the REST directory backend, session persistence in the
//! OS keychain and a command-line front end.

pub mod app;
pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;

pub use app::{App, Cli, DomainEmailStore};
