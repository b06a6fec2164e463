//! Credential storage.
//!
//! This module provides the [`CredentialStore`](crate::services::CredentialStore)
//! implementations that persist the session:
//!
//! - OS keychain integration for secure credential storage
//! - An in-memory store for tests and ephemeral runs
//!
//! Keychain calls are blocking and run via `tokio::task::spawn_blocking`.

mod keychain;
mod memory;

pub use keychain::{KeychainAccess, KeychainError};
pub use memory::MemoryCredentials;
