//! Email directory backends.
//!
//! This module contains the [`EmailDirectoryService`] trait and its
//! implementations:
//!
//! - [`HttpDirectoryService`] - the REST backend over HTTP
//! - [`InMemoryDirectory`] - an in-process backend with the same rules
//!
//! # Architecture
//!
//! The directory abstraction keeps transport out of the state machine. Each
//! backend handles:
//!
//! - Listing domains and the addresses stored under them
//! - Adding and deleting addresses, deleting whole domains
//! - The authenticated CSV export
//! - Account login and registration
//!
//! # Example
//!
//! ```ignore
//! use email_groups::domain::Domain;
//! use email_groups::providers::directory::{EmailDirectoryService, InMemoryDirectory};
//!
//! async fn show(directory: &dyn EmailDirectoryService) {
//!     let emails = directory
//!         .list_emails(&Domain::from("acme.com"))
//!         .await
//!         .expect("failed to list emails");
//!
//!     for email in emails {
//!         println!("{email}");
//!     }
//! }
//! ```

mod http;
mod memory;
mod traits;

pub use http::HttpDirectoryService;
pub use memory::{DirectoryCall, InMemoryDirectory};
pub use traits::{DirectoryError, EmailDirectoryService, Result};

#[cfg(test)]
pub use traits::MockEmailDirectoryService;
