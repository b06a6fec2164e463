//! Application state and lifecycle management
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌────────────────────────┐
//! │  cli::App    │────▶│ DomainEmailStore │────▶│ EmailDirectoryService  │
//! └──────────────┘     │  DirectoryState  │     └────────────────────────┘
//!                      └──────────────────┘
//! ```

mod cli;
mod error;
mod state;
mod store;

pub use cli::{execute, App, Cli, Command};
pub use error::{
    StoreError, StoreResult, ADD_FAILED_FALLBACK, DELETE_FAILED_FALLBACK,
    DOMAIN_DELETE_FAILED_FALLBACK, EXPORT_FAILED_FALLBACK,
};
pub use state::{filter_domains, DirectoryState};
pub use store::{DomainEmailStore, EmailLoadTicket, LoadOutcome, PendingDeletion};
