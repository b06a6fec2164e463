//! Domain layer types for the email group directory.
//!
//! Domains, the email addresses grouped under them, and the authenticated
//! session used to reach the directory backend.

mod session;
mod types;

pub use session::Session;
pub use types::{is_valid_email, normalize_email, Domain, EmailAddress};
