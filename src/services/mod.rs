//! Business services layer.
//!
//! Services sit between the front end and the infrastructure layer:
//!
//! ```text
//! Front end (CLI)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Directory backends, Credential storage)
//! ```
//!
//! # Services Overview
//!
//! - [`SessionService`]: Login, logout, registration and restore-on-start
//!
//! The domain/email state machine lives in [`crate::app`].

mod session_service;

pub use session_service::{
    CredentialStore, SessionError, SessionResult, SessionService, TOKEN_KEY, USER_KEY,
};
