//! Authenticated session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An access credential plus the identity it was issued to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token issued by the backend.
    pub access_token: String,
    /// Email the user logged in with, shown as their identity.
    pub user: String,
    /// When this session was created or restored locally.
    pub established_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session established now.
    pub fn new(access_token: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user: user.into(),
            established_at: Utc::now(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .field("established_at", &self.established_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_value() {
        let session = Session::new("abc123", "me@example.com");
        assert_eq!(session.bearer(), "Bearer abc123");
    }

    #[test]
    fn debug_redacts_token() {
        let session = Session::new("super-secret", "me@example.com");
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("me@example.com"));
    }
}
