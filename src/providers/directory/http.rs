//! REST backend implementation.
//!
//! This module provides an [`EmailDirectoryService`] implementation that talks to
//! the directory's HTTP API. Error bodies follow the FastAPI convention of a
//! `{"detail": ...}` object; string details are surfaced verbatim.
//!
//! # Endpoints
//!
//! - `GET /domains` and `GET /emails/{domain}` for reads
//! - `POST /emails/{domain}/add`, `POST /emails/{domain}/delete` and
//!   `POST /domains/delete` for mutations
//! - `GET /download_csv` (bearer token) for the export
//! - `POST /token` (form encoded) and `POST /register` for accounts

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{DirectoryError, EmailDirectoryService, Result};
use crate::domain::{Domain, EmailAddress, Session};

/// Which endpoint produced a response, for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Directory,
    Token,
    Register,
}

/// Body for add and delete email requests.
#[derive(Debug, Serialize)]
struct EmailInput<'a> {
    email: &'a str,
}

/// Body for domain deletion.
#[derive(Debug, Serialize)]
struct DomainDeleteInput<'a> {
    domain: &'a str,
    confirm: &'a str,
}

/// Body for registration.
#[derive(Debug, Serialize)]
struct RegisterInput<'a> {
    email: &'a str,
    password: &'a str,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: Option<String>,
}

/// FastAPI error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// HTTP directory client.
///
/// # Example
///
/// ```ignore
/// use email_groups::providers::directory::{EmailDirectoryService, HttpDirectoryService};
///
/// let service = HttpDirectoryService::new("http://localhost:8000")?;
/// let domains = service.list_domains().await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpDirectoryService {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpDirectoryService {
    /// Creates a client for the given base URL with a default HTTP client.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            client: reqwest::Client::new(),
        })
    }

    /// Creates a client whose requests time out after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Network(e.to_string()))?;
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            client,
        })
    }

    /// Overrides the HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an endpoint URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                DirectoryError::InvalidResponse(format!(
                    "base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: Endpoint,
    ) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(Self::handle_error_response(response, endpoint).await)
    }

    async fn handle_error_response(
        response: reqwest::Response,
        endpoint: Endpoint,
    ) -> DirectoryError {
        let status = response.status();
        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => Some(render_detail(&body.detail)),
            Err(_) => None,
        };
        tracing::warn!(status = status.as_u16(), detail = ?detail, "directory request failed");
        map_status(status, detail, endpoint)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(%url, "GET");
        let response = self.send(self.client.get(url), Endpoint::Directory).await?;
        response
            .json()
            .await
            .map_err(|e| {
                DirectoryError::InvalidResponse(format!("Failed to parse response: {}", e))
            })
    }
}

#[async_trait]
impl EmailDirectoryService for HttpDirectoryService {
    async fn list_domains(&self) -> Result<Vec<Domain>> {
        let url = self.endpoint(&["domains"])?;
        self.get_json(url).await
    }

    async fn list_emails(&self, domain: &Domain) -> Result<Vec<EmailAddress>> {
        let url = self.endpoint(&["emails", domain.as_str()])?;
        self.get_json(url).await
    }

    async fn add_email(&self, domain: &Domain, email: &str) -> Result<()> {
        let url = self.endpoint(&["emails", domain.as_str(), "add"])?;
        tracing::debug!(%url, "POST add email");
        self.send(
            self.client.post(url).json(&EmailInput { email }),
            Endpoint::Directory,
        )
        .await?;
        Ok(())
    }

    async fn delete_email(&self, domain: &Domain, email: &EmailAddress) -> Result<()> {
        let url = self.endpoint(&["emails", domain.as_str(), "delete"])?;
        tracing::debug!(%url, "POST delete email");
        self.send(
            self.client.post(url).json(&EmailInput {
                email: email.as_str(),
            }),
            Endpoint::Directory,
        )
        .await?;
        Ok(())
    }

    async fn delete_domain(&self, domain: &Domain, confirmation: &str) -> Result<()> {
        let url = self.endpoint(&["domains", "delete"])?;
        tracing::debug!(%url, domain = %domain, "POST delete domain");
        self.send(
            self.client.post(url).json(&DomainDeleteInput {
                domain: domain.as_str(),
                confirm: confirmation,
            }),
            Endpoint::Directory,
        )
        .await?;
        Ok(())
    }

    async fn export_csv(&self, session: &Session) -> Result<Bytes> {
        let url = self.endpoint(&["download_csv"])?;
        let bearer = HeaderValue::from_str(&session.bearer())
            .map_err(|_| DirectoryError::Unauthorized)?;
        tracing::debug!(%url, "GET csv export");
        let response = self
            .send(
                self.client.get(url).header(AUTHORIZATION, bearer),
                Endpoint::Directory,
            )
            .await?;

        let mut stream = response.bytes_stream();
        let mut csv = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DirectoryError::Network(e.to_string()))?;
            csv.extend_from_slice(&chunk);
        }
        tracing::debug!(size = csv.len(), "csv export received");
        Ok(csv.freeze())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.endpoint(&["token"])?;
        let form = [("username", email), ("password", password)];
        let response = self
            .send(self.client.post(url).form(&form), Endpoint::Token)
            .await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(format!("Failed to parse token: {}", e)))?;
        tracing::info!(user = %email, "authenticated");
        Ok(Session::new(token.access_token, email))
    }

    async fn register(&self, email: &str, password: &str) -> Result<()> {
        let url = self.endpoint(&["register"])?;
        self.send(
            self.client
                .post(url)
                .json(&RegisterInput { email, password }),
            Endpoint::Register,
        )
        .await?;
        tracing::info!(user = %email, "registered");
        Ok(())
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url.trim())
        .map_err(|e| DirectoryError::InvalidResponse(format!("invalid base URL {base_url}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(DirectoryError::InvalidResponse(format!(
            "invalid base URL {base_url}"
        )));
    }
    Ok(url)
}

/// Renders a FastAPI `detail` value: strings verbatim, anything else as JSON.
fn render_detail(detail: &serde_json::Value) -> String {
    match detail {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Maps an unsuccessful status and optional detail to a [`DirectoryError`].
fn map_status(status: StatusCode, detail: Option<String>, endpoint: Endpoint) -> DirectoryError {
    let message = detail.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    match (status, endpoint) {
        (StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST, Endpoint::Token) => {
            DirectoryError::InvalidCredentials
        }
        (StatusCode::CONFLICT, Endpoint::Register) => DirectoryError::AlreadyRegistered(message),
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, _) => {
            DirectoryError::Validation(message)
        }
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => DirectoryError::Unauthorized,
        (StatusCode::NOT_FOUND, _) => DirectoryError::NotFound(message),
        _ => DirectoryError::Server {
            status: status.as_u16(),
            message,
        },
    }
}
