//! HTTP transport for manager requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use url::Url;

use crate::error::TransportError;

/// Raw HTTP response as seen by the session.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// First `Set-Cookie` header, if any.
    pub set_cookie: Option<String>,
    /// Response body.
    pub body: String,
}

/// Trait for issuing manager requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a GET request, attaching `cookie` when given.
    async fn get(&self, url: &Url, cookie: Option<&str>)
    -> Result<TransportResponse, TransportError>;
}

/// Transport backed by `reqwest`.
///
/// Follows redirects and keeps no cookie store of its own; session affinity
/// is handled by the session.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given timeout and user agent.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &Url,
        cookie: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let mut request = self.client.get(url.clone());
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(TransportResponse {
            status,
            set_cookie,
            body,
        })
    }
}

/// Extract the `name=value` pair from a `Set-Cookie` header.
#[must_use]
pub fn affinity_token_from(set_cookie: &str) -> Option<String> {
    let token = set_cookie.split(';').next()?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
