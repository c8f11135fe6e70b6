//! Outbound client for the Thunder identity API.
//!
//! The browser never talks to Thunder directly; every call is relayed through
//! `/api/thunder/*` so the UI stays same-origin. Thunder deployments commonly
//! run with self-signed certificates on the mail host, so certificate
//! verification is disabled for this upstream only.

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use reqwest::{
    Client, Response,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ThunderClient {
    base: String,
    client: Client,
}

impl ThunderClient {
    /// Build the proxy client for the given Thunder base URL.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            // Thunder runs with self-signed certificates on the mail host.
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to build Thunder HTTP client")?;

        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Forward a request to Thunder, preserving method, body, and bearer token.
    ///
    /// # Errors
    /// Returns an error if the upstream request cannot be sent.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        authorization: Option<&HeaderValue>,
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = format!("{}/{}", self.base, path.trim_start_matches('/'));

        debug!("Proxying {method} to {url}");

        let mut request = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .with_context(|| format!("Proxy request to {url} failed"))
    }
}
