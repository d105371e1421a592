//! The usage fetch capability and its claude.ai implementation.
//!
//! # Endpoints
//!
//! - `GET {base}/organizations` lists organizations the key can see
//! - `GET {base}/organizations/{uuid}/usage` returns the usage payload
//!
//! Both authenticate with the `sessionKey` cookie. Timeouts are enforced by
//! the HTTP client; nothing here retries.

use async_trait::async_trait;
use claudemeter_core::mapper::UsageApiResponse;
use claudemeter_core::{Organization, SessionKey};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{FetchError, HttpError};
use crate::http::{DEFAULT_TIMEOUT_SECS, HttpClient, ResponseExt};

// ============================================================================
// Constants
// ============================================================================

/// Claude.ai domain.
pub const CLAUDE_DOMAIN: &str = "claude.ai";

/// Base URL of the web API.
pub const DEFAULT_BASE_URL: &str = "https://claude.ai/api";

// ============================================================================
// Capability Trait
// ============================================================================

/// Access to the upstream usage service.
///
/// The refresh coordinator and the session key validator are the only
/// callers. Implementations own their timeouts.
#[async_trait]
pub trait UsageApi: Send + Sync {
    /// Lists the organizations visible to `key`.
    async fn fetch_organizations(&self, key: &SessionKey) -> Result<Vec<Organization>, FetchError>;

    /// Fetches the raw usage payload for an organization.
    async fn fetch_raw_usage(
        &self,
        key: &SessionKey,
        organization_id: &str,
    ) -> Result<UsageApiResponse, FetchError>;
}

// ============================================================================
// Web Client
// ============================================================================

/// Claude web API client authenticated by session key cookie.
#[derive(Debug, Clone)]
pub struct ClaudeWebClient {
    http: HttpClient,
    base_url: String,
}

impl ClaudeWebClient {
    /// Creates a client for claude.ai with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client against another base URL.
    ///
    /// Requests are restricted to the host of `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the URL has no host or the HTTP
    /// client cannot be built.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let host = Url::parse(base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .ok_or_else(|| HttpError::InvalidUrl(base_url.to_string()))?;

        let http = HttpClient::with_timeout(timeout)?.allow_domains(vec![host]);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL requests are made against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn organizations_url(&self) -> String {
        format!("{}/organizations", self.base_url)
    }

    fn usage_url(&self, organization_id: &str) -> String {
        format!("{}/organizations/{organization_id}/usage", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        key: &SessionKey,
    ) -> Result<T, FetchError> {
        let cookie = format!("sessionKey={}", key.as_str());
        let response = self.http.get_with_cookies(url, &cookie).await?;

        if let Some(err) = classify_status(response.status(), response.retry_after_secs()) {
            warn!(status = %response.status(), "Request failed");
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from(HttpError::from(e)))?;

        debug!(len = body.len(), "Received response");

        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse response");
            FetchError::InvalidResponse(format!("Failed to parse response: {e}"))
        })
    }
}

#[async_trait]
impl UsageApi for ClaudeWebClient {
    #[instrument(skip(self, key))]
    async fn fetch_organizations(&self, key: &SessionKey) -> Result<Vec<Organization>, FetchError> {
        let organizations: Vec<Organization> =
            self.get_json(&self.organizations_url(), key).await?;
        debug!(count = organizations.len(), "Fetched organizations");
        Ok(organizations)
    }

    #[instrument(skip(self, key))]
    async fn fetch_raw_usage(
        &self,
        key: &SessionKey,
        organization_id: &str,
    ) -> Result<UsageApiResponse, FetchError> {
        if organization_id.is_empty() {
            return Err(FetchError::NoOrganization);
        }
        self.get_json(&self.usage_url(organization_id), key).await
    }
}

/// Maps a non-success status to the matching error.
fn classify_status(status: StatusCode, retry_after: Option<u64>) -> Option<FetchError> {
    match status {
        s if s.is_success() => None,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(FetchError::AuthenticationFailed(
            format!("Session key rejected ({status})"),
        )),
        StatusCode::TOO_MANY_REQUESTS => Some(FetchError::RateLimited { retry_after }),
        _ => Some(FetchError::InvalidResponse(format!("Status {status}"))),
    }
}

// ============================================================================
// Tests
// ============================================================================
