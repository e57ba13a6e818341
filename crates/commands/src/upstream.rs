//! Upstream platform client
//!
//! Both lookups authenticate with the session token sent as the `BXAuth`
//! cookie. Neither lookup returns an error to its caller: failures are logged
//! and degrade to [`UNKNOWN_NAME`] or `None`.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, ORIGIN};
use serde::Deserialize;

use flowkeys_runtime::config::{
    DEFAULT_HTTP_TIMEOUT_SECS, KEY_ISSUANCE_PATH, PROFILE_PATH, SESSION_COOKIE,
};

use crate::store::KeyInfo;

/// Display name used when the profile page yields nothing
pub const UNKNOWN_NAME: &str = "unknown";

static MASKED_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3}\*{4}\d{4})").expect("masked phone pattern is valid"));
static PHONE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""phone"\s*:\s*"([^"]+)""#).expect("phone pattern is valid"));
static NAME_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""name"\s*:\s*"([^"]+)""#).expect("name pattern is valid"));

/// Remote lookups keyed by a session token
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Resolve the account's display name, or [`UNKNOWN_NAME`]
    async fn resolve_display_name(&self, session_token: &str) -> String;

    /// Issue a fresh key, or `None` on any failure
    async fn resolve_key_info(&self, session_token: &str) -> Option<KeyInfo>;
}

/// Find a display name in the profile page.
///
/// Tries a masked phone number (`136****8852`) first, then a `"phone"` field,
/// then a `"name"` field.
pub fn extract_display_name(page: &str) -> Option<String> {
    [&*MASKED_PHONE, &*PHONE_FIELD, &*NAME_FIELD]
        .into_iter()
        .find_map(|pattern| pattern.captures(page))
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_string())
}

#[derive(Debug, Deserialize)]
struct KeyIssuanceResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<KeyIssuanceData>,
}

#[derive(Debug, Deserialize)]
struct KeyIssuanceData {
    #[serde(rename = "apiKey", default)]
    api_key: Option<String>,
    #[serde(rename = "expireTime", default)]
    expire_time: Option<String>,
}

/// Parse a key issuance response body
fn parse_key_issuance(body: &str) -> Result<KeyInfo> {
    let response: KeyIssuanceResponse =
        serde_json::from_str(body).context("Failed to parse key issuance response")?;

    if !response.success {
        bail!("key issuance reported failure");
    }
    let data = response
        .data
        .context("key issuance response has no data payload")?;
    let api_key = data
        .api_key
        .context("key issuance response has no apiKey")?;

    Ok(KeyInfo {
        api_key,
        expires_at: data.expire_time.unwrap_or_default(),
    })
}

/// HTTP client for the upstream platform
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Create a client for the platform at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn cookie(session_token: &str) -> String {
        format!("{SESSION_COOKIE}={session_token}")
    }

    async fn fetch_profile(&self, session_token: &str) -> Result<String> {
        let url = format!("{}{PROFILE_PATH}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("tab", "apiKey")])
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
            .header(COOKIE, Self::cookie(session_token))
            .send()
            .await
            .context("Failed to fetch profile")?;

        let status = response.status();
        tracing::debug!(%status, "profile response");
        if status != reqwest::StatusCode::OK {
            bail!("profile request returned {}", status);
        }

        response.text().await.context("Failed to read profile page")
    }

    async fn fetch_key_info(&self, session_token: &str) -> Result<KeyInfo> {
        let url = format!("{}{KEY_ISSUANCE_PATH}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(CONTENT_TYPE, "application/json")
            .header(ORIGIN, &self.base_url)
            .header(COOKIE, Self::cookie(session_token))
            .body(r#"{"name":""}"#)
            .send()
            .await
            .context("Failed to request API key")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read key issuance response")?;
        tracing::debug!(
            %status,
            body = %body.chars().take(200).collect::<String>(),
            "key issuance response"
        );

        if status != reqwest::StatusCode::OK {
            bail!("key issuance returned {}", status);
        }
        parse_key_issuance(&body)
    }
}

#[async_trait]
impl CredentialSource for UpstreamClient {
    async fn resolve_display_name(&self, session_token: &str) -> String {
        match self.fetch_profile(session_token).await {
            Ok(page) => extract_display_name(&page).unwrap_or_else(|| {
                tracing::debug!("no display name found on profile page");
                UNKNOWN_NAME.to_string()
            }),
            Err(e) => {
                tracing::warn!("Failed to resolve display name: {e:#}");
                UNKNOWN_NAME.to_string()
            }
        }
    }

    async fn resolve_key_info(&self, session_token: &str) -> Option<KeyInfo> {
        self.fetch_key_info(session_token)
            .await
            .inspect_err(|e| tracing::warn!("Failed to resolve API key: {e:#}"))
            .ok()
    }
}

#[cfg(test)]
#[path = "upstream_tests.rs"]
mod tests;
