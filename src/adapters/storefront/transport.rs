//! Admin GraphQL transport
//!
//! Single entry point for every storefront call: builds the admin endpoint
//! from the shop config, attaches auth headers, decodes the GraphQL
//! envelope, and retries throttled or transient-status responses with
//! exponential backoff. Callers hand in a query and variables and get the
//! `data` payload decoded into their own response struct.

use crate::config::ShopConfig;
use crate::domain::{Result, StorefrontError, SyncError};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Longest error-body excerpt carried into an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Backoff settings for throttled and transient-status responses.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the first request included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Delay before the next attempt after `failures` prior failures,
    /// doubling from the base and capped at `max_delay`.
    fn backoff_delay(&self, failures: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(failures).unwrap_or(u64::MAX);
        let delay = Duration::from_millis(base_ms.saturating_mul(factor));
        delay.min(self.max_delay)
    }
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    #[serde(default)]
    message: String,
    #[serde(default)]
    path: Vec<Value>,
    #[serde(default)]
    extensions: Option<GraphqlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorExtensions {
    #[serde(default)]
    code: String,
}

/// HTTP client for the shop admin GraphQL endpoint.
pub struct GraphqlTransport {
    http: reqwest::Client,
    endpoint: String,
    token: SecretString,
    retry: RetryConfig,
}

impl GraphqlTransport {
    pub fn new(config: &ShopConfig) -> Result<Self> {
        Self::with_retry(config, RetryConfig::default())
    }

    pub fn with_retry(config: &ShopConfig, retry: RetryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| {
                SyncError::Configuration(format!("failed to build storefront http client: {err}"))
            })?;

        Ok(Self {
            http,
            endpoint: admin_endpoint(&config.domain, &config.api_version)?,
            token: config.access_token.clone(),
            retry,
        })
    }

    /// Run a GraphQL document and decode its `data` payload, retrying when
    /// the shop throttles or answers with a transient status.
    pub async fn execute<T>(&self, query: &str, variables: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut failures: u32 = 0;
        loop {
            match self.issue(query, &variables).await {
                Ok(data) => return Ok(data),
                Err(err) if is_retryable(&err) => {
                    failures += 1;
                    if failures >= self.retry.max_attempts {
                        return Err(SyncError::RetriesExhausted {
                            attempts: failures,
                            last: err.to_string(),
                        });
                    }
                    let delay = self.retry.backoff_delay(failures - 1);
                    tracing::warn!(
                        attempt = failures,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Storefront request throttled, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn issue<T>(&self, query: &str, variables: &Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(ACCESS_TOKEN_HEADER, self.token.expose_secret())
            .json(&GraphqlRequest {
                query: query.trim(),
                variables,
            })
            .send()
            .await
            .map_err(|err| StorefrontError::ConnectionFailed(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| StorefrontError::ConnectionFailed(err.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StorefrontError::Throttled(body_snippet(&body, status)).into());
        }
        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                body = %body_snippet(&body, status),
                "Storefront request failed"
            );
            return Err(StorefrontError::BadStatus {
                status: status.as_u16(),
                message: body_snippet(&body, status),
            }
            .into());
        }

        let envelope: GraphqlEnvelope = serde_json::from_str(&body)
            .map_err(|err| StorefrontError::InvalidResponse(err.to_string()))?;

        if !envelope.errors.is_empty() {
            let formatted = format_graphql_errors(&envelope.errors);
            if is_throttle_error(&envelope.errors) {
                return Err(StorefrontError::Throttled(formatted).into());
            }
            return Err(StorefrontError::Graphql(formatted).into());
        }

        let data = envelope
            .data
            .filter(|value| !value.is_null())
            .ok_or_else(|| StorefrontError::InvalidResponse("response is missing data".to_string()))?;

        serde_json::from_value(data)
            .map_err(|err| StorefrontError::InvalidResponse(err.to_string()).into())
    }
}

fn is_retryable(err: &SyncError) -> bool {
    matches!(err, SyncError::Storefront(inner) if inner.is_retryable())
}

/// The apex-level throttle shows up either in the error message or as an
/// extensions code, depending on the surface that rejected the call.
fn is_throttle_error(entries: &[GraphqlErrorEntry]) -> bool {
    entries.iter().any(|entry| {
        if entry.message.to_lowercase().contains("throttled") {
            return true;
        }
        entry
            .extensions
            .as_ref()
            .is_some_and(|ext| ext.code.eq_ignore_ascii_case("THROTTLED"))
    })
}

fn format_graphql_errors(entries: &[GraphqlErrorEntry]) -> String {
    let parts: Vec<String> = entries
        .iter()
        .filter(|entry| !entry.message.trim().is_empty())
        .map(|entry| {
            let message = entry.message.trim();
            if entry.path.is_empty() {
                message.to_string()
            } else {
                let path = entry
                    .path
                    .iter()
                    .map(|segment| match segment.as_str() {
                        Some(text) => text.to_string(),
                        None => segment.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                format!("{message} (path: {path})")
            }
        })
        .collect();

    if parts.is_empty() {
        "unknown graphql error".to_string()
    } else {
        parts.join("; ")
    }
}

fn admin_endpoint(domain: &str, api_version: &str) -> Result<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(SyncError::Configuration("shop domain is empty".to_string()));
    }
    let api_version = api_version.trim();
    if api_version.is_empty() {
        return Err(SyncError::Configuration("shop api version is empty".to_string()));
    }

    let base = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };

    Ok(format!(
        "{}/admin/api/{}/graphql.json",
        base.trim_end_matches('/'),
        api_version
    ))
}

fn body_snippet(body: &str, status: StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status.canonical_reason().unwrap_or("unknown status").to_string();
    }
    if trimmed.len() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while end > 0 && !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
