//! REST client for the ledger backend with retry logic.
//!
//! Tables are served PostgREST-style under `/rest/v1/{table}` with
//! `column=op.value` filters; functions are invoked with a POST to
//! `/functions/v1/{name}`. Every request carries the `apikey` header and the
//! same key as bearer token.

use rand::Rng;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::application::ports::StoreError;

/// Retry behavior for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// First delay.
    pub initial_backoff: Duration,
    /// Delay ceiling.
    pub max_backoff: Duration,
    /// Growth factor between attempts.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Query filters as `(column, "op.value")` pairs.
pub type Filters<'a> = &'a [(&'a str, String)];

/// HTTP client for the ledger backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl BackendClient {
    /// Client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry,
        })
    }

    /// Rows of `table` matching `filters`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: Filters<'_>,
    ) -> Result<Vec<T>, StoreError> {
        self.request(Method::GET, &table_path(table), filters, None::<&()>)
            .await
    }

    /// Insert one row and return the stored representation.
    pub async fn insert<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        table: &str,
        row: &B,
    ) -> Result<Vec<T>, StoreError> {
        self.request(Method::POST, &table_path(table), &[], Some(row))
            .await
    }

    /// Patch rows matching `filters` and return them.
    pub async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        table: &str,
        filters: Filters<'_>,
        patch: &B,
    ) -> Result<Vec<T>, StoreError> {
        self.request(Method::PATCH, &table_path(table), filters, Some(patch))
            .await
    }

    /// Invoke a backend function.
    pub async fn invoke<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        function: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        self.request(
            Method::POST,
            &format!("/functions/v1/{function}"),
            &[],
            Some(body),
        )
        .await
    }

    async fn request<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        filters: Filters<'_>,
        body: Option<&B>,
    ) -> Result<T, StoreError> {
        let url = format!("{}{path}", self.base_url);
        let mut backoff = ExponentialBackoff::new(&self.retry);

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
                .header("Prefer", "return=representation")
                .query(filters);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %e,
                            path,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Backend unreachable, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(StoreError::Unavailable {
                        message: format!("{path}: {e}"),
                    });
                }
            };

            let status = response.status();
            if status.is_success() {
                let text = response.text().await.map_err(|e| StoreError::Unavailable {
                    message: e.to_string(),
                })?;
                let text = if text.trim().is_empty() { "null" } else { &text };
                return serde_json::from_str(text).map_err(|e| StoreError::Decode {
                    message: format!("{path}: {e}"),
                });
            }

            let body = response.text().await.unwrap_or_default();
            match categorize_status(status) {
                ErrorCategory::Retryable => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            status = status.as_u16(),
                            path,
                            delay_ms = delay.as_millis(),
                            "Retryable backend error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(StoreError::Unavailable {
                        message: format!("{path}: {status} after {} attempts", backoff.attempt),
                    });
                }
                ErrorCategory::NonRetryable => {
                    return Err(match status {
                        StatusCode::NOT_FOUND => StoreError::NotFound {
                            entity: "Resource".to_string(),
                            id: path.to_string(),
                        },
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            StoreError::Unavailable {
                                message: format!("{path}: {status}"),
                            }
                        }
                        _ => StoreError::Rejected {
                            message: format!("{status}: {body}"),
                        },
                    });
                }
            }
        }
    }
}

fn table_path(table: &str) -> String {
    format!("/rest/v1/{table}")
}

/// `column=eq.value` filter.
#[must_use]
pub fn eq(column: &str, value: impl std::fmt::Display) -> (&str, String) {
    (column, format!("eq.{value}"))
}

enum ErrorCategory {
    Retryable,
    NonRetryable,
}

const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        408 | 429 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff with up to 20% added jitter.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts,
            current_backoff: policy.initial_backoff,
            max_backoff: policy.max_backoff,
            multiplier: policy.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        let jitter = rand::rng().random_range(0.0..=0.2);
        Some(backoff.mul_f64(1.0 + jitter).min(self.max_backoff))
    }
}
